use super::{RegistrationError, Router, RouterStatus};
use crate::config::RouterConfig;
use crate::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult};
use crate::hooks::HookStage;
use crate::pattern::SUPPORTED_METHODS;
use http::Method;

fn ok(_: &mut HandlerRequest) -> HandlerResult {
    Ok(DispatchSignal::Continue)
}

fn started(patterns: &[&str]) -> Router {
    let mut router = Router::default();
    for p in patterns {
        router.register_serve(p, ok).unwrap();
    }
    router.start().unwrap();
    router
}

fn serve_uri(router: &Router, method: Method, host: &str, path: &str) -> Option<String> {
    router
        .resolve_serve(host, &method, path)
        .map(|m| format!("{}@{}", m.route.pattern.uri, m.route.pattern.domain))
}

fn get(router: &Router, path: &str) -> Option<String> {
    router
        .resolve_serve("localhost", &Method::GET, path)
        .map(|m| m.route.pattern.uri.clone())
}

#[test]
fn test_literal_beats_named_and_wildcard() {
    let router = started(&["/user/*any", "/user/:id", "/user/list"]);
    assert_eq!(get(&router, "/user/list").as_deref(), Some("/user/list"));
    assert_eq!(get(&router, "/user/7").as_deref(), Some("/user/:id"));
    assert_eq!(get(&router, "/user/7/posts").as_deref(), Some("/user/*any"));
}

#[test]
fn test_literal_beats_its_own_wildcard_tail() {
    for order in [
        ["/user", "/user/*any", "/shop/list", "/shop/list/*rest"],
        ["/shop/list/*rest", "/shop/list", "/user/*any", "/user"],
    ] {
        let router = started(&order);
        assert_eq!(get(&router, "/user").as_deref(), Some("/user"));
        assert_eq!(get(&router, "/shop/list").as_deref(), Some("/shop/list"));
        assert_eq!(get(&router, "/user/x").as_deref(), Some("/user/*any"));
        assert_eq!(get(&router, "/shop/list/a/b").as_deref(), Some("/shop/list/*rest"));
    }
}

#[test]
fn test_named_still_beats_sibling_wildcard() {
    let router = started(&["/files/*path", "/files/:name", "/files/:name/*rest"]);
    assert_eq!(get(&router, "/files/a").as_deref(), Some("/files/:name"));
    assert_eq!(get(&router, "/files/a/b").as_deref(), Some("/files/:name/*rest"));
    assert_eq!(get(&router, "/files").as_deref(), Some("/files/*path"));
}

#[test]
fn test_deeper_pattern_wins() {
    let router = started(&["/a/:x", "/a/:x/b"]);
    assert_eq!(get(&router, "/a/1/b").as_deref(), Some("/a/:x/b"));
    assert_eq!(get(&router, "/a/1").as_deref(), Some("/a/:x"));
    assert_eq!(get(&router, "/a/1/c"), None);
}

#[test]
fn test_domain_route_never_leaks_to_other_hosts() {
    let router = started(&["GET:/x@example.com", "GET:/x", "/only@example.com"]);
    assert_eq!(
        serve_uri(&router, Method::GET, "example.com", "/x").as_deref(),
        Some("/x@example.com")
    );
    assert_eq!(
        serve_uri(&router, Method::GET, "other.com", "/x").as_deref(),
        Some("/x@default")
    );
    assert_eq!(serve_uri(&router, Method::GET, "other.com", "/only"), None);
}

#[test]
fn test_host_is_normalized() {
    let router = started(&["/x@example.com"]);
    assert_eq!(
        serve_uri(&router, Method::GET, "EXAMPLE.com:8080", "/x").as_deref(),
        Some("/x@example.com")
    );
}

#[test]
fn test_default_domain_falls_back_once() {
    let router = started(&["/x"]);
    assert_eq!(
        serve_uri(&router, Method::GET, "default", "/x").as_deref(),
        Some("/x@default")
    );
}

#[test]
fn test_cached_result_equals_fresh_result() {
    let patterns = ["/user/:id", "/user/list", "/files/*path"];
    let cached = started(&patterns);
    let mut uncached = Router::new(RouterConfig {
        cache_enabled: false,
        ..RouterConfig::default()
    });
    for p in patterns {
        uncached.register_serve(p, ok).unwrap();
    }
    uncached.start().unwrap();

    for path in ["/user/3", "/user/list", "/files/a/b.txt", "/nope"] {
        let first = cached.resolve_serve("h", &Method::GET, path);
        let second = cached.resolve_serve("h", &Method::GET, path);
        let fresh = uncached.resolve_serve("h", &Method::GET, path);
        let key = |m: &Option<super::RouteMatch>| {
            m.as_ref().map(|m| (m.route.pattern.uri.clone(), m.path_params_map()))
        };
        assert_eq!(key(&first), key(&second), "{path}");
        assert_eq!(key(&first), key(&fresh), "{path}");
    }
    assert_eq!(cached.serve_cache().len(), 4);
    assert!(uncached.serve_cache().is_empty());
}

#[test]
fn test_misses_are_cached() {
    let router = started(&["/a"]);
    assert!(router.resolve_serve("h", &Method::GET, "/b").is_none());
    assert_eq!(router.serve_cache().len(), 1);
}

#[test]
fn test_nothing_cached_before_start() {
    let mut router = Router::default();
    router.register_serve("/a", ok).unwrap();
    assert!(router.resolve_serve("h", &Method::GET, "/a").is_some());
    assert!(router.serve_cache().is_empty());
}

#[test]
fn test_all_methods_registered_by_default() {
    let router = started(&["/any"]);
    for method in SUPPORTED_METHODS {
        assert!(
            router.resolve_serve("h", &method, "/any").is_some(),
            "{method}"
        );
    }
    let propfind = Method::from_bytes(b"PROPFIND").unwrap();
    assert!(router.resolve_serve("h", &propfind, "/any").is_none());
}

#[test]
fn test_specific_method_beats_all() {
    let mut router = Router::default();
    router.register_serve("/m", ok).unwrap();
    router
        .register_serve_handler("GET:/m", std::sync::Arc::new(ok), "get_m")
        .unwrap();
    router.start().unwrap();
    let m = router.resolve_serve("h", &Method::GET, "/m").unwrap();
    assert_eq!(m.route.handler_name, "get_m");
    let m = router.resolve_serve("h", &Method::POST, "/m").unwrap();
    assert_ne!(m.route.handler_name, "get_m");
}

#[test]
fn test_other_method_is_a_miss() {
    let router = started(&["POST:/post"]);
    assert!(router.resolve_serve("h", &Method::POST, "/post").is_some());
    assert!(router.resolve_serve("h", &Method::GET, "/post").is_none());
}

#[test]
fn test_template_segment() {
    let router = started(&["/list/{page}.html"]);
    let m = router.resolve_serve("h", &Method::GET, "/list/2.html").unwrap();
    assert_eq!(m.get_path_param("page"), Some("2"));
    assert!(router.resolve_serve("h", &Method::GET, "/list/2.htm").is_none());
    assert!(router.resolve_serve("h", &Method::GET, "/list/.html").is_none());
}

#[test]
fn test_root_route() {
    let router = started(&["/"]);
    assert_eq!(get(&router, "/").as_deref(), Some("/"));
    assert_eq!(get(&router, "").as_deref(), Some("/"));
    assert_eq!(get(&router, "/x"), None);
}

#[test]
fn test_wildcard_matches_its_own_prefix() {
    let router = started(&["/user/*any"]);
    let m = router.resolve_serve("h", &Method::GET, "/user").unwrap();
    assert_eq!(m.get_path_param("any"), Some(""));
    let m = router.resolve_serve("h", &Method::GET, "/user/a/b").unwrap();
    assert_eq!(m.get_path_param("any"), Some("a/b"));
}

#[test]
fn test_trailing_slash_is_ignored() {
    let router = started(&["/user/list"]);
    assert_eq!(get(&router, "/user/list/").as_deref(), Some("/user/list"));
}

#[test]
fn test_duplicate_param_names_last_wins() {
    let router = started(&["/org/:id/user/:id"]);
    let m = router.resolve_serve("h", &Method::GET, "/org/1/user/2").unwrap();
    assert_eq!(m.get_path_param("id"), Some("2"));
    assert_eq!(m.path_params.len(), 2);
}

#[test]
fn test_literal_prefix_wins_across_branches() {
    // both routes have three segments and one capture; the walk follows the literal "a" branch
    for order in [["/a/:x/c", "/:y/b/c"], ["/:y/b/c", "/a/:x/c"]] {
        let router = started(&order);
        assert_eq!(get(&router, "/a/b/c").as_deref(), Some("/a/:x/c"));
        assert_eq!(get(&router, "/z/b/c").as_deref(), Some("/:y/b/c"));
    }
}

#[test]
fn test_longer_literal_prefix_wins() {
    for order in [["/a/:x/c", "/a/b/:z"], ["/a/b/:z", "/a/:x/c"]] {
        let router = started(&order);
        assert_eq!(get(&router, "/a/b/c").as_deref(), Some("/a/b/:z"));
        assert_eq!(get(&router, "/a/q/c").as_deref(), Some("/a/:x/c"));
    }
}

#[test]
fn test_literal_dead_end_falls_back_to_fuzzy_branch() {
    let router = started(&["/a/b/c", "/a/:x/d"]);
    assert_eq!(get(&router, "/a/b/d").as_deref(), Some("/a/:x/d"));
}

#[test]
fn test_equal_routes_keep_registration_order() {
    let mut router = Router::default();
    router
        .register_serve_handler("/p/:a", std::sync::Arc::new(ok), "first")
        .unwrap();
    router
        .register_serve_handler("/p/:b", std::sync::Arc::new(ok), "second")
        .unwrap();
    router.start().unwrap();
    let m = router.resolve_serve("h", &Method::GET, "/p/1").unwrap();
    assert_eq!(m.route.handler_name, "first");
}

#[test]
fn test_hook_chain_order() {
    let mut router = Router::default();
    router.register_hook("/priority/show", "BeforeServe", ok).unwrap();
    router.register_hook("/priority/:name", "beforeserve", ok).unwrap();
    router.register_hook("/priority/*any", "BEFORESERVE", ok).unwrap();
    router.start().unwrap();

    let uris = |path: &str| -> Vec<String> {
        router
            .resolve_hooks(HookStage::BeforeServe, "h", &Method::GET, path)
            .iter()
            .map(|m| m.route.pattern.uri.clone())
            .collect()
    };
    assert_eq!(
        uris("/priority/show"),
        ["/priority/show", "/priority/:name", "/priority/*any"]
    );
    assert_eq!(uris("/priority/other"), ["/priority/:name", "/priority/*any"]);
    assert!(router
        .resolve_hooks(HookStage::AfterServe, "h", &Method::GET, "/priority/show")
        .is_empty());
}

#[test]
fn test_identical_hooks_all_run_in_order() {
    let mut router = Router::default();
    for name in ["one", "two"] {
        router
            .register_hook_handler("/h", HookStage::AfterServe, std::sync::Arc::new(ok), name)
            .unwrap();
    }
    router.start().unwrap();
    let chain = router.resolve_hooks(HookStage::AfterServe, "h", &Method::GET, "/h");
    let names: Vec<&str> = chain.iter().map(|m| m.route.handler_name.as_str()).collect();
    assert_eq!(names, ["one", "two"]);
}

#[test]
fn test_hook_in_several_lists_runs_once() {
    let mut router = Router::default();
    // anchored in the "a" list and in the fuzzy list below it
    router.register_hook("/a/:x/*rest", "BeforeServe", ok).unwrap();
    router.start().unwrap();
    let chain = router.resolve_hooks(HookStage::BeforeServe, "h", &Method::GET, "/a/1/2/3");
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].get_path_param("rest"), Some("2/3"));
}

#[test]
fn test_hooks_from_both_domains() {
    let mut router = Router::default();
    router.register_hook("/x@a.com", "BeforeServe", ok).unwrap();
    router.register_hook("/x", "BeforeServe", ok).unwrap();
    router.start().unwrap();
    let chain = router.resolve_hooks(HookStage::BeforeServe, "a.com", &Method::GET, "/x");
    let domains: Vec<&str> = chain.iter().map(|m| m.route.pattern.domain.as_str()).collect();
    assert_eq!(domains, ["a.com", "default"]);
    let chain = router.resolve_hooks(HookStage::BeforeServe, "b.com", &Method::GET, "/x");
    assert_eq!(chain.len(), 1);
}

#[test]
fn test_duplicate_serve_rejected() {
    let mut router = Router::default();
    router.register_serve("GET:/d", ok).unwrap();
    assert!(matches!(
        router.register_serve("get:/d/", ok),
        Err(RegistrationError::DuplicateRoute { .. })
    ));
    // a different method filter is a different route
    router.register_serve("/d", ok).unwrap();
}

#[test]
fn test_overwrite_replaces_in_place() {
    let mut router = Router::new(RouterConfig {
        route_overwrite: true,
        ..RouterConfig::default()
    });
    router
        .register_serve_handler("/o/:id", std::sync::Arc::new(ok), "old")
        .unwrap();
    router
        .register_serve_handler("/o/:id", std::sync::Arc::new(ok), "new")
        .unwrap();
    router.start().unwrap();
    assert_eq!(router.len(), 1);
    let m = router.resolve_serve("h", &Method::GET, "/o/1").unwrap();
    assert_eq!(m.route.handler_name, "new");
}

#[test]
fn test_registration_while_running_fails() {
    let mut router = started(&["/a"]);
    assert_eq!(router.status(), RouterStatus::Running);
    assert!(matches!(
        router.register_serve("/b", ok),
        Err(RegistrationError::RouterRunning { .. })
    ));
    assert!(matches!(
        router.register_hook("/b", "AfterClose", ok),
        Err(RegistrationError::RouterRunning { .. })
    ));
    assert!(matches!(
        router.start(),
        Err(RegistrationError::RouterRunning { .. })
    ));
    assert!(router.resolve_serve("h", &Method::GET, "/b").is_none());
}

#[test]
fn test_stop_clears_cache_and_allows_registration() {
    let mut router = started(&["/a"]);
    assert!(router.resolve_serve("h", &Method::GET, "/b").is_none());
    router.stop();
    assert!(router.serve_cache().is_empty());
    router.register_serve("/b", ok).unwrap();
    router.start().unwrap();
    assert!(router.resolve_serve("h", &Method::GET, "/b").is_some());
}

#[test]
fn test_unknown_stage_rejected() {
    let mut router = Router::default();
    assert!(matches!(
        router.register_hook("/a", "AroundServe", ok),
        Err(RegistrationError::UnknownHookStage { .. })
    ));
}

#[test]
fn test_bad_patterns_rejected() {
    let mut router = Router::default();
    assert!(matches!(
        router.register_serve("/a/*rest/b", ok),
        Err(RegistrationError::MisplacedWildcard { .. })
    ));
    assert!(matches!(
        router.register_serve("/a/{page.html", ok),
        Err(RegistrationError::UnterminatedCapture { .. })
    ));
    assert!(matches!(
        router.register_serve("GET:", ok),
        Err(RegistrationError::EmptyUri { .. })
    ));
    assert!(router.is_empty());
}

#[test]
fn test_deny_routes_installed_on_start() {
    let mut router = Router::new(RouterConfig {
        deny_routes: vec!["/admin/*any".to_string()],
        ..RouterConfig::default()
    });
    router.register_serve("/admin/users", ok).unwrap();
    router.start().unwrap();
    let chain = router.resolve_hooks(HookStage::BeforeServe, "h", &Method::GET, "/admin/users");
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].route.handler_name, "deny_route");

    router.stop();
    router.start().unwrap();
    assert_eq!(router.len(), 2);
}

#[test]
fn test_bad_deny_route_installs_nothing() {
    for bad in ["nope", "/a/*rest/b"] {
        let mut router = Router::new(RouterConfig {
            deny_routes: vec!["/admin/*any".to_string(), bad.to_string()],
            ..RouterConfig::default()
        });
        router.register_serve("/admin/users", ok).unwrap();
        assert!(router.start().is_err());
        assert_eq!(router.len(), 1);
        assert!(router.start().is_err());
        assert_eq!(router.len(), 1);
        assert_eq!(router.status(), RouterStatus::Stopped);
    }
}

#[test]
fn test_unbracketed_ipv6_host_keeps_its_address() {
    assert_eq!(Router::normalize_domain("::1"), "::1");
    assert_eq!(Router::normalize_domain("FE80::1"), "fe80::1");
    assert_eq!(Router::normalize_domain("[::1]:8080"), "[::1]");
    assert_eq!(Router::normalize_domain("a.com:80"), "a.com");
    assert_eq!(Router::normalize_domain(":80"), "default");

    let mut router = Router::default();
    router.domain("::1").register_serve("/x", ok).unwrap();
    router.start().unwrap();
    assert_eq!(serve_uri(&router, Method::GET, "::1", "/x").as_deref(), Some("/x@::1"));
    assert_eq!(serve_uri(&router, Method::GET, "localhost", "/x"), None);
}

#[test]
fn test_route_table() {
    let mut router = Router::default();
    router.register_hook("/a", "AfterClose", ok).unwrap();
    router.register_serve("GET:/b@z.com", ok).unwrap();
    router.register_serve("/a", ok).unwrap();
    router.register_hook("/a", "BeforeServe", ok).unwrap();
    let rows: Vec<(String, Option<HookStage>)> = router
        .routes()
        .into_iter()
        .map(|r| (format!("{}:{}@{}", r.method, r.uri, r.domain), r.stage))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("ALL:/a@default".to_string(), None),
            ("ALL:/a@default".to_string(), Some(HookStage::BeforeServe)),
            ("ALL:/a@default".to_string(), Some(HookStage::AfterClose)),
            ("GET:/b@z.com".to_string(), None),
        ]
    );
}
