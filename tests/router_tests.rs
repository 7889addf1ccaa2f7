//! Integration tests for route resolution through the public API
//!
//! # Test Coverage
//!
//! - Pattern syntax: literal, named, wildcard and template segments
//! - Method filters and `ALL`
//! - Domain isolation and the `default` fallback
//! - Precedence between overlapping patterns
//! - The route table

use hookrouter::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult};
use hookrouter::pattern::{MethodFilter, Pattern};
use hookrouter::router::RouterStatus;
use hookrouter::{HookStage, RegistrationError, Router, DEFAULT_DOMAIN};
use http::Method;

fn ok(_: &mut HandlerRequest) -> HandlerResult {
    Ok(DispatchSignal::Continue)
}

fn zoo_router() -> Router {
    let mut router = Router::default();
    for pattern in [
        "GET:/",
        "GET:/zoo/animals",
        "POST:/zoo/animals",
        "GET:/zoo/animals/:id",
        "PUT:/zoo/animals/:id",
        "DELETE:/zoo/animals/:id",
        "GET:/zoo/animals/:id/toys/:toy_id",
        "GET:/zoo/:category/animals/:id/habitats/:habitat_id",
        "GET:/pages/{page}.html",
        "GET:/pages/{name}-{lang}.html",
        "/files/*path",
        "HEAD:/zoo/health",
        "/zoo/health@vet.example.com",
    ] {
        router.register_serve(pattern, ok).unwrap();
    }
    router.start().unwrap();
    router
}

fn assert_route_match(router: &Router, method: Method, path: &str, expected_uri: Option<&str>) {
    let result = router.resolve_serve("localhost", &method, path);
    assert_eq!(
        result.as_ref().map(|m| m.route.pattern.uri.as_str()),
        expected_uri,
        "{method} {path}"
    );
}

#[test]
fn test_zoo_routes() {
    let router = zoo_router();
    assert_route_match(&router, Method::GET, "/", Some("/"));
    assert_route_match(&router, Method::GET, "/zoo/animals", Some("/zoo/animals"));
    assert_route_match(&router, Method::POST, "/zoo/animals", Some("/zoo/animals"));
    assert_route_match(&router, Method::PATCH, "/zoo/animals", None);
    assert_route_match(&router, Method::PUT, "/zoo/animals/7", Some("/zoo/animals/:id"));
    assert_route_match(
        &router,
        Method::GET,
        "/zoo/animals/7/toys/3",
        Some("/zoo/animals/:id/toys/:toy_id"),
    );
    assert_route_match(
        &router,
        Method::GET,
        "/zoo/cats/animals/7/habitats/2",
        Some("/zoo/:category/animals/:id/habitats/:habitat_id"),
    );
    assert_route_match(&router, Method::HEAD, "/zoo/health", Some("/zoo/health"));
    assert_route_match(&router, Method::GET, "/zoo/health", None);
    assert_route_match(&router, Method::GET, "/does/not/exist", None);
}

#[test]
fn test_path_params_extracted() {
    let router = zoo_router();
    let m = router
        .resolve_serve("localhost", &Method::GET, "/zoo/cats/animals/7/habitats/2")
        .unwrap();
    assert_eq!(m.get_path_param("category"), Some("cats"));
    assert_eq!(m.get_path_param("id"), Some("7"));
    assert_eq!(m.get_path_param("habitat_id"), Some("2"));
    assert_eq!(m.path_params_map().len(), 3);
}

#[test]
fn test_template_segments() {
    let router = zoo_router();
    let m = router
        .resolve_serve("localhost", &Method::GET, "/pages/intro.html")
        .unwrap();
    assert_eq!(m.route.pattern.uri, "/pages/{page}.html");
    assert_eq!(m.get_path_param("page"), Some("intro"));

    let m = router
        .resolve_serve("localhost", &Method::GET, "/pages/guide-en.html")
        .unwrap();
    assert_eq!(m.route.pattern.uri, "/pages/{name}-{lang}.html");
    assert_eq!(m.get_path_param("name"), Some("guide"));
    assert_eq!(m.get_path_param("lang"), Some("en"));

    assert!(router
        .resolve_serve("localhost", &Method::GET, "/pages/intro.txt")
        .is_none());
}

#[test]
fn test_wildcard_captures_tail() {
    let router = zoo_router();
    let m = router
        .resolve_serve("localhost", &Method::DELETE, "/files/a/b/c.txt")
        .unwrap();
    assert_eq!(m.get_path_param("path"), Some("a/b/c.txt"));
}

#[test]
fn test_domain_specific_route() {
    let router = zoo_router();
    let vet = router
        .resolve_serve("Vet.Example.com:8443", &Method::GET, "/zoo/health")
        .unwrap();
    assert_eq!(vet.route.pattern.domain, "vet.example.com");

    let head = router
        .resolve_serve("vet.example.com", &Method::HEAD, "/zoo/health")
        .unwrap();
    assert_eq!(head.route.pattern.domain, "vet.example.com");
}

#[test]
fn test_pattern_parse_public() {
    let pattern = Pattern::parse("post:/a/:b@Example.COM").unwrap();
    assert_eq!(pattern.method, MethodFilter::Only(Method::POST));
    assert_eq!(pattern.domain, "example.com");
    assert_eq!(pattern.uri, "/a/:b");

    let pattern = Pattern::parse("/a").unwrap();
    assert_eq!(pattern.method, MethodFilter::All);
    assert_eq!(pattern.domain, DEFAULT_DOMAIN);

    assert!(matches!(
        Pattern::parse("FETCH:/a"),
        Err(RegistrationError::InvalidMethod { .. })
    ));
    assert!(matches!(
        Pattern::parse(""),
        Err(RegistrationError::EmptyUri { .. })
    ));
}

#[test]
fn test_router_lifecycle() {
    let mut router = Router::default();
    assert_eq!(router.status(), RouterStatus::Stopped);
    router.register_serve("/a", ok).unwrap();
    router.start().unwrap();
    assert!(router.is_running());
    assert!(matches!(
        router.register_serve("/b", ok),
        Err(RegistrationError::RouterRunning { .. })
    ));
    router.stop();
    router.register_serve("/b", ok).unwrap();
    router.start().unwrap();
    assert!(router.resolve_serve("x", &Method::GET, "/b").is_some());
}

#[test]
fn test_route_table() {
    let mut router = Router::default();
    router.register_serve("GET:/b", ok).unwrap();
    router.register_hook("/a/*any", "AfterClose", ok).unwrap();
    router.register_serve("/z@alpha.com", ok).unwrap();
    router.register_hook("/a/:id", "BeforeServe", ok).unwrap();

    let table = router.routes();
    let rows: Vec<(&str, Option<HookStage>, &str)> = table
        .iter()
        .map(|r| (r.domain.as_str(), r.stage, r.uri.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("alpha.com", None, "/z"),
            ("default", None, "/b"),
            ("default", Some(HookStage::BeforeServe), "/a/:id"),
            ("default", Some(HookStage::AfterClose), "/a/*any"),
        ]
    );
    assert_eq!(table[1].method, "GET");
    assert_eq!(table[2].priority, 2);
    assert!(table[3].regex.starts_with('^'));
}

#[test]
fn test_exact_route_beats_wildcard_tail() {
    let mut router = Router::default();
    router.register_serve("/docs/*page", ok).unwrap();
    router.register_serve("GET:/docs", ok).unwrap();
    router.start().unwrap();
    assert_route_match(&router, Method::GET, "/docs", Some("/docs"));
    assert_route_match(&router, Method::GET, "/docs/intro", Some("/docs/*page"));
    assert_route_match(&router, Method::POST, "/docs", Some("/docs/*page"));
}
