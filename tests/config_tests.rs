//! Tests for loading router configuration from YAML files

use hookrouter::config::DEFAULT_CACHE_EXPIRE_MS;
use hookrouter::dispatcher::{DispatchSignal, Dispatcher, HandlerRequest, HandlerResult};
use hookrouter::{RegistrationError, Router, RouterConfig};
use http::Method;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn body(text: &'static str) -> impl Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync {
    move |req: &mut HandlerRequest| -> HandlerResult {
        req.response.write(text);
        Ok(DispatchSignal::Continue)
    }
}

#[test]
fn test_load_full_file() {
    let file = write_yaml(
        r#"
cache_expire_ms: 250
cache_enabled: false
route_overwrite: true
deny_routes:
  - /private/*any
  - POST:/locked@example.com
dump_routes: true
"#,
    );
    let config = RouterConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.cache_expire_ms, 250);
    assert!(!config.cache_enabled);
    assert!(config.route_overwrite);
    assert_eq!(config.deny_routes.len(), 2);
    assert!(config.dump_routes);
}

#[test]
fn test_empty_mapping_uses_defaults() {
    let file = write_yaml("{}\n");
    let config = RouterConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config, RouterConfig::default());
    assert_eq!(config.cache_expire_ms, DEFAULT_CACHE_EXPIRE_MS);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("router.yaml");
    let err = RouterConfig::from_yaml_file(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("router.yaml"));
}

#[test]
fn test_overwrite_from_file_replaces_handler() {
    let file = write_yaml("route_overwrite: true\n");
    let mut router = Router::new(RouterConfig::from_yaml_file(file.path()).unwrap());
    router.register_serve("GET:/x", body("old")).unwrap();
    router.register_serve("get:/x/", body("new")).unwrap();
    router.start().unwrap();
    assert_eq!(router.len(), 1);

    let dispatcher = Dispatcher::new(Arc::new(router));
    let mut req = HandlerRequest::new(Method::GET, "localhost", "/x");
    dispatcher.dispatch(&mut req);
    assert_eq!(req.response.body, "new");
}

#[test]
fn test_duplicates_rejected_by_default() {
    let mut router = Router::new(RouterConfig::default());
    router.register_serve("GET:/x", body("old")).unwrap();
    assert!(matches!(
        router.register_serve("GET:/x", body("new")),
        Err(RegistrationError::DuplicateRoute { .. })
    ));
    // a different method or domain is not a duplicate
    router.register_serve("POST:/x", body("post")).unwrap();
    router.register_serve("GET:/x@a.com", body("a")).unwrap();
}

#[test]
fn test_deny_routes_from_file() {
    let file = write_yaml("deny_routes: [\"POST:/locked@example.com\"]\n");
    let mut router = Router::new(RouterConfig::from_yaml_file(file.path()).unwrap());
    router.register_serve("/locked", body("open")).unwrap();
    router.start().unwrap();
    let dispatcher = Dispatcher::new(Arc::new(router));

    let mut post = HandlerRequest::new(Method::POST, "example.com", "/locked");
    dispatcher.dispatch(&mut post);
    assert_eq!(post.response.status, 403);

    let mut get = HandlerRequest::new(Method::GET, "example.com", "/locked");
    dispatcher.dispatch(&mut get);
    assert_eq!(get.response.status, 200);
    assert_eq!(get.response.body, "open");

    let mut other = HandlerRequest::new(Method::POST, "other.com", "/locked");
    dispatcher.dispatch(&mut other);
    assert_eq!(other.response.body, "open");
}
