//! Router core module - registration and the request hot path.

use http::Method;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cache::{CacheKey, RouteCache};
use super::compile::{parse_segments, CompiledRoute};
use super::error::RegistrationError;
use super::tree::{split_path, RouteNode};
use super::ParamVec;
use crate::config::RouterConfig;
use crate::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult, SharedHandler};
use crate::hooks::HookStage;
use crate::pattern::{Pattern, DEFAULT_DOMAIN};

const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Result of successfully matching a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (Arc to avoid expensive clones)
    pub route: Arc<CompiledRoute>,
    /// Path parameters extracted from the URL in capture order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/:id/user/:id`), returns the last occurrence.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// The bound handler.
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &SharedHandler {
        &self.route.handler
    }

    /// Convert path_params to HashMap
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Whether the router accepts registrations or serves requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RouterStatus {
    /// Registration phase; trees may change and nothing is cached.
    #[default]
    Stopped,
    /// Serving; trees are frozen and resolutions are cached.
    Running,
}

impl fmt::Display for RouterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterStatus::Stopped => f.write_str("stopped"),
            RouterStatus::Running => f.write_str("running"),
        }
    }
}

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// Domain the route is registered under
    pub domain: String,
    /// `ALL` or a single verb
    pub method: String,
    /// URI template
    pub uri: String,
    /// `None` for serve routes
    pub stage: Option<HookStage>,
    /// Segment count
    pub priority: usize,
    /// Handler type name
    pub handler: String,
    /// Compiled regex
    pub regex: String,
}

#[derive(Default)]
struct DomainTrees {
    serve: RouteNode,
    hooks: HashMap<HookStage, RouteNode>,
}

/// Request router: per-domain route trees, resolution and caching.
///
/// Build it while stopped, [`start`](Router::start) it, then share it (`Arc<Router>`) between
/// request threads. Resolution only needs `&self`.
///
/// # Resolution order
///
/// For a request on host `h`, the trees of `h` are searched first and the `default` domain
/// second. Within a tree, deeper terminal lists are tried before shallower ones, and each list
/// is ordered most specific first (see [`specificity`](super::specificity)).
pub struct Router {
    config: RouterConfig,
    status: RouterStatus,
    domains: HashMap<String, DomainTrees>,
    /// Every registration in order, deny hooks included
    registry: Vec<Arc<CompiledRoute>>,
    /// `METHOD:uri@domain` of serve routes to their registry slot
    serve_index: HashMap<String, usize>,
    serve_cache: RouteCache<Option<RouteMatch>>,
    hook_cache: RouteCache<Arc<[RouteMatch]>>,
    deny_installed: bool,
    next_id: u64,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    /// Create an empty, stopped router.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        let serve_cache = RouteCache::new(config.cache_expire_ms, config.cache_enabled);
        let hook_cache = RouteCache::new(config.cache_expire_ms, config.cache_enabled);
        Self {
            config,
            status: RouterStatus::Stopped,
            domains: HashMap::new(),
            registry: Vec::new(),
            serve_index: HashMap::new(),
            serve_cache,
            hook_cache,
            deny_installed: false,
            next_id: 1,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register a serve handler for `[METHOD:]/uri[@domain]`.
    ///
    /// # Errors
    ///
    /// Malformed patterns, duplicates (unless `route_overwrite` is set) and calls made while the
    /// router is running.
    pub fn register_serve<F>(&mut self, pattern: &str, handler: F) -> Result<(), RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_serve_handler(pattern, Arc::new(handler), std::any::type_name::<F>())
    }

    /// Register an already shared serve handler under an explicit name.
    pub fn register_serve_handler(
        &mut self,
        pattern: &str,
        handler: SharedHandler,
        name: &str,
    ) -> Result<(), RegistrationError> {
        self.ensure_stopped(pattern)?;
        let parsed = Pattern::parse(pattern)?;
        self.bind_parsed(parsed, None, handler, name)?;
        Ok(())
    }

    /// Register a hook for `stage` (case-insensitive stage name).
    ///
    /// Identical hook registrations are never duplicates: each one runs, in registration order.
    pub fn register_hook<F>(
        &mut self,
        pattern: &str,
        stage: &str,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        let stage: HookStage = stage.parse()?;
        self.register_hook_handler(pattern, stage, Arc::new(handler), std::any::type_name::<F>())
    }

    /// Register an already shared hook under an explicit name.
    pub fn register_hook_handler(
        &mut self,
        pattern: &str,
        stage: HookStage,
        handler: SharedHandler,
        name: &str,
    ) -> Result<(), RegistrationError> {
        self.ensure_stopped(pattern)?;
        let parsed = Pattern::parse(pattern)?;
        self.bind_parsed(parsed, Some(stage), handler, name)?;
        Ok(())
    }

    pub(crate) fn ensure_stopped(&self, pattern: &str) -> Result<(), RegistrationError> {
        if self.status == RouterStatus::Running {
            warn!(pattern = %pattern, "Registration rejected: router is running");
            return Err(RegistrationError::RouterRunning {
                pattern: pattern.to_string(),
            });
        }
        Ok(())
    }

    /// Compile a parsed pattern and insert it into the right tree.
    pub(crate) fn bind_parsed(
        &mut self,
        pattern: Pattern,
        stage: Option<HookStage>,
        handler: SharedHandler,
        name: &str,
    ) -> Result<Arc<CompiledRoute>, RegistrationError> {
        self.ensure_stopped(&pattern.to_string())?;

        if stage.is_none() {
            let key = pattern.to_string();
            if let Some(&slot) = self.serve_index.get(&key) {
                return self.overwrite(slot, key, handler, name);
            }
        }

        let route = Arc::new(CompiledRoute::compile(
            self.next_id,
            pattern,
            handler,
            name.to_string(),
            stage,
        )?);
        self.next_id += 1;

        let trees = self.domains.entry(route.pattern.domain.clone()).or_default();
        match stage {
            None => trees.serve.insert(&route),
            Some(stage) => trees.hooks.entry(stage).or_default().insert(&route),
        }
        if stage.is_none() {
            self.serve_index
                .insert(route.pattern.to_string(), self.registry.len());
        }
        self.registry.push(Arc::clone(&route));

        debug!(
            pattern = %route.pattern,
            stage = stage.map_or("serve", |s| s.as_str()),
            regex = %route.regex.as_str(),
            priority = route.priority,
            handler_name = %route.handler_name,
            "Route registered"
        );
        Ok(route)
    }

    fn overwrite(
        &mut self,
        slot: usize,
        key: String,
        handler: SharedHandler,
        name: &str,
    ) -> Result<Arc<CompiledRoute>, RegistrationError> {
        let existing = match self.registry.get(slot) {
            Some(existing) if self.config.route_overwrite => Arc::clone(existing),
            _ => {
                warn!(route = %key, "Duplicate route registration rejected");
                return Err(RegistrationError::DuplicateRoute { route: key });
            }
        };

        let replacement = Arc::new(existing.with_handler(handler, name.to_string()));
        if let Some(trees) = self.domains.get_mut(&existing.pattern.domain) {
            trees.serve.replace(existing.id, &replacement);
        }
        if let Some(entry) = self.registry.get_mut(slot) {
            *entry = Arc::clone(&replacement);
        }

        info!(
            route = %key,
            previous_handler = %existing.handler_name,
            handler_name = %replacement.handler_name,
            "Route overwritten"
        );
        Ok(replacement)
    }

    /// Freeze the trees and start serving.
    ///
    /// Installs the configured deny routes as `BeforeServe` hooks and prints the route table
    /// when `dump_routes` is set.
    ///
    /// # Errors
    ///
    /// Already running, or a deny route pattern is malformed.
    pub fn start(&mut self) -> Result<(), RegistrationError> {
        self.ensure_stopped("start")?;

        if !self.deny_installed {
            // every deny pattern is validated before any is bound
            let deny = self
                .config
                .deny_routes
                .iter()
                .map(|pattern| -> Result<Pattern, RegistrationError> {
                    let parsed = Pattern::parse(pattern)?;
                    parse_segments(&parsed.uri)?;
                    Ok(parsed)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let handler: SharedHandler = Arc::new(deny_route);
            for parsed in deny {
                self.bind_parsed(
                    parsed,
                    Some(HookStage::BeforeServe),
                    Arc::clone(&handler),
                    "deny_route",
                )?;
            }
            self.deny_installed = true;
        }

        if self.config.dump_routes {
            self.dump_routes();
        }

        self.status = RouterStatus::Running;

        let routes_summary: Vec<String> = self
            .registry
            .iter()
            .take(10)
            .map(|r| r.pattern.to_string())
            .collect();
        info!(
            routes_count = self.registry.len(),
            domains = self.domains.len(),
            cache_expire_ms = self.config.cache_expire_ms,
            cache_enabled = self.config.cache_enabled,
            routes_summary = ?routes_summary,
            "Router started"
        );
        Ok(())
    }

    /// Return to the registration phase and drop every cached resolution.
    pub fn stop(&mut self) {
        self.status = RouterStatus::Stopped;
        self.serve_cache.clear();
        self.hook_cache.clear();
        info!("Router stopped");
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> RouterStatus {
        self.status
    }

    /// True while serving.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RouterStatus::Running
    }

    /// Resolve the serve route for a request.
    ///
    /// `host` may carry a port and any letter case. A path registered only under another method
    /// is a miss, not a 405. Misses are cached like hits while the router runs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hookrouter::dispatcher::{DispatchSignal, HandlerRequest};
    /// use hookrouter::router::Router;
    /// use http::Method;
    ///
    /// let mut router = Router::default();
    /// router
    ///     .register_serve("POST:/post", |_: &mut HandlerRequest| Ok(DispatchSignal::Continue))
    ///     .unwrap();
    /// router.start().unwrap();
    /// assert!(router.resolve_serve("a.com", &Method::POST, "/post").is_some());
    /// assert!(router.resolve_serve("a.com", &Method::GET, "/post").is_none());
    /// ```
    #[must_use]
    pub fn resolve_serve(&self, host: &str, method: &Method, path: &str) -> Option<RouteMatch> {
        let domain = normalize_host(host);
        let path = normalize_path(path);

        debug!(
            domain = %domain,
            method = %method,
            path = %path,
            "Route match attempt"
        );

        let key = CacheKey::serve(&domain, method, path);
        if self.is_running() {
            if let Some(hit) = self.serve_cache.get(&key) {
                debug!(domain = %domain, method = %method, path = %path, "Route cache hit");
                return hit;
            }
        }

        let match_start = Instant::now();
        let result = self.match_serve(&domain, method, path);
        let match_duration = match_start.elapsed();

        match &result {
            Some(m) if match_duration > SLOW_MATCH => warn!(
                domain = %domain,
                method = %method,
                path = %path,
                route_pattern = %m.route.pattern,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            ),
            Some(m) => info!(
                domain = %domain,
                method = %method,
                path = %path,
                route_pattern = %m.route.pattern,
                handler_name = %m.route.handler_name,
                path_params = ?m.path_params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            ),
            None => warn!(
                domain = %domain,
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "No route matched"
            ),
        }

        if self.is_running() {
            self.serve_cache.insert(key, result.clone());
        }
        result
    }

    /// Resolve the hook chain of one stage for a request, in execution order.
    ///
    /// Every matching hook is collected across both domains and all candidate lists, each
    /// registration at most once.
    #[must_use]
    pub fn resolve_hooks(
        &self,
        stage: HookStage,
        host: &str,
        method: &Method,
        path: &str,
    ) -> Arc<[RouteMatch]> {
        let domain = normalize_host(host);
        let path = normalize_path(path);

        let key = CacheKey::hook(stage, &domain, method, path);
        if self.is_running() {
            if let Some(hit) = self.hook_cache.get(&key) {
                return hit;
            }
        }

        let chain: Arc<[RouteMatch]> = self.match_hooks(stage, &domain, method, path).into();
        if !chain.is_empty() {
            debug!(
                stage = %stage,
                domain = %domain,
                method = %method,
                path = %path,
                hooks = chain.len(),
                "Hook chain resolved"
            );
        }

        if self.is_running() {
            self.hook_cache.insert(key, Arc::clone(&chain));
        }
        chain
    }

    /// Request domain first, then `default` unless they are the same.
    fn search_domains<'a>(&'a self, domain: &str) -> impl Iterator<Item = &'a DomainTrees> {
        let own = self.domains.get(domain);
        let fallback = if domain == DEFAULT_DOMAIN {
            None
        } else {
            self.domains.get(DEFAULT_DOMAIN)
        };
        own.into_iter().chain(fallback)
    }

    fn match_serve(&self, domain: &str, method: &Method, path: &str) -> Option<RouteMatch> {
        let segments = split_path(path);
        for trees in self.search_domains(domain) {
            for list in trees.serve.candidates(&segments).iter().rev() {
                for route in list.iter() {
                    if !route.pattern.method.accepts(method) {
                        continue;
                    }
                    if let Some(path_params) = route.captures(path) {
                        return Some(RouteMatch {
                            route: Arc::clone(route),
                            path_params,
                        });
                    }
                }
            }
        }
        None
    }

    fn match_hooks(
        &self,
        stage: HookStage,
        domain: &str,
        method: &Method,
        path: &str,
    ) -> Vec<RouteMatch> {
        let segments = split_path(path);
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        for trees in self.search_domains(domain) {
            let Some(tree) = trees.hooks.get(&stage) else {
                continue;
            };
            for list in tree.candidates(&segments).iter().rev() {
                for route in list.iter() {
                    if seen.contains(&route.id) || !route.pattern.method.accepts(method) {
                        continue;
                    }
                    if let Some(path_params) = route.captures(path) {
                        seen.insert(route.id);
                        chain.push(RouteMatch {
                            route: Arc::clone(route),
                            path_params,
                        });
                    }
                }
            }
        }
        chain
    }

    /// The route table, grouped by domain then tree (serve first, then stages in execution
    /// order), registration order within a group.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut rows: Vec<(&Arc<CompiledRoute>, RouteInfo)> = self
            .registry
            .iter()
            .map(|route| {
                (
                    route,
                    RouteInfo {
                        domain: route.pattern.domain.clone(),
                        method: route.pattern.method.to_string(),
                        uri: route.pattern.uri.clone(),
                        stage: route.stage,
                        priority: route.priority,
                        handler: route.handler_name.clone(),
                        regex: route.regex.as_str().to_string(),
                    },
                )
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| {
            a.pattern
                .domain
                .cmp(&b.pattern.domain)
                .then_with(|| a.stage.cmp(&b.stage))
        });
        rows.into_iter().map(|(_, info)| info).collect()
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        let routes = self.routes();
        println!("[routes] status={} count={}", self.status, routes.len());
        for info in &routes {
            let stage = info.stage.map_or("serve", |s| s.as_str());
            println!(
                "[route] {:<12} {:<7} {:<30} {:<12} -> {}",
                info.domain, info.method, info.uri, stage, info.handler
            );
        }
    }

    /// Number of registrations, deny hooks included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Cache of serve resolutions.
    #[must_use]
    pub fn serve_cache(&self) -> &RouteCache<Option<RouteMatch>> {
        &self.serve_cache
    }

    /// Cache of hook chains.
    #[must_use]
    pub fn hook_cache(&self) -> &RouteCache<Arc<[RouteMatch]>> {
        &self.hook_cache
    }

    /// Drop expired entries from both caches and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.serve_cache.purge_expired() + self.hook_cache.purge_expired()
    }

    /// Lower-case a host and strip its port. An empty host maps to the default domain.
    ///
    /// A host with more than one `:` and no brackets is an IPv6 address and is kept whole.
    ///
    /// ```rust
    /// use hookrouter::router::Router;
    ///
    /// assert_eq!(Router::normalize_domain("Example.COM:8080"), "example.com");
    /// assert_eq!(Router::normalize_domain("[::1]:443"), "[::1]");
    /// assert_eq!(Router::normalize_domain("::1"), "::1");
    /// assert_eq!(Router::normalize_domain(""), "default");
    /// ```
    #[must_use]
    pub fn normalize_domain(host: &str) -> String {
        normalize_host(host)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let bare = if host.starts_with('[') {
        host.find(']').map_or(host, |end| &host[..=end])
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(host)
    } else {
        // no colon, or an unbracketed IPv6 address
        host
    };
    if bare.is_empty() {
        DEFAULT_DOMAIN.to_string()
    } else {
        bare.to_ascii_lowercase()
    }
}

/// Drop trailing slashes; an empty path is the root.
fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn deny_route(req: &mut HandlerRequest) -> HandlerResult {
    req.response.write_status(403);
    req.response.body.clear();
    req.response.write("Forbidden");
    Ok(DispatchSignal::SkipAll)
}
