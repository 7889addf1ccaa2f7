//! # hookrouter
//!
//! **hookrouter** is an embeddable HTTP request router. Given an inbound request's method, host
//! and path it resolves the serve handler that should run, plus the ordered chain of lifecycle
//! hooks for each of six stages around it.
//!
//! ## Overview
//!
//! Handlers are registered against patterns of the form `[METHOD:]/uri[@domain]`:
//!
//! - `/user/list` - literal path, every HTTP verb, default domain
//! - `GET:/user/:id` - named segment, GET only
//! - `/static/*path@example.com` - tail capture, only for `example.com`
//! - `/list/{page}.html` - capture embedded in a literal segment
//!
//! Precedence between overlapping patterns is deterministic: deeper tree positions win first,
//! then more specific patterns at the same position (more segments, fewer captures, literal over
//! named over wildcard), then registration order.
//!
//! ## Architecture
//!
//! - **[`pattern`]** - parses registration strings into `(method, domain, uri)`
//! - **[`router`]** - compiles routes, stores them in per-domain segment tries, resolves and
//!   caches matches
//! - **[`dispatcher`]** - runs hook chains and the serve handler for a request, with parameter
//!   shadowing, early exit and panic containment
//! - **[`hooks`]** - the six hook stages
//! - **[`config`]** - router configuration from defaults, YAML and environment
//! - **[`otel`]** - `tracing` subscriber initialisation
//! - **[`cli`]** - the `hookrouter` inspection tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Listener
//!     participant Dispatcher
//!     participant Router
//!     participant Cache as RouteCache
//!     participant Hooks as Hook chain
//!     participant Handler as Serve handler
//!
//!     Listener->>Dispatcher: dispatch(request)
//!     Dispatcher->>Router: resolve_serve(host, method, path)
//!     Router->>Cache: lookup (domain, method, path)
//!     alt Cache miss
//!         Router->>Router: walk trees [host, default]
//!         Router->>Cache: store result (including "no route")
//!     end
//!     Router-->>Dispatcher: Option<RouteMatch>
//!     Dispatcher->>Hooks: BeforeServe
//!     Dispatcher->>Handler: handle(request)
//!     Dispatcher->>Hooks: AfterServe
//!     Dispatcher->>Hooks: BeforeOutput
//!     Dispatcher->>Listener: write_output
//!     Dispatcher->>Hooks: AfterOutput
//!     Dispatcher->>Hooks: BeforeClose
//!     Dispatcher->>Listener: close
//!     Dispatcher->>Hooks: AfterClose
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hookrouter::dispatcher::{DispatchSignal, Dispatcher, HandlerRequest};
//! use hookrouter::router::Router;
//! use http::Method;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::default();
//! router.register_serve("GET:/user/:id", |req: &mut HandlerRequest| {
//!     let id = req.get_path_param("id").unwrap_or_default().to_string();
//!     req.response.write(format!("user {id}"));
//!     Ok(DispatchSignal::Continue)
//! })?;
//! router.register_hook("/user/*any", "BeforeServe", |req: &mut HandlerRequest| {
//!     req.response.write("> ");
//!     Ok(DispatchSignal::Continue)
//! })?;
//! router.start()?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(router));
//! let mut req = HandlerRequest::new(Method::GET, "localhost:8080", "/user/42");
//! dispatcher.dispatch(&mut req);
//! assert_eq!(req.response.body, "> user 42");
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Route trees are only mutable while the router is not running, so a started router can be
//! shared as `Arc<Router>` and read without locks. The route cache is the only structure written
//! during serving; it is a sharded concurrent map and every entry is re-derivable from the trees.

pub mod cli;
pub mod config;
pub mod dispatcher;
mod echo;
pub mod hooks;
pub mod otel;
pub mod pattern;
pub mod router;

pub use config::RouterConfig;
pub use dispatcher::{DispatchSignal, Dispatcher, Handler, HandlerRequest, HandlerResponse};
pub use hooks::HookStage;
pub use pattern::{MethodFilter, Pattern, DEFAULT_DOMAIN};
pub use router::{RegistrationError, RouteMatch, Router};
