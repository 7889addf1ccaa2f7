//! # Router Module
//!
//! The router module compiles registration patterns, stores them in per-domain segment tries and
//! resolves requests to a serve handler and per-stage hook chains.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Parsing and compiling `[METHOD:]/uri[@domain]` patterns into [`CompiledRoute`]s
//! - Inserting routes into one serve tree and six hook trees per domain
//! - Resolving `(host, method, path)` queries with request-domain then `default` fallback
//! - Caching resolutions (including misses) with a configurable TTL
//!
//! ## Architecture
//!
//! Resolution runs in two phases:
//!
//! 1. **Narrowing**: the path is walked segment by segment through the domain's route tree,
//!    preferring literal children over the shared fuzzy child, and the terminal lists met on the
//!    way are collected.
//!
//! 2. **Disambiguation**: the collected lists are tried deepest first. Within a list, routes are
//!    already sorted most specific first; each route's anchored regex decides the match and
//!    yields the path parameters.
//!
//! ## Example
//!
//! ```rust
//! use hookrouter::dispatcher::{DispatchSignal, HandlerRequest};
//! use hookrouter::router::Router;
//! use http::Method;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::default();
//! router.register_serve("/user/list", |_: &mut HandlerRequest| Ok(DispatchSignal::Continue))?;
//! router.register_serve("/user/:id", |_: &mut HandlerRequest| Ok(DispatchSignal::Continue))?;
//! router.start()?;
//!
//! let m = router.resolve_serve("localhost", &Method::GET, "/user/42").unwrap();
//! assert_eq!(m.route.pattern.uri, "/user/:id");
//! assert_eq!(m.get_path_param("id"), Some("42"));
//!
//! let m = router.resolve_serve("localhost", &Method::GET, "/user/list").unwrap();
//! assert_eq!(m.route.pattern.uri, "/user/list");
//! # Ok(())
//! # }
//! ```
//!
//! ## Performance
//!
//! Trees are immutable once the router is running, so lookups take no locks. The only shared
//! mutable state on the request path is the route cache, a sharded concurrent map.

mod cache;
mod compile;
mod core;
mod error;
mod group;
mod tree;
#[cfg(test)]
mod tests;

use smallvec::SmallVec;
use std::sync::Arc;

pub use cache::{CacheKey, RouteCache};
pub use compile::{specificity, CompiledRoute, Segment, TemplatePiece};
pub use core::{RouteInfo, RouteMatch, Router, RouterStatus};
pub use error::RegistrationError;
pub use group::{Controller, DomainBinder, RouterGroup};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names are `Arc<str>` shared with the compiled route; values are per-request data from
/// the URL. Duplicate names are allowed and lookups use "last write wins".
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;
