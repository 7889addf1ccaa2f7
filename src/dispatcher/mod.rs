//! # Dispatcher Module
//!
//! The dispatcher runs the handlers a [`Router`](crate::router::Router) resolves for a request:
//! the hook chain of each of the six stages and the serve handler between them.
//!
//! ## Overview
//!
//! The dispatcher:
//! - Resolves the serve route and seeds the request's path parameters from it
//! - Runs each stage's hook chain in resolution order (deepest, then most specific, then first
//!   registered)
//! - Gives every hook its own parameter view and restores the serve parameters afterwards
//! - Honors the [`DispatchSignal`] each handler returns
//! - Contains handler panics and errors as [`HookFault`]s
//!
//! ## Request Flow
//!
//! 1. `BeforeServe` hooks
//! 2. Serve handler (status 404 is set up front when no route matched)
//! 3. `AfterServe`, `BeforeOutput` hooks
//! 4. [`Lifecycle::write_output`]
//! 5. `AfterOutput`, `BeforeClose` hooks
//! 6. [`Lifecycle::close`]
//! 7. `AfterClose` hooks
//!
//! A handler returning [`DispatchSignal::SkipStage`] ends only its own stage;
//! [`DispatchSignal::SkipAll`] skips every hook and handler still pending. Listener steps are
//! never skipped.
//!
//! ## Error Handling
//!
//! - A handler returning `Err` or panicking is recorded in `response.faults`, logged at `error`
//!   and turns the status into 500
//! - The rest of the faulting stage is abandoned; later stages still run
//!
//! ## Example
//!
//! ```rust
//! use hookrouter::dispatcher::{DispatchSignal, Dispatcher, HandlerRequest};
//! use hookrouter::router::Router;
//! use http::Method;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut router = Router::default();
//! router.register_hook("/admin/*any", "BeforeServe", |req: &mut HandlerRequest| {
//!     req.response.write_status(401);
//!     Ok(DispatchSignal::SkipAll)
//! })?;
//! router.register_serve("/admin/users", |req: &mut HandlerRequest| {
//!     req.response.write("users");
//!     Ok(DispatchSignal::Continue)
//! })?;
//! router.start()?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(router));
//! let mut req = HandlerRequest::new(Method::GET, "example.com", "/admin/users");
//! dispatcher.dispatch(&mut req);
//! assert_eq!(req.response.status, 401);
//! assert!(req.response.body.is_empty());
//! # Ok(())
//! # }
//! ```

mod core;

pub use core::{
    DispatchSignal, Dispatcher, Handler, HandlerRequest, HandlerResponse, HandlerResult,
    HeaderVec, HookFault, Lifecycle, NoopLifecycle, SharedHandler, StageOutcome,
    MAX_INLINE_HEADERS,
};
