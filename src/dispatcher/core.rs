//! Dispatcher core module - hook chains and the serve handler for one request.

use http::Method;
use serde::Serialize;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use ulid::Ulid;

use crate::hooks::HookStage;
use crate::router::{CompiledRoute, ParamVec, RouteMatch, Router};

/// Maximum inline response headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated response header storage
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// What a handler wants to happen after it returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DispatchSignal {
    /// Run the next hook (or the next stage).
    #[default]
    Continue,
    /// Skip the remaining hooks of the current stage only.
    SkipStage,
    /// Skip every remaining hook, the serve handler if it has not run yet, and all later stages.
    SkipAll,
}

/// Return type of every handler. An `Err` is contained by the dispatcher and recorded as a
/// [`HookFault`].
pub type HandlerResult = anyhow::Result<DispatchSignal>;

/// A serve handler or hook.
///
/// Implemented for every `Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync`, so closures
/// and plain functions can be registered directly.
pub trait Handler: Send + Sync {
    /// Handle the request, writing into `req.response`.
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerRequest) -> HandlerResult + Send + Sync,
{
    #[inline]
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResult {
        self(req)
    }
}

/// Handler shared between every tree position it is anchored at.
pub type SharedHandler = Arc<dyn Handler>;

/// A hook or serve handler that panicked or returned `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookFault {
    /// Stage that was running, `None` for the serve handler
    pub stage: Option<HookStage>,
    /// Pattern of the failing route (`METHOD:uri@domain`)
    pub pattern: String,
    /// Error message or panic payload
    pub message: String,
}

impl fmt::Display for HookFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{stage} hook {} failed: {}", self.pattern, self.message),
            None => write!(f, "handler {} failed: {}", self.pattern, self.message),
        }
    }
}

/// Response being assembled for a request.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 403, 404, 500, etc.)
    pub status: u16,
    /// Response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body
    pub body: String,
    /// Faults contained while handling this request
    pub faults: Vec<HookFault>,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: String::new(),
            faults: Vec::new(),
        }
    }
}

impl HandlerResponse {
    /// Append to the body.
    #[inline]
    pub fn write(&mut self, content: impl AsRef<str>) {
        self.body.push_str(content.as_ref());
    }

    /// Replace the status code.
    #[inline]
    pub fn write_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// True when no fault has been recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Request state threaded through every hook and the serve handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for log correlation
    pub request_id: Ulid,
    /// HTTP method
    pub method: Method,
    /// Host header as received (may carry a port)
    pub host: String,
    /// Request path
    pub path: String,
    /// Path parameters visible to the handler currently running
    pub path_params: ParamVec,
    /// Route whose handler is currently running
    pub route: Option<Arc<CompiledRoute>>,
    /// Response under construction
    pub response: HandlerResponse,
}

impl HandlerRequest {
    /// New request with an empty 200 response.
    #[must_use]
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: Ulid::new(),
            method,
            host: host.into(),
            path: path.into(),
            path_params: ParamVec::new(),
            route: None,
            response: HandlerResponse::default(),
        }
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: a hook's own captures are appended after the serve
    /// route's, so they shadow equal-named serve parameters for the duration of that hook.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a path parameter for the rest of the current handler.
    ///
    /// Values set by a hook are discarded when the hook returns.
    pub fn set_path_param(&mut self, name: &str, value: impl Into<String>) {
        self.path_params.retain(|(k, _)| k.as_ref() != name);
        self.path_params.push((Arc::from(name), value.into()));
    }

    /// Convert path_params to HashMap
    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// How a stage (or the serve step) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Every handler ran and returned `Continue` (or there was nothing to run).
    Completed,
    /// A hook returned `SkipStage`.
    StageExited,
    /// A handler faulted; the rest of the stage was abandoned.
    Faulted,
    /// A handler returned `SkipAll`.
    AllExited,
}

impl StageOutcome {
    /// True when later stages must be skipped.
    #[inline]
    #[must_use]
    pub fn stops_request(self) -> bool {
        self == StageOutcome::AllExited
    }
}

/// Output and teardown steps owned by the listener.
///
/// [`Dispatcher::dispatch_with`] calls `write_output` between `BeforeOutput` and `AfterOutput`
/// and `close` between `BeforeClose` and `AfterClose`. Both run even when a handler signalled
/// [`DispatchSignal::SkipAll`].
pub trait Lifecycle {
    /// Hand the assembled response to the connection.
    fn write_output(&mut self, _req: &mut HandlerRequest) {}

    /// Tear the connection down.
    fn close(&mut self, _req: &mut HandlerRequest) {}
}

/// Lifecycle with no output or teardown, for embedding and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycle;

impl Lifecycle for NoopLifecycle {}

/// Runs hook chains and the serve handler for requests against a started [`Router`].
///
/// Cheap to clone; every clone shares the same router.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    /// Create a dispatcher over a router.
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// The router requests are resolved against.
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Resolve the serve route and seed the request with its parameters. A miss sets status 404
    /// up front so `BeforeServe` hooks can still override it.
    pub fn resolve(&self, req: &mut HandlerRequest) -> Option<RouteMatch> {
        let serve = self
            .router
            .resolve_serve(&req.host, &req.method, &req.path);
        match &serve {
            Some(m) => {
                req.path_params = m.path_params.clone();
                req.route = Some(Arc::clone(&m.route));
            }
            None => {
                req.path_params = ParamVec::new();
                req.route = None;
                req.response.status = 404;
            }
        }
        serve
    }

    /// Run the full request lifecycle without listener steps.
    pub fn dispatch(&self, req: &mut HandlerRequest) {
        self.dispatch_with(req, &mut NoopLifecycle);
    }

    /// Run the full request lifecycle:
    /// `BeforeServe`, serve, `AfterServe`, `BeforeOutput`, output, `AfterOutput`, `BeforeClose`,
    /// close, `AfterClose`.
    pub fn dispatch_with<L: Lifecycle + ?Sized>(&self, req: &mut HandlerRequest, lifecycle: &mut L) {
        let started = Instant::now();
        let serve = self.resolve(req);

        info!(
            request_id = %req.request_id,
            method = %req.method,
            host = %req.host,
            path = %req.path,
            route = %serve
                .as_ref()
                .map_or_else(|| "-".to_string(), |m| m.route.pattern.to_string()),
            "Request dispatched"
        );

        let mut stopped = self.run_stage(HookStage::BeforeServe, req).stops_request();
        if !stopped {
            if let Some(serve) = &serve {
                stopped = self.serve(serve, req).stops_request();
            }
        }
        for stage in [HookStage::AfterServe, HookStage::BeforeOutput] {
            if !stopped {
                stopped = self.run_stage(stage, req).stops_request();
            }
        }
        lifecycle.write_output(req);
        for stage in [HookStage::AfterOutput, HookStage::BeforeClose] {
            if !stopped {
                stopped = self.run_stage(stage, req).stops_request();
            }
        }
        lifecycle.close(req);
        if !stopped {
            self.run_stage(HookStage::AfterClose, req);
        }

        debug!(
            request_id = %req.request_id,
            status = req.response.status,
            faults = req.response.faults.len(),
            skipped_remaining = stopped,
            duration_us = started.elapsed().as_micros(),
            "Request complete"
        );
    }

    /// Run the serve handler of a resolved match.
    pub fn serve(&self, serve: &RouteMatch, req: &mut HandlerRequest) -> StageOutcome {
        req.path_params = serve.path_params.clone();
        req.route = Some(Arc::clone(&serve.route));
        match invoke(&serve.route, req) {
            Ok(DispatchSignal::SkipAll) => StageOutcome::AllExited,
            Ok(_) => StageOutcome::Completed,
            Err(fault) => {
                record_fault(req, fault);
                StageOutcome::Faulted
            }
        }
    }

    /// Run the hook chain of one stage.
    ///
    /// Every hook sees a fresh copy of the serve parameters with its own captures appended.
    /// Whatever a hook does to `path_params` is discarded when it returns, and the serve
    /// parameters are in place again once the stage is over.
    pub fn run_stage(&self, stage: HookStage, req: &mut HandlerRequest) -> StageOutcome {
        let chain = self
            .router
            .resolve_hooks(stage, &req.host, &req.method, &req.path);
        if chain.is_empty() {
            return StageOutcome::Completed;
        }

        debug!(
            request_id = %req.request_id,
            stage = %stage,
            hooks = chain.len(),
            "Running hook chain"
        );

        let serve_params = std::mem::take(&mut req.path_params);
        let serve_route = req.route.take();
        let mut outcome = StageOutcome::Completed;

        for hook in chain.iter() {
            let mut params = serve_params.clone();
            params.extend(hook.path_params.iter().cloned());
            req.path_params = params;
            req.route = Some(Arc::clone(&hook.route));

            let result = invoke(&hook.route, req);
            match result {
                Ok(DispatchSignal::Continue) => continue,
                Ok(DispatchSignal::SkipStage) => {
                    debug!(
                        request_id = %req.request_id,
                        stage = %stage,
                        hook = %hook.route.pattern,
                        "Hook skipped the rest of the stage"
                    );
                    outcome = StageOutcome::StageExited;
                }
                Ok(DispatchSignal::SkipAll) => {
                    debug!(
                        request_id = %req.request_id,
                        stage = %stage,
                        hook = %hook.route.pattern,
                        "Hook skipped all remaining stages"
                    );
                    outcome = StageOutcome::AllExited;
                }
                Err(fault) => {
                    record_fault(req, fault);
                    outcome = StageOutcome::Faulted;
                }
            }
            break;
        }

        req.path_params = serve_params;
        req.route = serve_route;
        outcome
    }
}

/// Call a route's handler, containing panics and errors.
fn invoke(route: &CompiledRoute, req: &mut HandlerRequest) -> Result<DispatchSignal, HookFault> {
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| route.handler.handle(req)));
    let fault = |message: String| HookFault {
        stage: route.stage,
        pattern: route.pattern.to_string(),
        message,
    };
    let signal = match result {
        Ok(Ok(signal)) => signal,
        Ok(Err(err)) => return Err(fault(format!("{err:#}"))),
        Err(payload) => return Err(fault(panic_message(payload.as_ref()))),
    };
    debug!(
        request_id = %req.request_id,
        stage = route.stage.map_or("serve", |s| s.as_str()),
        handler_name = %route.handler_name,
        signal = ?signal,
        duration_us = started.elapsed().as_micros(),
        "Handler complete"
    );
    Ok(signal)
}

fn record_fault(req: &mut HandlerRequest, fault: HookFault) {
    error!(
        request_id = %req.request_id,
        stage = fault.stage.map_or("serve", |s| s.as_str()),
        pattern = %fault.pattern,
        message = %fault.message,
        "Handler failed - contained"
    );
    req.response.status = 500;
    req.response.faults.push(fault);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
