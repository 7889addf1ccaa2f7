use crate::dispatcher::{DispatchSignal, HandlerRequest, HandlerResult, SharedHandler};
use std::sync::Arc;

/// Handler used by the CLI for manifest routes: appends `[name]` to the body and continues,
/// so the body of a resolved request shows which handlers ran and in what order.
pub(crate) fn echo_handler(name: &str) -> SharedHandler {
    let tag = format!("[{name}]");
    Arc::new(move |req: &mut HandlerRequest| -> HandlerResult {
        req.response.write(&tag);
        Ok(DispatchSignal::Continue)
    })
}
