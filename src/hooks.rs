//! Hook stages.
//!
//! Every request passes through six fixed lifecycle points. Each stage has its own route tree per
//! domain; the hooks resolved for a stage run in specificity order (see
//! [`Router::resolve_hooks`](crate::router::Router::resolve_hooks)).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::router::RegistrationError;

/// A lifecycle point around request serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookStage {
    /// Before the serve handler runs.
    BeforeServe,
    /// After the serve handler returns.
    AfterServe,
    /// Before the response is handed to the listener for output.
    BeforeOutput,
    /// After the response has been written.
    AfterOutput,
    /// Before the listener tears the connection down.
    BeforeClose,
    /// After teardown.
    AfterClose,
}

impl HookStage {
    /// All stages in execution order.
    pub const ALL: [HookStage; 6] = [
        HookStage::BeforeServe,
        HookStage::AfterServe,
        HookStage::BeforeOutput,
        HookStage::AfterOutput,
        HookStage::BeforeClose,
        HookStage::AfterClose,
    ];

    /// Canonical stage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::BeforeServe => "BeforeServe",
            HookStage::AfterServe => "AfterServe",
            HookStage::BeforeOutput => "BeforeOutput",
            HookStage::AfterOutput => "AfterOutput",
            HookStage::BeforeClose => "BeforeClose",
            HookStage::AfterClose => "AfterClose",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookStage {
    type Err = RegistrationError;

    /// Case-insensitive. `HOOK_BEFORE_SERVE` and `before_serve` spellings are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let folded = folded.strip_prefix("hook").unwrap_or(&folded);
        HookStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(folded))
            .ok_or_else(|| RegistrationError::UnknownHookStage {
                stage: s.to_string(),
            })
    }
}
