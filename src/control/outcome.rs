//! Structured result of a control call

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// `{ok, msg}` record returned to the external caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOutcome {
    pub ok: bool,
    pub msg: String,
}

impl ControlOutcome {
    /// Successful outcome
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            ok: true,
            msg: msg.into(),
        }
    }

    /// Failed outcome
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            msg: msg.into(),
        }
    }

    /// Build from a relay result, using `msg` on success
    pub fn from_result<T>(result: Result<T, RelayError>, msg: &str) -> Self {
        match result {
            Ok(_) => Self::success(msg),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
