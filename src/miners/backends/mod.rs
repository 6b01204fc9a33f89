use crate::miners::api::ApiError;
use serde_json::Value;
use tracing::warn;

pub mod epic;
pub mod espminer;
pub mod traits;

/// Interpret the answer to a state-changing command.
pub(crate) fn success_flag(command: &str, response: Result<Value, ApiError>) -> bool {
    match response {
        Ok(value) => match value.get("success").and_then(Value::as_bool) {
            Some(success) => success,
            None => {
                warn!(command, "response has no success flag");
                false
            }
        },
        Err(e) => {
            warn!(command, error = %e, "command failed");
            false
        }
    }
}
