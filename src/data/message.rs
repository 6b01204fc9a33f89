use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerMessage {
    /// The time this message was generated or occurred
    /// May be set to 0 if the device does not timestamp its messages
    pub timestamp: u32,
    /// The message code
    /// May be set to 0 if no code is set by the device
    pub code: u64,
    /// The human-readable message being relayed by the device
    pub message: String,
    /// The severity of this message
    pub severity: MessageSeverity,
}

impl MinerMessage {
    pub fn error(code: u64, message: impl Into<String>) -> Self {
        MinerMessage {
            timestamp: 0,
            code,
            message: message.into(),
            severity: MessageSeverity::Error,
        }
    }

    /// Wrap a raw vendor error value. Numeric values become the code,
    /// anything else is kept as the message text.
    pub fn from_vendor_error(raw: &Value) -> Self {
        match raw {
            Value::Number(n) => {
                let code = n.as_u64().unwrap_or_default();
                MinerMessage::error(code, n.to_string())
            }
            Value::String(s) => MinerMessage::error(0, s.clone()),
            other => MinerMessage::error(0, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_vendor_error_keeps_code() {
        let msg = MinerMessage::from_vendor_error(&json!(23));
        assert_eq!(msg.code, 23);
        assert_eq!(msg.message, "23");
        assert_eq!(msg.severity, MessageSeverity::Error);
    }

    #[test]
    fn text_vendor_error_keeps_message() {
        let msg = MinerMessage::from_vendor_error(&json!("Board 2 overheated"));
        assert_eq!(msg.code, 0);
        assert_eq!(msg.message, "Board 2 overheated");
    }
}
