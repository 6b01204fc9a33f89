use serde::Deserialize;
use std::time::Duration;

/// Transport settings shared by all web API clients.
///
/// Deserializes from any serde format; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Per-request timeout, in seconds
    pub timeout_secs: u64,
    /// Extra attempts after a failed request
    pub retries: u32,
    /// Password ePIC firmware requires on every state-changing command
    pub epic_password: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            timeout_secs: 5,
            retries: 1,
            epic_password: String::from("letmein"),
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let settings: ClientSettings = serde_json::from_str(r#"{"retries": 3}"#).unwrap();
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.epic_password, "letmein");
    }
}
