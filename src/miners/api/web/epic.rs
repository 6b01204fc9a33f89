use super::{HttpTransport, parse_body};
use crate::miners::api::{ApiClient, ApiError};
use crate::miners::data::Endpoint;
use crate::settings::ClientSettings;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::time::Duration;

/// ePIC web API client.
///
/// Telemetry is read with `GET /<command>`. State-changing commands are
/// `POST /<command>` with the parameter and the web password in the body.
pub struct EPicWebApi {
    transport: HttpTransport,
    password: String,
}

impl EPicWebApi {
    pub const PORT: u16 = 4028;

    /// Create a new ePIC web API client with default settings
    pub fn new(ip: IpAddr) -> Result<Self, ApiError> {
        Ok(Self {
            transport: HttpTransport::new(ip, Self::PORT, "/")?,
            password: ClientSettings::default().epic_password,
        })
    }

    pub fn with_settings(self, settings: &ClientSettings) -> Self {
        self.with_timeout(settings.timeout())
            .with_retries(settings.retries)
            .with_password(settings.epic_password.clone())
    }

    /// Set the timeout for API requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.set_timeout(timeout);
        self
    }

    /// Set the number of retries for failed requests
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.transport.set_retries(retries);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }
}

/// A GET can be answered with `{"result": false, "error": ...}` when the miner
/// cannot produce the data yet.
fn check_result(value: Value) -> Result<Value, ApiError> {
    if value.get("result").and_then(Value::as_bool) == Some(false) {
        let reason = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(ApiError::Rejected(reason));
    }
    Ok(value)
}

#[async_trait]
impl ApiClient for EPicWebApi {
    async fn send_command(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
        if endpoint.group != Endpoint::WEB {
            return Err(ApiError::UnsupportedGroup(endpoint.group));
        }
        let body = self
            .transport
            .execute(endpoint.command, Method::GET, None)
            .await?;
        check_result(parse_body(&body)?)
    }

    async fn send_action(
        &self,
        command: &'static str,
        param: Option<Value>,
    ) -> Result<Value, ApiError> {
        let payload = json!({
            "param": param,
            "password": self.password,
        });
        let body = self
            .transport
            .execute(command, Method::POST, Some(&payload))
            .await?;
        parse_body(&body)
    }
}
