use super::{HttpTransport, parse_body};
use crate::miners::api::{ApiClient, ApiError};
use crate::miners::data::Endpoint;
use crate::settings::ClientSettings;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::net::IpAddr;
use std::time::Duration;

/// ESPMiner WebAPI client for communicating with BitAxe and similar miners
pub struct EspWebApi {
    transport: HttpTransport,
}

impl EspWebApi {
    pub const PORT: u16 = 80;

    /// Create a new ESPMiner WebAPI client
    pub fn new(ip: IpAddr) -> Result<Self, ApiError> {
        Ok(Self {
            transport: HttpTransport::new(ip, Self::PORT, "/api/")?,
        })
    }

    pub fn with_settings(self, settings: &ClientSettings) -> Self {
        self.with_timeout(settings.timeout())
            .with_retries(settings.retries)
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
}

#[async_trait]
impl ApiClient for EspWebApi {
    async fn send_command(&self, endpoint: Endpoint) -> Result<Value, ApiError> {
        if endpoint.group != Endpoint::WEB {
            return Err(ApiError::UnsupportedGroup(endpoint.group));
        }
        let body = self
            .transport
            .execute(endpoint.command, Method::GET, None)
            .await?;
        parse_body(&body)
    }

    /// Settings updates are `PATCH`, everything else is `POST`. The firmware answers
    /// actions with plain text, so any successful status counts as success.
    async fn send_action(
        &self,
        command: &'static str,
        param: Option<Value>,
    ) -> Result<Value, ApiError> {
        let method = if param.is_some() {
            Method::PATCH
        } else {
            Method::POST
        };
        self.transport
            .execute(command, method, param.as_ref())
            .await?;
        Ok(json!({"success": true}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miners::api::web::test_server::serve_once;

    fn client(addr: std::net::SocketAddr) -> EspWebApi {
        EspWebApi {
            transport: HttpTransport::new(addr.ip(), addr.port(), "/api/").unwrap(),
        }
        .with_retries(0)
    }

    #[tokio::test]
    async fn reads_system_info() {
        let (addr, request) = serve_once(200, r#"{"hostname": "bitaxe", "hashRate": 480.5}"#).await;
        let value = client(addr)
            .send_command(Endpoint::web("system/info"))
            .await
            .unwrap();

        assert_eq!(value["hostname"], "bitaxe");
        assert!(request.await.unwrap().starts_with("GET /api/system/info HTTP/1.1"));
    }

    #[tokio::test]
    async fn restart_accepts_plain_text_answer() {
        let (addr, request) = serve_once(200, "System will restart shortly.").await;
        let value = client(addr).send_action("system/restart", None).await.unwrap();

        assert_eq!(value, json!({"success": true}));
        assert!(request.await.unwrap().starts_with("POST /api/system/restart HTTP/1.1"));
    }

    #[tokio::test]
    async fn settings_are_patched() {
        let (addr, request) = serve_once(200, "").await;
        client(addr)
            .send_action("system", Some(json!({"fanspeed": 80})))
            .await
            .unwrap();
        assert!(request.await.unwrap().starts_with("PATCH /api/system HTTP/1.1"));
    }
}
