use super::ApiError;
use crate::settings::ClientSettings;
use reqwest::{Client, Method, Response};
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

pub mod epic;
pub mod esp_web_api;

/// HTTP plumbing shared by the web API clients: base URL, timeout and retries.
pub struct HttpTransport {
    client: Client,
    base: Url,
    timeout: Duration,
    retries: u32,
}

impl HttpTransport {
    /// `prefix` is the path every command lives under, e.g. `"/api/"`.
    pub fn new(ip: IpAddr, port: u16, prefix: &str) -> Result<Self, ApiError> {
        let base = Url::parse(&format!("http://{}{}", SocketAddr::new(ip, port), prefix))
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let defaults = ClientSettings::default();

        Ok(Self {
            client,
            base,
            timeout: defaults.timeout(),
            retries: defaults.retries,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    /// Send a request, retrying on any failure, and return the body of the first
    /// successful response. After the last attempt, its error is returned.
    pub async fn execute(
        &self,
        command: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<String, ApiError> {
        let url = self
            .base
            .join(command)
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let mut last_error = ApiError::Timeout;
        for attempt in 0..=self.retries {
            let result = match self.execute_request(&url, &method, body).await {
                Ok(response) if response.status().is_success() => response
                    .text()
                    .await
                    .map_err(|e| ApiError::Network(e.to_string())),
                Ok(response) => Err(ApiError::Http(response.status().as_u16())),
                Err(e) => Err(e),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(e) => {
                    debug!(%url, attempt, error = %e, "request failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Execute the actual HTTP request
    async fn execute_request(
        &self,
        url: &Url,
        method: &Method,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let mut request_builder = match *method {
            Method::GET => self.client.get(url.clone()),
            Method::POST => self.client.post(url.clone()),
            Method::PATCH => self.client.patch(url.clone()),
            _ => return Err(ApiError::Request(format!("unsupported method {}", method))),
        };
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        let request = request_builder
            .timeout(self.timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        timeout(self.timeout, self.client.execute(request))
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Network(e.to_string())
                }
            })
    }
}

/// Parse a response body. Devices answer some commands with an empty body, which
/// counts as success.
pub fn parse_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(json!({"success": true}));
    }
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_server {
    //! A one-shot HTTP server on localhost for exercising the web clients.

    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single request with `status` and `body`. The receiver yields the raw
    /// request as read from the socket.
    pub async fn serve_once(status: u16, body: &str) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(request);
        });

        (addr, rx)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
