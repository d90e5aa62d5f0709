//! HTTP transport for the chat endpoint.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::types::{ChatReply, ChatRequest, HealthStatus};
use crate::{Error, Result};

/// Anything that can deliver a chat request and produce the reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply>;
}

/// HTTP client for the chat backend
#[derive(Debug, Clone)]
pub struct ChatClient {
    endpoint: Url,
    health_url: Url,
    client: Client,
}

impl ChatClient {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))?;
        Self::with_client(&config.endpoint, &config.health_path, client)
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(endpoint: &str, health_path: &str, client: Client) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let health_url = endpoint
            .join(health_path)
            .map_err(|e| Error::InvalidEndpoint(format!("{}: {}", health_path, e)))?;

        Ok(Self {
            endpoint,
            health_url,
            client,
        })
    }

    /// Get the chat endpoint URL
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    // ========================================================================
    // Internal HTTP Methods
    // ========================================================================

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let response = self.client.get(url.clone()).send().await?;
        decode(response).await
    }

    /// Make a POST request
    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> Result<T> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        decode(response).await
    }

    // ========================================================================
    // Chat API
    // ========================================================================

    /// Send one message and wait for the full reply
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        tracing::debug!("POST {} ({} chars)", self.endpoint, request.message.chars().count());
        self.post(&self.endpoint, request).await
    }

    /// Query the backend health route
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get(&self.health_url).await
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.chat(request).await
    }
}

/// Turn a response into `T`, classifying a bad status or body as a
/// protocol error.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(Error::Protocol(format!("Request failed: {} {}", status, body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| Error::Protocol(format!("Malformed response body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn test_client(base: &str) -> ChatClient {
        let client = Client::builder().no_proxy().build().unwrap();
        ChatClient::with_client(&format!("{}/chat", base), "/health", client).unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            message: "Hello".to_string(),
            user_id: "web_user_1".to_string(),
        }
    }

    /// Serve a single canned response; the handle yields the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            raw
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(pos) = text.find("\r\n\r\n") {
                let content_length = text[..pos]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if text.len() >= pos + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_chat_success() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"response":"Hi there","timestamp":"2024-01-01T00:00:00","user_id":"web_user_1"}"#,
        )
        .await;

        let reply = test_client(&base).chat(&request()).await.unwrap();
        assert_eq!(reply.response, "Hi there");
        assert_eq!(reply.user_id.as_deref(), Some("web_user_1"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /chat "));
        assert!(raw.contains(r#""message":"Hello""#));
        assert!(raw.contains(r#""user_id":"web_user_1""#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_protocol_error() {
        let (base, server) =
            serve_once("500 Internal Server Error", r#"{"detail":"model exploded"}"#).await;

        let err = test_client(&base).chat(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("500")));
        assert!(err.is_send_failure());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_response_field_is_protocol_error() {
        let (base, server) = serve_once("200 OK", r#"{"answer":"wrong field"}"#).await;

        let err = test_client(&base).chat(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = test_client(&format!("http://{}", addr))
            .chat(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_send_failure());
    }

    #[tokio::test]
    async fn test_health() {
        let (base, server) = serve_once("200 OK", r#"{"status":"healthy","timestamp":"now"}"#).await;

        let health = test_client(&base).health().await.unwrap();
        assert!(health.is_healthy());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /health "));
    }

    #[test]
    fn test_new_from_default_config() {
        let client = ChatClient::new(&ClientConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/chat");
    }

    #[test]
    fn test_client_build_error_is_not_send_failure() {
        let error = Error::ClientBuild("TLS backend unavailable".to_string());
        assert!(!error.is_send_failure());
        assert_eq!(error.to_string(), "HTTP client setup failed: TLS backend unavailable");
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = ChatClient::with_client("not a url", "/health", Client::new());
        assert!(matches!(result, Err(Error::InvalidEndpoint(_))));
    }
}
