//! reqwest-backed transport for the helpdesk REST API.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use deskbridge_common::{Error, Result};

use crate::config::{ApiConfig, Auth};
use crate::request::ApiRequest;
use crate::transport::Transport;

/// HTTP transport against a fixed API base.
///
/// Credentials are client-level defaults; individual requests carry no
/// headers of their own.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from validated configuration.
    ///
    /// # Errors
    /// - `Error::Config` for an invalid base URL or unusable credentials
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base_url = config.parsed_base_url()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = header::HeaderMap::new();
        if let Some(value) = auth_header(&config.auth)? {
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// Resolve an API path such as `/api/ticket` against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid request path '{}': {}", path, e)))
    }

    /// Map a finished HTTP exchange to a decoded body or a typed error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(Error::RateLimited { retry_after });
        }

        let body = response.text().await.map_err(|e| Error::Transport {
            status: Some(status.as_u16()),
            message: format!("Failed to read response: {}", e),
        })?;

        if status.is_success() {
            decode_body(&body)
        } else {
            Err(error_from_body(status, &body))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.endpoint(&request.path)?;
        debug!("{} {}", request.method, url.path());

        let response = self
            .http
            .request(request.method.into(), url)
            .query(&request.query)
            .send()
            .await
            .map_err(|e| Error::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: format!("Request {} {} failed: {}", request.method, request.path, e),
            })?;

        self.handle_response(response).await
    }
}

fn auth_header(auth: &Auth) -> Result<Option<header::HeaderValue>> {
    let raw = match auth {
        Auth::None => return Ok(None),
        Auth::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            format!("Basic {}", encoded)
        }
        Auth::Token { token } => format!("Bearer {}", token),
    };

    let mut value = header::HeaderValue::from_str(&raw)
        .map_err(|e| Error::Config(format!("Invalid credentials: {}", e)))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

/// Decode a success body. Empty bodies decode to null.
pub(crate) fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("Response is not valid JSON: {}", e)))
}

/// Build the error for a non-success, non-429 response.
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> Error {
    let structured = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        let errors = v.get("Errors")?;
        let description = errors.get("description")?.as_str()?.to_string();
        let code = match errors.get("code") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Some((code, description))
    });

    match structured {
        Some((code, description)) => Error::ServerReported { code, description },
        None => {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            } else {
                body.trim().to_string()
            };
            Error::Transport {
                status: Some(status.as_u16()),
                message,
            }
        }
    }
}

/// Parse a delta-seconds `Retry-After` header. HTTP dates are ignored.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn canned(status: &str, headers: &[&str], body: &str) -> String {
        let mut response = format!("HTTP/1.1 {status}\r\n");
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ));
        response
    }

    /// Accept one connection on loopback, answer it with `response` and
    /// return the request head that was received.
    async fn serve_once(
        config: ApiConfig,
        response: String,
    ) -> (HttpTransport, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });

        let config = ApiConfig {
            base_url: format!("http://{addr}"),
            ..config
        };
        (HttpTransport::new(&config).unwrap(), server)
    }

    async fn exchange(response: String) -> (Result<Value>, String) {
        let (transport, server) = serve_once(ApiConfig::new("http://unused"), response).await;
        let result = transport
            .send(ApiRequest::get("/api/ticket").param("id", 5))
            .await;
        (result, server.await.unwrap())
    }

    #[tokio::test]
    async fn test_http_429_is_rate_limited_even_with_errors_body() {
        let (result, head) = exchange(canned(
            "429 Too Many Requests",
            &["Retry-After: 9", "Content-Type: application/json"],
            r#"{"Errors": {"code": 429, "description": "slow down"}}"#,
        ))
        .await;

        assert!(head.starts_with("GET /api/ticket?id=5 HTTP/1.1"));
        match result {
            Err(Error::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(9)));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_body_is_server_reported() {
        let (result, _) = exchange(canned(
            "400 Bad Request",
            &["Content-Type: application/json"],
            r#"{"Errors": {"code": 12, "description": "bad"}}"#,
        ))
        .await;

        match result {
            Err(Error::ServerReported { code, description }) => {
                assert_eq!(code, "12");
                assert_eq!(description, "bad");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_500_without_body_is_transport_error() {
        let (result, _) = exchange(canned("500 Internal Server Error", &[], "")).await;
        match result {
            Err(Error::Transport { status, message }) => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_empty_success_is_null() {
        let (result, _) = exchange(canned("200 OK", &[], "")).await;
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_http_success_decodes_and_sends_credentials() {
        let config = ApiConfig::new("http://unused").with_auth(Auth::Token {
            token: "tok".to_string(),
        });
        let (transport, server) = serve_once(
            config,
            canned(
                "200 OK",
                &["Content-Type: application/json"],
                r#"{"TicketID": 5, "Subject": "Printer"}"#,
            ),
        )
        .await;

        let value = transport
            .send(ApiRequest::post("/api/UpdateTicket").param("id", 5))
            .await
            .unwrap();
        assert_eq!(value, json!({"TicketID": 5, "Subject": "Printer"}));

        let head = server.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("post /api/updateticket?id=5 http/1.1"));
        assert!(head.contains("authorization: bearer tok"));
    }

    #[test]
    fn test_decode_empty_body_is_null() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert_eq!(decode_body("  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_scalar_and_object() {
        assert_eq!(decode_body("17").unwrap(), json!(17));
        assert_eq!(
            decode_body(r#"{"TicketID": 3}"#).unwrap(),
            json!({"TicketID": 3})
        );
    }

    #[test]
    fn test_decode_garbage_is_invalid_response() {
        assert!(matches!(
            decode_body("<html>oops</html>"),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_structured_error_body() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"Errors": {"code": 401, "description": "Not authorized"}}"#,
        );
        match err {
            Error::ServerReported { code, description } => {
                assert_eq!(code, "401");
                assert_eq!(description, "Not authorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unstructured_error_body() {
        let err = error_from_body(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(err, Error::Transport { status: Some(500), .. }));
        assert_eq!(err.to_string(), "Transport error (500): Internal Server Error");

        let err = error_from_body(StatusCode::BAD_GATEWAY, r#"{"message": "upstream"}"#);
        assert!(matches!(err, Error::Transport { status: Some(502), .. }));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let transport =
            HttpTransport::new(&ApiConfig::new("https://helpdesk.example.edu/helpdesk")).unwrap();
        let url = transport.endpoint("/api/ticket").unwrap();
        assert_eq!(url.as_str(), "https://helpdesk.example.edu/helpdesk/api/ticket");
    }

    #[test]
    fn test_auth_header_is_sensitive() {
        let value = auth_header(&Auth::Basic {
            username: "svc".to_string(),
            password: "pw".to_string(),
        })
        .unwrap()
        .unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Basic c3ZjOnB3");

        assert!(auth_header(&Auth::None).unwrap().is_none());
    }
}
