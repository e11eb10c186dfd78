//! In-memory transport for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use deskbridge_common::{Error, Result};

use crate::request::{ApiRequest, Method};
use crate::transport::Transport;

/// Scripted answers for one `(method, path)` route.
#[derive(Default)]
struct Route {
    /// One-shot answers, consumed in order.
    queue: VecDeque<Result<Value>>,
    /// Answer repeated once the queue is drained.
    sticky: Option<Value>,
}

/// In-memory transport.
///
/// Answers are scripted per `(method, path)` and every request is recorded,
/// so tests can assert exactly what went over the wire. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Route>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MemoryTransport {
    /// Create a transport with no scripted routes.
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<(Method, String), Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self) -> MutexGuard<'_, Vec<ApiRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a one-shot successful answer.
    pub fn push_response(&self, method: Method, path: &str, value: Value) {
        self.routes()
            .entry((method, path.to_string()))
            .or_default()
            .queue
            .push_back(Ok(value));
    }

    /// Queue a one-shot failure.
    pub fn push_error(&self, method: Method, path: &str, error: Error) {
        self.routes()
            .entry((method, path.to_string()))
            .or_default()
            .queue
            .push_back(Err(error));
    }

    /// Answer every otherwise-unscripted call to this route with `value`.
    pub fn set_response(&self, method: Method, path: &str, value: Value) {
        self.routes()
            .entry((method, path.to_string()))
            .or_default()
            .sticky = Some(value);
    }

    /// All requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log().clone()
    }

    /// Requests sent to one route, oldest first.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.log()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Forget recorded requests, keeping the scripted routes.
    pub fn clear_requests(&self) {
        self.log().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let key = (request.method, request.path.clone());
        self.log().push(request);

        let mut routes = self.routes();
        let route = routes.get_mut(&key).ok_or_else(|| Error::Transport {
            status: Some(404),
            message: format!("No scripted response for {} {}", key.0, key.1),
        })?;

        if let Some(answer) = route.queue.pop_front() {
            return answer;
        }
        route.sticky.clone().ok_or_else(|| Error::Transport {
            status: Some(404),
            message: format!("Scripted responses exhausted for {} {}", key.0, key.1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_then_sticky() {
        let transport = MemoryTransport::new();
        transport.push_response(Method::Get, "/api/ticket", json!({"n": 1}));
        transport.set_response(Method::Get, "/api/ticket", json!({"n": 2}));

        let first = transport.send(ApiRequest::get("/api/ticket")).await.unwrap();
        let second = transport.send(ApiRequest::get("/api/ticket")).await.unwrap();
        let third = transport.send(ApiRequest::get("/api/ticket")).await.unwrap();

        assert_eq!(first, json!({"n": 1}));
        assert_eq!(second, json!({"n": 2}));
        assert_eq!(third, json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_unscripted_route_fails_and_is_recorded() {
        let transport = MemoryTransport::new();
        let err = transport
            .send(ApiRequest::post("/api/UpdateTicket").param("id", 5))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport { status: Some(404), .. }));
        let sent = transport.requests_to(Method::Post, "/api/UpdateTicket");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].query_param("id"), Some("5"));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let transport = MemoryTransport::new();
        let clone = transport.clone();
        clone.set_response(Method::Get, "/api/categories", json!([]));

        transport
            .send(ApiRequest::get("/api/categories"))
            .await
            .unwrap();
        assert_eq!(clone.requests().len(), 1);

        clone.clear_requests();
        assert!(transport.requests().is_empty());
    }
}
