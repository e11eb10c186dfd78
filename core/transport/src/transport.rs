//! Transport trait definition.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use deskbridge_common::Result;

use crate::request::ApiRequest;

/// Issues API calls and decodes their JSON responses.
///
/// Implementations own connection handling, authentication and TLS.
/// Callers shape-check the returned value themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and decode the response body.
    ///
    /// # Postconditions
    /// - Exactly one network round trip has completed
    /// - An empty success body decodes to `Value::Null`
    ///
    /// # Errors
    /// - `RateLimited` for HTTP 429
    /// - `ServerReported` when the error body carries `Errors.code`/`Errors.description`
    /// - `Transport` for every other failure
    /// - `InvalidResponse` when a success body is not valid JSON
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        (**self).send(request).await
    }
}

/// Shared handle used by entities; cloning it does not open a new connection.
pub type SharedTransport = Arc<dyn Transport>;
