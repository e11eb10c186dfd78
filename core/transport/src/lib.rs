//! Transport layer for the helpdesk REST API.
//!
//! This module provides a trait-based interface for issuing API calls,
//! an HTTP implementation on top of reqwest, and an in-memory double
//! used throughout the test suites.
//!
//! # Design Principles
//! - Query-string arguments only: every parameter travels in the URL
//! - Typed failures: throttling, structured API errors and plain transport
//!   faults are distinct error kinds
//! - Loosely typed success: bodies come back as `serde_json::Value` and the
//!   resource layer checks their shape

pub mod config;
pub mod http;
pub mod memory;
pub mod request;
pub mod retry;
pub mod transport;

pub use config::{ApiConfig, Auth};
pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use request::{ApiRequest, Method};
pub use retry::{RetryConfig, RetryingTransport};
pub use transport::{SharedTransport, Transport};

use std::sync::Arc;

use deskbridge_common::Result;

/// Build the shared transport described by `config`, wrapping it in a
/// [`RetryingTransport`] when rate-limit retries are enabled.
pub fn connect(config: &ApiConfig) -> Result<SharedTransport> {
    let http = HttpTransport::new(config)?;
    if config.retry.max_retries > 0 {
        Ok(Arc::new(RetryingTransport::new(http, config.retry.clone())))
    } else {
        Ok(Arc::new(http))
    }
}
