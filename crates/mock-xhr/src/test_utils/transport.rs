//! A transport that records what passes through it.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::adapter::{Request, Response, Transport};
use crate::error::Result;
use crate::types::ResponseHeaders;

/// Answers every request with a fixed status and records it.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    status: u16,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl RecordingTransport {
    /// Create a transport answering 200 with `{"network": true}`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_status(200)
    }

    /// Create a transport answering with `status`.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// The body every passthrough response carries.
    #[must_use]
    pub fn body() -> Value {
        json!({"network": true})
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response>> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        let response = Response {
            status: self.status,
            data: Self::body(),
            headers: ResponseHeaders::new(),
            url: request.url,
        };
        async move { Ok(response) }.boxed()
    }
}
