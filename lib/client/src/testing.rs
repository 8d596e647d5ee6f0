//! In-memory backend for tests.
//!
//! Replies are queued per `(method, path)` and consumed in order; a request
//! with nothing queued gets a 404. Every request is recorded when it is
//! sent, so tests can count refresh calls and inspect replayed headers.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::backend::{HttpBackend, HttpMethod, HttpRequest, HttpResponse};
use crate::error::NetworkError;

/// A scripted outcome for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: Result<HttpResponse, NetworkError>,
    delay: Option<Duration>,
}

impl Reply {
    /// Replies with `response`.
    #[must_use]
    pub fn response(response: HttpResponse) -> Self {
        Self {
            outcome: Ok(response),
            delay: None,
        }
    }

    /// Fails the send as if the network were down.
    #[must_use]
    pub fn network_failure(reason: &str) -> Self {
        Self {
            outcome: Err(NetworkError {
                reason: reason.to_string(),
            }),
            delay: None,
        }
    }

    /// Holds the reply back for `delay`.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Self::response(response)
    }
}

#[derive(Default)]
struct Script {
    replies: HashMap<(HttpMethod, String), VecDeque<Reply>>,
    sent: Vec<HttpRequest>,
}

/// Backend that answers from a script.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    /// Creates a backend with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next `method` request to `path`.
    pub fn push(&self, method: HttpMethod, path: &str, reply: impl Into<Reply>) {
        self.lock()
            .replies
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply.into());
    }

    /// Returns every request sent so far, in send order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().sent.clone()
    }

    /// Returns the requests sent to `method path`, in send order.
    #[must_use]
    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<HttpRequest> {
        self.lock()
            .sent
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .cloned()
            .collect()
    }

    /// Returns how many requests were sent to `method path`.
    #[must_use]
    pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let reply = {
            let mut script = self.lock();
            script.sent.push(request.clone());
            script
                .replies
                .get_mut(&(request.method, request.path.clone()))
                .and_then(VecDeque::pop_front)
        };

        let Some(reply) = reply else {
            return Ok(HttpResponse::text(404, "Not Found"));
        };
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome
    }
}
