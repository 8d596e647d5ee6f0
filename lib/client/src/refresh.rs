//! Single-flight credential refresh.
//!
//! The coordinator is a task with one mailbox. The first 401 to reach it
//! while no refresh is running starts the only refresh call; every 401 that
//! arrives before that call settles joins a FIFO wait list. When the call
//! settles, the waiters are replayed in arrival order with the new
//! credential, or all rejected with `AuthExpired`.
//!
//! A replay is sent straight to the backend, so a second 401 is terminal
//! and never queues another refresh.
//!
//! A refresh only installs its credential if the store has not been set or
//! cleared since the refresh started. A refresh that settles after a logout
//! is discarded and its waiters are rejected.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Arc;
use storefront_core::{RefreshId, RequestId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::backend::{HttpRequest, HttpResponse};
use crate::credential::Credential;
use crate::error::ApiError;
use crate::transport::Shared;

/// A request parked until the in-flight refresh settles.
struct PendingRequest {
    id: RequestId,
    /// The request as first built, without an `Authorization` header.
    request: HttpRequest,
    /// Token the backend rejected; `None` if the request was sent anonymously.
    rejected_token: Option<String>,
    reply: oneshot::Sender<Result<HttpResponse, ApiError>>,
}

enum Command {
    RequestFailed401(PendingRequest),
}

enum Event {
    RequestFailed401(PendingRequest),
    RefreshSucceeded(Settled, Credential),
    RefreshFailed(Settled, ApiError),
}

/// Identifies a settled refresh and the store generation it started from.
#[derive(Clone, Copy)]
struct Settled {
    id: RefreshId,
    generation: u64,
}

struct InFlight {
    id: RefreshId,
    generation: u64,
    call: BoxFuture<'static, Result<Credential, ApiError>>,
}

/// Handle to the coordinator task.
#[derive(Clone)]
pub(crate) struct RefreshCoordinator {
    mailbox: mpsc::UnboundedSender<Command>,
}

impl RefreshCoordinator {
    /// Starts the coordinator task; it stops when the last handle is dropped.
    pub(crate) fn spawn(shared: Arc<Shared>) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let worker = Worker {
            shared,
            inbox,
            waiters: VecDeque::new(),
            in_flight: None,
        };
        tokio::spawn(worker.run());
        Self { mailbox }
    }

    /// Parks `request` until a refresh settles, then returns its replay outcome.
    pub(crate) async fn enqueue(
        &self,
        request: HttpRequest,
        rejected_token: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let (reply, outcome) = oneshot::channel();
        let pending = PendingRequest {
            id: RequestId::new(),
            request,
            rejected_token,
            reply,
        };
        debug!(request_id = %pending.id, path = %pending.request.path, "waiting for refresh");

        self.mailbox
            .send(Command::RequestFailed401(pending))
            .map_err(|_| coordinator_stopped())?;
        outcome.await.map_err(|_| coordinator_stopped())?
    }
}

fn coordinator_stopped() -> ApiError {
    ApiError::AuthExpired {
        reason: "refresh coordinator stopped".to_string(),
    }
}

struct Worker {
    shared: Arc<Shared>,
    inbox: mpsc::UnboundedReceiver<Command>,
    waiters: VecDeque<PendingRequest>,
    in_flight: Option<InFlight>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(Command::RequestFailed401(pending)) => Event::RequestFailed401(pending),
                    None => break,
                },
                (settled, outcome) = settle(&mut self.in_flight) => match outcome {
                    Ok(credential) => Event::RefreshSucceeded(settled, credential),
                    Err(error) => Event::RefreshFailed(settled, error),
                },
            };
            self.handle(event);
        }
        debug!("refresh coordinator stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::RequestFailed401(pending) => self.on_request_failed(pending),
            Event::RefreshSucceeded(settled, credential) => {
                self.on_refresh_succeeded(settled, credential);
            }
            Event::RefreshFailed(settled, error) => self.on_refresh_failed(settled.id, &error),
        }
    }

    fn on_request_failed(&mut self, pending: PendingRequest) {
        if self.in_flight.is_none() {
            // The 401 may predate a refresh that already finished.
            if let Some(token) = self.renewed_token(pending.rejected_token.as_deref()) {
                debug!(request_id = %pending.id, "credential already renewed; replaying");
                tokio::spawn(replay(Arc::clone(&self.shared), vec![pending], token));
                return;
            }

            let id = RefreshId::new();
            info!(refresh_id = %id, "refreshing access credential");
            self.in_flight = Some(InFlight {
                id,
                generation: self.shared.credentials.generation(),
                call: Arc::clone(&self.shared).refresh().boxed(),
            });
        }
        self.waiters.push_back(pending);
    }

    fn on_refresh_succeeded(&mut self, settled: Settled, credential: Credential) {
        self.in_flight = None;
        let waiters: Vec<_> = self.waiters.drain(..).collect();

        let token = credential.access_token().to_string();
        if !self
            .shared
            .credentials
            .set_if_generation(credential, settled.generation)
        {
            // Signed out or signed in again while the refresh was running.
            warn!(
                refresh_id = %settled.id,
                waiters = waiters.len(),
                "credential changed during refresh; discarding refreshed credential"
            );
            reject(waiters, "session ended during credential refresh");
            return;
        }

        info!(refresh_id = %settled.id, waiters = waiters.len(), "access credential refreshed");
        tokio::spawn(replay(Arc::clone(&self.shared), waiters, token));
    }

    fn on_refresh_failed(&mut self, id: RefreshId, error: &ApiError) {
        self.in_flight = None;
        let waiters: Vec<_> = self.waiters.drain(..).collect();
        warn!(
            refresh_id = %id,
            error = %error,
            waiters = waiters.len(),
            "refresh failed; ending session"
        );

        self.shared.expire_session();
        reject(waiters, &format!("credential refresh failed: {error}"));
    }

    /// Returns the stored token if it is still valid and is not the one rejected.
    fn renewed_token(&self, rejected: Option<&str>) -> Option<String> {
        let current = self.shared.credentials.get()?;
        if current.is_expired(self.shared.config.expiry_skew()) {
            return None;
        }
        (Some(current.access_token()) != rejected).then(|| current.access_token().to_string())
    }
}

/// Resolves when the in-flight refresh settles; never resolves while idle.
async fn settle(in_flight: &mut Option<InFlight>) -> (Settled, Result<Credential, ApiError>) {
    match in_flight {
        Some(flight) => {
            let settled = Settled {
                id: flight.id,
                generation: flight.generation,
            };
            (settled, (&mut flight.call).await)
        }
        None => std::future::pending().await,
    }
}

/// Fails every waiter with `AuthExpired`.
fn reject(waiters: Vec<PendingRequest>, reason: &str) {
    for pending in waiters {
        let rejection = ApiError::AuthExpired {
            reason: reason.to_string(),
        };
        if pending.reply.send(Err(rejection)).is_err() {
            debug!(request_id = %pending.id, "caller gone before rejection");
        }
    }
}

/// Replays `waiters` in order with `token`, resolving each with its own outcome.
async fn replay(shared: Arc<Shared>, waiters: Vec<PendingRequest>, token: String) {
    for pending in waiters {
        let outcome = replay_once(&shared, &pending.request, &token).await;
        if pending.reply.send(outcome).is_err() {
            debug!(request_id = %pending.id, "caller gone before replay completed");
        }
    }
}

async fn replay_once(
    shared: &Shared,
    request: &HttpRequest,
    token: &str,
) -> Result<HttpResponse, ApiError> {
    let response = shared.send(request.with_bearer(Some(token))).await?;
    if response.is_unauthorized() {
        warn!(path = %request.path, "request rejected after refresh; ending session");
        shared.expire_session();
        return Err(ApiError::AuthExpired {
            reason: "request rejected after credential refresh".to_string(),
        });
    }
    Ok(response)
}
