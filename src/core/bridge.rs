//! Request Bridge
//!
//! Adapts a callback-driven [`HttpExecutor`] into a single-result future that
//! can be canceled. Every call ends in exactly one outcome: the decoded value,
//! [`OAuth2Error::Http`], [`OAuth2Error::Transport`] or
//! [`OAuth2Error::Canceled`]. The completion callback, the cancellation token
//! and the request timeout all race to resolve a shared slot; the first one
//! wins and the others become no-ops.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::lock;
use crate::core::transport::{ExecutionHandle, ExecutionResult, HttpExecutor, HttpRequest, HttpResponse};
use crate::error::{OAuth2Error, OAuth2Result, TransportError};

/// Single-assignment outcome slot.
struct ResolveOnce<T> {
    sender: Mutex<Option<oneshot::Sender<OAuth2Result<T>>>>,
}

impl<T> ResolveOnce<T> {
    fn new(sender: oneshot::Sender<OAuth2Result<T>>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Returns `false` if an outcome was already set.
    fn resolve(&self, outcome: OAuth2Result<T>) -> bool {
        match lock(&self.sender).take() {
            Some(sender) => {
                // The receiver may be gone if the caller dropped the future.
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// State moved into the executor's completion callback.
struct Completion<T, D> {
    outcome: Arc<ResolveOnce<T>>,
    cancel: CancellationToken,
    decode: Option<D>,
    invoked: bool,
}

impl<T, D> Completion<T, D>
where
    D: FnOnce(HttpResponse) -> OAuth2Result<T>,
{
    fn complete(mut self, result: ExecutionResult) {
        self.invoked = true;

        if self.cancel.is_cancelled() {
            tracing::trace!("completion after cancellation ignored");
            return;
        }

        let response = match result {
            None => {
                tracing::trace!("executor completed without a payload");
                return;
            }
            Some(Err(error)) => {
                tracing::warn!(error = %error, "token request failed in transport");
                self.outcome.resolve(Err(error.into()));
                return;
            }
            Some(Ok(response)) => response,
        };

        let outcome = if response.is_success() {
            match self.decode.take() {
                Some(decode) => decode(response),
                None => return,
            }
        } else {
            tracing::warn!(
                status = response.status,
                status_text = %response.status_text,
                "token request returned non-success status"
            );
            let message = if response.status_text.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                response.status_text
            };
            Err(OAuth2Error::Http {
                status: response.status,
                message,
            })
        };

        if !self.outcome.resolve(outcome) {
            tracing::trace!("late completion ignored");
        }
    }
}

impl<T, D> Drop for Completion<T, D> {
    fn drop(&mut self) {
        if !self.invoked && !self.cancel.is_cancelled() {
            self.outcome
                .resolve(Err(TransportError::CallbackDropped.into()));
        }
    }
}

/// A started execution. Dropping it unresolved aborts the executor.
struct InFlight<T> {
    handle: Box<dyn ExecutionHandle>,
    outcome: Arc<ResolveOnce<T>>,
}

impl<T> InFlight<T> {
    /// Resolve with `error` and abort, unless an outcome already exists.
    fn interrupt(&self, error: OAuth2Error) {
        if self.outcome.resolve(Err(error)) {
            self.handle.abort();
        }
    }
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        self.interrupt(OAuth2Error::Canceled);
    }
}

/// Execute `request` and decode a successful response with `decode`.
///
/// `decode` runs only for 2xx responses; any other status becomes
/// [`OAuth2Error::Http`] carrying the status and status text. Canceling
/// `cancel` aborts the executor and resolves [`OAuth2Error::Canceled`]
/// unless a result was already delivered. A `timeout` on the request is
/// enforced here as well, so an executor that never calls back still
/// resolves. Failure to start the request is reported as
/// [`OAuth2Error::Transport`], never as a panic.
pub async fn execute<E, T, D>(
    executor: &E,
    request: HttpRequest,
    decode: D,
    cancel: &CancellationToken,
) -> OAuth2Result<T>
where
    E: HttpExecutor + ?Sized,
    T: Send + 'static,
    D: FnOnce(HttpResponse) -> OAuth2Result<T> + Send + 'static,
{
    if cancel.is_cancelled() {
        tracing::debug!(url = %request.url, "request canceled before submission");
        return Err(OAuth2Error::Canceled);
    }

    let (sender, mut receiver) = oneshot::channel();
    let outcome = Arc::new(ResolveOnce::new(sender));
    let timeout = request.timeout;

    let completion = Completion {
        outcome: outcome.clone(),
        cancel: cancel.clone(),
        decode: Some(decode),
        invoked: false,
    };

    tracing::debug!(method = request.method.as_str(), url = %request.url, "submitting request");

    let handle = match executor.execute(request, Box::new(move |result| completion.complete(result))) {
        Ok(handle) => handle,
        Err(error) => {
            tracing::warn!(error = %error, "request could not be started");
            // A callback the executor already fired wins; a dropped one does not.
            return match receiver.try_recv() {
                Ok(Err(OAuth2Error::Transport(TransportError::CallbackDropped))) | Err(_) => {
                    Err(error.into())
                }
                Ok(delivered) => delivered,
            };
        }
    };

    let in_flight = InFlight { handle, outcome };

    let deadline = async move {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => futures::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("request canceled");
            in_flight.interrupt(OAuth2Error::Canceled);
        }
        _ = &mut deadline => {
            if let Some(timeout) = timeout {
                tracing::warn!(?timeout, "request timed out");
                in_flight.interrupt(TransportError::Timeout { timeout }.into());
            }
        }
        delivered = &mut receiver => {
            return delivered.unwrap_or_else(|_| Err(TransportError::CallbackDropped.into()));
        }
    }

    // The slot is resolved at this point, possibly by a callback that beat
    // the interrupt.
    receiver
        .await
        .unwrap_or_else(|_| Err(TransportError::CallbackDropped.into()))
}

/// Execute `request` and return the raw response on a 2xx status.
pub async fn execute_response<E>(
    executor: &E,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> OAuth2Result<HttpResponse>
where
    E: HttpExecutor + ?Sized,
{
    execute(executor, request, Ok, cancel).await
}
