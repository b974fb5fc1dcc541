//! Turns the host's "element attached, capability delivered later" callback
//! into a single awaitable [`SessionProvider::session`] call.
//!
//! A provider is single-shot:
//!
//! ```text
//! Idle -> AwaitingCapability -> Attached -> Ready -> Ended
//! ```
//!
//! Any phase may move straight to `Ended`, and nothing leaves it. The
//! capability can arrive before the host reports the element id, in which
//! case `Attached` is skipped.

use crate::capability::{CapabilityError, TranslationCapability};
use crate::config::SessionTimeout;
use crate::host::{AttachmentHost, ElementId, HostedElement};
use crate::session::{CapabilitySession, Session, SessionConfiguration, SessionError};
use crate::util::UiContext;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

const LOG_TARGET: &str = "session::provider";

type SessionResult = Result<Box<dyn Session>, SessionError>;

pub trait SessionProvider: Send + Sync {
    fn configuration(&self) -> &SessionConfiguration;

    /// Waits for the capability for this provider's configuration.
    fn session(&self) -> BoxFuture<'_, Result<Box<dyn Session>, SessionError>>;

    /// Detaches the provider's element, if any, and clears its state. Safe to
    /// call more than once, or without a prior `session`.
    fn end_session(&self) -> BoxFuture<'_, ()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingCapability,
    Attached,
    Ready,
    Ended,
}

struct ManagerState {
    phase: SessionPhase,
    waiter: Option<oneshot::Sender<SessionResult>>,
    element: Option<ElementId>,
}

/// Owns a provider's pending waiter and hosted element. Every read and write
/// goes through the one lock.
struct SessionManager {
    state: Mutex<ManagerState>,
}

impl SessionManager {
    fn new() -> Self {
        Self {
            state: Mutex::new(ManagerState {
                phase: SessionPhase::Idle,
                waiter: None,
                element: None,
            }),
        }
    }

    async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    async fn register_waiter(
        &self,
        waiter: oneshot::Sender<SessionResult>,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        match state.phase {
            SessionPhase::Idle => {
                state.waiter = Some(waiter);
                state.phase = SessionPhase::AwaitingCapability;
                Ok(())
            }
            SessionPhase::Ended => Err(SessionError::Ended),
            _ => Err(SessionError::AlreadyRequested),
        }
    }

    /// Hands `id` back if the provider ended while the attach was in flight;
    /// the caller owns detaching it.
    async fn store_element(&self, id: ElementId) -> Option<ElementId> {
        let mut state = self.state.lock().await;
        match state.phase {
            SessionPhase::Ended => Some(id),
            SessionPhase::AwaitingCapability => {
                state.element = Some(id);
                state.phase = SessionPhase::Attached;
                None
            }
            _ => {
                state.element = Some(id);
                None
            }
        }
    }

    /// Fulfils the pending waiter. Outcomes arriving with no waiter are dropped.
    async fn resolve(&self, outcome: SessionResult) {
        let mut state = self.state.lock().await;
        let Some(waiter) = state.waiter.take() else {
            tracing::warn!(
                target: LOG_TARGET,
                phase = ?state.phase,
                ok = outcome.is_ok(),
                "capability outcome arrived with no pending session request; dropping it"
            );
            return;
        };

        if outcome.is_ok() {
            state.phase = SessionPhase::Ready;
            tracing::info!(target: LOG_TARGET, element = ?state.element, "session ready");
        }
        if waiter.send(outcome).is_err() {
            tracing::debug!(target: LOG_TARGET, "session requester went away before delivery");
        }
    }

    /// Element currently stored, read without waiting on the lock.
    fn attached_element(&self) -> Option<ElementId> {
        self.state.try_lock().ok().and_then(|state| state.element)
    }

    /// Moves to `Ended` and returns the element that still needs detaching.
    async fn end(&self) -> Option<ElementId> {
        let mut state = self.state.lock().await;
        state.phase = SessionPhase::Ended;
        state.waiter = None;
        state.element.take()
    }
}

/// Given to the host along with each element; the platform side reports the
/// prepared capability (or why there is none) through it.
#[derive(Clone)]
pub struct CapabilitySink {
    manager: Arc<SessionManager>,
}

impl CapabilitySink {
    pub async fn deliver(&self, capability: Box<dyn TranslationCapability>) {
        let session: Box<dyn Session> = Box::new(CapabilitySession::new(capability));
        self.manager.resolve(Ok(session)).await;
    }

    pub async fn fail(&self, error: CapabilityError) {
        self.manager
            .resolve(Err(SessionError::Capability(error)))
            .await;
    }
}

/// Session provider that attaches an element to an [`AttachmentHost`] and
/// waits for the capability the attachment produces.
pub struct HostedSessionProvider {
    configuration: SessionConfiguration,
    ui: UiContext,
    host: Arc<dyn AttachmentHost>,
    timeout: Option<SessionTimeout>,
    manager: Arc<SessionManager>,
}

impl HostedSessionProvider {
    /// Fails with [`SessionError::NoAttachmentRoot`] when `host` has nothing
    /// to attach to. That is an environment fault and is not worth retrying.
    pub fn new(
        configuration: SessionConfiguration,
        ui: UiContext,
        host: Arc<dyn AttachmentHost>,
    ) -> Result<Self, SessionError> {
        if !host.has_root() {
            tracing::error!(target: LOG_TARGET, "attachment host has no root");
            return Err(SessionError::NoAttachmentRoot);
        }
        Ok(Self {
            configuration,
            ui,
            host,
            timeout: None,
            manager: Arc::new(SessionManager::new()),
        })
    }

    /// `None` waits for the capability indefinitely.
    pub fn with_timeout(mut self, timeout: Option<SessionTimeout>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn phase(&self) -> SessionPhase {
        self.manager.phase().await
    }

    async fn acquire(&self) -> SessionResult {
        let (waiter, pending) = oneshot::channel();
        self.manager.register_waiter(waiter).await?;
        tracing::debug!(
            target: LOG_TARGET,
            configuration = ?self.configuration,
            "awaiting translation capability"
        );

        let element = HostedElement {
            configuration: self.configuration.clone(),
            sink: CapabilitySink {
                manager: self.manager.clone(),
            },
        };
        let host = self.host.clone();
        let manager = self.manager.clone();
        self.ui.dispatch(async move {
            match host.attach(element).await {
                Ok(id) => {
                    if let Some(stale) = manager.store_element(id).await {
                        tracing::warn!(
                            target: LOG_TARGET,
                            element = %stale,
                            "provider ended during attach; detaching"
                        );
                        if let Err(e) = host.detach(stale).await {
                            tracing::warn!(
                                target: LOG_TARGET,
                                element = %stale,
                                error = %e,
                                "detach failed"
                            );
                        }
                    }
                }
                Err(e) => manager.resolve(Err(SessionError::Attach(e))).await,
            }
        })?;

        let delivered = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout.duration(), pending)
                .await
                .map_err(|_| SessionError::TimedOut(timeout.duration())),
            None => Ok(pending.await),
        };

        match delivered {
            Ok(received) => received.unwrap_or(Err(SessionError::Abandoned)),
            Err(timed_out) => {
                tracing::warn!(target: LOG_TARGET, error = %timed_out, "giving up on session");
                self.abandon().await;
                Err(timed_out)
            }
        }
    }

    /// Ends the state now and queues the detach, without waiting on the UI
    /// context (which may be the thing that is stuck).
    async fn abandon(&self) {
        let Some(id) = self.manager.end().await else {
            return;
        };
        let host = self.host.clone();
        let queued = self.ui.dispatch(async move {
            if let Err(e) = host.detach(id).await {
                tracing::warn!(target: LOG_TARGET, element = %id, error = %e, "detach failed");
            }
        });
        if queued.is_err() {
            tracing::warn!(
                target: LOG_TARGET,
                element = %id,
                "ui context gone; element left attached"
            );
        }
    }
}

async fn teardown(manager: Arc<SessionManager>, host: Arc<dyn AttachmentHost>) {
    let Some(id) = manager.end().await else {
        tracing::trace!(target: LOG_TARGET, "session ended with nothing attached");
        return;
    };
    match host.detach(id).await {
        Ok(()) => tracing::info!(target: LOG_TARGET, element = %id, "session ended"),
        Err(e) => {
            tracing::warn!(target: LOG_TARGET, element = %id, error = %e, "detach failed")
        }
    }
}

impl SessionProvider for HostedSessionProvider {
    fn configuration(&self) -> &SessionConfiguration {
        &self.configuration
    }

    fn session(&self) -> BoxFuture<'_, Result<Box<dyn Session>, SessionError>> {
        self.acquire().boxed()
    }

    fn end_session(&self) -> BoxFuture<'_, ()> {
        async move {
            let job = teardown(self.manager.clone(), self.host.clone());
            if self.ui.run(job).await.is_err() {
                let leaked = self.manager.end().await;
                tracing::warn!(
                    target: LOG_TARGET,
                    element = ?leaked,
                    "ui context gone; state cleared without detaching"
                );
            }
        }
        .boxed()
    }
}

impl Drop for HostedSessionProvider {
    fn drop(&mut self) {
        // Covers a `session` future dropped mid-wait. No-op after `end_session`.
        let queued = self
            .ui
            .dispatch(teardown(self.manager.clone(), self.host.clone()));
        if queued.is_err() {
            if let Some(id) = self.manager.attached_element() {
                tracing::warn!(
                    target: LOG_TARGET,
                    element = %id,
                    "ui context gone on drop; element left attached"
                );
            }
        }
    }
}
