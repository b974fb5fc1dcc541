//! The UI-owning execution context.
//!
//! Work that touches the attachment hierarchy is funnelled through one
//! serial task: jobs run one at a time, in the order they were dispatched.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "util::ui_context";

type Job = BoxFuture<'static, ()>;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ui context has shut down")]
pub struct UiContextClosed;

#[derive(Clone, Debug)]
pub struct UiContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl UiContext {
    /// Starts the context on the current runtime. It runs until every handle
    /// has been dropped.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
            tracing::debug!(target: LOG_TARGET, "ui context stopped");
        });
        (Self { tx }, handle)
    }

    /// Queues `job` without waiting for it.
    pub fn dispatch<F>(&self, job: F) -> Result<(), UiContextClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx.send(job.boxed()).map_err(|_| UiContextClosed)
    }

    /// Queues `job` and waits for its output.
    pub async fn run<F, T>(&self, job: F) -> Result<T, UiContextClosed>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        self.dispatch(async move {
            let _ = done_tx.send(job.await);
        })?;
        done_rx.await.map_err(|_| UiContextClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn jobs_run_in_dispatch_order() {
        let (ui, _handle) = UiContext::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3u32 {
            let log = log.clone();
            ui.dispatch(async move {
                // later jobs must still wait for earlier ones
                tokio::time::sleep(Duration::from_millis(u64::from(3 - i) * 5)).await;
                log.lock().unwrap().push(i);
            })
            .unwrap();
        }
        ui.run(async {}).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn run_returns_job_output() {
        let (ui, _handle) = UiContext::spawn();
        assert_eq!(ui.run(async { 40 + 2 }).await, Ok(42));
    }

    #[tokio::test]
    async fn dispatch_fails_once_context_is_gone() {
        let (ui, handle) = UiContext::spawn();
        handle.abort();
        let _ = handle.await;

        assert!(ui.is_closed());
        assert_eq!(ui.dispatch(async {}), Err(UiContextClosed));
        assert_eq!(ui.run(async { 1 }).await, Err(UiContextClosed));
    }
}
