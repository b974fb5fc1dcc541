use crate::capability::CapabilityFactory;
use crate::host::{AttachmentHost, ElementId, HostError, HostedElement};
use crate::session::SessionConfiguration;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const LOG_TARGET: &str = "host::headless";

/// In-process hierarchy root. Attaching an element asks `factory` for a
/// capability on a background task and hands the result to the element's sink.
pub struct HeadlessHost {
    factory: Arc<dyn CapabilityFactory>,
    root: Option<Mutex<RootState>>,
}

#[derive(Default)]
struct RootState {
    next_id: u64,
    attached: BTreeMap<ElementId, SessionConfiguration>,
}

impl HeadlessHost {
    pub fn new(factory: Arc<dyn CapabilityFactory>) -> Self {
        Self {
            factory,
            root: Some(Mutex::new(RootState::default())),
        }
    }

    /// A host with nothing to attach to.
    pub fn without_root(factory: Arc<dyn CapabilityFactory>) -> Self {
        Self {
            factory,
            root: None,
        }
    }

    pub async fn attached(&self) -> Vec<ElementId> {
        match &self.root {
            Some(root) => root.lock().await.attached.keys().copied().collect(),
            None => Vec::new(),
        }
    }
}

impl AttachmentHost for HeadlessHost {
    fn has_root(&self) -> bool {
        self.root.is_some()
    }

    fn attach(&self, element: HostedElement) -> BoxFuture<'_, Result<ElementId, HostError>> {
        async move {
            let root = self.root.as_ref().ok_or(HostError::RootUnavailable)?;
            let HostedElement { configuration, sink } = element;

            let id = {
                let mut state = root.lock().await;
                state.next_id += 1;
                let id = ElementId::new(state.next_id);
                state.attached.insert(id, configuration.clone());
                id
            };
            tracing::debug!(target: LOG_TARGET, element = %id, "element attached");

            let factory = self.factory.clone();
            tokio::spawn(async move {
                match factory.prepare(configuration).await {
                    Ok(capability) => sink.deliver(capability).await,
                    Err(e) => {
                        tracing::warn!(
                            target: LOG_TARGET,
                            element = %id,
                            error = %e,
                            "capability preparation failed"
                        );
                        sink.fail(e).await
                    }
                }
            });

            Ok(id)
        }
        .boxed()
    }

    fn detach(&self, id: ElementId) -> BoxFuture<'_, Result<(), HostError>> {
        async move {
            let root = self.root.as_ref().ok_or(HostError::RootUnavailable)?;
            let removed = root.lock().await.attached.remove(&id);
            match removed {
                Some(_) => {
                    tracing::debug!(target: LOG_TARGET, element = %id, "element detached");
                    Ok(())
                }
                None => Err(HostError::UnknownElement(id)),
            }
        }
        .boxed()
    }
}
