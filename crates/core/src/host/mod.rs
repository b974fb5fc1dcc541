//! The hierarchy a session provider attaches its transient element to.
//!
//! Hosts are passed in explicitly; nothing in this crate looks up an ambient
//! window or root.

mod headless;

use crate::session::provider::CapabilitySink;
use crate::session::SessionConfiguration;
use futures::future::BoxFuture;
use std::fmt;

pub use headless::HeadlessHost;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// An invisible, zero-sized element whose only job is to prompt the host's
/// platform to prepare a capability for `configuration`.
pub struct HostedElement {
    pub configuration: SessionConfiguration,
    pub sink: CapabilitySink,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("attachment root unavailable")]
    RootUnavailable,
    #[error("{0} is not attached")]
    UnknownElement(ElementId),
}

pub trait AttachmentHost: Send + Sync {
    fn has_root(&self) -> bool;

    /// Adds `element` beneath the root. The capability arrives later, through
    /// the element's sink; attaching does not wait for it.
    fn attach(&self, element: HostedElement) -> BoxFuture<'_, Result<ElementId, HostError>>;

    fn detach(&self, id: ElementId) -> BoxFuture<'_, Result<(), HostError>>;
}
