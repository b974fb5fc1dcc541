pub mod factory;
pub mod provider;

use crate::capability::{CapabilityError, TranslationCapability};
use crate::config::LanguageTag;
use crate::host::HostError;
use crate::util::UiContextClosed;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use factory::{HostedSessionProviderFactory, SessionProviderFactory};
pub use provider::{CapabilitySink, HostedSessionProvider, SessionPhase, SessionProvider};

/// The language pair a session provider is built for.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub source: Option<LanguageTag>,
    pub target: Option<LanguageTag>,
}

impl SessionConfiguration {
    pub fn new(source: Option<LanguageTag>, target: Option<LanguageTag>) -> Self {
        Self { source, target }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationResponse {
    pub result: String,
    /// May be more or less specific than the tag that was requested.
    pub target_language: LanguageTag,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("no attachment root available to host a translation session")]
    NoAttachmentRoot,
    #[error("a session was already requested from this provider")]
    AlreadyRequested,
    #[error("session provider has ended")]
    Ended,
    #[error("failed to attach session element: {0}")]
    Attach(#[from] HostError),
    #[error("translation capability unavailable: {0}")]
    Capability(#[from] CapabilityError),
    #[error("no translation capability delivered within {0:?}")]
    TimedOut(Duration),
    #[error("session request abandoned before a capability was delivered")]
    Abandoned,
    #[error(transparent)]
    UiContext(#[from] UiContextClosed),
}

pub trait Session: Send + Sync {
    fn target_language(&self) -> Option<&LanguageTag>;
    fn translate(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<TranslationResponse, CapabilityError>>;
}

/// A session over one capability handle. Each call is passed straight through.
pub struct CapabilitySession {
    capability: Box<dyn TranslationCapability>,
}

impl CapabilitySession {
    pub fn new(capability: Box<dyn TranslationCapability>) -> Self {
        Self { capability }
    }

    pub fn source_language(&self) -> Option<&LanguageTag> {
        self.capability.source_language()
    }
}

impl Session for CapabilitySession {
    fn target_language(&self) -> Option<&LanguageTag> {
        self.capability.target_language()
    }

    fn translate(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<TranslationResponse, CapabilityError>> {
        async move {
            let output = self.capability.translate(text).await?;
            Ok(TranslationResponse {
                result: output.text,
                target_language: output.target_language,
            })
        }
        .boxed()
    }
}
