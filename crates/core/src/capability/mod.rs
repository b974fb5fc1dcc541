//! The external translation capability: the thing that actually translates.
//!
//! A [`CapabilityFactory`] prepares one [`TranslationCapability`] per
//! session configuration. How text is translated is entirely up to the
//! implementation; the rest of the crate only requests, awaits and drops
//! these handles.

mod deepl;
mod dummy;

use crate::config::LanguageTag;
use crate::session::SessionConfiguration;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use deepl::{DeepLCapability, DeepLCapabilityFactory};
pub use dummy::{DummyCapability, DummyCapabilityFactory};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilityOutput {
    pub text: String,
    pub source_language: Option<LanguageTag>,
    /// Language the text was translated into, as reported by the backend.
    pub target_language: LanguageTag,
}

#[derive(thiserror::Error, Debug)]
pub enum CapabilityError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),
}

pub trait TranslationCapability: Send + Sync {
    fn source_language(&self) -> Option<&LanguageTag>;
    fn target_language(&self) -> Option<&LanguageTag>;
    fn translate(&self, text: String) -> BoxFuture<'_, Result<CapabilityOutput, CapabilityError>>;
}

pub trait CapabilityFactory: Send + Sync {
    fn prepare(
        &self,
        configuration: SessionConfiguration,
    ) -> BoxFuture<'_, Result<Box<dyn TranslationCapability>, CapabilityError>>;
}
