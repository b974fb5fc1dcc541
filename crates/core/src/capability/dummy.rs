use crate::capability::{
    CapabilityError, CapabilityFactory, CapabilityOutput, TranslationCapability,
};
use crate::config::LanguageTag;
use crate::session::SessionConfiguration;
use futures::future::BoxFuture;
use futures::FutureExt;

/// Offline factory whose capabilities echo their input.
#[derive(Clone, Debug, Default)]
pub struct DummyCapabilityFactory;

impl DummyCapabilityFactory {
    pub fn new() -> Self {
        Self
    }
}

impl CapabilityFactory for DummyCapabilityFactory {
    fn prepare(
        &self,
        configuration: SessionConfiguration,
    ) -> BoxFuture<'_, Result<Box<dyn TranslationCapability>, CapabilityError>> {
        async move {
            Ok(Box::new(DummyCapability {
                source: configuration.source,
                target: configuration.target,
            }) as Box<dyn TranslationCapability>)
        }
        .boxed()
    }
}

#[derive(Clone, Debug)]
pub struct DummyCapability {
    source: Option<LanguageTag>,
    target: Option<LanguageTag>,
}

impl TranslationCapability for DummyCapability {
    fn source_language(&self) -> Option<&LanguageTag> {
        self.source.as_ref()
    }

    fn target_language(&self) -> Option<&LanguageTag> {
        self.target.as_ref()
    }

    fn translate(&self, text: String) -> BoxFuture<'_, Result<CapabilityOutput, CapabilityError>> {
        async move {
            let target_language = self.target.clone().ok_or_else(|| {
                CapabilityError::UnsupportedConfiguration("no target language configured".into())
            })?;
            Ok(CapabilityOutput {
                text,
                source_language: self.source.clone(),
                target_language,
            })
        }
        .boxed()
    }
}
