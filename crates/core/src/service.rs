use crate::config::{LanguageTag, SessionTimeout};
use crate::host::AttachmentHost;
use crate::recognize::{ClassifierRecognizer, LanguageRecognizer, RecognizeError};
use crate::session::{
    HostedSessionProviderFactory, SessionError, SessionProviderFactory, TranslationResponse,
};
use crate::util::UiContext;
use std::sync::Arc;

const LOG_TARGET: &str = "service";

#[derive(thiserror::Error, Debug)]
pub enum TranslationError {
    #[error(transparent)]
    Recognition(#[from] RecognizeError),
    #[error("translation failed: {0}")]
    TranslationFailed(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Detects the source language when needed, then runs one translation on a
/// freshly acquired session.
#[derive(Clone)]
pub struct TranslationService {
    recognizer: Arc<dyn LanguageRecognizer>,
    factory: Arc<dyn SessionProviderFactory>,
}

impl TranslationService {
    pub fn new(
        recognizer: Arc<dyn LanguageRecognizer>,
        factory: Arc<dyn SessionProviderFactory>,
    ) -> Self {
        Self {
            recognizer,
            factory,
        }
    }

    /// Whatlang recognition plus sessions hosted on `host`.
    pub fn hosted(
        ui: UiContext,
        host: Arc<dyn AttachmentHost>,
        timeout: Option<SessionTimeout>,
    ) -> Self {
        let factory = HostedSessionProviderFactory::new(ui, host).with_timeout(timeout);
        Self::new(Arc::new(ClassifierRecognizer::whatlang()), Arc::new(factory))
    }

    pub fn recognize_language(&self, text: &str) -> Result<LanguageTag, RecognizeError> {
        self.recognizer.recognize_language(text)
    }

    /// Translates `source_text` into `target_language`.
    ///
    /// With no `source_language` the text is classified first, and a failed
    /// classification aborts the call with the recognizer's error. The session
    /// is ended whether or not the translation itself succeeds.
    pub async fn translate(
        &self,
        source_text: String,
        source_language: Option<LanguageTag>,
        target_language: LanguageTag,
    ) -> Result<TranslationResponse, TranslationError> {
        let source_language = match source_language {
            Some(language) => language,
            None => self.recognizer.recognize_language(&source_text)?,
        };

        let provider = self
            .factory
            .session_provider(Some(source_language.clone()), Some(target_language.clone()))?;
        let session = provider.session().await?;

        let outcome = session.translate(source_text).await;
        provider.end_session().await;

        match outcome {
            Ok(response) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    source_lang = %source_language,
                    target_lang = %response.target_language,
                    "translated"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    source_lang = %source_language,
                    target_lang = %target_language,
                    error = %e,
                    "translation failed"
                );
                Err(TranslationError::TranslationFailed(e.to_string()))
            }
        }
    }
}
