mod whatlang_classifier;

use crate::config::LanguageTag;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

pub use whatlang_classifier::WhatlangClassifier;

const LOG_TARGET: &str = "recognize";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizeError {
    #[error("failed to recognize source language")]
    Undetermined,
    #[error("language classifier unavailable: {0}")]
    Unavailable(String),
}

pub trait LanguageRecognizer: Send + Sync {
    fn recognize_language(&self, text: &str) -> Result<LanguageTag, RecognizeError>;
}

/// A stateful statistical classifier. Text is fed in with [`process`] and the
/// best single-language judgment is read back with [`dominant_language`].
///
/// [`process`]: LanguageClassifier::process
/// [`dominant_language`]: LanguageClassifier::dominant_language
pub trait LanguageClassifier: Send {
    fn reset(&mut self);
    fn process(&mut self, text: &str);
    /// `None` when the classifier has no judgment at all. May return the
    /// undetermined tag when it has seen text but cannot decide.
    fn dominant_language(&self) -> Option<LanguageTag>;
}

/// Recognizer that reuses one classifier across calls, resetting it before
/// and after each classification.
pub struct ClassifierRecognizer<C> {
    classifier: Mutex<C>,
}

impl<C: LanguageClassifier> ClassifierRecognizer<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier: Mutex::new(classifier),
        }
    }
}

impl ClassifierRecognizer<WhatlangClassifier> {
    pub fn whatlang() -> Self {
        Self::new(WhatlangClassifier::new())
    }
}

impl<C: LanguageClassifier> LanguageRecognizer for ClassifierRecognizer<C> {
    fn recognize_language(&self, text: &str) -> Result<LanguageTag, RecognizeError> {
        let mut guard = self
            .classifier
            .lock()
            .map_err(|e| RecognizeError::Unavailable(e.to_string()))?;
        let mut classifier = ResetOnDrop::new(&mut *guard);

        classifier.process(text);
        match classifier.dominant_language() {
            Some(tag) if !tag.is_undetermined() => {
                tracing::debug!(target: LOG_TARGET, language = %tag, "language recognized");
                Ok(tag)
            }
            _ => {
                tracing::debug!(
                    target: LOG_TARGET,
                    chars = text.chars().count(),
                    "language undetermined"
                );
                Err(RecognizeError::Undetermined)
            }
        }
    }
}

/// Resets the classifier on creation and again when dropped, so no call
/// sees state left behind by a previous one, even on early return.
struct ResetOnDrop<'a, C: LanguageClassifier> {
    inner: &'a mut C,
}

impl<'a, C: LanguageClassifier> ResetOnDrop<'a, C> {
    fn new(inner: &'a mut C) -> Self {
        inner.reset();
        Self { inner }
    }
}

impl<C: LanguageClassifier> Deref for ResetOnDrop<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.inner
    }
}

impl<C: LanguageClassifier> DerefMut for ResetOnDrop<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.inner
    }
}

impl<C: LanguageClassifier> Drop for ResetOnDrop<'_, C> {
    fn drop(&mut self) {
        self.inner.reset();
    }
}
