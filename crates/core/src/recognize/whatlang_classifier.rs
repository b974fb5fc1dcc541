use crate::config::LanguageTag;
use crate::recognize::LanguageClassifier;
use whatlang::{Detector, Lang};

/// Trigram classifier backed by `whatlang`. Text passed to `process` is
/// buffered until `reset`.
pub struct WhatlangClassifier {
    detector: Detector,
    buffer: String,
}

impl WhatlangClassifier {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
            buffer: String::new(),
        }
    }
}

impl Default for WhatlangClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageClassifier for WhatlangClassifier {
    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn process(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(text);
    }

    fn dominant_language(&self) -> Option<LanguageTag> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        let info = self.detector.detect(&self.buffer)?;
        LanguageTag::new(lang_to_tag(info.lang())).ok()
    }
}

/// ISO 639-1 where one exists, otherwise whatlang's ISO 639-3 code.
fn lang_to_tag(lang: Lang) -> &'static str {
    match lang {
        // Mandarin has no 639-1 code of its own
        Lang::Cmn => "zh",
        l => isolang::Language::from_639_3(l.code())
            .and_then(|iso| iso.to_639_1())
            .unwrap_or_else(|| l.code()),
    }
}
