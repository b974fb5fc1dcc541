use crate::config::{LanguageTag, SessionTimeout};
use crate::host::AttachmentHost;
use crate::session::{HostedSessionProvider, SessionConfiguration, SessionError, SessionProvider};
use crate::util::UiContext;
use std::sync::Arc;

pub trait SessionProviderFactory: Send + Sync {
    /// Builds a fresh provider for the pair. Providers are never cached.
    fn session_provider(
        &self,
        source_language: Option<LanguageTag>,
        target_language: Option<LanguageTag>,
    ) -> Result<Box<dyn SessionProvider>, SessionError>;
}

#[derive(Clone)]
pub struct HostedSessionProviderFactory {
    ui: UiContext,
    host: Arc<dyn AttachmentHost>,
    timeout: Option<SessionTimeout>,
}

impl HostedSessionProviderFactory {
    pub fn new(ui: UiContext, host: Arc<dyn AttachmentHost>) -> Self {
        Self {
            ui,
            host,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<SessionTimeout>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SessionProviderFactory for HostedSessionProviderFactory {
    fn session_provider(
        &self,
        source_language: Option<LanguageTag>,
        target_language: Option<LanguageTag>,
    ) -> Result<Box<dyn SessionProvider>, SessionError> {
        let configuration = SessionConfiguration::new(source_language, target_language);
        let provider =
            HostedSessionProvider::new(configuration, self.ui.clone(), self.host.clone())?
                .with_timeout(self.timeout);
        Ok(Box::new(provider))
    }
}
