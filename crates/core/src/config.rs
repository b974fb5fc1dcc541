use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

pub const DEFAULT_TARGET_LANG: &str = "en";
pub const ENV_DEEPL_API_KEY: &str = "DEEPL_API_KEY";
pub const ENV_TARGET_LANG: &str = "TRANSLATION_KIT_TARGET_LANG";
pub const ENV_SESSION_TIMEOUT_MS: &str = "TRANSLATION_KIT_SESSION_TIMEOUT_MS";

/// Identifier for a natural language or locale variant, e.g. `de` or `en-GB`.
///
/// Tags are opaque: two tags are equal only when their identifiers are equal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// The BCP-47 "undetermined" tag.
    pub const UNDETERMINED: &'static str = "und";

    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyLanguageTag);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn undetermined() -> Self {
        Self(Self::UNDETERMINED.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_undetermined(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::UNDETERMINED)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeys {
    pub deepl: Option<ApiKey>,
}

/// Upper bound on how long a session provider waits for its capability.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTimeout {
    pub timeout_ms: u64,
}

impl SessionTimeout {
    pub fn new(timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { timeout_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Backend {
    #[default]
    DeepL,
    Dummy,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "dummy" => Ok(Self::Dummy),
            other => Err(ConfigError::UnknownBackend(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub source_lang: Option<LanguageTag>,
    pub target_lang: LanguageTag,
    pub backend: Backend,
    pub api_keys: ApiKeys,
    pub session_timeout: Option<SessionTimeout>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == Backend::DeepL && self.api_keys.deepl.is_none() {
            return Err(ConfigError::MissingApiKey(ENV_DEEPL_API_KEY));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("language tag must not be empty")]
    EmptyLanguageTag,
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("api key required: pass it on the command line or set {0}")]
    MissingApiKey(&'static str),
    #[error("session timeout must be > 0 ms")]
    ZeroTimeout,
    #[error("invalid session timeout: {0}")]
    InvalidTimeout(String),
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_language_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> Result<LanguageTag, ConfigError> {
    match cli_value {
        Some(v) => LanguageTag::new(v),
        None => LanguageTag::new(env.var(env_key).unwrap_or_else(|| default.to_owned())),
    }
}

pub fn resolve_session_timeout(
    cli_value: Option<u64>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<SessionTimeout>, ConfigError> {
    let timeout_ms = match cli_value {
        Some(v) => v,
        None => match env.var(env_key) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => return Ok(None),
        },
    };
    Ok(Some(SessionTimeout::new(timeout_ms)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_DEEPL_API_KEY, "env-key");
        let key = resolve_api_key(Some("cli-key".to_owned()), ENV_DEEPL_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "cli-key");
    }

    #[test]
    fn api_key_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_DEEPL_API_KEY, "env-key");
        let key = resolve_api_key(None, ENV_DEEPL_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "env-key");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("secret").expect("valid key");
        assert_eq!(format!("{key:?}"), "ApiKey(**redacted**)");
    }

    #[test]
    fn language_tag_rejects_blank_and_trims() {
        assert_eq!(LanguageTag::new("  "), Err(ConfigError::EmptyLanguageTag));
        let tag = LanguageTag::new(" en-GB ").expect("valid tag");
        assert_eq!(tag.as_str(), "en-GB");
    }

    #[test]
    fn language_tag_equality_is_by_identifier() {
        let a: LanguageTag = "de".parse().expect("valid tag");
        let b = LanguageTag::new("de").expect("valid tag");
        assert_eq!(a, b);
        assert_ne!(a, LanguageTag::new("de-AT").expect("valid tag"));
    }

    #[test]
    fn language_tag_serde_uses_plain_string() {
        let tag = LanguageTag::new("pt-BR").expect("valid tag");
        let json = serde_json::to_string(&tag).expect("serialize");
        assert_eq!(json, "\"pt-BR\"");
        assert!(serde_json::from_str::<LanguageTag>("\"\"").is_err());
    }

    #[test]
    fn undetermined_tag_is_recognized() {
        assert!(LanguageTag::undetermined().is_undetermined());
        assert!(!LanguageTag::new("en").expect("valid tag").is_undetermined());
    }

    #[test]
    fn target_language_default_used_when_both_missing() {
        let env = MapEnv::default();
        let tag = resolve_language_with_default(None, ENV_TARGET_LANG, &env, "de").expect("tag");
        assert_eq!(tag.as_str(), "de");
    }

    #[test]
    fn target_language_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_TARGET_LANG, "fr");
        let tag = resolve_language_with_default(None, ENV_TARGET_LANG, &env, "de").expect("tag");
        assert_eq!(tag.as_str(), "fr");
    }

    #[test]
    fn session_timeout_absent_means_unbounded() {
        let env = MapEnv::default();
        let timeout = resolve_session_timeout(None, ENV_SESSION_TIMEOUT_MS, &env).expect("ok");
        assert_eq!(timeout, None);
    }

    #[test]
    fn session_timeout_from_env_is_parsed_and_validated() {
        let env = MapEnv::default().with_var(ENV_SESSION_TIMEOUT_MS, "2500");
        let timeout = resolve_session_timeout(None, ENV_SESSION_TIMEOUT_MS, &env)
            .expect("ok")
            .expect("present");
        assert_eq!(timeout.duration(), Duration::from_millis(2500));

        let env = MapEnv::default().with_var(ENV_SESSION_TIMEOUT_MS, "soon");
        assert_eq!(
            resolve_session_timeout(None, ENV_SESSION_TIMEOUT_MS, &env),
            Err(ConfigError::InvalidTimeout("soon".to_owned()))
        );
        assert_eq!(
            resolve_session_timeout(Some(0), ENV_SESSION_TIMEOUT_MS, &env),
            Err(ConfigError::ZeroTimeout)
        );
    }

    #[test]
    fn deepl_backend_requires_api_key() {
        let cfg = AppConfig {
            source_lang: None,
            target_lang: LanguageTag::new("de").expect("valid tag"),
            backend: Backend::DeepL,
            api_keys: ApiKeys::default(),
            session_timeout: None,
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MissingApiKey(ENV_DEEPL_API_KEY))
        );

        let dummy = AppConfig {
            backend: Backend::Dummy,
            ..cfg
        };
        assert_eq!(dummy.validate(), Ok(()));
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("DeepL".parse::<Backend>(), Ok(Backend::DeepL));
        assert_eq!("dummy".parse::<Backend>(), Ok(Backend::Dummy));
        assert_eq!(
            "google".parse::<Backend>(),
            Err(ConfigError::UnknownBackend("google".to_owned()))
        );
    }
}
