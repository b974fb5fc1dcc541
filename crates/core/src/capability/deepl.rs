use crate::capability::{
    CapabilityError, CapabilityFactory, CapabilityOutput, TranslationCapability,
};
use crate::config::{ApiKey, LanguageTag};
use crate::session::SessionConfiguration;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "capability::deepl";
const FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";
const PRO_API_URL: &str = "https://api.deepl.com/v2/translate";

#[derive(Clone)]
pub struct DeepLCapabilityFactory {
    client: Client,
    api_key: ApiKey,
    endpoint: Option<String>,
}

impl DeepLCapabilityFactory {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint: None,
        }
    }

    /// Sends requests to `url` instead of the endpoint implied by the key.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }
}

impl CapabilityFactory for DeepLCapabilityFactory {
    fn prepare(
        &self,
        configuration: SessionConfiguration,
    ) -> BoxFuture<'_, Result<Box<dyn TranslationCapability>, CapabilityError>> {
        async move {
            let target = configuration.target.ok_or_else(|| {
                CapabilityError::UnsupportedConfiguration(
                    "DeepL requires a target language".into(),
                )
            })?;
            tracing::debug!(
                target: LOG_TARGET,
                source_lang = ?configuration.source.as_ref().map(LanguageTag::as_str),
                target_lang = %target,
                "prepared DeepL capability"
            );
            let endpoint = self
                .endpoint
                .clone()
                .unwrap_or_else(|| api_url(&self.api_key).to_owned());
            Ok(Box::new(DeepLCapability {
                client: self.client.clone(),
                api_key: self.api_key.clone(),
                endpoint,
                source: configuration.source,
                target,
            }) as Box<dyn TranslationCapability>)
        }
        .boxed()
    }
}

pub struct DeepLCapability {
    client: Client,
    api_key: ApiKey,
    endpoint: String,
    source: Option<LanguageTag>,
    target: LanguageTag,
}

#[derive(Serialize)]
struct DeepLRequest {
    text: Vec<String>,
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    detected_source_language: String,
    text: String,
}

/// Target codes are uppercase; a few regional variants are kept as-is.
fn deepl_target_code(tag: &LanguageTag) -> String {
    match tag.as_str().to_lowercase().as_str() {
        "pt-br" => "PT-BR".to_string(),
        "pt-pt" => "PT-PT".to_string(),
        "en-gb" => "EN-GB".to_string(),
        "en-us" => "EN-US".to_string(),
        other => other.to_uppercase(),
    }
}

/// Source codes never carry a region.
fn deepl_source_code(tag: &LanguageTag) -> String {
    tag.as_str()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

fn api_url(api_key: &ApiKey) -> &'static str {
    if api_key.expose().ends_with(":fx") {
        FREE_API_URL
    } else {
        PRO_API_URL
    }
}

impl TranslationCapability for DeepLCapability {
    fn source_language(&self) -> Option<&LanguageTag> {
        self.source.as_ref()
    }

    fn target_language(&self) -> Option<&LanguageTag> {
        Some(&self.target)
    }

    fn translate(&self, text: String) -> BoxFuture<'_, Result<CapabilityOutput, CapabilityError>> {
        async move {
            let request = DeepLRequest {
                text: vec![text],
                target_lang: deepl_target_code(&self.target),
                source_lang: self.source.as_ref().map(deepl_source_code),
            };

            let response = self
                .client
                .post(&self.endpoint)
                .header(
                    "Authorization",
                    format!("DeepL-Auth-Key {}", self.api_key.expose()),
                )
                .json(&request)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::warn!(target: LOG_TARGET, %status, "DeepL request rejected");
                return Err(CapabilityError::Api(format!(
                    "HTTP {}: {}",
                    status, error_text
                )));
            }

            let deepl_response: DeepLResponse = response.json().await.map_err(|e| {
                CapabilityError::InvalidResponse(format!("Failed to parse JSON: {}", e))
            })?;

            let translation = deepl_response
                .translations
                .into_iter()
                .next()
                .ok_or_else(|| {
                    CapabilityError::InvalidResponse("No translations in response".to_string())
                })?;

            Ok(CapabilityOutput {
                text: translation.text,
                source_language: LanguageTag::new(translation.detected_source_language).ok(),
                target_language: self.target.clone(),
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tag(s: &str) -> LanguageTag {
        LanguageTag::new(s).unwrap()
    }

    #[test]
    fn target_codes_keep_supported_regions() {
        assert_eq!(deepl_target_code(&tag("de")), "DE");
        assert_eq!(deepl_target_code(&tag("en-gb")), "EN-GB");
        assert_eq!(deepl_target_code(&tag("pt-BR")), "PT-BR");
    }

    #[test]
    fn source_codes_drop_regions() {
        assert_eq!(deepl_source_code(&tag("en-GB")), "EN");
        assert_eq!(deepl_source_code(&tag("pt_BR")), "PT");
        assert_eq!(deepl_source_code(&tag("de")), "DE");
    }

    #[test]
    fn free_keys_use_free_endpoint() {
        assert_eq!(api_url(&ApiKey::new("abc:fx").unwrap()), FREE_API_URL);
        assert_eq!(api_url(&ApiKey::new("abc").unwrap()), PRO_API_URL);
    }

    #[test]
    fn request_omits_missing_source() {
        let request = DeepLRequest {
            text: vec!["hi".into()],
            target_lang: "DE".into(),
            source_lang: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("source_lang").is_none());
        assert_eq!(json["target_lang"], "DE");
    }

    #[tokio::test]
    async fn prepare_requires_target_language() {
        let factory = DeepLCapabilityFactory::new(ApiKey::new("abc:fx").unwrap());
        let result = factory
            .prepare(SessionConfiguration::new(Some(tag("en")), None))
            .await;
        assert!(matches!(
            result,
            Err(CapabilityError::UnsupportedConfiguration(_))
        ));

        let capability = factory
            .prepare(SessionConfiguration::new(None, Some(tag("de"))))
            .await
            .unwrap();
        assert_eq!(capability.target_language(), Some(&tag("de")));
        assert!(capability.source_language().is_none());
    }

    async fn capability_at(
        server: &MockServer,
        source: Option<LanguageTag>,
        target: &str,
    ) -> Box<dyn TranslationCapability> {
        DeepLCapabilityFactory::new(ApiKey::new("test-key:fx").unwrap())
            .with_endpoint(format!("{}/v2/translate", server.uri()))
            .prepare(SessionConfiguration::new(source, Some(tag(target))))
            .await
            .unwrap()
    }

    async fn sent_body(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn translate_reports_detected_source_and_requested_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .and(header("Authorization", "DeepL-Auth-Key test-key:fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    { "detected_source_language": "EN", "text": "Hallo Welt" }
                ]
            })))
            .mount(&server)
            .await;

        let capability = capability_at(&server, None, "de").await;
        let output = capability.translate("Hello world".into()).await.unwrap();

        assert_eq!(output.text, "Hallo Welt");
        assert_eq!(output.source_language, Some(tag("EN")));
        assert_eq!(output.target_language, tag("de"));

        let body = sent_body(&server).await;
        assert_eq!(body["text"], serde_json::json!(["Hello world"]));
        assert_eq!(body["target_lang"], "DE");
        assert!(body.get("source_lang").is_none());
    }

    #[tokio::test]
    async fn translate_sends_source_only_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    { "detected_source_language": "EN", "text": "Olá" }
                ]
            })))
            .mount(&server)
            .await;

        let capability = capability_at(&server, Some(tag("en-GB")), "pt-BR").await;
        capability.translate("Hello".into()).await.unwrap();

        let body = sent_body(&server).await;
        assert_eq!(body["source_lang"], "EN");
        assert_eq!(body["target_lang"], "PT-BR");
    }

    #[tokio::test]
    async fn rejected_request_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(456).set_body_string("Quota exceeded"))
            .mount(&server)
            .await;

        let capability = capability_at(&server, None, "de").await;
        let err = capability.translate("Hello".into()).await.unwrap_err();

        match err {
            CapabilityError::Api(message) => {
                assert!(message.starts_with("HTTP 456"), "{message}");
                assert!(message.ends_with(": Quota exceeded"), "{message}");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn forbidden_request_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Wrong key"))
            .mount(&server)
            .await;

        let capability = capability_at(&server, None, "de").await;
        let err = capability.translate("Hello".into()).await.unwrap_err();

        match err {
            CapabilityError::Api(message) => assert_eq!(message, "HTTP 403 Forbidden: Wrong key"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_translation_list_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translations": [] })),
            )
            .mount(&server)
            .await;

        let capability = capability_at(&server, None, "de").await;
        let err = capability.translate("Hello".into()).await.unwrap_err();

        assert!(matches!(err, CapabilityError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let capability = capability_at(&server, None, "de").await;
        let err = capability.translate("Hello".into()).await.unwrap_err();

        assert!(matches!(err, CapabilityError::InvalidResponse(_)));
    }
}
