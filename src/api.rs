use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::config::Config;
use crate::error::{ChatError, ChatResult};
use crate::language::Language;

/// Structured answer returned by `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReply {
    pub response: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl BotReply {
    /// Reply with only a response text, as simple backends send it
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            intent: String::new(),
            confidence: 0.0,
            source: None,
            url: None,
            suggestions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    language: Language,
}

/// Body of `POST /search`
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub query: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// The one backend capability the conversation needs.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user turn. Exactly one request, no retries.
    async fn send_message(&self, text: &str, language: Language) -> ChatResult<BotReply>;
}

/// HTTP client for the Driver's Friend backend
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> ChatResult<Self> {
        Self::new(config.api_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> ChatResult<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::backend(format!(
                "{} returned {}: {}",
                what,
                status,
                error_text.trim()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChatError::backend(format!("{} sent an unreadable body: {}", what, e)))
    }

    /// Full-text search over the regulation corpus
    pub async fn search(&self, params: &SearchParams) -> ChatResult<SearchResponse> {
        let response = self
            .client
            .post(self.endpoint("search"))
            .json(params)
            .send()
            .await?;
        Self::decode(response, "search").await
    }

    /// Regulation categories available in a language
    pub async fn categories(&self, language: Language) -> ChatResult<Vec<String>> {
        let response = self
            .client
            .get(self.endpoint("categories"))
            .query(&[("language", language.code())])
            .send()
            .await?;
        let body: CategoriesResponse = Self::decode(response, "categories").await?;
        Ok(body.categories)
    }

    pub async fn health(&self) -> ChatResult<HealthStatus> {
        let response = self.client.get(self.endpoint("health")).send().await?;
        Self::decode(response, "health").await
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, text: &str, language: Language) -> ChatResult<BotReply> {
        let payload = ChatRequest {
            message: text,
            language,
        };

        tracing::debug!(url = %self.endpoint("chat"), %language, "sending chat message");

        let response = self
            .client
            .post(self.endpoint("chat"))
            .json(&payload)
            .send()
            .await?;

        Self::decode(response, "chat").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn send_message_posts_message_and_language() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "message": "Can I turn right on red?", "language": "en-IN" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "No, unless a sign permits it.",
                "intent": "traffic_signals",
                "confidence": 0.92,
                "source": "Motor Vehicles Act",
                "url": "https://example.org/mva",
                "suggestions": ["What about U-turns?"]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api/", mock_server.uri())).unwrap();
        let reply = backend
            .send_message("Can I turn right on red?", Language::EnIn)
            .await
            .unwrap();

        assert_eq!(reply.response, "No, unless a sign permits it.");
        assert_eq!(reply.intent, "traffic_signals");
        assert!((reply.confidence - 0.92).abs() < f64::EPSILON);
        assert_eq!(reply.source.as_deref(), Some("Motor Vehicles Act"));
        assert_eq!(reply.url.as_deref(), Some("https://example.org/mva"));
        assert_eq!(reply.suggestions, Some(vec!["What about U-turns?".to_string()]));
    }

    #[tokio::test]
    async fn minimal_reply_only_needs_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hello" })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap();
        let reply = backend.send_message("hi", Language::De).await.unwrap();
        assert_eq!(reply, BotReply::text("Hello"));
    }

    #[tokio::test]
    async fn non_success_status_is_backend_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap();
        let err = backend.send_message("hi", Language::EnUs).await.unwrap_err();
        assert!(matches!(err, ChatError::BackendUnavailable(ref msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn malformed_body_is_backend_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "answer": "wrong shape" })),
            )
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap();
        let err = backend.send_message("hi", Language::EnUs).await.unwrap_err();
        assert!(matches!(err, ChatError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_backend_unavailable() {
        // Nothing listens on the discard port.
        let backend = HttpBackend::new("http://127.0.0.1:9/api").unwrap();
        let err = backend.send_message("hi", Language::EnUs).await.unwrap_err();
        assert!(matches!(err, ChatError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn categories_and_health_passthrough() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .and(query_param("language", "de"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "categories": ["Geschwindigkeit", "Parken"]
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap();
        assert_eq!(
            backend.categories(Language::De).await.unwrap(),
            vec!["Geschwindigkeit".to_string(), "Parken".to_string()]
        );
        assert_eq!(backend.health().await.unwrap().status, "healthy");
    }

    #[tokio::test]
    async fn search_sends_optional_fields_only_when_set() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search"))
            .and(body_json(json!({ "query": "parking", "language": "en-UK", "limit": 3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "title": "Parking on pavements" }],
                "query": "parking",
                "matched_keywords": ["parking"],
                "total_results": 1
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(format!("{}/api", mock_server.uri())).unwrap();
        let result = backend
            .search(&SearchParams {
                query: "parking".into(),
                language: Language::EnUk,
                category: None,
                limit: Some(3),
            })
            .await
            .unwrap();
        assert_eq!(result.total_results, 1);
        assert_eq!(result.matched_keywords, vec!["parking".to_string()]);
    }
}
