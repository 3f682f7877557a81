//! SerpAPI Google search client

use super::{results_text, SearchOutcome, SearchResult, WebSearch, SUMMARY_UNAVAILABLE};
use crate::ai::{prompts, AiService};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// SerpAPI client that asks the AI backend to summarise its results
pub struct SerpApiClient {
    client: reqwest::Client,
    config: SearchConfig,
    ai: Arc<dyn AiService>,
}

impl SerpApiClient {
    /// Create a client from config
    pub fn new(config: SearchConfig, ai: Arc<dyn AiService>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config, ai })
    }

    async fn fetch(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>> {
        if self.config.api_key.is_empty() {
            return Err(Error::Config("SerpAPI key is not configured".to_string()));
        }

        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let num = num_results.to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query),
                ("api_key", self.config.api_key.as_str()),
                ("engine", self.config.engine.as_str()),
                ("num", num.as_str()),
                ("gl", self.config.country.as_str()),
                ("hl", self.config.language.as_str()),
            ])
            .send()
            .await
            // the query string carries the API key
            .map_err(|e| Error::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<SerpResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(Error::api("SerpAPI", status.as_u16(), message));
        }

        let parsed: SerpResponse = serde_json::from_str(&body)?;
        if let Some(error) = parsed.error {
            // e.g. "Google hasn't returned any results for this query."
            tracing::warn!(query, "SerpAPI reported: {}", error);
        }

        Ok(parsed
            .organic_results
            .into_iter()
            .take(num_results)
            .map(SearchResult::from)
            .collect())
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    async fn search(&self, query: &str, num_results: usize) -> Result<SearchOutcome> {
        tracing::info!(query, "Starting web search");

        let results = self.fetch(query, num_results).await?;

        tracing::info!(query, count = results.len(), "Search finished");

        if results.is_empty() {
            return Ok(SearchOutcome::empty());
        }

        let prompt = prompts::search_summary(query, &results_text(&results));
        let summary = match self.ai.generate_text(&prompt).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(query, "Search summary failed: {}", e);
                SUMMARY_UNAVAILABLE.to_string()
            }
        };

        Ok(SearchOutcome { results, summary })
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

impl From<OrganicResult> for SearchResult {
    fn from(r: OrganicResult) -> Self {
        SearchResult {
            title: r.title.unwrap_or_else(|| "No title".to_string()),
            link: r.link.unwrap_or_default(),
            snippet: r
                .snippet
                .unwrap_or_else(|| "No description available".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::NO_RESULTS_SUMMARY;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingAi {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AiService for RecordingAi {
        async fn generate_text(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                Err(Error::api("Gemini", 503, "overloaded"))
            } else {
                Ok("Rust is a systems language.".to_string())
            }
        }

        async fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> Result<String> {
            unreachable!()
        }

        async fn transcribe_audio(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
            unreachable!()
        }
    }

    fn client_for(server: &MockServer, ai: Arc<RecordingAi>) -> SerpApiClient {
        SerpApiClient::new(
            SearchConfig {
                api_key: "serp-key".to_string(),
                base_url: server.uri(),
                ..Default::default()
            },
            ai,
        )
        .unwrap()
    }

    async fn mount_results(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "serp-key"))
            .and(query_param("engine", "google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_zero_results_skip_summary() {
        let server = MockServer::start().await;
        mount_results(&server, json!({"search_metadata": {"status": "Success"}})).await;

        let ai = Arc::new(RecordingAi::default());
        let outcome = client_for(&server, ai.clone())
            .search("zxqv nothing", 5)
            .await
            .unwrap();

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.summary, NO_RESULTS_SUMMARY);
        assert_eq!(ai.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_field_with_200_is_no_results() {
        let server = MockServer::start().await;
        mount_results(
            &server,
            json!({"error": "Google hasn't returned any results for this query."}),
        )
        .await;

        let outcome = client_for(&server, Arc::new(RecordingAi::default()))
            .search("zxqv", 5)
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::empty());
    }

    #[tokio::test]
    async fn test_results_defaults_truncation_and_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust lang"))
            .and(query_param("num", "2"))
            .and(query_param("gl", "us"))
            .and(query_param("hl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic_results": [
                    {"position": 1, "title": "Rust", "link": "https://www.rust-lang.org", "snippet": "Fast and reliable"},
                    {"position": 2},
                    {"position": 3, "title": "Extra", "link": "https://example.org", "snippet": "dropped"}
                ]
            })))
            .mount(&server)
            .await;

        let ai = Arc::new(RecordingAi::default());
        let outcome = client_for(&server, ai.clone())
            .search("rust lang", 2)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(
            outcome.results[1],
            SearchResult {
                title: "No title".to_string(),
                link: String::new(),
                snippet: "No description available".to_string(),
            }
        );
        assert_eq!(outcome.summary, "Rust is a systems language.");

        let prompts = ai.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Summarize these search results for 'rust lang':"));
        assert!(prompts[0].contains("URL: https://www.rust-lang.org"));
        assert!(!prompts[0].contains("Extra"));
    }

    #[tokio::test]
    async fn test_summary_failure_keeps_results() {
        let server = MockServer::start().await;
        mount_results(
            &server,
            json!({"organic_results": [{"title": "Rust", "link": "https://www.rust-lang.org", "snippet": "x"}]}),
        )
        .await;

        let ai = Arc::new(RecordingAi {
            fail: true,
            ..Default::default()
        });
        let outcome = client_for(&server, ai).search("rust", 5).await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.summary, SUMMARY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid API key."})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, Arc::new(RecordingAi::default()))
            .search("rust", 5)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid API key."));
        assert!(!msg.contains("serp-key"));
    }
}
