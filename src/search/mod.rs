//! Web search backend
//!
//! [`WebSearch`] returns ranked results plus an AI-written summary.
//! [`SerpApiClient`] is the production implementation.

mod serpapi;

pub use serpapi::SerpApiClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Summary used when the backend returns no organic results
pub const NO_RESULTS_SUMMARY: &str = "No search results found.";

/// Summary used when results came back but the AI summary failed
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable right now. Here are the top results.";

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title
    pub title: String,
    /// Page URL; may be empty
    pub link: String,
    /// Snippet shown under the title
    pub snippet: String,
}

/// Results plus their summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Ranked results, at most the requested number
    pub results: Vec<SearchResult>,
    /// AI summary, or one of the fixed summaries above
    pub summary: String,
}

impl SearchOutcome {
    /// Outcome for a query with no results
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            summary: NO_RESULTS_SUMMARY.to_string(),
        }
    }
}

/// Web search service
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search and summarise; zero hits is an empty outcome, not an error
    async fn search(&self, query: &str, num_results: usize) -> Result<SearchOutcome>;
}

/// Render results as the `Title/URL/Description` blocks fed to the summariser
pub fn results_text(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Title: {}\nURL: {}\nDescription: {}", r.title, r.link, r.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}
