use serde::{Deserialize, Serialize};

/// Result count used when the caller does not supply one.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// One ranked hit returned by a search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchResultItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u32,
}

/// What a provider reports back for one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Success(Vec<SearchResultItem>),
    Timeout,
    Failure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_title_deserializes_to_empty_string() {
        let item: SearchResultItem =
            serde_json::from_value(serde_json::json!({"url": "https://example.com"})).unwrap();
        assert_eq!(item.title, "");
        assert_eq!(item.url.as_deref(), Some("https://example.com"));
        assert!(item.snippet.is_none());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let item = SearchResultItem::new("Rust")
            .with_url("https://rust-lang.org")
            .with_snippet("A language");
        assert_eq!(item.title, "Rust");
        assert_eq!(item.url.as_deref(), Some("https://rust-lang.org"));
        assert_eq!(item.snippet.as_deref(), Some("A language"));
    }
}
