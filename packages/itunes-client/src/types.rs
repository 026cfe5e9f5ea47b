use serde::{Deserialize, Serialize};

/// Fixed query parameters sent with every search, alongside the `term`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub entity: String,
    pub media: String,
    pub country: String,
    pub limit: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            entity: "software".to_string(),
            media: "software".to_string(),
            country: "us".to_string(),
            limit: 1,
        }
    }
}

impl SearchParams {
    /// Query pairs for a search on `term`, in the order the service documents them.
    pub fn query_pairs(&self, term: &str) -> Vec<(&'static str, String)> {
        vec![
            ("term", term.to_string()),
            ("entity", self.entity.clone()),
            ("media", self.media.clone()),
            ("country", self.country.clone()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Body of a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "resultCount", default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A single software result. Only the fields used for icon lookup are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "trackName")]
    pub track_name: Option<String>,
    #[serde(rename = "bundleId")]
    pub bundle_id: Option<String>,
    #[serde(rename = "artworkUrl512")]
    pub artwork_url_512: Option<String>,
    #[serde(rename = "artworkUrl100")]
    pub artwork_url_100: Option<String>,
    #[serde(rename = "artworkUrl60")]
    pub artwork_url_60: Option<String>,
}

impl SearchResult {
    /// Largest artwork available for this result.
    pub fn best_artwork(&self) -> Option<&str> {
        [
            &self.artwork_url_512,
            &self.artwork_url_100,
            &self.artwork_url_60,
        ]
        .into_iter()
        .filter_map(|url| url.as_deref())
        .find(|url| !url.trim().is_empty())
    }
}
