use serde::{Deserialize, Serialize};

/// A stored short link. Field names match the persisted file layout; a
/// field missing from the file loads as empty / zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    #[serde(rename = "url", default)]
    pub original_url: String,
    #[serde(rename = "click", default)]
    pub clicks: u64,
}

impl UrlRecord {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            clicks: 0,
        }
    }
}

/// Body of `POST /shorten`.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

/// Response to a successful `POST /shorten`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub short_url: String,
}
