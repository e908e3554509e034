use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Lookup of video metadata at the provider. Returns the raw response body;
/// callers decode it so malformed payloads can be reported separately from
/// transport failures.
#[async_trait]
pub trait VideoMetadataApi: Send + Sync {
    async fn fetch_video_metadata(&self, video_id: &str, api_key: &str) -> Result<String>;
}

#[async_trait]
pub trait ThumbnailFetcher: Send + Sync {
    async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct HttpMediaClient {
    http: Client,
    endpoint: Url,
}

impl fmt::Debug for HttpMediaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMediaClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpMediaClient {
    pub fn new(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let endpoint = Url::parse(&cfg.youtube.endpoint).context("invalid youtube endpoint")?;
        let http = Client::builder()
            .user_agent(cfg.http.user_agent.clone())
            .timeout(cfg.http_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::new(http, endpoint))
    }

    pub fn build_metadata_request(&self, video_id: &str, api_key: &str) -> Result<reqwest::Request> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("id", video_id)
            .append_pair("part", "snippet")
            .append_pair("alt", "json")
            .append_pair("key", api_key);
        self.http
            .get(url)
            .header("Accept", "application/json")
            .build()
            .context("failed to build video metadata request")
    }
}

#[async_trait]
impl VideoMetadataApi for HttpMediaClient {
    async fn fetch_video_metadata(&self, video_id: &str, api_key: &str) -> Result<String> {
        let request = self.build_metadata_request(video_id, api_key)?;
        debug!(video_id, "requesting video metadata");

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach video metadata API")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(video_id, %status, "video metadata API error");
            return Err(anyhow!("video metadata API error {}: {}", status, body));
        }
        res.text()
            .await
            .context("failed to read video metadata response")
    }
}

#[async_trait]
impl ThumbnailFetcher for HttpMediaClient {
    async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch thumbnail {url}"))?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("thumbnail fetch {} returned {}", url, status));
        }
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read thumbnail body {url}"))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub standard: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    /// Highest available tier: standard, then high, then default.
    pub fn best_url(&self) -> Option<&str> {
        self.standard
            .as_ref()
            .or(self.high.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.as_str())
    }
}
