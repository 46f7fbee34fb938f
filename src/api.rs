//! Extraction-service shim.
//!
//! The heavy lifting (extraction, transcoding) happens in a remote AudioTube
//! service; this module is the thin typed client for it. Components are
//! generic over [`ExtractorApi`] so tests can inject scripted fakes.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{DownloadReceipt, MetadataSnapshot, Mode, SubtitleLinks, ThumbnailLink};

/// Errors surfaced by the extraction service client.
///
/// `Status` carries the HTTP status and the service's `detail` body so the
/// submission controller can classify failures into user-facing messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Format catalog as served by `/formats` and `/video-formats`.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatCatalogDto {
    pub formats: Vec<String>,
    #[serde(rename = "default")]
    pub default_format: String,
}

/// Remote extraction service operations the engine depends on.
pub trait ExtractorApi: Send + Sync {
    fn list_formats(
        &self,
        mode: Mode,
    ) -> impl Future<Output = Result<FormatCatalogDto, ApiError>> + Send;

    fn fetch_metadata(
        &self,
        url: &str,
        mode: Mode,
    ) -> impl Future<Output = Result<MetadataSnapshot, ApiError>> + Send;

    fn submit_download(
        &self,
        url: &str,
        format: &str,
        mode: Mode,
    ) -> impl Future<Output = Result<DownloadReceipt, ApiError>> + Send;

    fn fetch_subtitles(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<SubtitleLinks, ApiError>> + Send;

    fn fetch_thumbnail(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<ThumbnailLink, ApiError>> + Send;
}

/// Where to find the extraction service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the service, without a trailing slash.
    pub base_url: String,

    /// Timeout for metadata and catalog calls (not for submissions, which
    /// block server-side until the remote job finishes).
    pub metadata_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metadata_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}

/// HTTP implementation of [`ExtractorApi`] using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpExtractorApi {
    cfg: ApiConfig,
    client: reqwest::Client,
}

#[derive(serde::Serialize)]
struct DownloadRequestBody<'a> {
    url: &'a str,
    format: &'a str,
}

impl HttpExtractorApi {
    pub fn new(cfg: ApiConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.cfg.base_url)
    }

    /// Mode-specific endpoints, mirroring the service's route layout.
    fn formats_path(mode: Mode) -> &'static str {
        match mode {
            Mode::Audio => "/formats",
            Mode::Video => "/video-formats",
        }
    }

    fn download_path(mode: Mode) -> &'static str {
        match mode {
            Mode::Audio => "/download",
            Mode::Video => "/download-video",
        }
    }
}

/// Decode a response, turning non-2xx statuses into `ApiError::Status` with
/// the service's `detail` message when present.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or(body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

impl ExtractorApi for HttpExtractorApi {
    async fn list_formats(&self, mode: Mode) -> Result<FormatCatalogDto, ApiError> {
        let resp = self
            .client
            .get(self.endpoint(Self::formats_path(mode)))
            .timeout(self.cfg.metadata_timeout)
            .send()
            .await?;
        decode(resp).await
    }

    async fn fetch_metadata(&self, url: &str, mode: Mode) -> Result<MetadataSnapshot, ApiError> {
        let resp = self
            .client
            .get(self.endpoint("/metadata"))
            .query(&[("url", url), ("type", mode.as_str())])
            .timeout(self.cfg.metadata_timeout)
            .send()
            .await?;
        decode(resp).await
    }

    async fn submit_download(
        &self,
        url: &str,
        format: &str,
        mode: Mode,
    ) -> Result<DownloadReceipt, ApiError> {
        let resp = self
            .client
            .post(self.endpoint(Self::download_path(mode)))
            .json(&DownloadRequestBody { url, format })
            .send()
            .await?;
        decode(resp).await
    }

    async fn fetch_subtitles(&self, url: &str) -> Result<SubtitleLinks, ApiError> {
        let resp = self
            .client
            .get(self.endpoint("/subtitles"))
            .query(&[("url", url)])
            .timeout(self.cfg.metadata_timeout)
            .send()
            .await?;
        decode(resp).await
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<ThumbnailLink, ApiError> {
        let resp = self
            .client
            .get(self.endpoint("/thumbnail"))
            .query(&[("url", url)])
            .timeout(self.cfg.metadata_timeout)
            .send()
            .await?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strips_trailing_slash() {
        let cfg = ApiConfig::new("https://api.example.com/");
        assert_eq!(cfg.base_url, "https://api.example.com");
    }

    #[test]
    fn endpoints_are_mode_specific() {
        assert_eq!(HttpExtractorApi::formats_path(Mode::Audio), "/formats");
        assert_eq!(HttpExtractorApi::formats_path(Mode::Video), "/video-formats");
        assert_eq!(HttpExtractorApi::download_path(Mode::Audio), "/download");
        assert_eq!(HttpExtractorApi::download_path(Mode::Video), "/download-video");
    }
}
