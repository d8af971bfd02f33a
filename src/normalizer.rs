use base64::Engine;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{error, info};

use crate::{config::FetchConfig, models::{ImageSource, NormalizedImagePart}};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid image url '{0}'")]
    InvalidUrl(String),
    #[error("fetch of {url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("fetch of {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// Turns image sources into base64 parts for the generation request.
#[derive(Clone)]
pub struct ImageNormalizer {
    client: Client,
    default_mime_type: String,
}

impl ImageNormalizer {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, default_mime_type: config.default_mime_type.clone() })
    }

    pub async fn normalize(&self, source: &ImageSource) -> Result<NormalizedImagePart, NormalizeError> {
        match source {
            ImageSource::Uploaded { bytes, media_type } => Ok(normalize_uploaded(bytes, media_type)),
            ImageSource::Remote { url } => self.normalize_remote(url).await,
        }
    }

    pub async fn normalize_remote(&self, url: &str) -> Result<NormalizedImagePart, NormalizeError> {
        let parsed = Url::parse(url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| NormalizeError::InvalidUrl(url.to_string()))?;

        info!("🌐 Fetching source image: {}", parsed);
        let response = self.client.get(parsed).send().await.map_err(|e| {
            error!("❌ Source image request failed: {}", e);
            NormalizeError::Transport { url: url.to_string(), reason: e.to_string() }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ Source image fetch returned {}", status);
            return Err(NormalizeError::Status { url: url.to_string(), status });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(media_type_essence)
            .unwrap_or_else(|| self.default_mime_type.clone());

        let body = response.bytes().await.map_err(|e| {
            error!("❌ Failed to read source image body: {}", e);
            NormalizeError::Transport { url: url.to_string(), reason: e.to_string() }
        })?;

        info!("📥 Fetched {} bytes ({})", body.len(), mime_type);
        Ok(NormalizedImagePart { data: encode(&body), mime_type })
    }
}

/// Declared media type is kept verbatim; the bytes are not inspected.
pub fn normalize_uploaded(bytes: &[u8], declared_media_type: &str) -> NormalizedImagePart {
    NormalizedImagePart { data: encode(bytes), mime_type: declared_media_type.to_string() }
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// "image/png; charset=binary" -> "image/png"
fn media_type_essence(header: &str) -> Option<String> {
    let essence = header.split(';').next().unwrap_or_default().trim();
    (!essence.is_empty()).then(|| essence.to_string())
}
