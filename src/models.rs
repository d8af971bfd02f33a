use std::{fmt, str::FromStr};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an input image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Uploaded { bytes: Bytes, media_type: String },
    Remote { url: String },
}

impl ImageSource {
    pub fn uploaded(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self::Uploaded { bytes: bytes.into(), media_type: media_type.into() }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote { url: url.into() }
    }
}

/// Base64 payload plus media type, ready for an `inlineData` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedImagePart {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model_part: NormalizedImagePart,
    pub product_part: NormalizedImagePart,
    pub instruction_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    #[default]
    Studio,
    Lifestyle,
    Social,
    Ecommerce,
}

impl StylePreset {
    pub const ALL: [StylePreset; 4] = [Self::Studio, Self::Lifestyle, Self::Social, Self::Ecommerce];

    pub fn key(self) -> &'static str {
        match self {
            Self::Studio => "studio",
            Self::Lifestyle => "lifestyle",
            Self::Social => "social",
            Self::Ecommerce => "ecommerce",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Studio => "Professional Studio",
            Self::Lifestyle => "Outdoor Lifestyle",
            Self::Social => "Social Media Aesthetic",
            Self::Ecommerce => "E-commerce Plain Background",
        }
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for StylePreset {
    type Err = String;

    /// Accepts either the short key (`studio`) or the full label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s) || p.label() == s)
            .ok_or_else(|| format!("Unknown style '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    Landscape,
    Portrait,
    #[default]
    Square,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [Self::Landscape, Self::Portrait, Self::Square];

    pub fn key(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Square => "square",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Landscape => "16:9 (Landscape)",
            Self::Portrait => "9:16 (Portrait)",
            Self::Square => "1:1 (Square)",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.key().eq_ignore_ascii_case(s) || r.label() == s)
            .ok_or_else(|| format!("Unknown aspect ratio '{s}'"))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PhotoshootResponse {
    pub id: Uuid,
    pub image: String, // data URI
    pub style: StylePreset,
    pub aspect_ratio: AspectRatio,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptionEntry {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptionsResponse {
    pub styles: Vec<OptionEntry>,
    pub aspect_ratios: Vec<OptionEntry>,
    pub default_style: String,
    pub default_aspect_ratio: String,
}

impl OptionsResponse {
    pub fn current() -> Self {
        Self {
            styles: StylePreset::ALL
                .iter()
                .map(|s| OptionEntry { key: s.key().to_string(), label: s.label().to_string() })
                .collect(),
            aspect_ratios: AspectRatio::ALL
                .iter()
                .map(|r| OptionEntry { key: r.key().to_string(), label: r.label().to_string() })
                .collect(),
            default_style: StylePreset::default().key().to_string(),
            default_aspect_ratio: AspectRatio::default().key().to_string(),
        }
    }
}
