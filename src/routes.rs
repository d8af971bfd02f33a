use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::{
    error::GenerationError,
    models::{AspectRatio, ImageSource, OptionsResponse, PhotoshootResponse, StylePreset},
    pipeline::PhotoshootPipeline,
};

const MISSING_INPUT_MESSAGE: &str = "Please upload both a model and product image, and enter a prompt.";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PhotoshootPipeline>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/photoshoot", post(create_photoshoot))
        .route("/api/options", get(get_options))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn get_options() -> Json<OptionsResponse> {
    Json(OptionsResponse::current())
}

/// Raw form fields before they are turned into sources.
#[derive(Default)]
struct PhotoshootForm {
    model_image: Option<(Bytes, String)>,
    model_url: Option<String>,
    product_image: Option<(Bytes, String)>,
    product_url: Option<String>,
    prompt: Option<String>,
    style: Option<String>,
    aspect_ratio: Option<String>,
}

impl PhotoshootForm {
    async fn read(mut multipart: Multipart) -> Result<Self, GenerationError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "model_image" | "product_image" => {
                    let file_name = field.file_name().map(str::to_string);
                    let media_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    // Browsers send an empty, unnamed part when no file was picked.
                    if bytes.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                        continue;
                    }
                    let slot = if name == "model_image" { &mut form.model_image } else { &mut form.product_image };
                    *slot = Some((bytes, media_type));
                }
                "model_url" => form.model_url = non_blank(field.text().await.map_err(bad_form)?),
                "product_url" => form.product_url = non_blank(field.text().await.map_err(bad_form)?),
                "prompt" => form.prompt = non_blank(field.text().await.map_err(bad_form)?),
                "style" => form.style = non_blank(field.text().await.map_err(bad_form)?),
                "aspect_ratio" => form.aspect_ratio = non_blank(field.text().await.map_err(bad_form)?),
                other => info!("Ignoring unknown form field '{}'", other),
            }
        }
        Ok(form)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> GenerationError {
    let message = format!("Could not read the upload: {}", e.body_text());
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GenerationError::UploadTooLarge(message)
    } else {
        GenerationError::InvalidInput(message)
    }
}

fn source(file: Option<(Bytes, String)>, url: Option<String>) -> Option<ImageSource> {
    match (file, url) {
        (Some((bytes, media_type)), _) => Some(ImageSource::uploaded(bytes, media_type)),
        (None, Some(url)) => Some(ImageSource::remote(url)),
        (None, None) => None,
    }
}

pub async fn create_photoshoot(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PhotoshootResponse>, GenerationError> {
    let id = Uuid::new_v4();
    let span = tracing::info_span!("photoshoot", %id);

    async move {
        let form = PhotoshootForm::read(multipart).await?;

        let style = match form.style.as_deref() {
            Some(s) => s.parse::<StylePreset>().map_err(GenerationError::InvalidInput)?,
            None => StylePreset::default(),
        };
        let aspect_ratio = match form.aspect_ratio.as_deref() {
            Some(s) => s.parse::<AspectRatio>().map_err(GenerationError::InvalidInput)?,
            None => AspectRatio::default(),
        };

        let model = source(form.model_image, form.model_url);
        let product = source(form.product_image, form.product_url);
        let (Some(model), Some(product), Some(prompt)) = (model, product, form.prompt) else {
            return Err(GenerationError::InvalidInput(MISSING_INPUT_MESSAGE.into()));
        };

        info!("🚀 Photoshoot requested: {}", prompt);
        let image = state.pipeline.generate(&model, &product, &prompt, style, aspect_ratio).await?;

        Ok::<_, GenerationError>(Json(PhotoshootResponse { id, image, style, aspect_ratio, generated_at: Utc::now() }))
    }
    .instrument(span)
    .await
    .inspect_err(|e| info!(%id, kind = e.kind(), "Photoshoot failed: {}", e))
}
