use tracing::{error, info};

use crate::{
    error::GenerationError,
    gemini::GeminiClient,
    models::{AspectRatio, GenerationRequest, ImageSource, StylePreset},
    normalizer::{ImageNormalizer, NormalizeError},
};

/// Normalizes both sources, asks Gemini for the composite and returns it as a data URI.
pub struct PhotoshootPipeline {
    normalizer: ImageNormalizer,
    gemini: GeminiClient,
}

impl PhotoshootPipeline {
    pub fn new(normalizer: ImageNormalizer, gemini: GeminiClient) -> Self {
        Self { normalizer, gemini }
    }

    pub fn build_instruction(prompt: &str, style: StylePreset, aspect_ratio: AspectRatio) -> String {
        format!(
            "You are an expert AI photographer. Your task is to edit the first image (the model) to seamlessly incorporate the product from the second image.\n\
            Creative Direction: \"{prompt}\".\n\
            Desired Style: \"{style}\".\n\
            The final image should be composed beautifully, as if for a '{aspect_ratio}' frame.\n\
            Ensure the lighting, shadows, and perspective on the integrated product are photorealistic and match the model's environment perfectly."
        )
    }

    pub async fn generate(
        &self,
        model_source: &ImageSource,
        product_source: &ImageSource,
        prompt: &str,
        style: StylePreset,
        aspect_ratio: AspectRatio,
    ) -> Result<String, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::InvalidInput("Please enter a prompt describing the photoshoot.".into()));
        }

        let (model_part, product_part) = tokio::try_join!(
            async { self.normalizer.normalize(model_source).await.map_err(|e| classify("model", e)) },
            async { self.normalizer.normalize(product_source).await.map_err(|e| classify("product", e)) },
        )?;

        let request = GenerationRequest {
            model_part,
            product_part,
            instruction_text: Self::build_instruction(prompt, style, aspect_ratio),
        };
        info!("🎯 Generating photoshoot (style: {}, aspect: {})", style, aspect_ratio);

        match self.gemini.generate_image(&request).await {
            Ok(Some(image)) => {
                info!("✅ Photoshoot image generated ({})", image.mime_type);
                Ok(image.to_data_uri())
            }
            Ok(None) => Err(GenerationError::NoImageProduced),
            Err(e) => {
                error!("❌ Error generating image with Gemini: {}", e);
                Err(GenerationError::GenerationFailed)
            }
        }
    }
}

fn classify(slot: &str, err: NormalizeError) -> GenerationError {
    error!("❌ Failed to prepare {} image: {}", slot, err);
    match err {
        NormalizeError::InvalidUrl(url) => {
            GenerationError::InvalidInput(format!("The {slot} image URL '{url}' is not a valid http(s) address."))
        }
        NormalizeError::Status { url, status } => {
            GenerationError::Normalization(format!("Failed to fetch {slot} image from URL: {url} (HTTP {})", status.as_u16()))
        }
        NormalizeError::Transport { url, .. } => {
            GenerationError::Normalization(format!("Failed to fetch {slot} image from URL: {url}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, GeminiConfig};
    use base64::Engine;
    use httpmock::{Method::{GET, POST}, MockServer};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

    fn pipeline(server: &MockServer) -> PhotoshootPipeline {
        let normalizer = ImageNormalizer::new(&FetchConfig::default()).unwrap();
        let gemini = GeminiClient::new(&GeminiConfig::new("test-key").with_base_url(server.url("/v1beta"))).unwrap();
        PhotoshootPipeline::new(normalizer, gemini)
    }

    fn uploads() -> (ImageSource, ImageSource) {
        (ImageSource::uploaded(b"model-bytes".to_vec(), "image/jpeg"), ImageSource::uploaded(b"product-bytes".to_vec(), "image/png"))
    }

    #[test]
    fn instruction_interpolates_labels_verbatim() {
        let text = PhotoshootPipeline::build_instruction("Beach at dusk", StylePreset::Social, AspectRatio::Portrait);
        assert!(text.starts_with("You are an expert AI photographer."));
        assert!(text.contains("Creative Direction: \"Beach at dusk\"."));
        assert!(text.contains("Desired Style: \"Social Media Aesthetic\"."));
        assert!(text.contains("as if for a '9:16 (Portrait)' frame."));
        assert!(text.contains("lighting, shadows, and perspective"));
    }

    #[tokio::test]
    async fn returns_echoed_image_as_data_uri() {
        let server = MockServer::start_async().await;
        // The mock echoes the normalized model upload back as the generated image.
        let body = json!({"candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": "image/jpeg", "data": "bW9kZWwtYnl0ZXM="}}
        ]}}]});
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GENERATE_PATH)
                    .query_param("key", "test-key")
                    .body_includes("\"data\":\"bW9kZWwtYnl0ZXM=\"")
                    .body_includes("\"mimeType\":\"image/png\"")
                    .body_includes("Outdoor Lifestyle");
                then.status(200).header("content-type", "application/json").body(body.to_string());
            })
            .await;

        let (model, product) = uploads();
        let uri = pipeline(&server)
            .generate(&model, &product, "On a hike", StylePreset::Lifestyle, AspectRatio::Landscape)
            .await
            .unwrap();

        mock.assert_async().await;
        let encoded = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        assert_eq!(encoded, "bW9kZWwtYnl0ZXM=");
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, b"model-bytes".to_vec());
    }

    #[tokio::test]
    async fn prompt_is_interpolated_untrimmed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GENERATE_PATH)
                    .body_includes("Creative Direction: \\\"  Beach at dusk  \\\".");
                then.status(200)
                    .body(json!({"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AA=="}}]}}]}).to_string());
            })
            .await;

        let (model, product) = uploads();
        pipeline(&server)
            .generate(&model, &product, "  Beach at dusk  ", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_timeout_is_normalization_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow.jpg");
                then.status(200).delay(Duration::from_secs(3)).body("late");
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).body("{}");
            })
            .await;

        let fetch = FetchConfig { timeout: Duration::from_millis(300), ..FetchConfig::default() };
        let normalizer = ImageNormalizer::new(&fetch).unwrap();
        let gemini = GeminiClient::new(&GeminiConfig::new("test-key").with_base_url(server.url("/v1beta"))).unwrap();
        let model = ImageSource::remote(server.url("/slow.jpg"));
        let product = ImageSource::uploaded(b"product".to_vec(), "image/png");

        let err = PhotoshootPipeline::new(normalizer, gemini)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Normalization(ref msg) if msg.contains("model") && msg.contains("/slow.jpg")));
        generate.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn generation_timeout_is_generation_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(200).delay(Duration::from_secs(3)).body("{}");
            })
            .await;

        let normalizer = ImageNormalizer::new(&FetchConfig::default()).unwrap();
        let mut config = GeminiConfig::new("test-key").with_base_url(server.url("/v1beta"));
        config.timeout = Duration::from_millis(300);
        let gemini = GeminiClient::new(&config).unwrap();
        let (model, product) = uploads();

        let err = PhotoshootPipeline::new(normalizer, gemini)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::GenerationFailed));
    }

    #[tokio::test]
    async fn image_after_text_is_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(200).body(
                    json!({"candidates": [{"content": {"parts": [
                        {"text": "Here is the composed shot."},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}}
                    ]}}]})
                    .to_string(),
                );
            })
            .await;

        let (model, product) = uploads();
        let uri = pipeline(&server)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap();
        assert_eq!(uri, "data:image/jpeg;base64,AQID");
    }

    #[tokio::test]
    async fn text_only_answer_is_no_image() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(200)
                    .body(json!({"candidates": [{"content": {"parts": [{"text": "I can't do that."}]}}]}).to_string());
            })
            .await;

        let (model, product) = uploads();
        let err = pipeline(&server)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoImageProduced));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn service_error_is_opaque() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(500).body("internal stack trace: secret detail");
            })
            .await;

        let (model, product) = uploads();
        let err = pipeline(&server)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::GenerationFailed));
        assert!(!err.to_string().contains("secret detail"));
    }

    #[tokio::test]
    async fn remote_404_aborts_before_generation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/stock/model1.jpg");
                then.status(404);
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path(GENERATE_PATH);
                then.status(200).body("{}");
            })
            .await;

        let model = ImageSource::remote(server.url("/stock/model1.jpg"));
        let product = ImageSource::uploaded(b"product".to_vec(), "image/png");
        let err = pipeline(&server)
            .generate(&model, &product, "Studio shot", StylePreset::Studio, AspectRatio::Square)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::Normalization(ref msg) if msg.contains("model") && msg.contains("404")));
        generate.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn each_source_is_normalized_from_its_own_input() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/stock/model2.jpg");
                then.status(200).header("content-type", "image/jpeg").body("remote-model");
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(GENERATE_PATH)
                    .body_includes("\"data\":\"cmVtb3RlLW1vZGVs\"")
                    .body_includes("\"data\":\"cHJvZHVjdA==\"");
                then.status(200)
                    .body(json!({"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AA=="}}]}}]}).to_string());
            })
            .await;

        let model = ImageSource::remote(server.url("/stock/model2.jpg"));
        let product = ImageSource::uploaded(b"product".to_vec(), "image/png");
        let uri = pipeline(&server)
            .generate(&model, &product, "Studio shot", StylePreset::Ecommerce, AspectRatio::Square)
            .await
            .unwrap();

        generate.assert_async().await;
        assert_eq!(uri, "data:image/png;base64,AA==");
    }

    #[tokio::test]
    async fn empty_prompt_makes_no_network_calls() {
        let server = MockServer::start_async().await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("x");
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).body("{}");
            })
            .await;

        let model = ImageSource::remote(server.url("/model.jpg"));
        let product = ImageSource::uploaded(b"product".to_vec(), "image/png");
        for prompt in ["", "   "] {
            let err = pipeline(&server)
                .generate(&model, &product, prompt, StylePreset::Studio, AspectRatio::Square)
                .await
                .unwrap_err();
            assert!(matches!(err, GenerationError::InvalidInput(_)));
        }
        fetch.assert_hits_async(0).await;
        generate.assert_hits_async(0).await;
    }
}
