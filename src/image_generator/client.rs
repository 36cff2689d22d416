use std::sync::Arc;

use super::catalog::ImageProvider;
use super::data_url::parse_input_image;
use super::provider_adapter::{adapter_for, ImageProviderAdapter};
use super::types::{GenerationResult, ImageAdapterOptions, ImageGenerationRequest};
use crate::error::AppError;
use crate::serde_utils::extract_error_message;
use crate::transport::HttpTransport;

/// One provider's image generation entry point. Holds the resolved
/// credential, base URL and a shared transport; nothing else.
pub struct ImageGenerator {
    adapter: Box<dyn ImageProviderAdapter>,
    options: ImageAdapterOptions,
    transport: Arc<dyn HttpTransport>,
}

impl ImageGenerator {
    pub fn new(
        provider: ImageProvider,
        options: ImageAdapterOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            adapter: adapter_for(provider),
            options,
            transport,
        }
    }

    pub fn openrouter(options: ImageAdapterOptions, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ImageProvider::OpenRouter, options, transport)
    }

    pub fn gemini(options: ImageAdapterOptions, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ImageProvider::Gemini, options, transport)
    }

    pub fn provider(&self) -> ImageProvider {
        self.adapter.provider()
    }

    pub async fn generate(&self, request: &ImageGenerationRequest) -> GenerationResult {
        self.generate_image(
            &request.prompt,
            &request.model,
            request.credential.as_deref(),
            request.input_image.as_deref(),
        )
        .await
    }

    /// Generates (or edits) one image. Every failure comes back as
    /// [`GenerationResult::Failure`]; validation failures never reach the
    /// network.
    pub async fn generate_image(
        &self,
        prompt: &str,
        model_id: &str,
        credential: Option<&str>,
        input_image_data_url: Option<&str>,
    ) -> GenerationResult {
        let input_image = match input_image_data_url.map(parse_input_image).transpose() {
            Ok(image) => image,
            Err(error) => return GenerationResult::failure(error),
        };

        if prompt.trim().is_empty() {
            return GenerationResult::failure("A prompt is required for image generation");
        }

        let Some(api_key) = credential
            .filter(|c| !c.trim().is_empty())
            .or(self.options.api_key.as_deref().filter(|c| !c.trim().is_empty()))
        else {
            return GenerationResult::failure(format!(
                "{} API key is required for image generation",
                self.provider().label()
            ));
        };

        let base_url = self
            .options
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.adapter.default_base_url());
        let url = self.adapter.endpoint(base_url, model_id);
        let headers = self.adapter.headers(api_key);
        let body = self.adapter.body(model_id, prompt, input_image.as_ref());

        tracing::info!(
            provider = %self.provider(),
            model = model_id,
            edit = input_image.is_some(),
            "generating image"
        );

        let response = match self.transport.post_json(&url, &headers, &body).await {
            Ok(response) => response,
            Err(err) => return transport_failure(self.provider(), err),
        };

        if !response.ok() {
            let message = extract_error_message(&response.body)
                .unwrap_or_else(|| "Unknown error".to_string());
            return transport_failure(self.provider(), AppError::status(response.status, message));
        }

        match self.adapter.parse_response(response.body) {
            Ok(image) => {
                tracing::info!(
                    provider = %self.provider(),
                    model = model_id,
                    mime_type = %image.mime_type,
                    "image generated"
                );
                GenerationResult::success(&image)
            }
            Err(error) => {
                tracing::warn!(provider = %self.provider(), model = model_id, %error, "no image in provider response");
                GenerationResult::failure(error)
            }
        }
    }
}

fn transport_failure(provider: ImageProvider, err: AppError) -> GenerationResult {
    tracing::warn!(%provider, error = %err, "image generation request failed");
    GenerationResult::failure(format!("Failed to generate image: {}", err))
}
