use std::collections::HashMap;

use serde_json::Value;

use super::catalog::ImageProvider;
use super::data_url::InlineImage;

pub mod google_gemini;
pub mod openrouter;

/// Sampling temperature for image requests. Chat completions run at 0; image
/// generation favours variety.
pub const IMAGE_TEMPERATURE: f64 = 1.0;

pub const NO_CANDIDATES: &str = "No candidates returned in the response";
pub const NO_CONTENT_PARTS: &str = "No content parts found in the response candidate";
pub const NO_IMAGE_DATA: &str = "No image data found in the response";

/// Wire-level translation for one provider: where to send a one-shot image
/// request, how to shape it, and how to pull the image back out.
pub trait ImageProviderAdapter: Send + Sync {
    fn provider(&self) -> ImageProvider;
    fn default_base_url(&self) -> &'static str;
    fn endpoint(&self, base_url: &str, model: &str) -> String;
    fn headers(&self, api_key: &str) -> HashMap<String, String>;
    fn body(&self, model: &str, prompt: &str, input_image: Option<&InlineImage>) -> Value;
    fn parse_response(&self, response: Value) -> Result<InlineImage, String>;
}

pub fn adapter_for(provider: ImageProvider) -> Box<dyn ImageProviderAdapter> {
    match provider {
        ImageProvider::OpenRouter => Box::new(openrouter::OpenRouterAdapter),
        ImageProvider::Gemini => Box::new(google_gemini::GoogleGeminiAdapter),
    }
}
