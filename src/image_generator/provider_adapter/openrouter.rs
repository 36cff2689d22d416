use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{
    ImageProviderAdapter, IMAGE_TEMPERATURE, NO_CANDIDATES, NO_CONTENT_PARTS, NO_IMAGE_DATA,
};
use crate::image_generator::catalog::ImageProvider;
use crate::image_generator::data_url::{parse_image_data_url, InlineImage};
use crate::utils::err_msg;

pub struct OpenRouterAdapter;

#[derive(Serialize)]
struct OpenRouterMessage<'a> {
    role: &'a str,
    content: Vec<OpenRouterContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenRouterContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: OpenRouterImageUrlRef },
}

#[derive(Serialize)]
struct OpenRouterImageUrlRef {
    url: String,
}

#[derive(Serialize)]
struct OpenRouterRequest<'a> {
    model: &'a str,
    messages: Vec<OpenRouterMessage<'a>>,
    modalities: Vec<&'a str>,
    temperature: f64,
}

#[derive(Deserialize)]
struct OpenRouterResponse {
    #[serde(default)]
    choices: Vec<OpenRouterChoice>,
}

#[derive(Deserialize)]
struct OpenRouterChoice {
    #[serde(default)]
    message: Option<OpenRouterResponseMessage>,
}

#[derive(Deserialize)]
struct OpenRouterResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<OpenRouterImage>,
}

#[derive(Deserialize)]
struct OpenRouterImage {
    image_url: OpenRouterImageUrl,
}

#[derive(Deserialize)]
struct OpenRouterImageUrl {
    url: String,
}

impl ImageProviderAdapter for OpenRouterAdapter {
    fn provider(&self) -> ImageProvider {
        ImageProvider::OpenRouter
    }

    fn default_base_url(&self) -> &'static str {
        "https://openrouter.ai/api/v1"
    }

    fn endpoint(&self, base_url: &str, _model: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        format!("{}/chat/completions", trimmed)
    }

    fn headers(&self, api_key: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".into(), format!("Bearer {}", api_key));
        headers.insert("Content-Type".into(), "application/json".into());
        headers.insert("X-Title".into(), "imagegen".into());
        headers
    }

    fn body(&self, model: &str, prompt: &str, input_image: Option<&InlineImage>) -> Value {
        let mut content = vec![OpenRouterContentPart::Text { text: prompt }];
        if let Some(image) = input_image {
            content.push(OpenRouterContentPart::ImageUrl {
                image_url: OpenRouterImageUrlRef {
                    url: image.to_data_url(),
                },
            });
        }

        let req = OpenRouterRequest {
            model,
            messages: vec![OpenRouterMessage {
                role: "user",
                content,
            }],
            modalities: vec!["image", "text"],
            temperature: IMAGE_TEMPERATURE,
        };

        serde_json::to_value(req).unwrap_or_else(|_| json!({}))
    }

    fn parse_response(&self, response: Value) -> Result<InlineImage, String> {
        let or_response: OpenRouterResponse = serde_json::from_value(response)
            .map_err(|e| err_msg(module_path!(), line!(), format!("Failed to parse response: {}", e)))?;

        let choice = or_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| NO_CANDIDATES.to_string())?;

        let message = choice
            .message
            .filter(|m| !m.images.is_empty() || m.content.as_deref().is_some_and(|c| !c.is_empty()))
            .ok_or_else(|| NO_CONTENT_PARTS.to_string())?;

        message
            .images
            .iter()
            .find_map(|img| parse_image_data_url(&img.image_url.url))
            .ok_or_else(|| NO_IMAGE_DATA.to_string())
    }
}
