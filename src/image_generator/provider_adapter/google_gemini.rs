use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{
    ImageProviderAdapter, IMAGE_TEMPERATURE, NO_CANDIDATES, NO_CONTENT_PARTS, NO_IMAGE_DATA,
};
use crate::image_generator::catalog::ImageProvider;
use crate::image_generator::data_url::InlineImage;
use crate::utils::err_msg;

pub struct GoogleGeminiAdapter;

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: GeminiInlineDataRef<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineDataRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    response_modalities: Vec<&'static str>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    #[serde(default)]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String, // Base64 encoded
}

impl ImageProviderAdapter for GoogleGeminiAdapter {
    fn provider(&self) -> ImageProvider {
        ImageProvider::Gemini
    }

    fn default_base_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com"
    }

    fn endpoint(&self, base_url: &str, model: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        let base = if trimmed.ends_with("/v1beta") {
            trimmed.to_string()
        } else {
            format!("{}/v1beta", trimmed)
        };
        format!("{}/models/{}:generateContent", base, model)
    }

    fn headers(&self, api_key: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".into(), "application/json".into());
        // Header auth keeps the key out of logged URLs.
        headers.insert("x-goog-api-key".into(), api_key.to_string());
        headers
    }

    fn body(&self, _model: &str, prompt: &str, input_image: Option<&InlineImage>) -> Value {
        let mut parts = vec![GeminiPart::Text { text: prompt }];
        if let Some(image) = input_image {
            parts.push(GeminiPart::Inline {
                inline_data: GeminiInlineDataRef {
                    mime_type: &image.mime_type,
                    data: &image.data,
                },
            });
        }

        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                temperature: IMAGE_TEMPERATURE,
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        serde_json::to_value(req).unwrap_or_else(|_| json!({}))
    }

    fn parse_response(&self, response: Value) -> Result<InlineImage, String> {
        let gemini_response: GeminiResponse = serde_json::from_value(response)
            .map_err(|e| err_msg(module_path!(), line!(), format!("Failed to parse response: {}", e)))?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| NO_CANDIDATES.to_string())?;

        let parts = candidate
            .content
            .map(|c| c.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| NO_CONTENT_PARTS.to_string())?;

        parts
            .into_iter()
            .filter_map(|part| part.inline_data)
            .find(|inline| inline.mime_type.starts_with("image/") && !inline.data.is_empty())
            .map(|inline| InlineImage::new(inline.mime_type, inline.data))
            .ok_or_else(|| NO_IMAGE_DATA.to_string())
    }
}
