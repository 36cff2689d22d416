use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    #[default]
    OpenRouter,
    Gemini,
}

impl ImageProvider {
    pub const ALL: [ImageProvider; 2] = [ImageProvider::OpenRouter, ImageProvider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageProvider::OpenRouter => "openrouter",
            ImageProvider::Gemini => "gemini",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImageProvider::OpenRouter => "OpenRouter",
            ImageProvider::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(ImageProvider::OpenRouter),
            "gemini" | "google" | "google-gemini" => Ok(ImageProvider::Gemini),
            other => Err(format!("Unknown image generation provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub provider: ImageProvider,
    pub id: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_edit: Option<bool>,
    /// Largest accepted input image, in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_input_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<&'static [&'static str]>,
}

impl ModelInfo {
    pub fn can_edit(&self) -> bool {
        self.supports_edit.unwrap_or(false)
    }
}

const PNG_JPG: &[&str] = &["png", "jpg"];
const PNG_ONLY: &[&str] = &["png"];

static OPENROUTER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        provider: ImageProvider::OpenRouter,
        id: "google/gemini-2.5-flash-image",
        label: "Gemini 2.5 Flash Image",
        supports_edit: Some(true),
        max_input_size: Some(7 * 1024 * 1024),
        output_formats: Some(PNG_JPG),
    },
    ModelInfo {
        provider: ImageProvider::OpenRouter,
        id: "google/gemini-2.5-flash-image-preview",
        label: "Gemini 2.5 Flash Image Preview",
        supports_edit: Some(true),
        max_input_size: Some(7 * 1024 * 1024),
        output_formats: Some(PNG_JPG),
    },
    ModelInfo {
        provider: ImageProvider::OpenRouter,
        id: "openai/gpt-5-image",
        label: "GPT-5 Image",
        supports_edit: Some(true),
        max_input_size: None,
        output_formats: Some(PNG_ONLY),
    },
    ModelInfo {
        provider: ImageProvider::OpenRouter,
        id: "openai/gpt-5-image-mini",
        label: "GPT-5 Image Mini",
        supports_edit: Some(false),
        max_input_size: None,
        output_formats: Some(PNG_ONLY),
    },
];

static GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        provider: ImageProvider::Gemini,
        id: "gemini-2.5-flash-image",
        label: "Gemini 2.5 Flash Image",
        supports_edit: Some(true),
        max_input_size: Some(7 * 1024 * 1024),
        output_formats: Some(PNG_JPG),
    },
    ModelInfo {
        provider: ImageProvider::Gemini,
        id: "gemini-2.5-flash-image-preview",
        label: "Gemini 2.5 Flash Image Preview",
        supports_edit: Some(true),
        max_input_size: Some(7 * 1024 * 1024),
        output_formats: Some(PNG_JPG),
    },
];

/// Models available for `provider`, in registration order.
pub fn list_models(provider: ImageProvider) -> &'static [ModelInfo] {
    match provider {
        ImageProvider::OpenRouter => OPENROUTER_MODELS,
        ImageProvider::Gemini => GEMINI_MODELS,
    }
}

/// Lookup by raw provider id. Unknown ids have no models rather than an error.
pub fn list_models_for_id(provider_id: &str) -> &'static [ModelInfo] {
    provider_id
        .parse::<ImageProvider>()
        .map(list_models)
        .unwrap_or(&[])
}

pub fn list_all_models() -> Vec<ModelInfo> {
    ImageProvider::ALL
        .iter()
        .flat_map(|p| list_models(*p).iter().cloned())
        .collect()
}

pub fn default_model(provider: ImageProvider) -> Option<&'static ModelInfo> {
    list_models(provider).first()
}

pub fn find_model(provider: ImageProvider, model_id: &str) -> Option<&'static ModelInfo> {
    list_models(provider).iter().find(|m| m.id == model_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_provider_has_models() {
        for provider in ImageProvider::ALL {
            let models = list_models(provider);
            assert!(!models.is_empty(), "{} has no models", provider);
            assert!(models.iter().all(|m| m.provider == provider));
        }
    }

    #[test]
    fn test_unknown_provider_id_is_empty() {
        assert!(list_models_for_id("stability").is_empty());
        assert_eq!(list_models_for_id("gemini").len(), GEMINI_MODELS.len());
    }

    #[test]
    fn test_list_all_models_keeps_provider_order() {
        let all = list_all_models();
        assert_eq!(all.len(), OPENROUTER_MODELS.len() + GEMINI_MODELS.len());
        assert_eq!(all[0].id, OPENROUTER_MODELS[0].id);
        assert_eq!(all[OPENROUTER_MODELS.len()].id, GEMINI_MODELS[0].id);
        let first_gemini = all
            .iter()
            .position(|m| m.provider == ImageProvider::Gemini)
            .unwrap();
        assert!(all[first_gemini..]
            .iter()
            .all(|m| m.provider == ImageProvider::Gemini));
    }

    #[test]
    fn test_default_and_find() {
        assert_eq!(
            default_model(ImageProvider::OpenRouter).map(|m| m.id),
            Some("google/gemini-2.5-flash-image")
        );
        assert!(find_model(ImageProvider::Gemini, "gemini-2.5-flash-image").is_some());
        assert!(find_model(ImageProvider::Gemini, "openai/gpt-5-image").is_none());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenRouter".parse::<ImageProvider>(), Ok(ImageProvider::OpenRouter));
        assert_eq!("google".parse::<ImageProvider>(), Ok(ImageProvider::Gemini));
        assert!("dalle".parse::<ImageProvider>().is_err());
        assert_eq!(ImageProvider::default(), ImageProvider::OpenRouter);
    }

    #[test]
    fn test_model_info_serializes_camel_case() {
        let json = serde_json::to_value(&GEMINI_MODELS[0]).unwrap();
        assert_eq!(json["provider"], "gemini");
        assert_eq!(json["supportsEdit"], true);
        assert_eq!(json["outputFormats"][1], "jpg");
    }
}
