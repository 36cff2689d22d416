use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_generator::catalog::{default_model, ImageProvider};
use crate::image_generator::types::ImageAdapterOptions;

pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiments {
    #[serde(default)]
    pub image_generation: bool,
}

/// Image generation slice of the provider settings object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_generation_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_router_image_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_image_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_router_image_generation_selected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_image_generation_selected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_router_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_base_url: Option<String>,
    #[serde(default)]
    pub experiments: Experiments,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ImageGenerationSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw).map_err(|e| AppError::Settings(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Fills unset keys from `OPENROUTER_API_KEY` / `GEMINI_API_KEY`.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_fallbacks(|name| std::env::var(name).ok())
    }

    pub fn with_fallbacks(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if non_empty(&self.open_router_image_api_key).is_none() {
            if let Some(key) = lookup(OPENROUTER_KEY_ENV).filter(|k| !k.is_empty()) {
                self.open_router_image_api_key = Some(key);
            }
        }
        if non_empty(&self.gemini_image_api_key).is_none() && non_empty(&self.gemini_api_key).is_none() {
            if let Some(key) = lookup(GEMINI_KEY_ENV).filter(|k| !k.is_empty()) {
                self.gemini_api_key = Some(key);
            }
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.experiments.image_generation
    }

    /// Selected provider; unset or unrecognised values fall back to OpenRouter.
    pub fn provider(&self) -> ImageProvider {
        match non_empty(&self.image_generation_provider) {
            None => ImageProvider::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err: String| {
                tracing::warn!(%err, "falling back to default image provider");
                ImageProvider::default()
            }),
        }
    }

    /// Configured model id, or the provider's first catalog entry.
    pub fn selected_model(&self, provider: ImageProvider) -> Option<String> {
        let configured = match provider {
            ImageProvider::OpenRouter => non_empty(&self.open_router_image_generation_selected_model),
            ImageProvider::Gemini => non_empty(&self.gemini_image_generation_selected_model),
        };
        configured
            .map(str::to_string)
            .or_else(|| default_model(provider).map(|m| m.id.to_string()))
    }

    pub fn credential(&self, provider: ImageProvider) -> Option<String> {
        let key = match provider {
            ImageProvider::OpenRouter => non_empty(&self.open_router_image_api_key),
            ImageProvider::Gemini => {
                non_empty(&self.gemini_image_api_key).or_else(|| non_empty(&self.gemini_api_key))
            }
        };
        key.map(str::to_string)
    }

    pub fn base_url(&self, provider: ImageProvider) -> Option<String> {
        let url = match provider {
            ImageProvider::OpenRouter => non_empty(&self.open_router_base_url),
            ImageProvider::Gemini => non_empty(&self.gemini_base_url),
        };
        url.map(|u| u.trim_end_matches('/').to_string())
    }

    pub fn adapter_options(&self, provider: ImageProvider) -> ImageAdapterOptions {
        ImageAdapterOptions {
            api_key: self.credential(provider),
            base_url: self.base_url(provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ImageGenerationSettings::from_json_str("{}").unwrap();
        assert_eq!(settings.provider(), ImageProvider::OpenRouter);
        assert_eq!(
            settings.selected_model(ImageProvider::OpenRouter).as_deref(),
            Some("google/gemini-2.5-flash-image")
        );
        assert_eq!(
            settings.selected_model(ImageProvider::Gemini).as_deref(),
            Some("gemini-2.5-flash-image")
        );
        assert!(settings.credential(ImageProvider::OpenRouter).is_none());
        assert!(!settings.is_enabled());
    }

    #[test]
    fn test_reads_camel_case_fields() {
        let settings = ImageGenerationSettings::from_json_str(
            r#"{
                "imageGenerationProvider": "gemini",
                "geminiApiKey": "chat-key",
                "geminiImageApiKey": "image-key",
                "geminiImageGenerationSelectedModel": "gemini-2.5-flash-image-preview",
                "geminiBaseUrl": "http://localhost:8080/",
                "experiments": { "imageGeneration": true }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.provider(), ImageProvider::Gemini);
        assert_eq!(settings.credential(ImageProvider::Gemini).as_deref(), Some("image-key"));
        assert_eq!(
            settings.selected_model(ImageProvider::Gemini).as_deref(),
            Some("gemini-2.5-flash-image-preview")
        );
        let options = settings.adapter_options(ImageProvider::Gemini);
        assert_eq!(options.base_url.as_deref(), Some("http://localhost:8080"));
        assert!(settings.is_enabled());
    }

    #[test]
    fn test_gemini_chat_key_is_fallback() {
        let settings = ImageGenerationSettings {
            gemini_api_key: Some("chat-key".into()),
            gemini_image_api_key: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(settings.credential(ImageProvider::Gemini).as_deref(), Some("chat-key"));
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let settings = ImageGenerationSettings {
            image_generation_provider: Some("midjourney".into()),
            ..Default::default()
        };
        assert_eq!(settings.provider(), ImageProvider::OpenRouter);
    }

    #[test]
    fn test_env_style_fallbacks_only_fill_gaps() {
        let settings = ImageGenerationSettings {
            open_router_image_api_key: Some("from-settings".into()),
            ..Default::default()
        }
        .with_fallbacks(|name| match name {
            OPENROUTER_KEY_ENV => Some("from-env".into()),
            GEMINI_KEY_ENV => Some("gemini-env".into()),
            _ => None,
        });

        assert_eq!(
            settings.credential(ImageProvider::OpenRouter).as_deref(),
            Some("from-settings")
        );
        assert_eq!(settings.credential(ImageProvider::Gemini).as_deref(), Some("gemini-env"));
    }

    #[test]
    fn test_malformed_json_is_settings_error() {
        let err = ImageGenerationSettings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, AppError::Settings(_)));
    }
}
