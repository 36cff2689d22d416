use serde::{Deserialize, Serialize};

use super::data_url::InlineImage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// `data:image/(png|jpeg);base64,...` when editing an existing image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
}

/// What an image adapter needs to be constructed. Chat-completion settings
/// live elsewhere.
#[derive(Debug, Clone, Default)]
pub struct ImageAdapterOptions {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ImageAdapterOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Outcome of a single generation call. Provider and transport failures are
/// values here, never panics or `Err`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "GenerationResultWire", try_from = "GenerationResultWire")]
pub enum GenerationResult {
    Success {
        /// `data:<mime>;base64,<payload>`
        image_data: String,
        image_format: String,
    },
    Failure {
        error: String,
    },
}

impl GenerationResult {
    pub fn success(image: &InlineImage) -> Self {
        GenerationResult::Success {
            image_data: image.to_data_url(),
            image_format: image.format(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            error
        };
        GenerationResult::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }

    pub fn image_data(&self) -> Option<&str> {
        match self {
            GenerationResult::Success { image_data, .. } => Some(image_data),
            GenerationResult::Failure { .. } => None,
        }
    }

    pub fn image_format(&self) -> Option<&str> {
        match self {
            GenerationResult::Success { image_format, .. } => Some(image_format),
            GenerationResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            GenerationResult::Success { .. } => None,
            GenerationResult::Failure { error } => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationResultWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<GenerationResult> for GenerationResultWire {
    fn from(value: GenerationResult) -> Self {
        match value {
            GenerationResult::Success {
                image_data,
                image_format,
            } => GenerationResultWire {
                success: true,
                image_data: Some(image_data),
                image_format: Some(image_format),
                error: None,
            },
            GenerationResult::Failure { error } => GenerationResultWire {
                success: false,
                image_data: None,
                image_format: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<GenerationResultWire> for GenerationResult {
    type Error = String;

    fn try_from(value: GenerationResultWire) -> Result<Self, Self::Error> {
        match (value.success, value.image_data, value.error) {
            (true, Some(image_data), None) if image_data.starts_with("data:") => {
                let image_format = value.image_format.unwrap_or_else(|| {
                    super::data_url::parse_image_data_url(&image_data)
                        .map(|img| img.format())
                        .unwrap_or_default()
                });
                Ok(GenerationResult::Success {
                    image_data,
                    image_format,
                })
            }
            (false, None, Some(error)) if !error.is_empty() => {
                Ok(GenerationResult::Failure { error })
            }
            _ => Err("generation result must carry either image data or an error".to_string()),
        }
    }
}
