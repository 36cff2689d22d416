pub mod catalog;
pub mod client;
pub mod commands;
pub mod data_url;
pub mod provider_adapter;
pub mod types;

pub use catalog::{
    default_model, find_model, list_all_models, list_models, list_models_for_id, ImageProvider,
    ModelInfo,
};
pub use client::ImageGenerator;
pub use commands::{generate_image, GenerateImageParams, ToolError, ToolOutcome};
pub use types::{GenerationResult, ImageAdapterOptions, ImageGenerationRequest};
