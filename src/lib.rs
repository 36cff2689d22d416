//! Image generation through OpenRouter and Gemini, a catalog of the models
//! each provider exposes, and token cost accounting.

pub mod chat_manager;
pub mod error;
pub mod image_generator;
pub mod logger;
pub mod models;
pub mod serde_utils;
pub mod settings;
pub mod task;
pub mod transport;
pub mod utils;

pub use error::AppError;
pub use image_generator::{
    generate_image, GenerateImageParams, GenerationResult, ImageAdapterOptions, ImageGenerator,
    ImageProvider, ModelInfo, ToolError, ToolOutcome,
};
pub use models::{calculate_request_cost, ModelPricing, PricingTier, RequestCost};
pub use settings::ImageGenerationSettings;
pub use task::{ApprovalRequest, TaskHost};
pub use transport::{HttpTransport, ReqwestTransport, TransportConfig, TransportResponse};
