//! Streaming chat decoding shared by the OpenRouter and Gemini chat paths.

pub mod grounding;
pub mod sse;
pub mod types;

pub use grounding::{extract_grounding_sources, format_sources};
pub use sse::{consume_byte_stream, usage_from_value, SseDecoder};
pub use types::{ErrorEnvelope, GroundingSource, StreamEvent, UsageSummary};
