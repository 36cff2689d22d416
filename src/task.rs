//! What the image tool needs from the task that invokes it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::settings::ImageGenerationSettings;
use crate::transport::HttpTransport;

/// Shown to the user before any request is sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub tool: &'static str,
    pub path: String,
    pub prompt: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
}

/// Host capabilities, borrowed for the duration of one tool call. Settings
/// are read through [`TaskHost::image_settings`] at call time so the tool
/// always sees the current values.
#[async_trait]
pub trait TaskHost: Send + Sync {
    fn cwd(&self) -> PathBuf;
    fn image_settings(&self) -> ImageGenerationSettings;
    fn transport(&self) -> Arc<dyn HttpTransport>;
    /// False when ignore rules hide `path` from the assistant.
    fn is_path_accessible(&self, path: &Path) -> bool;
    fn is_write_protected(&self, path: &Path) -> bool;

    async fn ask_approval(&self, request: &ApprovalRequest) -> bool;
    async fn say_error(&self, message: &str);
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, AppError>;
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), AppError>;
    async fn track_file_context(&self, path: &Path);
}
