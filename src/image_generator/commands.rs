use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{find_model, ImageProvider, ModelInfo};
use super::client::ImageGenerator;
use super::data_url::{encode_data_url, mime_for_extension, parse_image_data_url};
use super::types::GenerationResult;
use crate::error::AppError;
use crate::task::{ApprovalRequest, TaskHost};
use crate::utils::{resolve_path, with_image_extension};

pub const TOOL_NAME: &str = "generate_image";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateImageParams {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// Existing image to edit, relative to the task's cwd.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub path: String,
    pub absolute_path: PathBuf,
    pub provider: ImageProvider,
    pub model: String,
    pub image_format: String,
    pub bytes_written: usize,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing value for required parameter '{0}'. Please retry with a complete response.")]
    MissingParameter(&'static str),
    #[error("Image generation is an experimental feature. Enable it in settings to use this tool.")]
    Disabled,
    #[error("Access to {0} is blocked by the ignore settings.")]
    AccessDenied(String),
    #[error("{0} is write-protected and cannot be overwritten.")]
    WriteProtected(String),
    #[error("{} API key is required for image generation. Add it in the image generation settings.", .0.label())]
    MissingCredential(ImageProvider),
    #[error("Model '{model}' is not available for {provider} image generation.")]
    UnsupportedModel { provider: ImageProvider, model: String },
    #[error("Unsupported input image format for {0}. Only PNG and JPEG images can be edited.")]
    UnsupportedInputImage(String),
    #[error("Input image not found: {0}")]
    InputImageNotFound(String),
    #[error("Input image {path} is {size} bytes, above the {max} byte limit of the selected model.")]
    InputImageTooLarge { path: String, size: u64, max: u64 },
    #[error("Model '{0}' does not support editing existing images.")]
    EditNotSupported(String),
    #[error("The user denied image generation.")]
    Denied,
    #[error("{0}")]
    Generation(String),
    #[error("Failed to save generated image: {0}")]
    Write(#[source] AppError),
}

/// Runs the image tool for one task step. Any failure is reported to the
/// user through [`TaskHost::say_error`] before it is returned.
pub async fn generate_image(
    host: &dyn TaskHost,
    params: GenerateImageParams,
) -> Result<ToolOutcome, ToolError> {
    match run(host, params).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            tracing::warn!(tool = TOOL_NAME, error = %err, "image tool failed");
            host.say_error(&err.to_string()).await;
            Err(err)
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ToolError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ToolError::MissingParameter(name))
}

fn check_access(host: &dyn TaskHost, relative: &str, absolute: &Path) -> Result<(), ToolError> {
    if host.is_path_accessible(absolute) {
        Ok(())
    } else {
        Err(ToolError::AccessDenied(relative.to_string()))
    }
}

async fn run(host: &dyn TaskHost, params: GenerateImageParams) -> Result<ToolOutcome, ToolError> {
    let prompt = required(params.prompt, "prompt")?;
    let rel_path = required(params.path, "path")?;

    let settings = host.image_settings();
    if !settings.is_enabled() {
        return Err(ToolError::Disabled);
    }

    let cwd = host.cwd();
    let output_abs = resolve_path(&cwd, &rel_path);
    check_access(host, &rel_path, &output_abs)?;
    if host.is_write_protected(&output_abs) {
        return Err(ToolError::WriteProtected(rel_path));
    }

    let provider = settings.provider();
    let credential = settings
        .credential(provider)
        .ok_or(ToolError::MissingCredential(provider))?;
    let model_id = settings.selected_model(provider).unwrap_or_default();
    let model = find_model(provider, &model_id).ok_or_else(|| ToolError::UnsupportedModel {
        provider,
        model: model_id.clone(),
    })?;

    let input_image = match params.image.filter(|p| !p.trim().is_empty()) {
        Some(image_path) => Some(load_input_image(host, &cwd, &image_path, model).await?),
        None => None,
    };

    let approval = ApprovalRequest {
        tool: TOOL_NAME,
        path: rel_path.clone(),
        prompt: prompt.clone(),
        provider: provider.to_string(),
        model: model.id.to_string(),
        input_image: input_image.as_ref().map(|(path, _)| path.clone()),
    };
    if !host.ask_approval(&approval).await {
        return Err(ToolError::Denied);
    }

    let generator = ImageGenerator::new(
        provider,
        settings.adapter_options(provider),
        host.transport(),
    );
    let result = generator
        .generate_image(
            &prompt,
            model.id,
            Some(credential.as_str()),
            input_image.as_ref().map(|(_, url)| url.as_str()),
        )
        .await;

    let (image_data, image_format) = match result {
        GenerationResult::Success {
            image_data,
            image_format,
        } => (image_data, image_format),
        GenerationResult::Failure { error } => return Err(ToolError::Generation(error)),
    };

    let bytes = parse_image_data_url(&image_data)
        .ok_or_else(|| ToolError::Generation("Provider returned a malformed image".to_string()))?
        .decode()
        .map_err(ToolError::Generation)?;

    let final_path = with_image_extension(&rel_path, &image_format);
    let final_abs = resolve_path(&cwd, &final_path);
    if final_path != rel_path {
        check_access(host, &final_path, &final_abs)?;
        if host.is_write_protected(&final_abs) {
            return Err(ToolError::WriteProtected(final_path));
        }
    }

    host.write_file(&final_abs, &bytes)
        .await
        .map_err(ToolError::Write)?;
    host.track_file_context(&final_abs).await;

    tracing::info!(
        tool = TOOL_NAME,
        %provider,
        model = model.id,
        path = %final_path,
        bytes = bytes.len(),
        "image saved"
    );

    Ok(ToolOutcome {
        message: format!("Image generated and saved to {}", final_path),
        path: final_path,
        absolute_path: final_abs,
        provider,
        model: model.id.to_string(),
        image_format,
        bytes_written: bytes.len(),
    })
}

/// Reads and encodes the image to edit; returns `(relative path, data URL)`.
async fn load_input_image(
    host: &dyn TaskHost,
    cwd: &Path,
    image_path: &str,
    model: &ModelInfo,
) -> Result<(String, String), ToolError> {
    let abs = resolve_path(cwd, image_path);
    check_access(host, image_path, &abs)?;

    let mime = abs
        .extension()
        .and_then(|e| e.to_str())
        .and_then(mime_for_extension)
        .ok_or_else(|| ToolError::UnsupportedInputImage(image_path.to_string()))?;

    if !model.can_edit() {
        return Err(ToolError::EditNotSupported(model.id.to_string()));
    }

    let bytes = host.read_file(&abs).await.map_err(|err| {
        tracing::debug!(path = %abs.display(), error = %err, "input image read failed");
        ToolError::InputImageNotFound(image_path.to_string())
    })?;

    if let Some(max) = model.max_input_size {
        let size = bytes.len() as u64;
        if size > max {
            return Err(ToolError::InputImageTooLarge {
                path: image_path.to_string(),
                size,
                max,
            });
        }
    }

    Ok((image_path.to_string(), encode_data_url(mime, &bytes)))
}
