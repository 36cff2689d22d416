//! `data:<mime>;base64,<payload>` helpers shared by both adapters and the tool.

use base64::{engine::general_purpose, Engine};

pub const INVALID_INPUT_IMAGE: &str =
    "Invalid input image format. Expected a data URL of type image/png or image/jpeg.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// The MIME subtype, with `jpeg` folded to `jpg`.
    pub fn format(&self) -> String {
        format_from_mime(&self.mime_type)
    }

    pub fn decode(&self) -> Result<Vec<u8>, String> {
        decode_base64(&self.data)
    }
}

/// Validates an input image for an edit request. Only png and jpeg are
/// accepted and `image/jpg` is rewritten to `image/jpeg`.
pub fn parse_input_image(data_url: &str) -> Result<InlineImage, String> {
    let rest = data_url
        .strip_prefix("data:image/")
        .ok_or_else(|| INVALID_INPUT_IMAGE.to_string())?;
    let (subtype, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| INVALID_INPUT_IMAGE.to_string())?;

    let mime_type = match subtype {
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        _ => return Err(INVALID_INPUT_IMAGE.to_string()),
    };
    if payload.is_empty() {
        return Err(INVALID_INPUT_IMAGE.to_string());
    }

    Ok(InlineImage::new(mime_type, payload))
}

/// Parses any `data:image/*;base64,` URL, e.g. one returned by a provider.
pub fn parse_image_data_url(data_url: &str) -> Option<InlineImage> {
    let rest = data_url.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    if !mime_type.starts_with("image/") || payload.is_empty() {
        return None;
    }
    Some(InlineImage::new(mime_type, payload))
}

pub fn format_from_mime(mime_type: &str) -> String {
    let subtype = mime_type
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or(mime_type);
    let subtype = subtype.split(';').next().unwrap_or(subtype).trim();
    match subtype.to_ascii_lowercase().as_str() {
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    }
}

/// MIME type for an input file extension, for the two formats edits accept.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Failed to decode base64: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_image_accepts_png_and_jpeg() {
        let png = parse_input_image("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(png.mime_type, "image/png");
        assert_eq!(png.data, "iVBORw0K");

        let jpg = parse_input_image("data:image/jpg;base64,/9j/4AAQ").unwrap();
        assert_eq!(jpg.mime_type, "image/jpeg");
        assert_eq!(jpg.format(), "jpg");
    }

    #[test]
    fn test_parse_input_image_rejects_others() {
        for bad in [
            "data:image/gif;base64,R0lGOD",
            "data:image/png,not-base64",
            "data:image/png;base64,",
            "https://example.com/cat.png",
            "iVBORw0K",
        ] {
            assert_eq!(parse_input_image(bad), Err(INVALID_INPUT_IMAGE.to_string()), "{}", bad);
        }
    }

    #[test]
    fn test_format_from_mime() {
        assert_eq!(format_from_mime("image/png"), "png");
        assert_eq!(format_from_mime("image/jpeg"), "jpg");
        assert_eq!(format_from_mime("image/webp"), "webp");
    }

    #[test]
    fn test_encode_then_parse_data_url() {
        let url = encode_data_url("image/png", b"\x89PNG");
        let image = parse_image_data_url(&url).unwrap();
        assert_eq!(image.decode().unwrap(), b"\x89PNG");
        assert_eq!(image.to_data_url(), url);
        assert!(parse_image_data_url("data:text/plain;base64,aGk=").is_none());
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_extension("png"), Some("image/png"));
        assert_eq!(mime_for_extension("gif"), None);
    }
}
