use std::path::{Path, PathBuf};

/// Logs `message` with the module and line it came from and hands it back
/// as the caller's error string.
pub fn err_msg(module: &str, line: u32, message: impl Into<String>) -> String {
    let message = message.into();
    tracing::error!(module, line, "{}", message);
    message
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Joins `path` onto `cwd` unless it is already absolute.
pub fn resolve_path(cwd: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        cwd.join(candidate)
    }
}

/// Makes the file extension agree with the image `format`: appends `.{format}`
/// when the path has no image extension, swaps it when it names another
/// format (`jpeg` and `jpg` count as the same).
pub fn with_image_extension(path: &str, format: &str) -> String {
    let current = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match current {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => {
            if canonical_format(&ext) == canonical_format(format) {
                path.to_string()
            } else {
                Path::new(path)
                    .with_extension(format)
                    .to_string_lossy()
                    .into_owned()
            }
        }
        _ => format!("{}.{}", path, format),
    }
}

fn canonical_format(ext: &str) -> String {
    let lower = ext.to_ascii_lowercase();
    if lower == "jpeg" {
        "jpg".to_string()
    } else {
        lower
    }
}
