use serde_json::Value;

pub fn parse_body_to_value(text: &str) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Pulls a human readable message out of a provider error body.
///
/// Both OpenRouter and Gemini wrap failures as `{"error": {"message": ...}}`;
/// anything else falls back to the raw body.
pub fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(msg) = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Some(msg.to_string());
    }
    if let Some(msg) = body.get("error").and_then(|e| e.as_str()) {
        return Some(msg.to_string());
    }
    if let Some(msg) = body.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    match body {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn truncate_for_log(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

pub fn sanitize_header_value(key: &str, value: &str) -> String {
    let lowered = key.to_ascii_lowercase();
    if lowered.contains("authorization")
        || lowered.contains("api-key")
        || lowered.contains("apikey")
        || lowered.contains("secret")
        || lowered.contains("token")
        || lowered.contains("cookie")
    {
        "***".into()
    } else {
        truncate_for_log(value, 64)
    }
}

pub fn summarize_json(value: &Value) -> String {
    truncate_for_log(&value.to_string(), 512)
}
