use serde_json::Value;

use super::types::GroundingSource;

/// Web sources attached to Gemini candidates under
/// `groundingMetadata.groundingChunks[].web`.
pub fn extract_grounding_sources(v: &Value) -> Vec<GroundingSource> {
    let mut out = Vec::new();
    let Some(candidates) = v.get("candidates").and_then(|c| c.as_array()) else {
        return out;
    };
    for candidate in candidates {
        let chunks = candidate
            .get("groundingMetadata")
            .and_then(|g| g.get("groundingChunks"))
            .and_then(|c| c.as_array());
        for chunk in chunks.into_iter().flatten() {
            let Some(web) = chunk.get("web") else {
                continue;
            };
            let Some(url) = web.get("uri").and_then(|u| u.as_str()) else {
                continue;
            };
            let title = web
                .get("title")
                .and_then(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or(url);
            out.push(GroundingSource {
                title: title.to_string(),
                url: url.to_string(),
            });
        }
    }
    out
}

/// Adds `incoming` to `acc`, skipping URLs already present.
pub fn merge_sources(acc: &mut Vec<GroundingSource>, incoming: Vec<GroundingSource>) {
    for source in incoming {
        if !acc.iter().any(|s| s.url == source.url) {
            acc.push(source);
        }
    }
}

/// Markdown footer listing the sources as numbered links.
pub fn format_sources(sources: &[GroundingSource]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }
    let links: Vec<String> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}]({})", i + 1, s.url))
        .collect();
    Some(format!("Sources: {}", links.join(", ")))
}
