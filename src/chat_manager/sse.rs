use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;

use super::grounding::{extract_grounding_sources, format_sources, merge_sources};
use super::types::{ErrorEnvelope, GroundingSource, StreamEvent, UsageSummary};
use crate::models::{calculate_request_cost, ModelPricing, RequestCost};

/// Buffered SSE decoder that can handle JSON fragments split across chunk boundaries
/// and produce provider-agnostic events.
///
/// Text and reasoning deltas are yielded as they arrive. Usage and grounding
/// metadata are accumulated and only surface from [`SseDecoder::finish`], so a
/// consumer sees exactly one usage event per stream.
#[derive(Default)]
pub struct SseDecoder {
    buffer: String,
    pending: Vec<u8>,
    last_usage: Option<UsageSummary>,
    gemini_usage: bool,
    sources: Vec<GroundingSource>,
    saw_done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a `[DONE]` sentinel has been seen.
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    /// Feed raw bytes. Multi-byte characters split across chunks are held
    /// back until complete.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(s) => s.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return self.feed(&text);
            }
        };
        let rest = self.pending.split_off(valid_up_to);
        let head = std::mem::replace(&mut self.pending, rest);
        let text = String::from_utf8_lossy(&head).into_owned();
        self.feed(&text)
    }

    /// Feed a raw text chunk, returning any complete events parsed from it.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some(idx) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=idx).collect();
            self.handle_line(&line, &mut events);
        }
        events
    }

    /// Flushes any trailing line and yields the deferred grounding and usage
    /// events followed by [`StreamEvent::Done`].
    pub fn finish(mut self, pricing: Option<&ModelPricing>) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.buffer.push_str(&tail);
        }
        if !self.buffer.trim().is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line, &mut events);
        }

        if let Some(footer) = format_sources(&self.sources) {
            events.push(StreamEvent::Text {
                text: format!("\n\n{}", footer),
            });
            events.push(StreamEvent::Grounding {
                sources: std::mem::take(&mut self.sources),
            });
        }

        if let Some(usage) = self.last_usage.take() {
            let cost = pricing.and_then(|p| self.cost_for(p, &usage));
            events.push(StreamEvent::Usage { usage, cost });
        }

        events.push(StreamEvent::Done);
        events
    }

    fn cost_for(&self, pricing: &ModelPricing, usage: &UsageSummary) -> Option<RequestCost> {
        let input = usage.prompt_tokens.unwrap_or(0);
        let mut output = usage.completion_tokens.unwrap_or(0);
        // Gemini reports thinking tokens separately from candidate tokens
        // but bills them as output.
        if self.gemini_usage {
            output += usage.reasoning_tokens.unwrap_or(0);
        }
        calculate_request_cost(pricing, input, output, usage.cached_tokens.unwrap_or(0))
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        let l = line.trim();
        if l.is_empty() {
            return;
        }
        // data: <payload>
        let Some(rest) = l.strip_prefix("data:") else {
            return;
        };
        let payload = rest.trim();
        if payload.is_empty() {
            return;
        }
        if payload == "[DONE]" {
            self.saw_done = true;
            return;
        }

        let v = match serde_json::from_str::<Value>(payload) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!(%err, "skipping non-JSON SSE payload");
                return;
            }
        };

        if let Some(usage) = usage_from_value(&v) {
            self.gemini_usage = v.get("usageMetadata").is_some();
            self.last_usage = Some(usage);
        }
        merge_sources(&mut self.sources, extract_grounding_sources(&v));

        if let Some(envelope) = extract_stream_error(&v) {
            events.push(StreamEvent::Error { envelope });
            return;
        }

        if let Some(reasoning) = extract_reasoning_from_value(&v) {
            if !reasoning.is_empty() {
                events.push(StreamEvent::Reasoning { text: reasoning });
            }
        }
        if let Some(piece) = extract_text_from_value(&v) {
            if !piece.is_empty() {
                events.push(StreamEvent::Text { text: piece });
            }
        }
    }
}

/// Drives a byte stream (e.g. from `ReqwestTransport::post_stream`) through an
/// [`SseDecoder`], handing every event to `on_event`. The first stream error
/// aborts decoding and is returned as-is.
pub async fn consume_byte_stream<S, E, F>(
    stream: S,
    pricing: Option<&ModelPricing>,
    mut on_event: F,
) -> Result<(), E>
where
    S: Stream<Item = Result<Bytes, E>>,
    F: FnMut(StreamEvent),
{
    futures_util::pin_mut!(stream);
    let mut decoder = SseDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for event in decoder.feed_bytes(&chunk) {
            on_event(event);
        }
    }
    for event in decoder.finish(pricing) {
        on_event(event);
    }
    Ok(())
}

fn extract_text_from_value(v: &Value) -> Option<String> {
    // OpenAI/OpenRouter style: choices[0].delta.content
    if let Some(s) = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|t| t.as_str())
    {
        return Some(s.to_string());
    }
    if let Some(s) = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Some(s.to_string());
    }

    // Gemini-style: candidates[].content.parts[].text (skip thought=true parts)
    let candidates = v.get("candidates").and_then(|c| c.as_array())?;
    let combined: String = gemini_parts(candidates)
        .filter(|part| !is_thought(part))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}

/// Reasoning from thinking models: `choices[0].delta.reasoning` (or
/// `reasoning_content`) and Gemini parts flagged `thought: true`.
fn extract_reasoning_from_value(v: &Value) -> Option<String> {
    if let Some(choice) = v.get("choices").and_then(|c| c.get(0)) {
        let holder = choice.get("delta").or_else(|| choice.get("message"));
        if let Some(s) = holder.and_then(|d| {
            d.get("reasoning")
                .or_else(|| d.get("reasoning_content"))
                .and_then(|t| t.as_str())
        }) {
            return Some(s.to_string());
        }
    }

    let candidates = v.get("candidates").and_then(|c| c.as_array())?;
    let combined: String = gemini_parts(candidates)
        .filter(|part| is_thought(part))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();
    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}

fn gemini_parts(candidates: &[Value]) -> impl Iterator<Item = &Value> {
    candidates.iter().flat_map(|candidate| {
        candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .into_iter()
            .flatten()
    })
}

fn is_thought(part: &Value) -> bool {
    part.get("thought").and_then(|t| t.as_bool()).unwrap_or(false)
}

pub fn usage_from_value(v: &Value) -> Option<UsageSummary> {
    // Support both snake_case "usage" (OpenAI) and camelCase "usageMetadata" (Gemini)
    let u = v.get("usage").or_else(|| v.get("usageMetadata"))?;

    let prompt_tokens = take_first(
        u,
        &[
            "prompt_tokens",
            "input_tokens",
            "promptTokens",
            "inputTokens",
            "promptTokenCount",
        ],
    );
    let completion_tokens = take_first(
        u,
        &[
            "completion_tokens",
            "output_tokens",
            "completionTokens",
            "outputTokens",
            "candidatesTokenCount",
        ],
    );
    let reasoning_tokens = take_first(
        u,
        &[
            "reasoning_tokens",
            "reasoningTokens",
            "thoughtsTokenCount",
        ],
    )
    .or_else(|| {
        u.get("completion_tokens_details")
            .and_then(|d| take_first(d, &["reasoning_tokens", "reasoningTokens"]))
    });
    let cached_tokens = take_first(
        u,
        &[
            "cached_tokens",
            "cachedTokens",
            "cachedContentTokenCount",
            "cache_read_input_tokens",
        ],
    )
    .or_else(|| {
        u.get("prompt_tokens_details")
            .and_then(|d| take_first(d, &["cached_tokens", "cachedTokens"]))
    });
    let total_tokens =
        take_first(u, &["total_tokens", "totalTokens", "totalTokenCount"]).or_else(|| {
            match (prompt_tokens, completion_tokens) {
                (Some(p), Some(c)) => Some(p + c),
                _ => None,
            }
        });

    let finish_reason = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("finish_reason"))
        .and_then(|r| r.as_str())
        .or_else(|| {
            v.get("candidates")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("finishReason"))
                .and_then(|r| r.as_str())
        })
        .map(|s| s.to_string());

    tracing::debug!(
        ?prompt_tokens,
        ?completion_tokens,
        ?total_tokens,
        ?reasoning_tokens,
        ?cached_tokens,
        "parsed usage"
    );

    if prompt_tokens.is_none() && completion_tokens.is_none() && total_tokens.is_none() {
        None
    } else {
        Some(UsageSummary {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            reasoning_tokens,
            cached_tokens,
            finish_reason,
        })
    }
}

fn take_first(map: &Value, keys: &[&str]) -> Option<u64> {
    for k in keys {
        if let Some(val) = map.get(*k) {
            if let Some(n) = val.as_u64() {
                return Some(n);
            }
            if let Some(s) = val.as_str() {
                if let Ok(n) = s.trim().parse::<u64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

fn extract_stream_error(v: &Value) -> Option<ErrorEnvelope> {
    if let Some(message) = extract_gemini_error(v) {
        return Some(ErrorEnvelope {
            code: Some("CONTENT_BLOCKED".to_string()),
            message,
            provider_id: Some("gemini".to_string()),
            retryable: Some(false),
        });
    }

    // OpenRouter reports mid-stream failures as `data: {"error": {...}}`
    let err = v.get("error").filter(|e| !e.is_null())?;
    let message = err
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| err.as_str())
        .unwrap_or("Unknown error")
        .to_string();
    let code = err.get("code").and_then(|c| match c {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Some(ErrorEnvelope {
        code,
        message,
        provider_id: Some("openrouter".to_string()),
        retryable: None,
    })
}

fn extract_gemini_error(v: &Value) -> Option<String> {
    if let Some(block_reason) = v
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Some(format_gemini_block_reason(block_reason));
    }

    v.get("candidates")
        .and_then(|c| c.as_array())?
        .iter()
        .filter_map(|c| c.get("finishReason").and_then(|r| r.as_str()))
        .find_map(format_gemini_finish_reason_error)
}

fn format_gemini_block_reason(reason: &str) -> String {
    match reason {
        "SAFETY" => {
            "Content was blocked by Gemini safety filters. Try adjusting your prompt.".to_string()
        }
        "OTHER" => "Content was blocked by Gemini for an uncategorized reason.".to_string(),
        "BLOCKLIST" => {
            "Content was blocked: the prompt contains terms from the blocklist.".to_string()
        }
        "PROHIBITED_CONTENT" => {
            "Content was blocked by Gemini: prohibited content detected.".to_string()
        }
        "IMAGE_SAFETY" => {
            "Content was blocked by Gemini: the input image failed safety checks.".to_string()
        }
        _ => format!(
            "Content was blocked by Gemini: {}",
            reason.replace('_', " ").to_lowercase()
        ),
    }
}

fn format_gemini_finish_reason_error(reason: &str) -> Option<String> {
    match reason {
        "STOP" | "MAX_TOKENS" | "FINISH_REASON_UNSPECIFIED" => None,
        "SAFETY" => Some("Response was blocked by Gemini safety filters.".to_string()),
        "RECITATION" => Some(
            "Response was blocked due to recitation concerns (potential copyright issues)."
                .to_string(),
        ),
        "PROHIBITED_CONTENT" => {
            Some("Response was blocked: prohibited content detected.".to_string())
        }
        "IMAGE_SAFETY" => Some("Image generation was blocked by safety filters.".to_string()),
        "IMAGE_PROHIBITED_CONTENT" => {
            Some("Image generation was blocked: prohibited content detected.".to_string())
        }
        "NO_IMAGE" => Some("Image generation failed: no image was produced.".to_string()),
        _ => Some(format!(
            "Response was blocked by Gemini: {}",
            reason.replace('_', " ").to_lowercase()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn data(v: Value) -> String {
        format!("data: {}\n\n", v)
    }

    #[test]
    fn test_split_json_across_chunks() {
        let line = data(json!({ "choices": [{ "delta": { "content": "Hello" } }] }));
        let (a, b) = line.split_at(20);
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(a).is_empty());
        assert_eq!(
            decoder.feed(b),
            vec![StreamEvent::Text { text: "Hello".into() }]
        );
    }

    #[test]
    fn test_split_utf8_across_byte_chunks() {
        let line = data(json!({ "choices": [{ "delta": { "content": "héllo" } }] }));
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed_bytes(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.feed_bytes(&bytes[split..]),
            vec![StreamEvent::Text { text: "héllo".into() }]
        );
    }

    #[test]
    fn test_gemini_thoughts_are_reasoning() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(&data(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "weighing options", "thought": true },
                { "text": "Answer" }
            ] } }]
        })));
        assert_eq!(
            events,
            vec![
                StreamEvent::Reasoning { text: "weighing options".into() },
                StreamEvent::Text { text: "Answer".into() },
            ]
        );
    }

    #[test]
    fn test_usage_is_deferred_until_finish() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(&data(json!({
            "choices": [{ "delta": { "content": "hi" } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 2 }
        })));
        events.extend(decoder.feed(&data(json!({
            "choices": [{ "delta": {}, "finish_reason": "stop" }],
            "usage": {
                "prompt_tokens": 1_000_000,
                "completion_tokens": 1_000_000,
                "prompt_tokens_details": { "cached_tokens": 200_000 }
            }
        }))));
        events.extend(decoder.feed("data: [DONE]\n\n"));
        assert!(decoder.saw_done());
        assert_eq!(events, vec![StreamEvent::Text { text: "hi".into() }]);

        let pricing = ModelPricing {
            input_price: Some(3.0),
            output_price: Some(15.0),
            cache_reads_price: Some(0.3),
            ..Default::default()
        };
        let tail = decoder.finish(Some(&pricing));
        assert_eq!(tail.len(), 2);
        match &tail[0] {
            StreamEvent::Usage { usage, cost } => {
                assert_eq!(usage.total_tokens, Some(2_000_000));
                assert_eq!(usage.cached_tokens, Some(200_000));
                assert_eq!(usage.finish_reason.as_deref(), Some("stop"));
                let cost = cost.as_ref().unwrap();
                // 0.8M * 3 + 1M * 15 + 0.2M * 0.3
                assert!((cost.total_cost - 17.46).abs() < 1e-9);
            }
            other => panic!("expected usage, got {:?}", other),
        }
        assert_eq!(tail[1], StreamEvent::Done);
    }

    #[test]
    fn test_gemini_usage_bills_thoughts_as_output() {
        let mut decoder = SseDecoder::new();
        decoder.feed(&data(json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] }, "finishReason": "STOP" }],
            "usageMetadata": {
                "promptTokenCount": 1_000_000,
                "candidatesTokenCount": 500_000,
                "thoughtsTokenCount": 500_000,
                "totalTokenCount": 2_000_000
            }
        })));
        let pricing = ModelPricing {
            input_price: Some(1.0),
            output_price: Some(2.0),
            cache_reads_price: Some(0.0),
            ..Default::default()
        };
        let usage = decoder.last_usage.clone().unwrap();
        let tail = decoder.finish(Some(&pricing));
        let StreamEvent::Usage { usage: reported, cost } = &tail[0] else {
            panic!("expected usage first");
        };
        assert_eq!(reported.reasoning_tokens, Some(500_000));
        assert_eq!(reported.completion_tokens, Some(500_000));
        assert_eq!(cost.as_ref().map(|c| c.total_cost), Some(3.0));
        assert_eq!(cost.as_ref().map(|c| c.output.tokens), Some(1_000_000));

        // Without a cache-read price the cost is unavailable, not zero.
        let mut decoder = SseDecoder::new();
        decoder.gemini_usage = true;
        decoder.last_usage = Some(usage);
        let no_cache_price = ModelPricing {
            cache_reads_price: None,
            ..pricing
        };
        let StreamEvent::Usage { cost, .. } = &decoder.finish(Some(&no_cache_price))[0] else {
            panic!("expected usage first");
        };
        assert_eq!(cost, &None);
    }

    #[test]
    fn test_usage_without_pricing_has_no_cost() {
        let mut decoder = SseDecoder::new();
        decoder.feed(&data(json!({ "usage": { "input_tokens": "12", "output_tokens": 3 } })));
        let tail = decoder.finish(None);
        assert_eq!(
            tail[0],
            StreamEvent::Usage {
                usage: UsageSummary {
                    prompt_tokens: Some(12),
                    completion_tokens: Some(3),
                    total_tokens: Some(15),
                    ..Default::default()
                },
                cost: None,
            }
        );
    }

    #[test]
    fn test_grounding_footer_is_deduplicated() {
        let chunk = |uri: &str| {
            data(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "." }] },
                    "groundingMetadata": { "groundingChunks": [{ "web": { "uri": uri, "title": "t" } }] }
                }]
            }))
        };
        let mut decoder = SseDecoder::new();
        decoder.feed(&chunk("https://a.dev"));
        decoder.feed(&chunk("https://b.dev"));
        decoder.feed(&chunk("https://a.dev"));

        let tail = decoder.finish(None);
        assert_eq!(
            tail[0],
            StreamEvent::Text {
                text: "\n\nSources: [1](https://a.dev), [2](https://b.dev)".into()
            }
        );
        let StreamEvent::Grounding { sources } = &tail[1] else {
            panic!("expected grounding");
        };
        assert_eq!(sources.len(), 2);
        assert_eq!(tail.last(), Some(&StreamEvent::Done));
    }

    #[test]
    fn test_gemini_block_reason_is_error() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(&data(json!({ "promptFeedback": { "blockReason": "SAFETY" } })));
        let StreamEvent::Error { envelope } = &events[0] else {
            panic!("expected error");
        };
        assert_eq!(envelope.code.as_deref(), Some("CONTENT_BLOCKED"));
        assert!(envelope.message.contains("safety filters"));

        let events = decoder.feed(&data(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        })));
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                envelope: ErrorEnvelope {
                    code: Some("CONTENT_BLOCKED".into()),
                    message: "Image generation was blocked by safety filters.".into(),
                    provider_id: Some("gemini".into()),
                    retryable: Some(false),
                }
            }]
        );
    }

    #[test]
    fn test_openrouter_mid_stream_error() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(&data(json!({
            "error": { "code": 502, "message": "Provider returned error" }
        })));
        let StreamEvent::Error { envelope } = &events[0] else {
            panic!("expected error");
        };
        assert_eq!(envelope.code.as_deref(), Some("502"));
        assert_eq!(envelope.message, "Provider returned error");
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder
            .feed(": keep-alive\ndata: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}")
            .is_empty());
        assert_eq!(
            decoder.finish(None),
            vec![StreamEvent::Text { text: "tail".into() }, StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_consume_byte_stream() {
        let chunks: Vec<Result<Bytes, AppError>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n")),
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n")),
        ];
        let mut seen = Vec::new();
        consume_byte_stream(futures::stream::iter(chunks), None, |e| seen.push(e))
            .await
            .unwrap();
        assert_eq!(
            seen,
            vec![
                StreamEvent::Text { text: "a".into() },
                StreamEvent::Text { text: "b".into() },
                StreamEvent::Done,
            ]
        );

        let failing: Vec<Result<Bytes, AppError>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n")),
            Err(AppError::Other("reset".into())),
        ];
        let mut count = 0;
        let err = consume_byte_stream(futures::stream::iter(failing), None, |_| count += 1)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "reset");
        assert_eq!(count, 1);
    }
}
