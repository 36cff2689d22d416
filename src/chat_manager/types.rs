use serde::{Deserialize, Serialize};

use crate::models::RequestCost;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    /// Prompt tokens served from the provider's context cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: Option<String>,
    pub message: String,
    pub provider_id: Option<String>,
    pub retryable: Option<bool>,
}

/// Provider-agnostic events derived from a chat completion stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    Grounding {
        sources: Vec<GroundingSource>,
    },
    Usage {
        usage: UsageSummary,
        #[serde(skip_serializing_if = "Option::is_none")]
        cost: Option<RequestCost>,
    },
    Error {
        envelope: ErrorEnvelope,
    },
    Done,
}
