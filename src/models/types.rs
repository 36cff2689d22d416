use serde::{Deserialize, Serialize};

/// A context-window bound that overrides base prices once a request's input
/// token count fits under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub context_window: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_reads_price: Option<f64>,
}

/// Pricing information for a model. Prices are USD per 1M tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_reads_price: Option<f64>,
    /// Evaluated in order, bounds ascending by convention.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<PricingTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    /// Price per 1M tokens that was applied
    pub price: f64,
    pub tokens: u64,
    pub cost: f64,
}

/// Cost calculation result for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCost {
    pub input: CostLine,
    pub output: CostLine,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<CostLine>,
    /// Total cost in USD
    pub total_cost: f64,
}
