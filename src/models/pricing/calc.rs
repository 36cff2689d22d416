use crate::models::{CostLine, ModelPricing, RequestCost};

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

struct EffectivePrices {
    input: f64,
    output: f64,
    cache_reads: f64,
}

/// Resolves the prices that apply to a request of `input_tokens`, or `None`
/// when the model lacks any of the three base prices.
fn effective_prices(pricing: &ModelPricing, input_tokens: u64) -> Option<EffectivePrices> {
    let mut prices = EffectivePrices {
        input: pricing.input_price?,
        output: pricing.output_price?,
        cache_reads: pricing.cache_reads_price?,
    };

    if let Some(tier) = pricing
        .tiers
        .iter()
        .find(|tier| tier.context_window >= input_tokens)
    {
        prices.input = tier.input_price.unwrap_or(prices.input);
        prices.output = tier.output_price.unwrap_or(prices.output);
        prices.cache_reads = tier.cache_reads_price.unwrap_or(prices.cache_reads);
    }

    Some(prices)
}

fn line(price: f64, tokens: u64) -> CostLine {
    CostLine {
        price,
        tokens,
        cost: price * (tokens as f64 / TOKENS_PER_UNIT),
    }
}

pub fn calculate_request_cost(
    pricing: &ModelPricing,
    input_tokens: u64,
    output_tokens: u64,
    cache_read_tokens: u64,
) -> Option<RequestCost> {
    let prices = effective_prices(pricing, input_tokens)?;

    if cache_read_tokens > input_tokens {
        tracing::warn!(
            input_tokens,
            cache_read_tokens,
            "cache read tokens exceed input tokens, clamping billable input to zero"
        );
    }
    let billable_input = input_tokens.saturating_sub(cache_read_tokens);

    let input = line(prices.input, billable_input);
    let output = line(prices.output, output_tokens);
    let cache_read = (cache_read_tokens > 0).then(|| line(prices.cache_reads, cache_read_tokens));

    let total_cost =
        input.cost + output.cost + cache_read.as_ref().map(|c| c.cost).unwrap_or(0.0);

    Some(RequestCost {
        input,
        output,
        cache_read,
        total_cost,
    })
}
