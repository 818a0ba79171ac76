use serde::{Deserialize, Serialize};

use crate::record::{AttrMap, PlayerRecord};

/// Core skills the comparable filter windows on.
pub const CORE_SKILLS: [&str; 6] = [
    "playmaking",
    "passing",
    "defending",
    "scoring",
    "winger",
    "goalkeeping",
];

/// One historical sale: the same attributes as a player record plus the
/// observed sale price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub attrs: AttrMap,
    pub price: f64,
}

impl SaleRecord {
    pub fn new(attrs: AttrMap, price: f64) -> Self {
        Self { attrs, price }
    }

    pub fn age_years(&self) -> Option<f64> {
        if let Some(days) = self.attrs.get("age_days") {
            return Some(days / 365.0);
        }
        self.attrs.get("age_years")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterParams {
    /// Maximum age difference in years.
    pub age_range: f64,
    /// Maximum per-skill level difference.
    pub skill_delta: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            age_range: 1.0,
            skill_delta: 1.0,
        }
    }
}

/// Linear-interpolated percentile over an ascending slice, matching the
/// numpy/pandas default. `q` is in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            if lo == hi {
                sorted[lo]
            } else {
                sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
            }
        }
    }
}

/// Narrow a comparable set down to relevant, non-outlier sales.
///
/// Price outliers beyond 1.5 IQR go first (price-based, independent of the
/// target), then the age window, then a window per core skill. A record
/// missing the attribute under test is kept, and a target missing it skips
/// that step entirely; missing data never discards.
pub fn filter_comparables(
    player: &PlayerRecord,
    sales: &[SaleRecord],
    params: FilterParams,
) -> Vec<SaleRecord> {
    let mut kept: Vec<SaleRecord> = sales.to_vec();

    if !kept.is_empty() {
        let mut prices: Vec<f64> = kept.iter().map(|s| s.price).collect();
        prices.sort_by(f64::total_cmp);
        let q1 = percentile(&prices, 0.25);
        let q3 = percentile(&prices, 0.75);
        let iqr = q3 - q1;
        let low = q1 - 1.5 * iqr;
        let high = q3 + 1.5 * iqr;
        kept.retain(|s| s.price >= low && s.price <= high);
    }

    if let Some(target_age) = player.age_years() {
        kept.retain(|s| match s.age_years() {
            Some(age) => (age - target_age).abs() <= params.age_range,
            None => true,
        });
    }

    for skill in CORE_SKILLS {
        let Some(target) = player.attrs.get(skill) else {
            continue;
        };
        kept.retain(|s| match s.attrs.get(skill) {
            Some(value) => (value - target).abs() <= params.skill_delta,
            None => true,
        });
    }

    kept
}
