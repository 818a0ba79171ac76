use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use crate::comparables::SaleRecord;
use crate::record::PlayerRecord;

/// Env vars holding JSON attribute->number maps overlaid on the built-in
/// profiles. Malformed payloads are silently ignored.
pub const WEIGHTS_ENV: &str = "PRICING_WEIGHTS";
pub const SCALES_ENV: &str = "PRICING_SCALES";

/// Normalization scale per attribute, roughly its natural range or spread,
/// so differences are comparable before weighting. Keeping tsi around 100k
/// and skills around 5 is what stops one noisy attribute from dominating
/// the total distance.
pub static DEFAULT_SCALES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("playmaking", 5.0),
        ("passing", 5.0),
        ("defending", 5.0),
        ("scoring", 5.0),
        ("winger", 5.0),
        ("form", 5.0),
        ("tsi", 100_000.0),
        ("age_days", 1_825.0), // ~5 years
        ("specialty_index", 1.0),
        ("goalkeeping", 5.0),
        ("set_pieces", 5.0),
    ])
});

pub static DEFAULT_WEIGHTS: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| DEFAULT_SCALES.keys().map(|k| (*k, 1.0)).collect());

/// Goalkeeper profile: goalkeeping dominates, field skills are discounted.
pub static GOALKEEPER_WEIGHTS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let mut weights = DEFAULT_WEIGHTS.clone();
    weights.insert("goalkeeping", 3.0);
    for skill in ["scoring", "winger", "playmaking", "passing"] {
        weights.insert(skill, 0.5);
    }
    weights
});

pub static GOALKEEPER_SCALES: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| DEFAULT_SCALES.clone());

/// Parse a JSON-encoded attribute map from an environment variable.
/// Anything unreadable yields an empty overlay.
pub fn load_env_overrides(var: &str) -> HashMap<String, f64> {
    let Ok(raw) = env::var(var) else {
        return HashMap::new();
    };
    if raw.trim().is_empty() {
        return HashMap::new();
    }
    serde_json::from_str::<HashMap<String, f64>>(&raw).unwrap_or_default()
}

/// Resolve the weight and scale maps for one estimation call. Caller maps
/// take precedence wholesale; otherwise the profile for the player class is
/// overlaid with the env-var overrides. Non-positive scales are replaced
/// with 1.0 so the distance term can never divide by zero.
pub fn resolve_profiles(
    goalkeeper: bool,
    weights: Option<&HashMap<String, f64>>,
    scales: Option<&HashMap<String, f64>>,
) -> (HashMap<String, f64>, HashMap<String, f64>) {
    let weights = match weights {
        Some(explicit) => explicit.clone(),
        None => {
            let base = if goalkeeper {
                &*GOALKEEPER_WEIGHTS
            } else {
                &*DEFAULT_WEIGHTS
            };
            let mut merged: HashMap<String, f64> =
                base.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            merged.extend(load_env_overrides(WEIGHTS_ENV));
            merged
        }
    };

    let mut scales = match scales {
        Some(explicit) => explicit.clone(),
        None => {
            let base = if goalkeeper {
                &*GOALKEEPER_SCALES
            } else {
                &*DEFAULT_SCALES
            };
            let mut merged: HashMap<String, f64> =
                base.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            merged.extend(load_env_overrides(SCALES_ENV));
            merged
        }
    };
    for scale in scales.values_mut() {
        if !(*scale > 0.0) {
            *scale = 1.0;
        }
    }

    (weights, scales)
}

/// Per-attribute contributions to the dissimilarity between a target player
/// and one comparable sale: |difference| / scale * weight. Attributes absent
/// on either side count as 0 before differencing.
pub fn attribute_contributions(
    player: &PlayerRecord,
    sale: &SaleRecord,
    weights: &HashMap<String, f64>,
    scales: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mut contribs = HashMap::with_capacity(weights.len());
    for (attr, weight) in weights {
        let scale = match scales.get(attr) {
            Some(s) if *s > 0.0 => *s,
            _ => 1.0,
        };
        let diff = (player.attrs.get_or_zero(attr) - sale.attrs.get_or_zero(attr)) / scale;
        contribs.insert(attr.clone(), diff.abs() * weight);
    }
    contribs
}

/// Scalar weighted distance: the sum of all attribute contributions.
pub fn distance(
    player: &PlayerRecord,
    sale: &SaleRecord,
    weights: &HashMap<String, f64>,
    scales: &HashMap<String, f64>,
) -> f64 {
    attribute_contributions(player, sale, weights, scales)
        .values()
        .sum()
}
