use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result};

use crate::comparables::{self, FilterParams, SaleRecord};
use crate::curves;
use crate::estimator::{self, PriceEstimate};
use crate::model::{self, ModelArtifact, ModelPaths, ModelVariant};
use crate::record::PlayerRecord;
use crate::scoring;

pub const DEFAULT_MIN_COMPS: usize = 3;

/// Per-call knobs for the orchestrator. Defaults mirror the production
/// behavior: three comparables minimum, built-in profiles plus env
/// overrides for weights and scales.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    pub min_comps: usize,
    pub weights: Option<HashMap<String, f64>>,
    pub scales: Option<HashMap<String, f64>>,
    pub filter: FilterParams,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            min_comps: DEFAULT_MIN_COMPS,
            weights: None,
            scales: None,
            filter: FilterParams::default(),
        }
    }
}

/// Lazily-initialized holder for the two regression model variants.
///
/// The first request for a variant loads or trains it under the slot lock;
/// later requests reuse the cached artifact for the process lifetime. A
/// failed load is surfaced to the caller and not cached, so the next call
/// can succeed once the dataset or artifact appears.
#[derive(Debug)]
pub struct ModelStore {
    paths: ModelPaths,
    general: Mutex<Option<Arc<ModelArtifact>>>,
    goalkeeper: Mutex<Option<Arc<ModelArtifact>>>,
}

impl ModelStore {
    pub fn new(paths: ModelPaths) -> Self {
        Self {
            paths,
            general: Mutex::new(None),
            goalkeeper: Mutex::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ModelPaths::from_env())
    }

    pub fn model(&self, variant: ModelVariant) -> Result<Arc<ModelArtifact>> {
        let slot = match variant {
            ModelVariant::General => &self.general,
            ModelVariant::Goalkeeper => &self.goalkeeper,
        };
        let mut guard = slot.lock().expect("model store lock poisoned");
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }
        let artifact = model::load_or_train(variant, &self.paths)
            .with_context(|| format!("obtain {variant:?} pricing model"))?;
        let model = Arc::new(artifact);
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }
}

/// Process-wide store with env-resolved paths, initialized on first use.
pub fn global_model_store() -> &'static ModelStore {
    static STORE: OnceLock<ModelStore> = OnceLock::new();
    STORE.get_or_init(ModelStore::from_env)
}

/// Estimate a player's market price.
///
/// With a non-empty comparable set the sales are filtered (outlier prices,
/// age window, skill windows) and, if at least `min_comps` survive,
/// aggregated by inverse-distance weighting under the profile matching the
/// player's class (goalkeeping >= 7 selects the goalkeeper profile). With
/// no or too few comparables the cached regression model predicts a price,
/// the age curve adjusts it, and the fixed quantile fan applies.
pub fn estimate_price(
    player: &PlayerRecord,
    sales: Option<&[SaleRecord]>,
    options: &EstimateOptions,
    store: &ModelStore,
) -> Result<PriceEstimate> {
    let goalkeeper = player.is_goalkeeper();

    if let Some(sales) = sales
        && !sales.is_empty()
    {
        let filtered = comparables::filter_comparables(player, sales, options.filter);
        if filtered.len() >= options.min_comps {
            let (weights, scales) = scoring::resolve_profiles(
                goalkeeper,
                options.weights.as_ref(),
                options.scales.as_ref(),
            );
            if let Some(estimate) = estimator::estimate_from_comparables(
                player,
                &filtered,
                &weights,
                &scales,
                options.min_comps,
            ) {
                return Ok(estimate);
            }
        }
    }

    let artifact = store.model(ModelVariant::for_player(player))?;
    let mut price = artifact.predict_player(player);
    if let Some(age) = player.age_years() {
        price *= curves::age_price_multiplier(age);
    }
    Ok(curves::fallback_estimate(price))
}

/// Convenience wrapper over the process-wide model store.
pub fn estimate_price_default(
    player: &PlayerRecord,
    sales: Option<&[SaleRecord]>,
    options: &EstimateOptions,
) -> Result<PriceEstimate> {
    estimate_price(player, sales, options, global_model_store())
}
