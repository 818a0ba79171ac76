use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::record::PlayerRecord;

/// Feature order of the general model.
pub const GENERAL_FEATURES: [&str; 9] = [
    "playmaking",
    "passing",
    "defending",
    "scoring",
    "winger",
    "form",
    "tsi",
    "age_days",
    "specialty_index",
];

/// Feature order of the goalkeeper model: the general features plus the
/// two keeper-relevant skills.
pub const GOALKEEPER_FEATURES: [&str; 11] = [
    "playmaking",
    "passing",
    "defending",
    "scoring",
    "winger",
    "form",
    "tsi",
    "age_days",
    "specialty_index",
    "goalkeeping",
    "set_pieces",
];

pub const MODEL_PATH_ENV: &str = "PRICING_MODEL_PATH";
pub const GK_MODEL_PATH_ENV: &str = "PRICING_GK_MODEL_PATH";
pub const DATASET_PATH_ENV: &str = "PRICING_SALES_DATASET";

const ARTIFACT_VERSION: u32 = 1;
const CACHE_DIR: &str = "ht_trader";
const DEFAULT_DATASET: &str = "data/player_sales.csv";

// Fully-grown tree with a safety cap; fixture-sized datasets stay shallow.
const MAX_TREE_DEPTH: usize = 24;
const MIN_SPLIT_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    General,
    Goalkeeper,
}

impl ModelVariant {
    pub fn for_player(player: &PlayerRecord) -> Self {
        if player.is_goalkeeper() {
            ModelVariant::Goalkeeper
        } else {
            ModelVariant::General
        }
    }

    pub fn feature_names(self) -> &'static [&'static str] {
        match self {
            ModelVariant::General => &GENERAL_FEATURES,
            ModelVariant::Goalkeeper => &GOALKEEPER_FEATURES,
        }
    }

    pub fn artifact_file(self) -> &'static str {
        match self {
            ModelVariant::General => "pricing_model.json",
            ModelVariant::Goalkeeper => "pricing_model_gk.json",
        }
    }

    fn path_env(self) -> &'static str {
        match self {
            ModelVariant::General => MODEL_PATH_ENV,
            ModelVariant::Goalkeeper => GK_MODEL_PATH_ENV,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Deterministic CART regression tree: variance-minimizing binary splits on
/// midpoint thresholds, grown until nodes are pure or too small. The same
/// dataset always yields the same tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let mut nodes = Vec::new();
        if rows.is_empty() || rows.len() != targets.len() {
            nodes.push(TreeNode::Leaf { value: 0.0 });
            return Self { nodes };
        }
        let indices: Vec<usize> = (0..rows.len()).collect();
        grow(&mut nodes, rows, targets, indices, 0);
        Self { nodes }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    at = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Grow one subtree over `indices`, returning its node index.
fn grow(
    nodes: &mut Vec<TreeNode>,
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: Vec<usize>,
    depth: usize,
) -> usize {
    let mean = indices.iter().map(|i| targets[*i]).sum::<f64>() / indices.len() as f64;

    let pure = indices
        .iter()
        .all(|i| (targets[*i] - targets[indices[0]]).abs() < 1e-9);
    if depth >= MAX_TREE_DEPTH || indices.len() < MIN_SPLIT_SAMPLES || pure {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    }

    let Some((feature, threshold)) = best_split(rows, targets, &indices) else {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|i| rows[*i][feature] <= threshold);

    let at = nodes.len();
    nodes.push(TreeNode::Leaf { value: mean }); // placeholder until children exist
    let left = grow(nodes, rows, targets, left_idx, depth + 1);
    let right = grow(nodes, rows, targets, right_idx, depth + 1);
    nodes[at] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    at
}

/// Best (feature, midpoint threshold) by sum-of-squared-error reduction.
/// Ties keep the earliest feature and lowest threshold, so the result is
/// independent of iteration order quirks.
fn best_split(rows: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n_features = rows[indices[0]].len();
    let total: f64 = indices.iter().map(|i| targets[*i]).sum();
    let n = indices.len() as f64;

    let mut best: Option<(usize, f64)> = None;
    // SSE = sum(y^2) - sum(y)^2/n; sum(y^2) is constant per node, so
    // maximizing sum_l^2/n_l + sum_r^2/n_r minimizes the split SSE.
    let mut best_score = total * total / n;

    for feature in 0..n_features {
        let mut ordered: Vec<(f64, f64)> = indices
            .iter()
            .map(|i| (rows[*i][feature], targets[*i]))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for (pos, (value, target)) in ordered.iter().enumerate().take(ordered.len() - 1) {
            left_sum += target;
            let next_value = ordered[pos + 1].0;
            if *value == next_value {
                continue;
            }
            let n_left = (pos + 1) as f64;
            let n_right = n - n_left;
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left + right_sum * right_sum / n_right;
            if score > best_score + 1e-12 {
                best_score = score;
                best = Some((feature, (value + next_value) / 2.0));
            }
        }
    }
    best
}

/// Versioned persisted form of one trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub generated_at: String,
    pub variant: ModelVariant,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub tree: RegressionTree,
}

impl ModelArtifact {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.tree.predict(features)
    }

    /// Predict from a player record, pulling the ordered feature vector out
    /// of the attribute map (absent attributes read as 0).
    pub fn predict_player(&self, player: &PlayerRecord) -> f64 {
        let features: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| player.attrs.get_or_zero(name))
            .collect();
        self.tree.predict(&features)
    }
}

/// Where the two model artifacts and the training dataset live. Resolved
/// from env overrides, falling back to the per-user cache dir and the
/// repo-local dataset path.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub general_model: Option<PathBuf>,
    pub goalkeeper_model: Option<PathBuf>,
    pub dataset: PathBuf,
}

impl ModelPaths {
    pub fn from_env() -> Self {
        Self {
            general_model: artifact_path_for(ModelVariant::General),
            goalkeeper_model: artifact_path_for(ModelVariant::Goalkeeper),
            dataset: dataset_path_from_env(),
        }
    }

    pub fn model_path(&self, variant: ModelVariant) -> Option<&Path> {
        match variant {
            ModelVariant::General => self.general_model.as_deref(),
            ModelVariant::Goalkeeper => self.goalkeeper_model.as_deref(),
        }
    }
}

pub fn artifact_path_for(variant: ModelVariant) -> Option<PathBuf> {
    if let Ok(raw) = env::var(variant.path_env())
        && !raw.trim().is_empty()
    {
        return Some(PathBuf::from(raw.trim()));
    }
    app_cache_dir().map(|dir| dir.join(variant.artifact_file()))
}

pub fn dataset_path_from_env() -> PathBuf {
    match env::var(DATASET_PATH_ENV) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => PathBuf::from(DEFAULT_DATASET),
    }
}

pub(crate) fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

/// Read the historical sales CSV into ordered feature rows and prices.
/// Missing feature columns and malformed cells coerce to 0; rows without a
/// positive price are skipped.
pub fn load_training_rows(path: &Path, features: &[&str]) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open sales dataset {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read dataset header {}", path.display()))?
        .clone();

    let mut column_of: HashMap<&str, usize> = HashMap::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        column_of.insert(name.trim(), idx);
    }
    let price_col = *column_of
        .get("price")
        .ok_or_else(|| anyhow!("dataset {} has no price column", path.display()))?;
    let feature_cols: Vec<Option<usize>> = features
        .iter()
        .map(|name| column_of.get(*name).copied())
        .collect();

    let mut rows = Vec::new();
    let mut prices = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read dataset row {}", path.display()))?;
        let price = record.get(price_col).map(parse_cell).unwrap_or(0.0);
        if price <= 0.0 {
            continue;
        }
        let row: Vec<f64> = feature_cols
            .iter()
            .map(|col| {
                col.and_then(|idx| record.get(idx))
                    .map(parse_cell)
                    .unwrap_or(0.0)
            })
            .collect();
        rows.push(row);
        prices.push(price);
    }
    Ok((rows, prices))
}

fn parse_cell(raw: &str) -> f64 {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Train one variant synchronously from the historical sales dataset.
/// A missing or unreadable dataset is fatal: there is no estimator below
/// the regression model to fall back to.
pub fn train_from_csv(dataset: &Path, variant: ModelVariant) -> Result<ModelArtifact> {
    let features = variant.feature_names();
    let (rows, prices) = load_training_rows(dataset, features)?;
    if rows.is_empty() {
        return Err(anyhow!(
            "no usable training rows in {}",
            dataset.display()
        ));
    }
    let tree = RegressionTree::fit(&rows, &prices);
    Ok(ModelArtifact {
        version: ARTIFACT_VERSION,
        generated_at: chrono::Utc::now().to_rfc3339(),
        variant,
        feature_names: features.iter().map(|f| f.to_string()).collect(),
        train_rows: rows.len(),
        tree,
    })
}

pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(artifact).context("serialize model artifact")?;
    fs::write(&tmp, json).with_context(|| format!("write model artifact {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap model artifact {}", path.display()))?;
    Ok(())
}

pub fn load_artifact(path: &Path) -> Result<ModelArtifact> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read model artifact {}", path.display()))?;
    let artifact: ModelArtifact = serde_json::from_str(&raw)
        .with_context(|| format!("parse model artifact {}", path.display()))?;
    if artifact.version != ARTIFACT_VERSION {
        return Err(anyhow!(
            "unsupported model artifact version {} in {}",
            artifact.version,
            path.display()
        ));
    }
    Ok(artifact)
}

/// Load the persisted artifact for a variant, or train from the dataset and
/// persist the result. Without a resolvable artifact path the model is
/// trained in memory only.
pub fn load_or_train(variant: ModelVariant, paths: &ModelPaths) -> Result<ModelArtifact> {
    if let Some(path) = paths.model_path(variant)
        && path.exists()
    {
        return load_artifact(path);
    }
    let artifact = train_from_csv(&paths.dataset, variant)?;
    if let Some(path) = paths.model_path(variant) {
        save_artifact(&artifact, path)?;
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_targets_collapse_to_one_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![5.0, 5.0, 5.0];
        let tree = RegressionTree::fit(&rows, &targets);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[99.0]), 5.0);
    }

    #[test]
    fn step_function_is_recovered_exactly() {
        let rows: Vec<Vec<f64>> = (1..=10).map(|v| vec![v as f64]).collect();
        let targets: Vec<f64> = (1..=10)
            .map(|v| if v <= 5 { 100.0 } else { 900.0 })
            .collect();
        let tree = RegressionTree::fit(&rows, &targets);
        assert_eq!(tree.predict(&[2.0]), 100.0);
        assert_eq!(tree.predict(&[5.0]), 100.0);
        assert_eq!(tree.predict(&[6.0]), 900.0);
        assert_eq!(tree.predict(&[50.0]), 900.0);
    }

    #[test]
    fn splits_pick_the_informative_feature() {
        // Second feature is noise; the target depends on the first only.
        let rows = vec![
            vec![1.0, 9.0],
            vec![2.0, 1.0],
            vec![3.0, 7.0],
            vec![8.0, 2.0],
            vec![9.0, 8.0],
            vec![10.0, 3.0],
        ];
        let targets = vec![10.0, 10.0, 10.0, 50.0, 50.0, 50.0];
        let tree = RegressionTree::fit(&rows, &targets);
        assert_eq!(tree.predict(&[2.5, 100.0]), 10.0);
        assert_eq!(tree.predict(&[8.5, -100.0]), 50.0);
    }

    #[test]
    fn fit_is_deterministic() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64, (i * 13 % 11) as f64])
            .collect();
        let targets: Vec<f64> = (0..40).map(|i| ((i % 7) * 1000 + i % 3) as f64).collect();
        let a = RegressionTree::fit(&rows, &targets);
        let b = RegressionTree::fit(&rows, &targets);
        for row in &rows {
            assert_eq!(a.predict(row), b.predict(row));
        }
        assert_eq!(a.node_count(), b.node_count());
    }

    #[test]
    fn degenerate_fit_inputs_yield_zero_leaf() {
        let tree = RegressionTree::fit(&[], &[]);
        assert_eq!(tree.predict(&[1.0, 2.0]), 0.0);
    }
}
