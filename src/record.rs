use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categorical bonus trait affecting play style and market price.
///
/// Labels and indices (0-5) map bidirectionally; anything unrecognized
/// collapses to `None` rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Specialty {
    #[default]
    None,
    Technical,
    Quick,
    Unpredictable,
    Powerful,
    Head,
}

pub const SPECIALTIES: [Specialty; 6] = [
    Specialty::None,
    Specialty::Technical,
    Specialty::Quick,
    Specialty::Unpredictable,
    Specialty::Powerful,
    Specialty::Head,
];

impl Specialty {
    pub fn index(self) -> u8 {
        match self {
            Specialty::None => 0,
            Specialty::Technical => 1,
            Specialty::Quick => 2,
            Specialty::Unpredictable => 3,
            Specialty::Powerful => 4,
            Specialty::Head => 5,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => Specialty::Technical,
            2 => Specialty::Quick,
            3 => Specialty::Unpredictable,
            4 => Specialty::Powerful,
            5 => Specialty::Head,
            _ => Specialty::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Specialty::None => "None",
            Specialty::Technical => "Technical",
            Specialty::Quick => "Quick",
            Specialty::Unpredictable => "Unpredictable",
            Specialty::Powerful => "Powerful",
            Specialty::Head => "Head",
        }
    }

    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        for specialty in SPECIALTIES {
            if specialty.label().eq_ignore_ascii_case(trimmed) {
                return specialty;
            }
        }
        Specialty::None
    }
}

/// Attribute-name to numeric-value mapping with a defined default for
/// absent keys. All scoring and filtering code goes through this type
/// instead of probing loosely-typed rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrMap {
    values: HashMap<String, f64>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn get_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>, const N: usize> From<[(S, f64); N]> for AttrMap {
    fn from(pairs: [(S, f64); N]) -> Self {
        let mut values = HashMap::with_capacity(N);
        for (name, value) in pairs {
            values.insert(name.into(), value);
        }
        Self { values }
    }
}

/// Normalized view of one player, regardless of where the attributes came
/// from (live API, CSV export, pasted text).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub id: Option<u64>,
    pub attrs: AttrMap,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, attrs: AttrMap) -> Self {
        Self {
            name: name.into(),
            id: None,
            attrs,
        }
    }

    /// Age in years. `age_days` is authoritative when present; the
    /// `age_years` attribute is only consulted as a fallback.
    pub fn age_years(&self) -> Option<f64> {
        if let Some(days) = self.attrs.get("age_days") {
            return Some(days / 365.0);
        }
        self.attrs.get("age_years")
    }

    pub fn specialty(&self) -> Specialty {
        Specialty::from_index(self.attrs.get_or_zero("specialty_index") as i64)
    }

    pub fn is_goalkeeper(&self) -> bool {
        self.attrs.get_or_zero("goalkeeping") >= 7.0
    }

    /// Build a record from a JSON object. Malformed numeric fields coerce
    /// to 0 and unknown specialty labels to `None`; this never fails.
    pub fn from_json(value: &Value) -> Self {
        let mut record = PlayerRecord::default();
        let Some(object) = value.as_object() else {
            return record;
        };

        for (key, raw) in object {
            match key.as_str() {
                "name" => {
                    if let Some(name) = raw.as_str() {
                        record.name = name.trim().to_string();
                    }
                }
                "id" => {
                    record.id = num_from_value(raw).map(|n| n.max(0.0) as u64);
                }
                "specialty" => {
                    if let Some(label) = raw.as_str() {
                        let specialty = Specialty::from_label(label);
                        record
                            .attrs
                            .set("specialty_index", specialty.index() as f64);
                    }
                }
                _ => {
                    record
                        .attrs
                        .set(key, num_from_value(raw).unwrap_or(0.0));
                }
            }
        }

        // An explicit index wins over the label when both were supplied.
        if let Some(index) = object.get("specialty_index").and_then(num_from_value) {
            record.attrs.set("specialty_index", index);
        }
        record
    }
}

/// Numeric coercion for loosely-typed inputs: JSON numbers, or strings
/// with either `.` or `,` as the decimal separator.
pub fn num_from_value(value: &Value) -> Option<f64> {
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .or_else(|| raw.replace(',', ".").parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn specialty_round_trips_through_index() {
        for specialty in SPECIALTIES {
            let index = specialty.index();
            let back = Specialty::from_index(index as i64);
            assert_eq!(back, specialty);
            assert_eq!(Specialty::from_label(back.label()), specialty);
        }
    }

    #[test]
    fn specialty_unknown_maps_to_none() {
        assert_eq!(Specialty::from_label("Acrobatic"), Specialty::None);
        assert_eq!(Specialty::from_index(9), Specialty::None);
        assert_eq!(Specialty::from_index(-1), Specialty::None);
    }

    #[test]
    fn age_days_is_authoritative() {
        let player = PlayerRecord::new(
            "t",
            AttrMap::from([("age_days", 7300.0), ("age_years", 99.0)]),
        );
        assert!((player.age_years().unwrap() - 20.0).abs() < 1e-9);

        let only_years = PlayerRecord::new("t", AttrMap::from([("age_years", 24.0)]));
        assert_eq!(only_years.age_years(), Some(24.0));

        let neither = PlayerRecord::new("t", AttrMap::new());
        assert_eq!(neither.age_years(), None);
    }

    #[test]
    fn from_json_coerces_malformed_fields() {
        let player = PlayerRecord::from_json(&json!({
            "name": " Karl Berg ",
            "id": 123456789,
            "playmaking": "12",
            "tsi": "not a number",
            "form": "6,5",
            "specialty": "quick",
        }));
        assert_eq!(player.name, "Karl Berg");
        assert_eq!(player.id, Some(123456789));
        assert_eq!(player.attrs.get("playmaking"), Some(12.0));
        assert_eq!(player.attrs.get("tsi"), Some(0.0));
        assert_eq!(player.attrs.get("form"), Some(6.5));
        assert_eq!(player.specialty(), Specialty::Quick);
    }

    #[test]
    fn explicit_specialty_index_wins_over_label() {
        let player = PlayerRecord::from_json(&json!({
            "specialty": "Quick",
            "specialty_index": 4,
        }));
        assert_eq!(player.specialty(), Specialty::Powerful);
    }

    #[test]
    fn goalkeeper_threshold_is_seven() {
        let gk = PlayerRecord::new("g", AttrMap::from([("goalkeeping", 7.0)]));
        let field = PlayerRecord::new("f", AttrMap::from([("goalkeeping", 6.0)]));
        assert!(gk.is_goalkeeper());
        assert!(!field.is_goalkeeper());
    }
}
