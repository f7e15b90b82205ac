//! Quantity Normalizer
//!
//! Turns the raw text of a numeric entity (体重, 年龄, 时期, 用药疗程, 用药剂量,
//! 用药频率) into a [`QuantityRecord`]: every value grouped under its unit with
//! a comparator, split into the `dimension` (per-time or per-dose units) and
//! `number` partitions.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use mkg_core::{Document, NumericKind};
use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::canonical::canonicalize;
use crate::numeral::extract_numerals;
use crate::range::{resolve_limits, Limit};
use crate::unit::resolve_units;

/// Unit calendar values fold into for time-like kinds
pub const DAY_UNIT: &str = "天";

// ============================================================================
// Records
// ============================================================================

/// One normalized value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(serialize_with = "serialize_value")]
    pub value: f64,
    pub limit: Limit,
}

impl Measurement {
    pub fn new(value: f64, limit: Limit) -> Self {
        Self { value, limit }
    }
}

/// Integral values are written as integers (`1095`, not `1095.0`)
fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Normalized form of a numeric entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantityRecord {
    /// Canonicalized entity text
    #[serde(rename = "corrected entity")]
    pub corrected: String,

    /// Per-time / per-dose units
    pub dimension: BTreeMap<String, Vec<Measurement>>,

    /// Everything else, including values without a unit (key `""`)
    pub number: BTreeMap<String, Vec<Measurement>>,
}

impl QuantityRecord {
    pub fn is_empty(&self) -> bool {
        self.dimension.is_empty() && self.number.is_empty()
    }

    /// Compact JSON used as a graph node value
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Day count of a calendar unit
fn days_per(unit: &str) -> Option<f64> {
    match unit {
        "年" | "岁" | "周岁" => Some(365.0),
        "月" => Some(30.0),
        "周" => Some(7.0),
        "日" | "天" => Some(1.0),
        _ => None,
    }
}

/// Fill in missing comparators of one ascending unit group
fn complete_limits(entries: Vec<(f64, Option<Limit>)>) -> Vec<Measurement> {
    let open_range = entries.len() == 2 && entries.iter().all(|(_, limit)| limit.is_none());

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (value, limit))| {
            let limit = limit.unwrap_or(match (open_range, i) {
                (true, 0) => Limit::Ge,
                (true, _) => Limit::Le,
                (false, _) => Limit::Eq,
            });
            Measurement::new(value, limit)
        })
        .collect()
}

/// Normalize the raw text of a numeric entity
pub fn normalize(kind: NumericKind, raw: &str) -> QuantityRecord {
    let corrected = canonicalize(raw);
    let numerals = extract_numerals(&corrected);
    let units = resolve_units(&corrected, &numerals);
    let limits = resolve_limits(&corrected, &numerals);

    // Insertion-ordered per unit so the stable sort keeps text order on ties
    let mut groups: BTreeMap<&str, Vec<(f64, Option<Limit>)>> = BTreeMap::new();
    for ((numeral, unit), limit) in numerals.iter().zip(units).zip(limits) {
        let (value, unit) = match days_per(unit) {
            Some(days) if kind.converts_to_days() => (numeral.value * days, DAY_UNIT),
            _ => (numeral.value, unit),
        };
        let group = groups.entry(unit).or_default();
        if !group.contains(&(value, limit)) {
            group.push((value, limit));
        }
    }

    let mut record = QuantityRecord {
        corrected,
        ..Default::default()
    };
    let dimension_units = kind.dimension_units();
    for (unit, mut entries) in groups {
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        let measurements = complete_limits(entries);
        let partition = if dimension_units.contains(&unit) {
            &mut record.dimension
        } else {
            &mut record.number
        };
        partition.insert(unit.to_string(), measurements);
    }

    record
}

// ============================================================================
// Corpus-wide Memo
// ============================================================================

/// Quantity records keyed by (numeric kind, raw text)
#[derive(Debug, Clone, Default)]
pub struct QuantityTable {
    records: HashMap<(NumericKind, String), QuantityRecord>,
}

impl QuantityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every (kind, raw text) pair carried by a numeric entity of the corpus
    pub fn collect_keys(documents: &[Document]) -> BTreeSet<(NumericKind, String)> {
        documents
            .iter()
            .flat_map(|doc| doc.entity.values())
            .filter_map(|entity| {
                NumericKind::from_entity_type(&entity.kind).map(|kind| (kind, entity.value.clone()))
            })
            .collect()
    }

    /// Normalize each distinct pair once
    pub fn build(keys: BTreeSet<(NumericKind, String)>, parallel: bool) -> Self {
        let normalize_key = |(kind, raw): (NumericKind, String)| {
            let record = normalize(kind, &raw);
            ((kind, raw), record)
        };

        let records: HashMap<_, _> = if parallel {
            keys.into_par_iter().map(normalize_key).collect()
        } else {
            keys.into_iter().map(normalize_key).collect()
        };
        debug!(records = records.len(), parallel, "Built quantity table");

        Self { records }
    }

    /// Build from every numeric entity of the corpus
    pub fn from_documents(documents: &[Document], parallel: bool) -> Self {
        Self::build(Self::collect_keys(documents), parallel)
    }

    pub fn get(&self, kind: NumericKind, raw: &str) -> Option<&QuantityRecord> {
        self.records.get(&(kind, raw.to_string()))
    }

    /// Memoized normalization
    pub fn resolve(&mut self, kind: NumericKind, raw: &str) -> &QuantityRecord {
        self.records
            .entry((kind, raw.to_string()))
            .or_insert_with(|| normalize(kind, raw))
    }

    /// Record counts per node label (时期 counted under 时长)
    pub fn counts_by_label(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (kind, _) in self.records.keys() {
            *counts.entry(kind.node_label()).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mkg_core::Category;
    use proptest::prelude::*;

    #[test]
    fn test_age_folds_into_days() {
        let record = normalize(NumericKind::Age, "大于3岁");

        assert_eq!(record.corrected, "大于3岁");
        assert!(record.dimension.is_empty());
        assert_eq!(record.number["天"], vec![Measurement::new(1095.0, Limit::Gt)]);
    }

    #[test]
    fn test_unlimited_pair_becomes_range() {
        let record = normalize(NumericKind::Dose, "0.8一1.6g");

        assert_eq!(
            record.number["g"],
            vec![Measurement::new(0.8, Limit::Ge), Measurement::new(1.6, Limit::Le)]
        );

        let corrected = normalize(NumericKind::Dose, "每次0.8一1.6g");
        assert_eq!(corrected.corrected, "一次0.8～1.6g");
        assert_eq!(corrected.dimension["次"], vec![Measurement::new(1.0, Limit::Eq)]);
        assert_eq!(corrected.number["g"].len(), 2);
    }

    #[test]
    fn test_frequency_partitions() {
        let record = normalize(NumericKind::Frequency, "每日1次");

        assert_eq!(record.corrected, "一日1次");
        assert_eq!(record.dimension["日"], vec![Measurement::new(1.0, Limit::Eq)]);
        assert_eq!(record.number["次"], vec![Measurement::new(1.0, Limit::Eq)]);
    }

    #[test]
    fn test_calendar_units_only_fold_for_time_kinds() {
        let course = normalize(NumericKind::Course, "2周");
        assert_eq!(course.number["天"], vec![Measurement::new(14.0, Limit::Eq)]);

        let frequency = normalize(NumericKind::Frequency, "2周1次");
        assert!(frequency.dimension.contains_key("周"));
        assert!(!frequency.number.contains_key("天"));
    }

    #[test]
    fn test_explicit_limit_blocks_range_completion() {
        let record = normalize(NumericKind::Weight, "大于10kg或20kg");
        assert_eq!(
            record.number["kg"],
            vec![Measurement::new(10.0, Limit::Gt), Measurement::new(20.0, Limit::Eq)]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let record = normalize(NumericKind::Dose, "1片或1片");
        assert_eq!(record.number["片"], vec![Measurement::new(1.0, Limit::Eq)]);
    }

    #[test]
    fn test_unitless_and_empty() {
        let record = normalize(NumericKind::Weight, "1/3");
        assert_eq!(record.number[""].len(), 2);

        let empty = normalize(NumericKind::Dose, "遵医嘱");
        assert!(empty.is_empty());
        assert_eq!(empty.corrected, "遵医嘱");
    }

    #[test]
    fn test_json_writes_integers() {
        let record = normalize(NumericKind::Age, "大于3岁");
        assert_eq!(
            record.to_json(),
            r#"{"corrected entity":"大于3岁","dimension":{},"number":{"天":[{"value":1095,"limit":"＞"}]}}"#
        );

        let fractional = normalize(NumericKind::Dose, "0.5片");
        assert!(fractional.to_json().contains(r#""value":0.5"#));
    }

    #[test]
    fn test_table_collects_numeric_entities_once() {
        let docs = vec![
            Document::new(Category::Dosage)
                .with_entity("T1", "用药频率", "一日1次")
                .with_entity("T2", "用药剂量", "一次1片"),
            Document::new(Category::Children)
                .with_entity("T1", "用药频率", "一日1次")
                .with_entity("T2", "时期", "6个月")
                .with_entity("T3", "病症", "发热"),
        ];

        let table = QuantityTable::from_documents(&docs, true);
        assert_eq!(table.len(), 3);
        assert!(table.get(NumericKind::Frequency, "一日1次").is_some());
        assert!(table.get(NumericKind::Period, "6个月").is_some());
        assert_eq!(table.counts_by_label().get("时长"), Some(&1));

        let sequential = QuantityTable::from_documents(&docs, false);
        assert_eq!(
            sequential.get(NumericKind::Dose, "一次1片"),
            table.get(NumericKind::Dose, "一次1片")
        );
    }

    #[test]
    fn test_resolve_memoizes() {
        let mut table = QuantityTable::new();
        assert!(table.is_empty());
        let json = table.resolve(NumericKind::Age, "65岁以上").to_json();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(NumericKind::Age, "65岁以上").to_json(), json);
        assert_eq!(table.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_unlimited_pair_is_closed_range(a in 1u32..500, gap in 1u32..500) {
            let b = a + gap;
            let record = normalize(NumericKind::Weight, &format!("{b}~{a}mg"));
            prop_assert_eq!(
                &record.number["mg"],
                &vec![
                    Measurement::new(a as f64, Limit::Ge),
                    Measurement::new(b as f64, Limit::Le),
                ]
            );
        }

        #[test]
        fn prop_other_group_sizes_default_to_eq(
            values in proptest::collection::btree_set(1u32..1000, 1..6)
        ) {
            prop_assume!(values.len() != 2);
            let text: Vec<String> = values.iter().rev().map(|v| format!("{v}片")).collect();
            let record = normalize(NumericKind::Dose, &text.join("、"));

            let group = &record.number["片"];
            prop_assert_eq!(group.len(), values.len());
            prop_assert!(group.iter().all(|m| m.limit == Limit::Eq));
            prop_assert!(group.windows(2).all(|w| w[0].value < w[1].value));
        }
    }
}
