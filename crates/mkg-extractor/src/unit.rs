//! Unit Resolver
//!
//! Binds each numeral to the first recognized unit token at or after the
//! numeral's end. When several units start at the same offset the longest
//! one wins (`mg/kg` over `mg`, `周岁` over `周`).

use std::collections::BTreeMap;

use crate::numeral::Numeral;
use crate::span::find_literal;

/// Recognized unit tokens
pub const UNITS: [&str; 46] = [
    // Time and age
    "年", "岁", "周岁", "月", "周", "日", "天", "d", "小时", "h", "分钟", "m",
    // Mass
    "kg", "g", "mg", "μg",
    // Volume
    "l", "ml",
    // Length
    "cm",
    // Count
    "次", "kg/次",
    "片", "丸", "颗", "粒", "瓶", "包", "袋", "盒", "贴", "支", "滴", "下", "喷", "瓶盖",
    "单位",
    // Per-body-measure
    "g/kg", "mg/kg", "μg/kg", "ml/kg", "l/kg", "iu", "iu/m*m/天", "mg/m*m", "μg/kg/分速",
    "iu/m*m/d",
];

/// Longest unit starting at each char offset
pub fn unit_positions(text: &str) -> BTreeMap<usize, &'static str> {
    let mut positions: BTreeMap<usize, &'static str> = BTreeMap::new();
    for unit in UNITS {
        for span in find_literal(text, unit) {
            positions
                .entry(span.start)
                .and_modify(|current| {
                    if unit.chars().count() > current.chars().count() {
                        *current = unit;
                    }
                })
                .or_insert(unit);
        }
    }
    positions
}

/// Unit of each numeral, by index; empty when no unit follows
pub fn resolve_units(text: &str, numerals: &[Numeral]) -> Vec<&'static str> {
    let positions = unit_positions(text);
    numerals
        .iter()
        .map(|numeral| {
            positions
                .range(numeral.span.end..)
                .next()
                .map(|(_, unit)| *unit)
                .unwrap_or("")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeral::extract_numerals;

    fn units_of(text: &str) -> Vec<&'static str> {
        resolve_units(text, &extract_numerals(text))
    }

    #[test]
    fn test_nearest_following_unit() {
        assert_eq!(units_of("一日1次"), vec!["日", "次"]);
        assert_eq!(units_of("0.8~1.6g"), vec!["g", "g"]);
    }

    #[test]
    fn test_longest_unit_wins() {
        assert_eq!(units_of("一次5mg/kg"), vec!["次", "mg/kg"]);
        assert_eq!(units_of("3周岁"), vec!["周岁"]);
        assert_eq!(units_of("10ml"), vec!["ml"]);
    }

    #[test]
    fn test_missing_unit_is_empty() {
        assert_eq!(units_of("分3"), vec![""]);
        assert_eq!(units_of("1/3"), vec!["", ""]);
    }
}
