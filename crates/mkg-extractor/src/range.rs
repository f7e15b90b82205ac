//! Range Resolver
//!
//! Detects comparator cues ("大于", "以下", "不超过", positional cues such as
//! "前" or "末") and assigns each to its nearest numeral. A cue lying within
//! another cue's span is discarded, so "不大于" never also reads as "大于".

use serde::{Deserialize, Serialize};

use crate::numeral::Numeral;
use crate::span::{find_literal, Span};

/// Comparator attached to a normalized value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Limit {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "＜")]
    Lt,
    #[serde(rename = "≤")]
    Le,
    #[serde(rename = "＞")]
    Gt,
    #[serde(rename = "≥")]
    Ge,
}

impl Limit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "＜",
            Self::Le => "≤",
            Self::Gt => "＞",
            Self::Ge => "≥",
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparator lexicon, in resolution order
const CUES: [(&str, Limit); 36] = [
    ("<", Limit::Lt),
    ("＜", Limit::Lt),
    ("小于", Limit::Lt),
    ("未满", Limit::Lt),
    ("不满", Limit::Lt),
    ("以下", Limit::Lt),
    ("低于", Limit::Lt),
    ("≤", Limit::Le),
    ("小于等于", Limit::Le),
    ("不大于", Limit::Le),
    ("不超", Limit::Le),
    ("不超过", Limit::Le),
    ("未超过", Limit::Le),
    ("不能超过", Limit::Le),
    ("不应超过", Limit::Le),
    ("不得超过", Limit::Le),
    ("及以下", Limit::Le),
    ("初", Limit::Le),
    ("前", Limit::Le),
    ("头", Limit::Le),
    ("起", Limit::Le),
    ("内", Limit::Le),
    ("以内", Limit::Le),
    ("开始", Limit::Le),
    (">", Limit::Gt),
    ("＞", Limit::Gt),
    ("大于", Limit::Gt),
    ("超过", Limit::Gt),
    ("以上", Limit::Gt),
    ("≥", Limit::Ge),
    ("大于等于", Limit::Ge),
    ("不小于", Limit::Ge),
    ("及以上", Limit::Ge),
    ("末", Limit::Ge),
    ("后", Limit::Ge),
    ("分娩前", Limit::Ge),
];

/// A comparator cue occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub span: Span,
    pub limit: Limit,
}

/// Cue occurrences not covered by another cue, in lexicon order
pub fn find_cues(text: &str) -> Vec<Cue> {
    let all: Vec<Cue> = CUES
        .iter()
        .flat_map(|&(cue, limit)| {
            find_literal(text, cue)
                .into_iter()
                .map(move |span| Cue { span, limit })
        })
        .collect();

    all.iter()
        .enumerate()
        .filter(|&(i, cue)| {
            !all.iter()
                .enumerate()
                .any(|(j, other)| i != j && other.span.covers(&cue.span))
        })
        .map(|(_, cue)| *cue)
        .collect()
}

/// Index of the numeral a cue binds to.
///
/// The left candidate minimizes the gap between the cue start and a numeral
/// end; the right candidate the gap between a numeral start and the cue end.
/// The left candidate is taken only when strictly closer.
fn nearest_numeral(cue: &Span, numerals: &[Numeral]) -> Option<usize> {
    let closest = |gap: &dyn Fn(&Span) -> usize| {
        numerals
            .iter()
            .enumerate()
            .map(|(i, n)| (gap(&n.span), i))
            .min_by_key(|&(d, _)| d)
    };
    let (left_gap, left) = closest(&|n: &Span| cue.start.abs_diff(n.end))?;
    let (right_gap, right) = closest(&|n: &Span| n.start.abs_diff(cue.end))?;
    Some(if left_gap < right_gap { left } else { right })
}

/// Explicit comparator of each numeral, by index
pub fn resolve_limits(text: &str, numerals: &[Numeral]) -> Vec<Option<Limit>> {
    let mut limits = vec![None; numerals.len()];
    for cue in find_cues(text) {
        if let Some(i) = nearest_numeral(&cue.span, numerals) {
            limits[i] = Some(cue.limit);
        }
    }
    limits
}
