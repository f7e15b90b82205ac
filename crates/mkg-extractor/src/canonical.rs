//! Canonicalizer
//!
//! Rewrites raw numeric-entity text into a lowercase, unit-normalized,
//! typo-corrected string:
//! 1. exact-match corrections for known-bad literals (OCR slips, merged ranges)
//! 2. full-width digit and letter folding, then ordered token substitution
//! 3. lowercasing
//!
//! The three steps repeat until the text stops changing, so canonical text
//! is a fixed point of [`canonicalize`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on rewrite passes
const MAX_PASSES: usize = 8;

/// Whole-string corrections
static CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("l岁以下", "1岁以下"),
        ("每次0.8一1.6g", "每次0.8～1.6g"),
        ("一日200万～200ｏ万单位", "一日200万～2000万单位"),
        (".万单位/kg", "单位/kg"),
        ("10一12.5mg/kg", "10～12.5mg/kg"),
        ("一日0.25一0.5g", "一日0.25～0.5g"),
        ("６０万～１２０万Ｕ／次", "60万～120万U/次"),
        ("一0.6ml/kg", "一次0.6ml/kg"),
        ("7.5一12.5mg/kg", "7.5～12.5mg/kg"),
        ("一20毫升", "一次20毫升"),
        ("一日0.51.5g", "一日0.5～1.5g"),
        ("一次9一15粒", "一次9～15粒"),
        (
            "一次500.000～1.000.000单位一日2.000.000～4.000.000单位",
            "一次50万～100万单位一日200万～400万单位",
        ),
        ("1OO万国际单位", "100万国际单位"),
        ("1.2.5毫克～5毫克/次", "2.5毫克～5毫克/次"),
        ("6一10周", "6～10周"),
        ("小于l岁", "小于1岁"),
        ("周岁以内", "小于1岁"),
        ("未满周岁", "小于1岁"),
        ("周岁或周岁以下", "小于等于1岁"),
        ("周岁", "1岁"),
        ("周岁以下", "小于1岁"),
        ("不满周岁", "小于1岁"),
        ("周岁以上", "大于1岁"),
        ("周岁内", "小于1岁"),
        ("３岁以下", "3岁以下"),
        ("６月至６岁的", "6月至6岁的"),
        ("低于lOkg", "低于10kg"),
        ("每次２片", "每次2片"),
        ("１５～４０ｍｇ", "15～40mg"),
        ("每次l片", "每次1片"),
        ("每次６～７片", "每次6～7片"),
        ("每次２～５ｇ", "每次2～5g"),
        ("每次１０ｍｌ", "每次10ml"),
        ("每次４～１０ｍｌ", "每次4～10ml"),
        ("每服３片", "每服3片"),
        ("每次4粒", "每次4粒"),
        ("每次l包", "每次1包"),
        ("１克", "1克"),
        ("每次１ｍｌ", "每次1ml"),
        ("每次０.３～１.０ｍｌ", "每次0.3～1.0ml"),
        ("每次２～６穴", "每次2～6穴"),
        ("每次２粒", "每次2粒"),
        ("５～２０ｇ", "5～20g"),
        ("每次l袋", "每次1袋"),
        ("每次lmg／公斤", "每次1mg/公斤"),
        ("２克/天", "2克/天"),
        ("每次１～２支", "每次1～2支"),
        ("―次", "1次"),
        ("每次５ｍｇ", "每次5mg"),
        ("每日３次", "每日3次"),
        ("每日―次", "每日1次"),
        ("分２～４次", "分2～4次"),
        ("每日最多服用-次", "每日最多服用1次"),
        ("每日－次", "每日1次"),
        ("分２次", "分2次"),
        ("每日服用―次", "每日服用1次"),
        ("１日３次", "1日3次"),
        ("分３次", "分3次"),
        ("分２～３次", "分2～3次"),
        ("每日１次", "每日1次"),
        ("２～４周１次", "2～4周1次"),
        ("每日或隔日１次", "每日或隔日1次"),
        ("每日２次", "每日2次"),
        ("每日l次", "每日1次"),
        ("５～７日", "5～7日"),
        ("３个月", "3个月"),
        ("４～６周", "4～6周"),
        ("４周", "4周"),
        ("１０日", "10日"),
        ("一次半岁1/4瓶", "一次0.25瓶"),
        ("一次1-2亳升（1-2支）", "一次1-2毫升（1-2支）"),
        ("2.2-6岁", "2-6岁"),
        ("1.1-18岁", "1-18岁"),
        ("7-lo日", "7-10日"),
        ("l/3", "1/3"),
        ("每次?40?万～?80?万单位", "每次40万～80万单位"),
    ]
    .into_iter()
    .collect()
});

/// "一" between two Arabic digits is a mistyped range dash (`0.8一1.6g`)
static DASH_TYPO: Lazy<Regex> =
    Lazy::new(|| Regex::new("([0-9])一([0-9])").expect("dash pattern is valid"));

/// Ordered token substitutions; earlier entries win over their suffixes
const SUBSTITUTIONS: [(&str, &str); 27] = [
    ("公斤", "kg"),
    ("千克", "kg"),
    ("千g", "kg"),
    ("毫克", "mg"),
    ("毫g", "mg"),
    ("微克", "μg"),
    ("微g", "μg"),
    ("克", "g"),
    ("毫升", "ml"),
    ("升", "l"),
    ("公分", "cm"),
    ("iu/m/天", "iu/m*m/d"),
    ("iu/m2/天", "iu/m*m/d"),
    ("mg/m2", "mg/m*m"),
    ("一次每kg", "kg/次"),
    ("一半", "0.5"),
    ("半", "0.5"),
    ("/次", "/一次"),
    ("每次", "一次"),
    ("/日", "/一日"),
    ("每日", "一日"),
    ("/天", "/一天"),
    ("每天", "一天"),
    ("每周", "一周"),
    ("每月", "一月"),
    ("每小时", "一小时"),
    ("每分钟", "一分钟"),
];

/// Fold full-width digits, letters, `．` and `／`; other full-width
/// punctuation (`，`, `～`, `（`) is kept as written
fn fold_full_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' | '．' | '／' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

fn rewrite_once(text: &str) -> String {
    let corrected = CORRECTIONS.get(text).copied().unwrap_or(text);

    let folded = fold_full_width(corrected);
    let mut rewritten = DASH_TYPO.replace_all(&folded, "${1}～${2}").into_owned();
    for (from, to) in SUBSTITUTIONS {
        if rewritten.contains(from) {
            rewritten = rewritten.replace(from, to);
        }
    }

    rewritten.to_lowercase()
}

/// Canonicalize raw numeric-entity text
pub fn canonicalize(text: &str) -> String {
    let mut current = rewrite_once(text);
    for _ in 1..MAX_PASSES {
        let next = rewrite_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}
