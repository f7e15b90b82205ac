//! Numeral Extractor
//!
//! Finds maximal runs of Arabic digits, Chinese numerals (common and formal
//! forms) and decimal points, and converts each run to a value. Runs may mix
//! notations (`200万`, `1.5万`, `一千零五`). A run that does not form a
//! number is dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::span::{char_span, Span};

static NUMERAL_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[0-9零一二三四五六七八九十百千万亿壹贰叁肆伍陆柒捌玖拾佰仟两俩.]+")
        .expect("numeral pattern is valid")
});

/// A numeral found in canonical text
#[derive(Debug, Clone, PartialEq)]
pub struct Numeral {
    /// Span of the matched run, including stray decimal points
    pub span: Span,
    /// Run text with leading/trailing decimal points removed
    pub text: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    /// Arabic literal, possibly fractional
    Number(f64),
    /// Chinese digit 1-9
    Digit(f64),
    /// 零, a placeholder inside larger numbers
    Zero,
    /// 十 百 千 (and formal forms)
    Unit(f64),
    /// 万 亿
    Section(f64),
}

fn classify(c: char) -> Option<Token> {
    let token = match c {
        '零' => Token::Zero,
        '一' | '壹' => Token::Digit(1.0),
        '二' | '贰' | '两' | '俩' => Token::Digit(2.0),
        '三' | '叁' => Token::Digit(3.0),
        '四' | '肆' => Token::Digit(4.0),
        '五' | '伍' => Token::Digit(5.0),
        '六' | '陆' => Token::Digit(6.0),
        '七' | '柒' => Token::Digit(7.0),
        '八' | '捌' => Token::Digit(8.0),
        '九' | '玖' => Token::Digit(9.0),
        '十' | '拾' => Token::Unit(10.0),
        '百' | '佰' => Token::Unit(100.0),
        '千' | '仟' => Token::Unit(1_000.0),
        '万' => Token::Section(10_000.0),
        '亿' => Token::Section(100_000_000.0),
        _ => return None,
    };
    Some(token)
}

fn tokenize(run: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut arabic = String::new();

    for c in run.chars() {
        if c.is_ascii_digit() || c == '.' {
            arabic.push(c);
            continue;
        }
        if !arabic.is_empty() {
            tokens.push(Token::Number(arabic.parse().ok()?));
            arabic.clear();
        }
        tokens.push(classify(c)?);
    }
    if !arabic.is_empty() {
        tokens.push(Token::Number(arabic.parse().ok()?));
    }

    Some(tokens)
}

/// Convert a numeral run in Arabic, Chinese or mixed notation
pub fn parse_numeral(run: &str) -> Option<f64> {
    let tokens = tokenize(run)?;
    if tokens.is_empty() {
        return None;
    }

    let positional = tokens
        .iter()
        .any(|t| matches!(t, Token::Unit(_) | Token::Section(_)));
    if !positional {
        return parse_digit_sequence(&tokens);
    }

    let mut total = 0.0;
    let mut section = 0.0;
    let mut pending: Option<f64> = None;
    let mut previous: Option<Token> = None;
    let mut last_unit = 0.0;

    for &token in &tokens {
        match token {
            Token::Number(v) | Token::Digit(v) => {
                if pending.is_some() {
                    return None;
                }
                pending = Some(v);
            }
            Token::Zero => {
                if pending.is_some() {
                    return None;
                }
            }
            Token::Unit(unit) => {
                let n = pending.take().unwrap_or(1.0);
                section += n * unit;
                last_unit = unit;
            }
            Token::Section(unit) => {
                let mut base = section + pending.take().unwrap_or(0.0);
                if base == 0.0 && total == 0.0 {
                    base = 1.0;
                }
                if unit > 10_000.0 {
                    total = (total + base) * unit;
                } else {
                    total += base * unit;
                }
                section = 0.0;
                last_unit = unit;
            }
        }
        previous = Some(token);
    }

    // Tokens ended on a bare digit right after a unit: 一万五 = 15000
    let mut tail = 0.0;
    if let Some(n) = pending {
        let abbreviated = matches!(previous, Some(Token::Digit(_)))
            && tokens.len() >= 2
            && matches!(
                tokens[tokens.len() - 2],
                Token::Unit(_) | Token::Section(_)
            );
        tail = if abbreviated { n * last_unit / 10.0 } else { n };
    }

    Some(total + section + tail)
}

/// Runs without place-value characters: a single Arabic literal, or Chinese
/// digits read one by one (`一二` = 12)
fn parse_digit_sequence(tokens: &[Token]) -> Option<f64> {
    if let [Token::Number(v)] = tokens {
        return Some(*v);
    }
    tokens.iter().try_fold(0.0, |acc, t| match t {
        Token::Digit(d) => Some(acc * 10.0 + d),
        Token::Zero => Some(acc * 10.0),
        _ => None,
    })
}

/// Extract numerals from canonical text, in text order
pub fn extract_numerals(text: &str) -> Vec<Numeral> {
    NUMERAL_RUN
        .find_iter(text)
        .filter_map(|m| {
            let stripped = m.as_str().trim_matches('.');
            if stripped.is_empty() {
                return None;
            }
            let value = parse_numeral(stripped)?;
            Some(Numeral {
                span: char_span(text, m.start(), m.end()),
                text: stripped.to_string(),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arabic() {
        assert_eq!(parse_numeral("3"), Some(3.0));
        assert_eq!(parse_numeral("0.8"), Some(0.8));
        assert_eq!(parse_numeral("0.51.5"), None);
    }

    #[test]
    fn test_parse_chinese() {
        assert_eq!(parse_numeral("一"), Some(1.0));
        assert_eq!(parse_numeral("十二"), Some(12.0));
        assert_eq!(parse_numeral("二十五"), Some(25.0));
        assert_eq!(parse_numeral("一千零五"), Some(1005.0));
        assert_eq!(parse_numeral("一万五"), Some(15000.0));
        assert_eq!(parse_numeral("两"), Some(2.0));
        assert_eq!(parse_numeral("壹佰"), Some(100.0));
        assert_eq!(parse_numeral("一二"), Some(12.0));
        assert_eq!(parse_numeral("一亿二千万"), Some(120_000_000.0));
    }

    #[test]
    fn test_parse_mixed() {
        assert_eq!(parse_numeral("200万"), Some(2_000_000.0));
        assert_eq!(parse_numeral("1.5万"), Some(15_000.0));
        assert_eq!(parse_numeral("3五"), None);
        assert_eq!(parse_numeral("一.五"), None);
    }

    #[test]
    fn test_extract_in_text_order() {
        let numerals = extract_numerals("一日1次");
        assert_eq!(numerals.len(), 2);
        assert_eq!(numerals[0].span, Span::new(0, 1));
        assert_eq!(numerals[0].value, 1.0);
        assert_eq!(numerals[1].span, Span::new(2, 3));
        assert_eq!(numerals[1].value, 1.0);
    }

    #[test]
    fn test_stray_points_stripped() {
        let numerals = extract_numerals("约.5.片");
        assert_eq!(numerals.len(), 1);
        assert_eq!(numerals[0].text, "5");
        assert_eq!(numerals[0].span, Span::new(1, 4));
    }

    #[test]
    fn test_unparseable_runs_dropped() {
        assert!(extract_numerals("一日0.51.5g").iter().all(|n| n.text != "0.51.5"));
        assert!(extract_numerals("...").is_empty());
        assert!(extract_numerals("遵医嘱").is_empty());
    }
}
