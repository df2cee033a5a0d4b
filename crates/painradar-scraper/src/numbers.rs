//! Parsing of human-formatted counters such as `1.2K`, `3,5 млн` or `12 345`.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d[\d.,]*)(k|к|тыс\.?|m|м|млн\.?)?$").expect("valid number regex")
});

static COMMA_GROUPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(,\d{3})+$").expect("valid comma-group regex"));

static DOT_GROUPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{3}){2,}$").expect("valid dot-group regex"));

/// Parses an abbreviated, possibly grouped counter into an integer.
///
/// Accepts plain digits, `K`/`M` suffixes (Latin or Cyrillic, plus `тыс`/`млн`),
/// comma or space thousands separators and a decimal comma. Returns `None` for
/// anything else, including negative values.
#[must_use]
pub fn parse_abbreviated_number(text: &str) -> Option<u64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let compact = compact.strip_prefix('+').unwrap_or(&compact);
    let caps = NUMBER_RE.captures(compact)?;

    let multiplier = match caps.get(2).map(|m| m.as_str().trim_end_matches('.')) {
        None => 1.0,
        Some("k" | "к" | "тыс") => 1_000.0,
        Some("m" | "м" | "млн") => 1_000_000.0,
        Some(_) => return None,
    };

    let normalized = normalize_separators(&caps[1])?;
    let value: f64 = normalized.parse().ok()?;
    let scaled = (value * multiplier).round();
    #[allow(clippy::cast_precision_loss)]
    let in_range = scaled.is_finite() && scaled >= 0.0 && scaled <= u64::MAX as f64;
    if !in_range {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(scaled as u64)
}

/// Rewrites grouping and decimal separators into a plain `f64` literal.
fn normalize_separators(digits: &str) -> Option<String> {
    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();
    match (commas, dots) {
        (0, 0 | 1) => Some(digits.to_string()),
        (0, _) if DOT_GROUPS_RE.is_match(digits) => Some(digits.replace('.', "")),
        (0, _) => None,
        (_, 0) if COMMA_GROUPS_RE.is_match(digits) => Some(digits.replace(',', "")),
        (1, 0) => Some(digits.replace(',', ".")),
        (_, 0) => None,
        _ => {
            // Both present: whichever comes last is the decimal point.
            let last_comma = digits.rfind(',')?;
            let last_dot = digits.rfind('.')?;
            if last_dot > last_comma {
                Some(digits.replace(',', ""))
            } else {
                Some(digits.replace('.', "").replace(',', "."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_integer() {
        assert_eq!(parse_abbreviated_number("1234"), Some(1234));
        assert_eq!(parse_abbreviated_number("0"), Some(0));
    }

    #[test]
    fn thousands_suffix() {
        assert_eq!(parse_abbreviated_number("1.2K"), Some(1200));
        assert_eq!(parse_abbreviated_number("15k"), Some(15_000));
    }

    #[test]
    fn millions_suffix() {
        assert_eq!(parse_abbreviated_number("3.5M"), Some(3_500_000));
    }

    #[test]
    fn comma_and_space_groups() {
        assert_eq!(parse_abbreviated_number("1,234"), Some(1234));
        assert_eq!(parse_abbreviated_number("1,234,567"), Some(1_234_567));
        assert_eq!(parse_abbreviated_number("1 234"), Some(1234));
        assert_eq!(parse_abbreviated_number("12\u{a0}345"), Some(12_345));
        assert_eq!(parse_abbreviated_number("1\u{2009}000"), Some(1000));
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(parse_abbreviated_number("1,5K"), Some(1500));
        assert_eq!(parse_abbreviated_number("12,5"), Some(13));
    }

    #[test]
    fn cyrillic_suffixes() {
        assert_eq!(parse_abbreviated_number("12К"), Some(12_000));
        assert_eq!(parse_abbreviated_number("2,3 млн"), Some(2_300_000));
        assert_eq!(parse_abbreviated_number("4 тыс."), Some(4_000));
        assert_eq!(parse_abbreviated_number("1.1м"), Some(1_100_000));
    }

    #[test]
    fn mixed_separators() {
        assert_eq!(parse_abbreviated_number("1,234.5"), Some(1235));
        assert_eq!(parse_abbreviated_number("1.234,5"), Some(1235));
        assert_eq!(parse_abbreviated_number("1.234.567"), Some(1_234_567));
    }

    #[test]
    fn leading_plus_is_allowed() {
        assert_eq!(parse_abbreviated_number("+42"), Some(42));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_abbreviated_number("garbage"), None);
        assert_eq!(parse_abbreviated_number(""), None);
        assert_eq!(parse_abbreviated_number("K"), None);
        assert_eq!(parse_abbreviated_number("12 views"), None);
        assert_eq!(parse_abbreviated_number("1.2.3"), None);
    }

    #[test]
    fn negative_is_none() {
        assert_eq!(parse_abbreviated_number("-4"), None);
    }
}
