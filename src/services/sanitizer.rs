//! Coordinate sanitization
//!
//! Turns whatever a device reported into a usable `f64`. Anything that is not
//! a finite, in-range number becomes `0.0`. A normalized value cannot be told
//! apart from a real reading of zero; callers that care should use
//! `sanitize_checked` and inspect the reason.

use crate::domain::event::RawCoordinate;

/// Placeholder tokens devices send instead of a reading (compared uppercased)
const SENTINELS: [&str; 6] = ["D$Q", "-", "N/A", "NULL", "NONE", "NAN"];

/// Currency-like symbols stripped from both ends of a string before parsing
const STRIP_SYMBOLS: [char; 6] = ['$', '€', '£', '¥', '¢', '₹'];

/// Coordinate axis. Each axis has its own valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Absolute bound of the valid range (inclusive)
    #[inline]
    pub fn limit(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }
}

/// Why a raw coordinate was replaced with `0.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Absent, null, or empty after trimming
    Missing,
    /// Known placeholder token
    Sentinel,
    /// Not a number
    Unparsable,
    /// Parsed to infinity or NaN
    NonFinite,
    /// Finite but outside the axis range
    OutOfRange(f64),
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Missing => "missing",
            Rejection::Sentinel => "sentinel",
            Rejection::Unparsable => "unparsable",
            Rejection::NonFinite => "non_finite",
            Rejection::OutOfRange(_) => "out_of_range",
        }
    }
}

/// Outcome of sanitizing one coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sanitized {
    Valid(f64),
    Normalized(Rejection),
}

impl Sanitized {
    /// The value to use downstream
    #[inline]
    pub fn value(&self) -> f64 {
        match self {
            Sanitized::Valid(v) => *v,
            Sanitized::Normalized(_) => 0.0,
        }
    }

    #[inline]
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Sanitized::Valid(_) => None,
            Sanitized::Normalized(reason) => Some(*reason),
        }
    }
}

/// Sanitize a raw coordinate to a float. Never fails.
#[inline]
pub fn sanitize(raw: Option<&RawCoordinate>, axis: Axis) -> f64 {
    sanitize_checked(raw, axis).value()
}

/// Sanitize a raw coordinate, reporting why it was normalized (if it was)
pub fn sanitize_checked(raw: Option<&RawCoordinate>, axis: Axis) -> Sanitized {
    let parsed = match raw {
        None => Err(Rejection::Missing),
        Some(RawCoordinate::Number(v)) => Ok(*v),
        Some(RawCoordinate::Text(s)) => parse_text(s),
        Some(RawCoordinate::Other(_)) => Err(Rejection::Unparsable),
    };

    match parsed.and_then(|v| check_range(v, axis)) {
        Ok(v) => Sanitized::Valid(v),
        Err(reason) => Sanitized::Normalized(reason),
    }
}

fn parse_text(raw: &str) -> Result<f64, Rejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Missing);
    }
    if is_sentinel(trimmed) {
        return Err(Rejection::Sentinel);
    }

    let stripped = trimmed.trim_matches(|c: char| STRIP_SYMBOLS.contains(&c) || c.is_whitespace());
    if stripped.is_empty() {
        return Err(Rejection::Missing);
    }

    stripped.parse::<f64>().map_err(|_| Rejection::Unparsable)
}

fn is_sentinel(token: &str) -> bool {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if is_dash(c) {
            return true;
        }
    }
    SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(token))
}

/// ASCII hyphen plus the unicode dash and minus variants
fn is_dash(c: char) -> bool {
    matches!(
        c,
        '-' | '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}'
    )
}

fn check_range(value: f64, axis: Axis) -> Result<f64, Rejection> {
    if !value.is_finite() {
        return Err(Rejection::NonFinite);
    }
    if value.abs() > axis.limit() {
        return Err(Rejection::OutOfRange(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCoordinate {
        RawCoordinate::Text(s.to_string())
    }

    fn lat(s: &str) -> f64 {
        sanitize(Some(&text(s)), Axis::Latitude)
    }

    fn lng(s: &str) -> f64 {
        sanitize(Some(&text(s)), Axis::Longitude)
    }

    #[test]
    fn test_valid_coordinates() {
        assert_eq!(lat("37.7749"), 37.7749);
        assert_eq!(lng("-122.4194"), -122.4194);
        assert_eq!(lat("0"), 0.0);
        assert_eq!(lat("45.0"), 45.0);
        assert_eq!(lat("  45.5  "), 45.5);
        assert_eq!(lat("+12.5"), 12.5);
    }

    #[test]
    fn test_sentinels_normalize_to_zero() {
        for token in ["D$Q", "d$q", "-", "", "   ", "NAN", "nan", "NONE", "None", "NULL", "N/A", "n/a"] {
            assert_eq!(lat(token), 0.0, "token {token:?}");
        }
    }

    #[test]
    fn test_unicode_dashes_are_sentinels() {
        for dash in ["\u{2010}", "\u{2013}", "\u{2014}", "\u{2212}", "\u{FF0D}"] {
            let result = sanitize_checked(Some(&text(dash)), Axis::Latitude);
            assert_eq!(result, Sanitized::Normalized(Rejection::Sentinel));
        }
    }

    #[test]
    fn test_missing_value() {
        assert_eq!(sanitize(None, Axis::Latitude), 0.0);
        assert_eq!(
            sanitize_checked(None, Axis::Longitude),
            Sanitized::Normalized(Rejection::Missing)
        );
    }

    #[test]
    fn test_unparsable() {
        assert_eq!(lat("abc"), 0.0);
        assert_eq!(lat("12.34.56"), 0.0);
        assert_eq!(
            sanitize_checked(Some(&text("abc")), Axis::Latitude),
            Sanitized::Normalized(Rejection::Unparsable)
        );
        let boolean = RawCoordinate::Other(serde_json::Value::Bool(true));
        assert_eq!(
            sanitize_checked(Some(&boolean), Axis::Latitude),
            Sanitized::Normalized(Rejection::Unparsable)
        );
    }

    #[test]
    fn test_currency_symbols_stripped() {
        assert_eq!(lat("$45.5"), 45.5);
        assert_eq!(lng("-122.41 €"), -122.41);
        assert_eq!(lat("$"), 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(
            sanitize_checked(Some(&text("inf")), Axis::Longitude),
            Sanitized::Normalized(Rejection::NonFinite)
        );
        assert_eq!(
            sanitize_checked(Some(&RawCoordinate::Number(f64::NAN)), Axis::Latitude),
            Sanitized::Normalized(Rejection::NonFinite)
        );
    }

    #[test]
    fn test_latitude_range_is_ninety() {
        assert_eq!(lat("200"), 0.0);
        assert_eq!(lat("90.5"), 0.0);
        assert_eq!(lat("-91"), 0.0);
        assert_eq!(lat("90"), 90.0);
        assert_eq!(lat("-90"), -90.0);
        assert_eq!(
            sanitize_checked(Some(&text("120")), Axis::Latitude),
            Sanitized::Normalized(Rejection::OutOfRange(120.0))
        );
    }

    #[test]
    fn test_longitude_range_is_one_eighty() {
        assert_eq!(lng("170"), 170.0);
        assert_eq!(lng("180"), 180.0);
        assert_eq!(lng("-180"), -180.0);
        assert_eq!(lng("200"), 0.0);
        assert_eq!(lng("-200"), 0.0);
    }

    #[test]
    fn test_numeric_input() {
        assert_eq!(sanitize(Some(&RawCoordinate::Number(37.78)), Axis::Latitude), 37.78);
        assert_eq!(sanitize(Some(&RawCoordinate::Number(95.0)), Axis::Latitude), 0.0);
        assert_eq!(sanitize(Some(&RawCoordinate::Number(95.0)), Axis::Longitude), 95.0);
    }
}
