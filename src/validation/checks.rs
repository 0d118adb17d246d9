//! Stateless cell checks.
//!
//! Every check treats the empty string as valid; required-ness is the rule
//! layer's concern. A check returns `None` on success or the failure message.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::codelist::{CodeList, CRS_CHANNEL_CODES};

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());
static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}$").unwrap());
static LONG_FRACTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\.\d{6})\d+").unwrap());

/// A single membership or format check on one cell value.
#[derive(Debug, Clone, Copy)]
pub enum Check {
    /// Strict `YYYY-MM-DD`.
    Date,
    /// ISO 8601 datetime; a plain date also passes.
    DateTime,
    Integer,
    Decimal,
    /// Membership in a code list.
    Code(&'static CodeList),
    /// Decimal between 0 and 100.
    Percentage,
    /// `0`, `1`, `true`, or `false`, case-insensitive.
    BooleanFlag,
    /// `http://` or `https://` prefix.
    Url,
    /// Three-letter uppercase ISO 4217 code.
    Currency,
    /// Two-letter lowercase ISO 639-1 code.
    Language,
    /// DAC CRS channel code.
    CrsChannel,
}

impl Check {
    /// Run the check; `None` means the value passed.
    pub fn apply(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match self {
            Check::Date => check_date(value),
            Check::DateTime => check_datetime(value),
            Check::Integer => value
                .parse::<i64>()
                .err()
                .map(|_| format!("Invalid integer '{value}'")),
            Check::Decimal => value
                .parse::<f64>()
                .err()
                .map(|_| format!("Invalid decimal number '{value}'")),
            Check::Code(list) => {
                if list.contains(value) {
                    None
                } else {
                    Some(format!(
                        "Invalid value '{value}' for {}. Valid values: {:?}",
                        list.name, list.codes
                    ))
                }
            }
            Check::Percentage => match value.parse::<f64>() {
                Err(_) => Some(format!("Invalid percentage '{value}', expected a number")),
                Ok(n) if !(0.0..=100.0).contains(&n) => {
                    Some(format!("Percentage '{value}' is out of range 0-100"))
                }
                Ok(_) => None,
            },
            Check::BooleanFlag => {
                if matches!(value.to_lowercase().as_str(), "0" | "1" | "true" | "false") {
                    None
                } else {
                    Some(format!(
                        "Invalid boolean flag '{value}', expected 0, 1, true, or false"
                    ))
                }
            }
            Check::Url => {
                if value.starts_with("http://") || value.starts_with("https://") {
                    None
                } else {
                    Some(format!(
                        "Invalid URL '{value}', must start with http:// or https://"
                    ))
                }
            }
            Check::Currency => {
                if CURRENCY_RE.is_match(value) {
                    None
                } else {
                    Some(format!(
                        "Invalid currency code '{value}', expected 3-letter uppercase code"
                    ))
                }
            }
            Check::Language => {
                if LANGUAGE_RE.is_match(value) {
                    None
                } else {
                    Some(format!(
                        "Invalid language code '{value}', expected 2-letter lowercase code"
                    ))
                }
            }
            Check::CrsChannel => {
                if CRS_CHANNEL_CODES.contains(value) {
                    None
                } else {
                    Some(format!("Invalid CRS channel code '{value}'"))
                }
            }
        }
    }
}

fn check_date(value: &str) -> Option<String> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(_) => None,
        Err(_) => Some(format!("Invalid date format '{value}', expected YYYY-MM-DD")),
    }
}

fn check_datetime(value: &str) -> Option<String> {
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return None;
    }
    // Normalize the trailing Z and over-long fractional seconds before the
    // format attempts.
    let normalized = value.replace('Z', "+00:00");
    let normalized = LONG_FRACTION_RE.replace(&normalized, "$1");

    if DateTime::parse_from_rfc3339(&normalized).is_ok() {
        return None;
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if NaiveDateTime::parse_from_str(&normalized, format).is_ok() {
            return None;
        }
    }
    Some(format!("Invalid datetime format '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::codelist::{ACTIVITY_STATUS, BUDGET_TYPE, TRANSACTION_TYPE};

    #[test]
    fn test_date() {
        assert_eq!(Check::Date.apply("2024-01-15"), None);
        assert_eq!(Check::Date.apply(""), None);
        assert!(Check::Date.apply("15-01-2024").is_some());
        assert!(Check::Date.apply("2024-13-01").is_some());
        assert!(Check::Date.apply("2024").is_some());
        assert_eq!(
            Check::Date.apply("nope").unwrap(),
            "Invalid date format 'nope', expected YYYY-MM-DD"
        );
    }

    #[test]
    fn test_datetime() {
        assert_eq!(Check::DateTime.apply("2024-01-15"), None);
        assert_eq!(Check::DateTime.apply("2024-01-15T10:30:00Z"), None);
        assert_eq!(Check::DateTime.apply("2024-01-15T10:30:00+05:00"), None);
        assert_eq!(Check::DateTime.apply("2024-01-15T10:30:00"), None);
        assert_eq!(Check::DateTime.apply("2024-01-15T10:30:00.1234567890Z"), None);
        assert_eq!(
            Check::DateTime.apply("not-a-date").unwrap(),
            "Invalid datetime format 'not-a-date'"
        );
    }

    #[test]
    fn test_integer_and_decimal() {
        assert_eq!(Check::Integer.apply("42"), None);
        assert_eq!(Check::Integer.apply("-1"), None);
        assert!(Check::Integer.apply("3.14").is_some());
        assert!(Check::Integer.apply("abc").is_some());
        assert_eq!(Check::Decimal.apply("3.14"), None);
        assert_eq!(Check::Decimal.apply("-100.5"), None);
        assert_eq!(
            Check::Decimal.apply("abc").unwrap(),
            "Invalid decimal number 'abc'"
        );
    }

    #[test]
    fn test_code_membership() {
        assert_eq!(Check::Code(&ACTIVITY_STATUS).apply("2"), None);
        assert!(Check::Code(&ACTIVITY_STATUS).apply("99").is_some());
        assert_eq!(Check::Code(&BUDGET_TYPE).apply("1"), None);
        assert!(Check::Code(&BUDGET_TYPE).apply("Z").is_some());
        assert_eq!(Check::Code(&TRANSACTION_TYPE).apply("3"), None);
        let message = Check::Code(&ACTIVITY_STATUS).apply("99").unwrap();
        assert!(message.starts_with("Invalid value '99' for ActivityStatus."));
        assert!(message.contains("Valid values:"));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(Check::Percentage.apply("0"), None);
        assert_eq!(Check::Percentage.apply("100"), None);
        assert_eq!(Check::Percentage.apply("54.5"), None);
        assert_eq!(
            Check::Percentage.apply("101").unwrap(),
            "Percentage '101' is out of range 0-100"
        );
        assert_eq!(
            Check::Percentage.apply("-1").unwrap(),
            "Percentage '-1' is out of range 0-100"
        );
        assert_eq!(
            Check::Percentage.apply("abc").unwrap(),
            "Invalid percentage 'abc', expected a number"
        );
    }

    #[test]
    fn test_boolean_flag() {
        for ok in ["0", "1", "true", "false", "TRUE", "False"] {
            assert_eq!(Check::BooleanFlag.apply(ok), None, "{ok}");
        }
        assert_eq!(
            Check::BooleanFlag.apply("yes").unwrap(),
            "Invalid boolean flag 'yes', expected 0, 1, true, or false"
        );
    }

    #[test]
    fn test_url() {
        assert_eq!(Check::Url.apply("http://example.org"), None);
        assert_eq!(Check::Url.apply("https://example.org/x.pdf"), None);
        assert!(Check::Url.apply("ftp://example.org").is_some());
        assert!(Check::Url.apply("example.org").is_some());
    }

    #[test]
    fn test_currency_and_language() {
        assert_eq!(Check::Currency.apply("USD"), None);
        assert!(Check::Currency.apply("usd").is_some());
        assert!(Check::Currency.apply("US").is_some());
        assert_eq!(Check::Language.apply("en"), None);
        assert!(Check::Language.apply("EN").is_some());
        assert!(Check::Language.apply("eng").is_some());
    }

    #[test]
    fn test_crs_channel() {
        assert_eq!(Check::CrsChannel.apply("46002"), None);
        assert_eq!(
            Check::CrsChannel.apply("99999").unwrap(),
            "Invalid CRS channel code '99999'"
        );
    }
}
