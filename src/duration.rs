use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::FormatError;

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: u64 = 7 * MILLIS_PER_DAY;
const MILLIS_PER_YEAR: u64 = 365 * MILLIS_PER_DAY;

static DURATION_REGEX: OnceLock<Regex> = OnceLock::new();

fn duration_regex() -> &'static Regex {
    DURATION_REGEX.get_or_init(|| {
        Regex::new(
            r"^(?:([0-9]+)y)?(?:([0-9]+)w)?(?:([0-9]+)d)?(?:([0-9]+)h)?(?:([0-9]+)m)?(?:([0-9]+)s)?(?:([0-9]+)ms)?$",
        )
        .expect("BUG: invalid duration regex")
    })
}

/// Parses a compound duration string such as `1h30m`, `2d12h` or `500ms`.
///
/// Components must appear in `y w d h m s ms` order and each may occur at
/// most once. The literal string `"0"` denotes a zero duration. A year is
/// 365 days, a week 7 days; resolution is one millisecond.
pub fn parse_duration(s: &str) -> Result<Duration, FormatError> {
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(FormatError(s.to_string()));
    }
    let caps = duration_regex()
        .captures(s)
        .ok_or_else(|| FormatError(s.to_string()))?;

    let units: [u64; 7] = [
        MILLIS_PER_YEAR,
        MILLIS_PER_WEEK,
        MILLIS_PER_DAY,
        MILLIS_PER_HOUR,
        MILLIS_PER_MINUTE,
        MILLIS_PER_SECOND,
        1,
    ];
    let mut total_ms: u64 = 0;
    for (i, unit) in units.iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            let n: u64 = m
                .as_str()
                .parse()
                .map_err(|_| FormatError(s.to_string()))?;
            total_ms = n
                .checked_mul(*unit)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(|| FormatError(s.to_string()))?;
        }
    }
    Ok(Duration::from_millis(total_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0", 0; "zero literal")]
    #[test_case("500ms", 500; "millis")]
    #[test_case("1s", 1_000; "seconds")]
    #[test_case("1m", 60_000; "minutes")]
    #[test_case("1h30m", 90 * 60_000; "hours and minutes")]
    #[test_case("2d12h", 60 * 3_600_000; "days and hours")]
    #[test_case("1w", 7 * 86_400_000; "week")]
    #[test_case("1y", 365 * 86_400_000; "year")]
    #[test_case("1y2w3d4h5m6s7ms",
        365 * 86_400_000 + 2 * 7 * 86_400_000 + 3 * 86_400_000
            + 4 * 3_600_000 + 5 * 60_000 + 6 * 1_000 + 7; "all components")]
    fn test_parse_duration_valid(input: &str, want_ms: u64) {
        let got = parse_duration(input).unwrap();
        assert_eq!(got, Duration::from_millis(want_ms), "input: {input}");
    }

    #[test_case(""; "empty")]
    #[test_case("1"; "missing unit")]
    #[test_case("-1s"; "negative")]
    #[test_case("1.5h"; "fractional")]
    #[test_case("1h 30m"; "inner space")]
    #[test_case("1m1h"; "wrong order")]
    #[test_case("1s1s"; "repeated component")]
    #[test_case("1x"; "unknown unit")]
    #[test_case("ms"; "unit without number")]
    #[test_case("999999999999999999999y"; "overflow")]
    fn test_parse_duration_invalid(input: &str) {
        let err = parse_duration(input).unwrap_err();
        assert_eq!(err, FormatError(input.to_string()));
    }
}
