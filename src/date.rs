//! Heuristic date detection for inbound payloads.
//!
//! Whether a string becomes a date is decided by the key it sits under, not by
//! its content: a well-formed timestamp under `name` stays a string, and a
//! malformed one under `time_created` stays a string too.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};

use crate::tree::Scalar;

/// Substrings that mark a key as temporal, matched case-insensitively.
const TEMPORAL_MARKERS: &[&str] = &["time", "date", "expir"];

/// Suffix for `created_at` style keys.
const TEMPORAL_SUFFIX: &str = "_at";

/// Returns `true` if values under `key` should be considered for date parsing.
///
/// # Examples
///
/// ```
/// use wirecall::date::is_temporal_key;
///
/// assert!(is_temporal_key("time_created"));
/// assert!(is_temporal_key("expiration"));
/// assert!(is_temporal_key("updated_at"));
/// assert!(!is_temporal_key("name"));
/// ```
pub fn is_temporal_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.ends_with(TEMPORAL_SUFFIX) || TEMPORAL_MARKERS.iter().any(|m| key.contains(m))
}

/// Parses an ISO-8601 timestamp, truncated to millisecond precision.
///
/// Accepted forms:
/// - RFC 3339 with `Z` or a numeric offset, with any number of fractional digits
/// - date and time without an offset, read as UTC
/// - a bare `YYYY-MM-DD`, read as midnight UTC
///
/// A JavaScript `Date` reads an offset-less date-time as local time. Here it is
/// always UTC, so the result does not depend on the host's time zone.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;
    Some(parsed.trunc_subsecs(3))
}

/// Turns a string scalar under a temporal key into a date when it parses.
///
/// Anything else, including unparsable strings, comes back unchanged.
pub fn maybe_parse(key: &str, value: Scalar) -> Scalar {
    match value {
        Scalar::String(s) if is_temporal_key(key) => match parse_timestamp(&s) {
            Some(date) => Scalar::Date(date),
            None => Scalar::String(s),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 10, 5, 14, 48, 0).unwrap()
    }

    #[test]
    fn test_temporal_keys() {
        for key in [
            "time_created",
            "timeCreated",
            "timestamp",
            "expiration",
            "expires",
            "start_date",
            "created_at",
            "LAST_UPDATED_AT",
        ] {
            assert!(is_temporal_key(key), "{key} should be temporal");
        }
        for key in ["name", "org_id", "message", "count"] {
            assert!(!is_temporal_key(key), "{key} should not be temporal");
        }
    }

    #[test]
    fn test_fractional_seconds_of_any_length() {
        let cases = [
            ("2023-10-05T14:48:00Z", 0),
            ("2023-10-05T14:48:00.1Z", 100),
            ("2023-10-05T14:48:00.12Z", 120),
            ("2023-10-05T14:48:00.123Z", 123),
            ("2023-10-05T14:48:00.123456Z", 123),
            ("2023-10-05T14:48:00.123456789Z", 123),
            ("2023-10-05T14:48:00.123456789012345Z", 123),
        ];
        for (input, millis) in cases {
            let parsed = parse_timestamp(input).unwrap_or_else(|| panic!("{input} failed"));
            assert_eq!(parsed.with_nanosecond(0).unwrap(), expected(), "{input}");
            assert_eq!(parsed.timestamp_subsec_millis(), millis, "{input}");
            assert_eq!(parsed.timestamp_subsec_nanos() % 1_000_000, 0, "{input}");
        }
    }

    #[test]
    fn test_offsets_and_naive_forms() {
        assert_eq!(parse_timestamp("2023-10-05T16:48:00+02:00"), Some(expected()));
        assert_eq!(parse_timestamp("2023-10-05T14:48:00"), Some(expected()));
        assert_eq!(
            parse_timestamp("2023-10-05"),
            Some(Utc.with_ymd_and_hms(2023, 10, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_maybe_parse_requires_temporal_key() {
        let raw = "2023-10-05T14:48:00.000Z".to_string();

        assert_eq!(
            maybe_parse("time_created", Scalar::String(raw.clone())),
            Scalar::Date(expected())
        );
        assert_eq!(
            maybe_parse("description", Scalar::String(raw.clone())),
            Scalar::String(raw)
        );
    }

    #[test]
    fn test_unparsable_value_is_left_alone() {
        let value = Scalar::String("not a date".to_string());
        assert_eq!(maybe_parse("expiration", value.clone()), value);
        assert_eq!(maybe_parse("expiration", Scalar::Bool(true)), Scalar::Bool(true));
    }
}
