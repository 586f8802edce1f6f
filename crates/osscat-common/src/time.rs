//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Shared primitives and utilities for the catalog runtime."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
//! Timestamp codec for the relational store.
//!
//! Timestamps are persisted as fixed-width RFC 3339 UTC text with microsecond
//! precision (`2024-05-01T09:30:00.000000Z`), so that lexical comparison in
//! SQL matches chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Current wall-clock time truncated to the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Smallest stored-precision instant not earlier than `ts`.
///
/// Use for inclusive lower bounds; [`to_db`] alone truncates, which would
/// widen a lower bound by up to 999ns.
pub fn ceil_micros(ts: &DateTime<Utc>) -> DateTime<Utc> {
    let truncated = ts.trunc_subsecs(6);
    if truncated == *ts {
        truncated
    } else {
        truncated + chrono::Duration::microseconds(1)
    }
}

/// Render a timestamp in the stored text form. Sub-microsecond digits are dropped.
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS[.f]`
/// form SQLite's own date functions emit (interpreted as UTC).
pub fn from_db(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stored_form_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(to_db(&whole), "2024-05-01T09:30:00.000000Z");
        let later = whole + chrono::Duration::microseconds(1500);
        assert_eq!(to_db(&later), "2024-05-01T09:30:00.001500Z");
        assert!(to_db(&whole) < to_db(&later));
    }

    #[test]
    fn parses_both_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(from_db("2024-05-01T09:30:00.000000Z").unwrap(), expected);
        assert_eq!(from_db("2024-05-01T11:30:00+02:00").unwrap(), expected);
        assert_eq!(from_db("2024-05-01 09:30:00").unwrap(), expected);
        assert!(from_db("yesterday").is_err());
    }

    #[test]
    fn lower_bounds_round_up_to_the_next_microsecond() {
        let whole = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(ceil_micros(&whole), whole);
        let nanos = whole + chrono::Duration::nanoseconds(500);
        assert_eq!(to_db(&ceil_micros(&nanos)), "2024-05-01T09:30:00.000001Z");
        assert_eq!(to_db(&nanos), "2024-05-01T09:30:00.000000Z");
        let micros = whole + chrono::Duration::microseconds(7);
        assert_eq!(ceil_micros(&micros), micros);
    }

    #[test]
    fn now_round_trips_exactly() {
        let ts = now();
        assert_eq!(from_db(&to_db(&ts)).unwrap(), ts);
    }
}
