//! Time related utils.

use chrono::Utc;

use crate::{Error, Result};

/// The timestamp type used across signpost, always in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// The current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a timestamp into a date like `20220301`.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format a timestamp into ISO8601 basic format like `20220301T081234Z`.
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Split an ISO8601 basic timestamp into its `(date, time)` parts.
///
/// `20220301T081234Z` splits into `("20220301", "081234")`. The date part is
/// what signing scopes are built from, so a malformed timestamp must fail
/// here rather than produce a signature that can never verify.
pub fn split_iso8601(s: &str) -> Result<(&str, &str)> {
    let stripped = s
        .strip_suffix('Z')
        .ok_or_else(|| Error::request_invalid(format!("timestamp `{s}` does not end with `Z`")))?;
    stripped
        .split_once('T')
        .ok_or_else(|| Error::request_invalid(format!("timestamp `{s}` is missing the `T` separator")))
}

/// Parse a timestamp from RFC3339 format like `2022-03-01T08:12:34Z`.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|err| Error::unexpected(format!("`{s}` is not a valid rfc3339 timestamp")).with_source(err))?;
    Ok(t.with_timezone(&Utc))
}
