// ── Timestamp helpers ──
//
// List files written by older tool versions use Python-style ISO 8601
// timestamps with an explicit offset, sometimes without one, and both `null`
// and `""` for "never". Everything is normalised to UTC on load and written
// back with microsecond precision and a `+00:00` offset.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// The fallback for records that never stored a last-seen timestamp.
pub const EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Convert a TTL given in (fractional) hours.
///
/// Negative or non-finite input yields zero; absurdly large input saturates.
pub fn hours(hours: f64) -> TimeDelta {
    let secs = (hours * 3600.0).max(0.0);
    std::time::Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .unwrap_or(if secs > 0.0 { TimeDelta::MAX } else { TimeDelta::zero() })
}

/// `true` once `at + ttl` lies in the past relative to `now`.
pub fn is_expired(at: DateTime<Utc>, ttl: TimeDelta, now: DateTime<Utc>) -> bool {
    at.checked_add_signed(ttl).is_some_and(|deadline| now > deadline)
}

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

// ── serde adapters ──────────────────────────────────────────────────

pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(dt))
}

pub fn serialize_opt<S: Serializer>(
    dt: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match dt {
        Some(dt) => serializer.serialize_str(&format(dt)),
        None => serializer.serialize_none(),
    }
}

/// Required timestamp; a malformed value fails the record.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

/// `null` or `""` load as absent.
pub fn deserialize_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
    }
}

/// Absent or `null` loads as [`EPOCH`].
pub fn deserialize_or_epoch<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    Ok(deserialize_opt(deserializer)?.unwrap_or(EPOCH))
}

pub fn epoch() -> DateTime<Utc> {
    EPOCH
}
