//! Record extraction - turns a loosely typed settings record into the two
//! fields the agent cares about.
//!
//! Only `id` and `ring_time` are looked at. A record without a usable id,
//! or with either field holding something other than text, is malformed.
//! A null or absent `ring_time` means the alarm is disabled.

use bim_env::{AlarmId, AlarmRecord, RecordValue, Timestamp};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use thiserror::Error;

pub const ID_KEY: &str = "id";
pub const RING_TIME_KEY: &str = "ring_time";

/// Local date-time shapes accepted once the offset has been split off.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Why a record was skipped.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no alarm id")]
    MissingId,

    #[error("record has an empty alarm id")]
    EmptyId,

    #[error("field `{key}` has unexpected type {found}")]
    UnexpectedType { key: &'static str, found: &'static str },

    #[error("ring_time {value:?} of alarm {id} is not an ISO-8601 date-time: {source}")]
    UnparseableTime {
        id: AlarmId,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl RecordError {
    /// True for records whose shape is wrong (as opposed to a bad time).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, RecordError::UnparseableTime { .. })
    }
}

/// The recognized part of one alarm record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEntry<'a> {
    pub id: AlarmId,
    /// Raw ring time; `None` when the alarm is disabled.
    pub ring_time: Option<&'a str>,
}

impl AlarmEntry<'_> {
    /// Parses the ring time, if there is one.
    pub fn timestamp(&self) -> Option<Result<Timestamp, RecordError>> {
        self.ring_time.map(|raw| parse_ring_time(&self.id, raw))
    }
}

/// Pulls `id` and `ring_time` out of `record`, ignoring every other key.
pub fn extract(record: &AlarmRecord) -> Result<AlarmEntry<'_>, RecordError> {
    let id = extract_id(record)?;

    let ring_time = match record.get(RING_TIME_KEY) {
        None | Some(RecordValue::Null) => None,
        Some(RecordValue::Text(raw)) => Some(raw.as_str()),
        Some(other) => {
            return Err(RecordError::UnexpectedType {
                key: RING_TIME_KEY,
                found: other.kind(),
            })
        }
    };

    Ok(AlarmEntry { id, ring_time })
}

/// Pulls only the `id`, whatever shape `ring_time` has.
pub fn extract_id(record: &AlarmRecord) -> Result<AlarmId, RecordError> {
    match record.get(ID_KEY) {
        None | Some(RecordValue::Null) => Err(RecordError::MissingId),
        Some(RecordValue::Text(id)) => AlarmId::new(id.as_str()).ok_or(RecordError::EmptyId),
        Some(other) => Err(RecordError::UnexpectedType {
            key: ID_KEY,
            found: other.kind(),
        }),
    }
}

/// Parses an ISO-8601 date-time with an explicit offset into Unix seconds.
///
/// Both the extended (`2030-01-01T00:00:00Z`) and basic (`20300101T000000Z`)
/// forms are accepted, seconds may be omitted, and the offset may be `Z`,
/// `±hh`, `±hhmm` or `±hh:mm`. Fractional seconds are floored. Strings
/// without an offset are rejected.
pub fn parse_ring_time(id: &AlarmId, raw: &str) -> Result<Timestamp, RecordError> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .or_else(|source| parse_iso8601(trimmed).ok_or(source))
        .map(|datetime| datetime.timestamp())
        .map_err(|source| RecordError::UnparseableTime {
            id: id.clone(),
            value: raw.to_string(),
            source,
        })
}

fn parse_iso8601(raw: &str) -> Option<DateTime<FixedOffset>> {
    let (local, offset) = split_offset(raw)?;
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())?;
    offset.from_local_datetime(&naive).single()
}

/// Splits `raw` into its local part and the trailing UTC offset.
fn split_offset(raw: &str) -> Option<(&str, FixedOffset)> {
    if let Some(local) = raw.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return Some((local, FixedOffset::east_opt(0)?));
    }

    let time_start = raw.find(|c: char| c == 'T' || c == ' ')?;
    let sign_at = time_start + raw[time_start..].rfind(|c: char| c == '+' || c == '-')?;
    let (local, offset) = raw.split_at(sign_at);
    let sign = if offset.starts_with('-') { -1 } else { 1 };

    let body = &offset[1..];
    let (hours, minutes) = match body.len() {
        2 => (body, "00"),
        4 => (&body[..2], &body[2..]),
        5 if body.as_bytes()[2] == b':' => (&body[..2], &body[3..]),
        _ => return None,
    };
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    Some((local, FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> AlarmId {
        AlarmId::new(s).unwrap()
    }

    #[test]
    fn test_extract_enabled_alarm() {
        let record = AlarmRecord::alarm("a", Some("2030-01-01T00:00:00Z")).with("name", "Wake up");
        let entry = extract(&record).unwrap();

        assert_eq!(entry.id.as_str(), "a");
        assert_eq!(entry.ring_time, Some("2030-01-01T00:00:00Z"));
        assert_eq!(entry.timestamp().unwrap().unwrap(), 1893456000);
    }

    #[test]
    fn test_extract_disabled_alarm() {
        let record = AlarmRecord::alarm("a", None);
        let entry = extract(&record).unwrap();
        assert!(entry.ring_time.is_none());
        assert!(entry.timestamp().is_none());

        let record = AlarmRecord::new().with("id", "a").with("ring_time", RecordValue::Null);
        assert!(extract(&record).unwrap().ring_time.is_none());
    }

    #[test]
    fn test_extract_missing_or_empty_id() {
        let record = AlarmRecord::new().with("ring_time", "2030-01-01T00:00:00Z");
        assert!(matches!(extract(&record), Err(RecordError::MissingId)));

        let record = AlarmRecord::alarm("", Some("2030-01-01T00:00:00Z"));
        assert!(matches!(extract(&record), Err(RecordError::EmptyId)));
    }

    #[test]
    fn test_extract_unexpected_types() {
        let record = AlarmRecord::new().with("id", 42i64);
        let err = extract(&record).unwrap_err();
        assert!(err.is_malformed());
        assert!(matches!(err, RecordError::UnexpectedType { key: "id", found: "int" }));

        let record = AlarmRecord::new().with("id", "a").with("ring_time", true);
        assert!(matches!(
            extract(&record),
            Err(RecordError::UnexpectedType { key: "ring_time", found: "bool" })
        ));
    }

    #[test]
    fn test_parse_ring_time_offsets_and_fractions() {
        let a = id("a");
        assert_eq!(parse_ring_time(&a, "2030-01-01T00:00:10Z").unwrap(), 1893456010);
        assert_eq!(parse_ring_time(&a, "2030-01-01T01:00:00+01:00").unwrap(), 1893456000);
        assert_eq!(parse_ring_time(&a, "2030-01-01T00:00:00.999Z").unwrap(), 1893456000);
        assert_eq!(parse_ring_time(&a, "1969-12-31T23:59:59.5Z").unwrap(), -1);
    }

    #[test]
    fn test_parse_ring_time_iso8601_variants() {
        let a = id("a");
        for raw in [
            "20300101T000000Z",
            "20300101T0000Z",
            "2030-01-01T00:00Z",
            "2030-01-01 00:00:00Z",
            "2030-01-01T00:00:00+00",
            "2030-01-01T00:00:00+0000",
            "2030-01-01T05:00:00+05",
            "2030-01-01T05:30:00+0530",
            "2029-12-31T19:00:00-05:00",
            "20291231T190000-0500",
            "2030-01-01T00:00:00.75z",
            " 2030-01-01T00:00:00Z ",
        ] {
            assert_eq!(parse_ring_time(&a, raw).unwrap(), 1893456000, "{raw:?}");
        }
    }

    #[test]
    fn test_extract_id_ignores_ring_time_shape() {
        let record = AlarmRecord::new().with("id", "a").with("ring_time", 7i64);
        assert!(extract(&record).is_err());
        assert_eq!(extract_id(&record).unwrap().as_str(), "a");

        let record = AlarmRecord::new().with("id", 7i64);
        assert!(matches!(
            extract_id(&record),
            Err(RecordError::UnexpectedType { key: "id", .. })
        ));
    }

    #[test]
    fn test_parse_ring_time_rejects_garbage() {
        let a = id("c");
        for raw in [
            "not-a-date",
            "",
            "2030-01-01",
            "2030-01-01T00:00:00",
            "2030-13-01T00:00:00Z",
            "2030-01-01T00:00:00+5",
            "2030-01-01T00:00:00+05:0",
            "2030-01-01T00:00:00+a0",
            "2030-01-01TZ",
        ] {
            let err = parse_ring_time(&a, raw).unwrap_err();
            assert!(!err.is_malformed(), "{raw:?} should be a time error");
        }
    }
}
