use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse a timestamp in any of the formats seen in telemetry exports and
/// query strings. Values without an offset are taken as UTC.
///
/// Accepted, in order: RFC 3339, naive ISO 8601 date-time (`T` or space
/// separated, optional fractional seconds), plain `YYYY-MM-DD` (midnight UTC),
/// integer Unix seconds.
pub fn parse_flexible_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }

    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

pub(crate) fn deserialize_flexible_timestamp<'de, D>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid timestamp format '{raw}': expected RFC3339, ISO8601, date or Unix timestamp"
        ))
    })
}

pub(crate) fn deserialize_optional_flexible_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_flexible_timestamp(&value).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid timestamp format '{value}'"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_flexible_timestamp("2023-02-06T01:01:01.001Z").unwrap();
        assert_eq!(
            dt,
            Utc.with_ymd_and_hms(2023, 2, 6, 1, 1, 1).unwrap() + chrono::Duration::milliseconds(1)
        );

        let offset = parse_flexible_timestamp("2023-02-06T03:00:00+02:00").unwrap();
        assert_eq!(offset, Utc.with_ymd_and_hms(2023, 2, 6, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_datetime_as_utc() {
        assert_eq!(
            parse_flexible_timestamp("2023-02-06T10:20:30").unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 6, 10, 20, 30).unwrap()
        );
        assert_eq!(
            parse_flexible_timestamp("2023-02-06 10:20:30").unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 6, 10, 20, 30).unwrap()
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight_utc() {
        assert_eq!(
            parse_flexible_timestamp("2023-01-06").unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 6, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_unix_seconds() {
        assert_eq!(
            parse_flexible_timestamp("1672531200").unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_flexible_timestamp("").is_none());
        assert!(parse_flexible_timestamp("   ").is_none());
        assert!(parse_flexible_timestamp("yesterday").is_none());
        assert!(parse_flexible_timestamp("2023-13-01").is_none());
    }
}
