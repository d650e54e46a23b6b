use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Calendar unit used to align interior chunk boundaries.
///
/// All boundaries are computed in UTC. Weeks run Monday 00:00:00.000 through
/// Sunday 23:59:59.999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Day,
    Week,
    #[default]
    Month,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown resolution '{0}', expected one of: day, week, month")]
pub struct ParseResolutionError(pub String);

impl Resolution {
    /// Resolve a raw query value, falling back to [`Resolution::Month`] when the
    /// value is missing or not one of the supported names.
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Day => "day",
            Resolution::Week => "week",
            Resolution::Month => "month",
        }
    }

    /// First calendar day of the unit containing `date`, clamped to the
    /// earliest representable date for the partial week at the calendar start.
    fn unit_first_day(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Resolution::Day => date,
            Resolution::Week => date
                .checked_sub_days(Days::new(date.weekday().num_days_from_monday() as u64))
                .unwrap_or(NaiveDate::MIN),
            Resolution::Month => date - Days::new(date.day0() as u64),
        }
    }

    /// First calendar day of the unit after the one containing `date`;
    /// `None` past the last representable date.
    fn next_first_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Resolution::Day => date.checked_add_days(Days::new(1)),
            Resolution::Week => date.checked_add_days(Days::new(
                7 - date.weekday().num_days_from_monday() as u64,
            )),
            Resolution::Month => self.unit_first_day(date).checked_add_months(Months::new(1)),
        }
    }

    /// 00:00:00.000 UTC of the unit containing `dt`.
    pub fn start_of_unit(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        midnight(self.unit_first_day(dt.date_naive()))
    }

    /// 23:59:59.999 UTC of the last day of the unit containing `dt`.
    pub fn end_of_unit(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_unit_start(dt)
            .map(|next| next - Duration::milliseconds(1))
    }

    /// Start of the unit immediately after the one containing `dt`.
    pub fn next_unit_start(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_first_day(dt.date_naive()).map(midnight)
    }

    /// Whether both instants fall in the same calendar unit.
    pub fn same_unit(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.unit_index(a) == self.unit_index(b)
    }

    /// Ordinal of the unit containing `dt`; consecutive units differ by one.
    pub fn unit_index(&self, dt: DateTime<Utc>) -> i64 {
        let date = dt.date_naive();
        let days = date.num_days_from_ce() as i64;
        match self {
            Resolution::Day => days,
            Resolution::Week => {
                (days - date.weekday().num_days_from_monday() as i64).div_euclid(7)
            }
            Resolution::Month => date.year() as i64 * 12 + date.month0() as i64,
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Resolution::Day),
            "week" => Ok(Resolution::Week),
            "month" => Ok(Resolution::Month),
            other => Err(ParseResolutionError(other.to_string())),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_from_query_defaults_to_month() {
        assert_eq!(Resolution::from_query(None), Resolution::Month);
        assert_eq!(Resolution::from_query(Some("year")), Resolution::Month);
        assert_eq!(Resolution::from_query(Some("WEEK")), Resolution::Month);
        assert_eq!(Resolution::from_query(Some("")), Resolution::Month);
    }

    #[test]
    fn test_from_query_accepts_known_values() {
        assert_eq!(Resolution::from_query(Some("day")), Resolution::Day);
        assert_eq!(Resolution::from_query(Some("week")), Resolution::Week);
        assert_eq!(Resolution::from_query(Some("month")), Resolution::Month);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "hourly".parse::<Resolution>().unwrap_err();
        assert_eq!(err, ParseResolutionError("hourly".to_string()));
        assert!(err.to_string().contains("hourly"));
    }

    #[test]
    fn test_day_boundaries() {
        let dt = utc("2023-02-08T01:01:01.001Z");
        assert_eq!(Resolution::Day.start_of_unit(dt), utc("2023-02-08T00:00:00.000Z"));
        assert_eq!(Resolution::Day.end_of_unit(dt), Some(utc("2023-02-08T23:59:59.999Z")));
        assert_eq!(Resolution::Day.next_unit_start(dt), Some(utc("2023-02-09T00:00:00.000Z")));
    }

    #[test]
    fn test_week_boundaries_monday_to_sunday() {
        // Wednesday
        let dt = utc("2023-02-01T01:01:01.001Z");
        assert_eq!(Resolution::Week.start_of_unit(dt), utc("2023-01-30T00:00:00.000Z"));
        assert_eq!(Resolution::Week.end_of_unit(dt), Some(utc("2023-02-05T23:59:59.999Z")));

        // Sunday belongs to the week that started the previous Monday
        let sunday = utc("2023-02-05T12:00:00Z");
        assert_eq!(Resolution::Week.start_of_unit(sunday), utc("2023-01-30T00:00:00Z"));

        // Monday starts its own week
        let monday = utc("2023-02-06T00:00:00Z");
        assert_eq!(Resolution::Week.start_of_unit(monday), monday);
    }

    #[test]
    fn test_month_boundaries_handle_lengths() {
        assert_eq!(
            Resolution::Month.end_of_unit(utc("2023-02-10T00:00:00Z")),
            Some(utc("2023-02-28T23:59:59.999Z"))
        );
        assert_eq!(
            Resolution::Month.end_of_unit(utc("2024-02-10T00:00:00Z")),
            Some(utc("2024-02-29T23:59:59.999Z"))
        );
        assert_eq!(
            Resolution::Month.end_of_unit(utc("2023-04-30T23:59:59Z")),
            Some(utc("2023-04-30T23:59:59.999Z"))
        );
        assert_eq!(
            Resolution::Month.end_of_unit(utc("2022-12-31T10:00:00Z")),
            Some(utc("2022-12-31T23:59:59.999Z"))
        );
        assert_eq!(
            Resolution::Month.next_unit_start(utc("2022-12-15T10:00:00Z")),
            Some(utc("2023-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_same_unit() {
        let a = utc("2024-03-05T01:01:01.001Z");
        let b = utc("2024-03-09T23:23:23.999Z");
        assert!(Resolution::Week.same_unit(a, b));
        assert!(Resolution::Month.same_unit(a, b));
        assert!(!Resolution::Day.same_unit(a, b));

        // Sunday and the following Monday are different weeks
        assert!(!Resolution::Week.same_unit(
            utc("2024-03-10T23:59:59.999Z"),
            utc("2024-03-11T00:00:00Z")
        ));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Resolution::Week).unwrap(), "\"week\"");
        let parsed: Resolution = serde_json::from_str("\"day\"").unwrap();
        assert_eq!(parsed, Resolution::Day);
        assert_eq!(Resolution::Month.to_string(), "month");
    }

    #[test]
    fn test_unit_index_is_consecutive() {
        let jan = utc("2022-12-31T23:59:59.999Z");
        let feb = utc("2023-01-01T00:00:00Z");
        assert_eq!(Resolution::Day.unit_index(feb) - Resolution::Day.unit_index(jan), 1);
        assert_eq!(Resolution::Month.unit_index(feb) - Resolution::Month.unit_index(jan), 1);

        // Saturday 2022-12-31 and Sunday 2023-01-01 share a week
        assert_eq!(Resolution::Week.unit_index(jan), Resolution::Week.unit_index(feb));
        assert_eq!(
            Resolution::Week.unit_index(utc("2023-01-02T00:00:00Z")) - Resolution::Week.unit_index(feb),
            1
        );
    }

    #[test]
    fn test_calendar_edges_do_not_overflow() {
        let min = DateTime::<Utc>::MIN_UTC;
        let max = DateTime::<Utc>::MAX_UTC;

        for resolution in [Resolution::Day, Resolution::Week, Resolution::Month] {
            assert!(resolution.start_of_unit(min) <= min);
            assert!(resolution.next_unit_start(min).is_some());
            assert!(resolution.same_unit(min, min));
            assert_eq!(resolution.next_unit_start(max), None);
            assert_eq!(resolution.end_of_unit(max), None);
        }
    }
}
