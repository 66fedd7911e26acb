//! Timestamp normalization and date-time property rendering.

use std::fmt::Write as _;

use chrono::{
    DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::outline::{Repeater, RepeaterUnit, TimePoint, Timestamp};

/// Hours added to a timed point event when no default duration is set.
const POINT_EVENT_HOURS: i64 = 2;

const UTC_FORMAT: &str = ":%Y%m%dT%H%M%SZ";
const DATE_FORMAT: &str = ";VALUE=DATE:%Y%m%d";

/// A normalized civil date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDateTime {
    pub datetime: NaiveDateTime,
    /// False for date-only timestamps.
    pub with_time: bool,
}

/// How a stamp's zone is expressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampZone<'a> {
    /// Configured `date_time_format`.
    Default,
    /// Converted to UTC with a trailing `Z`.
    Utc,
    /// `;TZID=<zone>:` prefix.
    Tzid(&'a str),
}

impl<'a> StampZone<'a> {
    /// Zone for an entry's TIMEZONE property.
    ///
    /// Names that cannot be a parameter value (DQUOTE or control
    /// characters) fall back to the configured format.
    pub fn for_property(tz: Option<&'a str>) -> Self {
        match tz.map(str::trim) {
            None | Some("") => StampZone::Default,
            Some("UTC") => StampZone::Utc,
            Some(tz) if tz.chars().any(|c| c == '"' || c.is_control()) => {
                tracing::debug!(timezone = %tz, "unusable TZID value, using the default zone");
                StampZone::Default
            }
            Some(tz) => StampZone::Tzid(tz),
        }
    }
}

/// A TZID parameter value, quoted when it holds `:`, `;` or `,`.
fn tzid_param(tz: &str) -> String {
    if tz.contains([':', ';', ',']) {
        tracing::debug!(timezone = %tz, "quoting TZID value");
        format!("\"{tz}\"")
    } else {
        tz.to_string()
    }
}

/// Timezone data resolved once per export.
#[derive(Debug, Clone)]
pub struct TimeSettings {
    /// Name substituted for `%Z` and written to X-WR-TIMEZONE.
    pub timezone_name: String,
    /// `None` means the system local zone.
    tz: Option<Tz>,
    date_time_format: String,
    format_is_utc: bool,
    default_duration: Option<u32>,
}

impl TimeSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        let timezone_name = config
            .timezone
            .clone()
            .or_else(|| iana_time_zone::get_timezone().ok())
            .unwrap_or_else(|| "UTC".to_string());
        let tz = timezone_name.parse::<Tz>().ok();
        if tz.is_none() {
            tracing::debug!(
                timezone = %timezone_name,
                "unknown zone name, converting with the system zone"
            );
        }

        TimeSettings {
            timezone_name,
            tz,
            date_time_format: config.date_time_format.clone(),
            format_is_utc: config.format_is_utc(),
            default_duration: config.default_appointment_duration,
        }
    }

    /// Interpret a civil date-time in the export zone and convert to UTC.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.tz {
            Some(tz) => local_to_utc(&tz, local),
            None => local_to_utc(&Local, local),
        }
    }

    /// Civil date-time of `now` in the export zone.
    pub fn to_local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match self.tz {
            Some(tz) => now.with_timezone(&tz).naive_local(),
            None => now.with_timezone(&Local).naive_local(),
        }
    }

    /// Render `KEYWORD<params>:<value>` for one side of a timestamp.
    pub fn render(
        &self,
        keyword: &str,
        ts: &Timestamp,
        want_end: bool,
        zone: StampZone<'_>,
    ) -> ExportResult<String> {
        let civil = normalize(ts, want_end, self.default_duration)?;
        Ok(format!("{keyword}{}", self.format_civil(civil, zone)?))
    }

    fn format_civil(&self, civil: CivilDateTime, zone: StampZone<'_>) -> ExportResult<String> {
        if zone == StampZone::Utc {
            return Ok(self.to_utc(civil.datetime).format(UTC_FORMAT).to_string());
        }
        if !civil.with_time {
            return Ok(civil.datetime.format(DATE_FORMAT).to_string());
        }
        if let StampZone::Tzid(tz) = zone {
            return Ok(format!(
                ";TZID={}{}",
                tzid_param(tz),
                civil.datetime.format(":%Y%m%dT%H%M%S")
            ));
        }

        let template = self
            .date_time_format
            .replace("%Z", &self.timezone_name.replace('%', "%%"));
        // Formatting fails when the template asks for data the value lacks
        let mut out = String::new();
        let written = if self.format_is_utc {
            write!(out, "{}", self.to_utc(civil.datetime).format(&template))
        } else {
            write!(out, "{}", civil.datetime.format(&template))
        };
        written.map_err(|_| {
            ExportError::Config(format!(
                "date_time_format '{}' cannot render a local date-time",
                self.date_time_format
            ))
        })?;
        Ok(out)
    }
}

fn local_to_utc<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Inside a DST gap: take the wall time an hour later.
        LocalResult::None => zone
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local)),
    }
}

/// DTSTAMP line for `now`.
pub fn dtstamp(now: DateTime<Utc>) -> String {
    format!("DTSTAMP{}", now.format(UTC_FORMAT))
}

/// Resolve a timestamp's start (or end) into a concrete civil date-time.
///
/// Date-only stamps sit at midnight; their end is the explicit end day, or
/// the day after the start. A timed stamp without an explicit range ends
/// after `default_duration` minutes, or two hours when none is configured.
pub fn normalize(
    ts: &Timestamp,
    want_end: bool,
    default_duration: Option<u32>,
) -> ExportResult<CivilDateTime> {
    let start = ts
        .start
        .ok_or_else(|| ExportError::InvalidInput(format!("timestamp {ts} has no start date")))?;
    let end = ts.end.unwrap_or(start);

    if !start.has_time() {
        let datetime = match (want_end, ts.end) {
            (false, _) => midnight(&start)?,
            (true, Some(end)) => midnight(&end)?,
            (true, None) => midnight(&start)? + Duration::days(1),
        };
        return Ok(CivilDateTime {
            datetime,
            with_time: false,
        });
    }

    if !want_end {
        return Ok(CivilDateTime {
            datetime: at_time(&start, hour(&start), minute(&start))?,
            with_time: true,
        });
    }

    let equal_bounds = end == start;
    // A range whose end lacks a time keeps the start's time.
    let (end_hour, end_minute) = if end.has_time() {
        (hour(&end), minute(&end))
    } else {
        (hour(&start), minute(&start))
    };

    let datetime = match (equal_bounds, default_duration) {
        (true, Some(duration)) => at_time(&end, end_hour, end_minute + i64::from(duration))?,
        (true, None) => at_time(&end, end_hour + POINT_EVENT_HOURS, end_minute)?,
        (false, _) => at_time(&end, end_hour, end_minute)?,
    };

    Ok(CivilDateTime {
        datetime,
        with_time: true,
    })
}

fn hour(p: &TimePoint) -> i64 {
    i64::from(p.hour.unwrap_or(0))
}

fn minute(p: &TimePoint) -> i64 {
    i64::from(p.minute.unwrap_or(0))
}

fn midnight(p: &TimePoint) -> ExportResult<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(p.year, p.month, p.day).ok_or_else(|| {
        ExportError::InvalidInput(format!(
            "impossible date {:04}-{:02}-{:02}",
            p.year, p.month, p.day
        ))
    })?;
    Ok(date.and_time(NaiveTime::MIN))
}

/// Midnight of `p` plus the given hours and minutes; overflow carries.
fn at_time(p: &TimePoint, hours: i64, minutes: i64) -> ExportResult<NaiveDateTime> {
    Ok(midnight(p)? + Duration::hours(hours) + Duration::minutes(minutes))
}

/// `RRULE:` line for a repeater, or `None` when the calendar cannot express it.
pub fn recurrence_rule(repeater: &Repeater) -> Option<String> {
    let freq = match repeater.unit {
        RepeaterUnit::Hour => "HOURLY",
        RepeaterUnit::Day => "DAILY",
        RepeaterUnit::Week => "WEEKLY",
        RepeaterUnit::Month => "MONTHLY",
        RepeaterUnit::Year => "YEARLY",
        RepeaterUnit::Unsupported => return None,
    };
    if repeater.value == 0 {
        return None;
    }
    Some(format!("RRULE:FREQ={freq};INTERVAL={}", repeater.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tz: &str, format: &str, duration: Option<u32>) -> TimeSettings {
        let config = ExportConfig {
            timezone: Some(tz.to_string()),
            date_time_format: format.to_string(),
            default_appointment_duration: duration,
            ..ExportConfig::default()
        };
        TimeSettings::from_config(&config)
    }

    fn plain() -> TimeSettings {
        settings("Europe/Paris", ":%Y%m%dT%H%M%S", None)
    }

    #[test]
    fn test_date_only_point() {
        let ts = Timestamp::date(2024, 3, 1);
        let s = plain();
        assert_eq!(
            s.render("DTSTART", &ts, false, StampZone::Default).unwrap(),
            "DTSTART;VALUE=DATE:20240301"
        );
        assert_eq!(
            s.render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND;VALUE=DATE:20240302"
        );
    }

    #[test]
    fn test_date_only_end_of_month_rolls_over() {
        let ts = Timestamp::date(2024, 2, 29);
        assert_eq!(
            plain().render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND;VALUE=DATE:20240301"
        );
    }

    #[test]
    fn test_date_only_range_uses_end_day() {
        let ts = Timestamp::date(2024, 3, 1).until(TimePoint::date(2024, 3, 3));
        assert_eq!(
            plain().render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND;VALUE=DATE:20240303"
        );
    }

    #[test]
    fn test_timed_point_defaults_to_two_hours() {
        let ts = Timestamp::at(2024, 3, 1, 9, 0);
        let s = plain();
        assert_eq!(
            s.render("DTSTART", &ts, false, StampZone::Default).unwrap(),
            "DTSTART:20240301T090000"
        );
        assert_eq!(
            s.render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND:20240301T110000"
        );
    }

    #[test]
    fn test_timed_point_with_default_duration_carries_minutes() {
        let ts = Timestamp::at(2024, 3, 1, 23, 30);
        let s = settings("Europe/Paris", ":%Y%m%dT%H%M%S", Some(45));
        assert_eq!(
            s.render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND:20240302T001500"
        );
    }

    #[test]
    fn test_timed_range_uses_explicit_end() {
        let ts = Timestamp::at(2024, 3, 1, 9, 0).until(TimePoint::at(2024, 3, 1, 10, 30));
        let s = settings("Europe/Paris", ":%Y%m%dT%H%M%S", Some(45));
        assert_eq!(
            s.render("DTEND", &ts, true, StampZone::Default).unwrap(),
            "DTEND:20240301T103000"
        );
    }

    #[test]
    fn test_minute_overflow_in_input() {
        let ts = Timestamp::at(2024, 3, 1, 9, 75);
        let civil = normalize(&ts, false, None).unwrap();
        assert_eq!(civil.datetime.format("%H:%M").to_string(), "10:15");
    }

    #[test]
    fn test_missing_start_is_invalid_input() {
        let mut ts = Timestamp::date(2024, 3, 1);
        ts.start = None;
        assert!(matches!(
            normalize(&ts, false, None),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_utc_zone_converts() {
        let ts = Timestamp::at(2024, 7, 1, 9, 0);
        assert_eq!(
            plain().render("DTSTART", &ts, false, StampZone::Utc).unwrap(),
            "DTSTART:20240701T070000Z"
        );
    }

    #[test]
    fn test_format_ending_in_z_converts() {
        let ts = Timestamp::at(2024, 1, 15, 9, 0);
        let s = settings("Europe/Paris", ":%Y%m%dT%H%M%SZ", None);
        assert_eq!(
            s.render("DTSTART", &ts, false, StampZone::Default).unwrap(),
            "DTSTART:20240115T080000Z"
        );
    }

    #[test]
    fn test_timezone_placeholder() {
        let ts = Timestamp::at(2024, 1, 15, 9, 0);
        let s = settings("Europe/Paris", ";TZID=%Z:%Y%m%dT%H%M%S", None);
        assert_eq!(
            s.render("DTSTART", &ts, false, StampZone::Default).unwrap(),
            "DTSTART;TZID=Europe/Paris:20240115T090000"
        );
    }

    #[test]
    fn test_tzid_zone_from_property() {
        let ts = Timestamp::at(2024, 1, 15, 9, 0);
        assert_eq!(
            plain()
                .render("DTSTART", &ts, false, StampZone::for_property(Some("America/New_York")))
                .unwrap(),
            "DTSTART;TZID=America/New_York:20240115T090000"
        );
        assert_eq!(StampZone::for_property(Some("UTC")), StampZone::Utc);
        assert_eq!(StampZone::for_property(None), StampZone::Default);
    }

    #[test]
    fn test_tzid_with_separators_is_quoted() {
        let ts = Timestamp::at(2024, 1, 15, 9, 0);
        assert_eq!(
            plain()
                .render("DTSTART", &ts, false, StampZone::for_property(Some("Odd;Zone:1")))
                .unwrap(),
            "DTSTART;TZID=\"Odd;Zone:1\":20240115T090000"
        );
        assert_eq!(
            StampZone::for_property(Some("Bad\"Zone")),
            StampZone::Default
        );
    }

    #[test]
    fn test_offset_in_local_format_is_an_error() {
        let ts = Timestamp::at(2024, 1, 15, 9, 0);
        let s = settings("Europe/Paris", ":%Y%m%dT%H%M%S%z", None);
        assert!(matches!(
            s.render("DTSTART", &ts, false, StampZone::Default),
            Err(ExportError::Config(_))
        ));
    }

    #[test]
    fn test_recurrence_rule() {
        let weekly = Repeater {
            unit: RepeaterUnit::Week,
            value: 2,
        };
        assert_eq!(
            recurrence_rule(&weekly).as_deref(),
            Some("RRULE:FREQ=WEEKLY;INTERVAL=2")
        );
        let odd = Repeater {
            unit: RepeaterUnit::Unsupported,
            value: 1,
        };
        assert_eq!(recurrence_rule(&odd), None);
    }

    #[test]
    fn test_dtstamp_is_utc() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 15, 4, 5).unwrap();
        assert_eq!(dtstamp(now), "DTSTAMP:20250320T150405Z");
    }
}
