//! Timestamps and diary expressions as delivered by the outline parser.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampKind {
    Active,
    Inactive,
    /// `<%%(...)>` form: the date is computed by a diary expression.
    Diary,
}

/// A civil date with an optional time of day.
///
/// A point without `hour` is date-only. `minute` defaults to 0 when only the
/// hour is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePoint {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

impl TimePoint {
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        TimePoint {
            year,
            month,
            day,
            hour: None,
            minute: None,
        }
    }

    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        TimePoint {
            year,
            month,
            day,
            hour: Some(hour),
            minute: Some(minute),
        }
    }

    pub fn has_time(&self) -> bool {
        self.hour.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeaterUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
    /// Any unit the parser knows but the calendar cannot express.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeater {
    pub unit: RepeaterUnit,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub kind: TimestampKind,
    #[serde(default)]
    pub start: Option<TimePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeater: Option<Repeater>,
    /// Source text; required for diary timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Timestamp {
    /// Active date-only timestamp.
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self::from_point(TimePoint::date(year, month, day))
    }

    /// Active timestamp with a time of day.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self::from_point(TimePoint::at(year, month, day, hour, minute))
    }

    /// Diary timestamp such as `<%%(diary-float t 4 2)>`.
    pub fn diary(raw: &str) -> Self {
        Timestamp {
            kind: TimestampKind::Diary,
            start: None,
            end: None,
            repeater: None,
            raw: Some(raw.to_string()),
        }
    }

    fn from_point(start: TimePoint) -> Self {
        Timestamp {
            kind: TimestampKind::Active,
            start: Some(start),
            end: None,
            repeater: None,
            raw: None,
        }
    }

    pub fn until(mut self, end: TimePoint) -> Self {
        self.end = Some(end);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.kind = TimestampKind::Inactive;
        self
    }

    pub fn repeat(mut self, unit: RepeaterUnit, value: u32) -> Self {
        self.repeater = Some(Repeater { unit, value });
        self
    }

    pub fn is_diary(&self) -> bool {
        self.kind == TimestampKind::Diary
    }

    pub fn has_time(&self) -> bool {
        self.start.is_some_and(|p| p.has_time())
    }

    /// Diary expression text for diary timestamps.
    pub fn diary_expression(&self) -> Option<&str> {
        match self.kind {
            TimestampKind::Diary => self.raw.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            return f.write_str(raw);
        }
        let (open, close) = match self.kind {
            TimestampKind::Inactive => ('[', ']'),
            _ => ('<', '>'),
        };
        let Some(start) = self.start else {
            return write!(f, "{open}{close}");
        };

        write!(f, "{open}")?;
        write_point(f, &start)?;
        match self.end {
            Some(end)
                if end.year == start.year && end.month == start.month && end.day == start.day =>
            {
                if let (true, Some(h)) = (start.has_time(), end.hour) {
                    write!(f, "-{:02}:{:02}", h, end.minute.unwrap_or(0))?;
                }
                write_repeater(f, self.repeater)?;
                write!(f, "{close}")
            }
            Some(end) => {
                write_repeater(f, self.repeater)?;
                write!(f, "{close}--{open}")?;
                write_point(f, &end)?;
                write!(f, "{close}")
            }
            None => {
                write_repeater(f, self.repeater)?;
                write!(f, "{close}")
            }
        }
    }
}

fn write_point(f: &mut fmt::Formatter<'_>, p: &TimePoint) -> fmt::Result {
    write!(f, "{:04}-{:02}-{:02}", p.year, p.month, p.day)?;
    if let Some(h) = p.hour {
        write!(f, " {:02}:{:02}", h, p.minute.unwrap_or(0))?;
    }
    Ok(())
}

fn write_repeater(f: &mut fmt::Formatter<'_>, repeater: Option<Repeater>) -> fmt::Result {
    let Some(r) = repeater else { return Ok(()) };
    let unit = match r.unit {
        RepeaterUnit::Hour => 'h',
        RepeaterUnit::Day => 'd',
        RepeaterUnit::Week => 'w',
        RepeaterUnit::Month => 'm',
        RepeaterUnit::Year => 'y',
        RepeaterUnit::Unsupported => return Ok(()),
    };
    write!(f, " +{}{}", r.value, unit)
}

/// A diary expression found in an entry body, e.g.
/// `%%(diary-anniversary 10 31 1948) Arthur's birthday`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiaryExpression(pub String);

impl DiaryExpression {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
