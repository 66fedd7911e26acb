//! Diary expressions rendered as recurring VEVENTs.
//!
//! Only the date functions that map onto a single RRULE are understood:
//! `diary-anniversary`, `diary-cyclic`, `diary-block` and `diary-date`.
//! Anything else is reported as [`ExportError::DiaryExpression`].

use chrono::Datelike;

use crate::config::DiaryDateStyle;
use crate::context::ExportContext;
use crate::error::{ExportError, ExportResult};
use crate::ics::text::{escape, fold};
use crate::ics::time::{StampZone, dtstamp, recurrence_rule};
use crate::outline::{Repeater, RepeaterUnit, TimePoint, Timestamp, TimestampKind};

/// Turns one diary expression into complete, folded VEVENT text.
pub trait DiaryRenderer: Send + Sync {
    fn render(
        &self,
        cx: &ExportContext,
        expression: &str,
        uid: &str,
        summary: &str,
    ) -> ExportResult<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SexpDiaryRenderer;

impl DiaryRenderer for SexpDiaryRenderer {
    fn render(
        &self,
        cx: &ExportContext,
        expression: &str,
        uid: &str,
        summary: &str,
    ) -> ExportResult<String> {
        let parsed = parse(expression)?;
        let current_year = cx.local_now().year();
        let ts = parsed.to_timestamp(cx.config.diary_date_style, current_year)?;
        let summary = if parsed.text.is_empty() {
            summary
        } else {
            parsed.text
        };

        let mut lines = vec![
            "BEGIN:VEVENT".to_string(),
            dtstamp(cx.now),
            format!("UID:{uid}"),
            cx.time.render("DTSTART", &ts, false, StampZone::Default)?,
            cx.time.render("DTEND", &ts, true, StampZone::Default)?,
        ];
        if let Some(rule) = ts.repeater.as_ref().and_then(recurrence_rule) {
            lines.push(rule);
        }
        lines.push(format!("SUMMARY:{}", escape(summary)));
        lines.push("END:VEVENT".to_string());

        let mut text = fold(&lines.join("\n"));
        text.push('\n');
        Ok(text)
    }
}

type Clock = (u32, u32);

#[derive(Debug, PartialEq, Eq)]
struct ParsedDiary<'a> {
    function: &'a str,
    args: Vec<&'a str>,
    start_time: Option<Clock>,
    end_time: Option<Clock>,
    text: &'a str,
}

fn parse(expression: &str) -> ExportResult<ParsedDiary<'_>> {
    let trimmed = expression.trim();
    let (bracketed, expr) = match trimmed.strip_prefix('<') {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let body = expr.strip_prefix("%%(").ok_or_else(|| {
        ExportError::DiaryExpression(format!("not a diary expression: {expression}"))
    })?;

    let mut depth = 1;
    let mut close = None;
    for (idx, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close.ok_or_else(|| {
        ExportError::DiaryExpression(format!("unbalanced parentheses: {expression}"))
    })?;

    let mut tokens = body[..close].split_whitespace();
    let function = tokens.next().ok_or_else(|| {
        ExportError::DiaryExpression(format!("empty diary expression: {expression}"))
    })?;
    let args = tokens.collect();

    // `<%%(...) 09:00> text`: the annotation may sit inside or after the brackets
    let rest = &body[close + 1..];
    let (inside, outside) = if bracketed {
        rest.split_once('>').unwrap_or((rest, ""))
    } else {
        ("", rest)
    };
    let (inside_times, inside_text) = split_clock(inside);
    let (outside_times, outside_text) = split_clock(outside);
    let (start_time, end_time) = inside_times.or(outside_times).unwrap_or_default();
    let text = if outside_text.is_empty() {
        inside_text
    } else {
        outside_text
    };

    Ok(ParsedDiary {
        function,
        args,
        start_time,
        end_time,
        text,
    })
}

/// Leading `HH:MM[-HH:MM]` of `s` and the text after it.
fn split_clock(s: &str) -> (Option<(Option<Clock>, Option<Clock>)>, &str) {
    let s = s.trim();
    let Some(first) = s.split_whitespace().next() else {
        return (None, s);
    };
    let (from, to) = match first.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (first, None),
    };
    match parse_clock(from) {
        Some(from) => (
            Some((Some(from), to.and_then(parse_clock))),
            s[first.len()..].trim(),
        ),
        None => (None, s),
    }
}

fn parse_clock(s: &str) -> Option<Clock> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some((h, m))
}

/// One date argument: a number or the `t` wildcard.
fn date_part(arg: Option<&&str>) -> ExportResult<Option<i64>> {
    match arg.copied() {
        None | Some("t") => Ok(None),
        Some(a) => a
            .parse()
            .map(Some)
            .map_err(|_| ExportError::DiaryExpression(format!("bad date argument '{a}'"))),
    }
}

/// (year, month, day) from three arguments in the configured order.
fn date_triple(
    style: DiaryDateStyle,
    args: &[&str],
) -> ExportResult<(Option<i64>, Option<i64>, Option<i64>)> {
    let a = date_part(args.first())?;
    let b = date_part(args.get(1))?;
    let c = date_part(args.get(2))?;
    Ok(match style {
        DiaryDateStyle::American => (c, a, b),
        DiaryDateStyle::European => (c, b, a),
        DiaryDateStyle::Iso => (a, b, c),
    })
}

impl ParsedDiary<'_> {
    fn point(
        &self,
        year: i64,
        month: i64,
        day: i64,
        clock: Option<Clock>,
    ) -> ExportResult<TimePoint> {
        let parts = (
            i32::try_from(year),
            u32::try_from(month),
            u32::try_from(day),
        );
        let (year, month, day) = match parts {
            (Ok(y), Ok(m), Ok(d)) => (y, m, d),
            _ => {
                return Err(ExportError::DiaryExpression(format!(
                    "date out of range in {}",
                    self.function
                )));
            }
        };
        Ok(match clock {
            Some((h, m)) => TimePoint::at(year, month, day, h, m),
            None => TimePoint::date(year, month, day),
        })
    }

    fn full_date(
        &self,
        (year, month, day): (Option<i64>, Option<i64>, Option<i64>),
    ) -> ExportResult<(i64, i64, i64)> {
        match (year, month, day) {
            (Some(y), Some(m), Some(d)) => Ok((y, m, d)),
            _ => Err(ExportError::DiaryExpression(format!(
                "{} needs a complete date",
                self.function
            ))),
        }
    }

    fn to_timestamp(&self, style: DiaryDateStyle, current_year: i32) -> ExportResult<Timestamp> {
        let (start, end, repeater) = match self.function {
            "diary-anniversary" => {
                let (y, m, d) = self.full_date(date_triple(style, &self.args)?)?;
                let start = self.point(y, m, d, self.start_time)?;
                (start, self.same_day_end(start), Some(yearly()))
            }
            "diary-cyclic" => {
                let every: u32 = self
                    .args
                    .first()
                    .and_then(|n| n.parse().ok())
                    .filter(|&n| n > 0)
                    .ok_or_else(|| {
                        ExportError::DiaryExpression(
                            "diary-cyclic needs a positive interval".into(),
                        )
                    })?;
                let (y, m, d) = self.full_date(date_triple(style, &self.args[1..])?)?;
                let start = self.point(y, m, d, self.start_time)?;
                let repeater = Repeater {
                    unit: RepeaterUnit::Day,
                    value: every,
                };
                (start, self.same_day_end(start), Some(repeater))
            }
            "diary-block" => {
                if self.args.len() < 6 {
                    return Err(ExportError::DiaryExpression("diary-block needs two dates".into()));
                }
                let (y1, m1, d1) = self.full_date(date_triple(style, &self.args[..3])?)?;
                let (y2, m2, d2) = self.full_date(date_triple(style, &self.args[3..6])?)?;
                let start = self.point(y1, m1, d1, self.start_time)?;
                let end = self.point(y2, m2, d2, self.end_time.or(self.start_time))?;
                (start, Some(end), None)
            }
            "diary-date" => {
                let (year, month, day) = date_triple(style, &self.args)?;
                let (Some(m), Some(d)) = (month, day) else {
                    return Err(ExportError::DiaryExpression(
                        "diary-date with a month or day wildcard".into(),
                    ));
                };
                let (y, repeater) = match year {
                    Some(y) => (y, None),
                    None => (anchor_year(current_year, m, d), Some(yearly())),
                };
                let start = self.point(y, m, d, self.start_time)?;
                (start, self.same_day_end(start), repeater)
            }
            other => {
                return Err(ExportError::DiaryExpression(format!(
                    "unsupported diary function '{other}'"
                )));
            }
        };

        Ok(Timestamp {
            kind: TimestampKind::Active,
            start: Some(start),
            end,
            repeater,
            raw: None,
        })
    }

    /// Explicit `HH:MM-HH:MM` end on the start day.
    fn same_day_end(&self, start: TimePoint) -> Option<TimePoint> {
        let (h, m) = self.end_time?;
        start.has_time().then(|| TimePoint {
            hour: Some(h),
            minute: Some(m),
            ..start
        })
    }
}

/// Start year for a yearly `t` date. Feb 29 needs a leap year, so it
/// starts on the most recent one.
fn anchor_year(current_year: i32, month: i64, day: i64) -> i64 {
    let year = i64::from(current_year);
    if (month, day) != (2, 29) {
        return year;
    }
    (0..8)
        .map(|back| year - back)
        .find(|y| (y % 4 == 0 && y % 100 != 0) || y % 400 == 0)
        .unwrap_or(year)
}

fn yearly() -> Repeater {
    Repeater {
        unit: RepeaterUnit::Year,
        value: 1,
    }
}
