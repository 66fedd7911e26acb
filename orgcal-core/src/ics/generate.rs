//! Calendar component generation (VEVENT, VTODO, VALARM).
//!
//! Builders return folded text blocks ending with a newline, ready to be
//! concatenated into a calendar body.

use crate::config::{DeadlineUse, ExportConfig, ScheduledUse};
use crate::context::ExportContext;
use crate::error::{ExportError, ExportResult};
use crate::ics::text::{escape, fold};
use crate::ics::time::{StampZone, dtstamp, recurrence_rule};
use crate::outline::{OutlineEntry, Timestamp, TodoState};

/// Descriptive fields shared by every component derived from one entry.
///
/// Text is raw; builders escape it. `categories` is already escaped and
/// comma-joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub summary: String,
    pub location: Option<String>,
    pub class: Option<String>,
    pub description: Option<String>,
    pub categories: String,
    pub timezone: Option<String>,
    pub warn_time: Option<u32>,
}

/// Generate a VEVENT for one timestamp of an entry.
///
/// Diary timestamps are handed to the context's diary renderer as is.
pub fn vevent(
    cx: &ExportContext,
    ts: &Timestamp,
    uid: &str,
    summary: &str,
    fields: &EntryFields,
) -> ExportResult<String> {
    if ts.is_diary() {
        let expression = ts.diary_expression().ok_or_else(|| {
            ExportError::InvalidInput(format!("diary timestamp without expression for {uid}"))
        })?;
        return cx.diary().render(cx, expression, uid, summary);
    }

    let zone = StampZone::for_property(fields.timezone.as_deref());
    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        dtstamp(cx.now),
        format!("UID:{uid}"),
        cx.time.render("DTSTART", ts, false, zone)?,
        cx.time.render("DTEND", ts, true, zone)?,
    ];

    if let Some(repeater) = &ts.repeater {
        match recurrence_rule(repeater) {
            Some(rule) => lines.push(rule),
            None => tracing::debug!(uid, ?repeater, "repeater has no RRULE equivalent"),
        }
    }

    lines.push(format!("SUMMARY:{}", escape(summary)));
    push_descriptive(&mut lines, fields);
    lines.push(format!("CATEGORIES:{}", fields.categories));

    if let Some(alarm) = valarm(cx, ts, summary, fields.warn_time) {
        lines.push(alarm);
    }

    lines.push("END:VEVENT".to_string());
    Ok(finish(&lines))
}

/// Generate the VTODO for a task entry.
///
/// The start is the SCHEDULED stamp when tasks take their start from it,
/// otherwise the export clock.
pub fn vtodo(
    cx: &ExportContext,
    entry: &OutlineEntry,
    uid: &str,
    fields: &EntryFields,
) -> ExportResult<String> {
    let config = &cx.config;
    let zone = StampZone::for_property(fields.timezone.as_deref());

    let now;
    let start = match &entry.scheduled {
        Some(ts) if config.use_scheduled.contains(&ScheduledUse::TodoStart) && !ts.is_diary() => ts,
        _ => {
            now = cx.now_timestamp();
            &now
        }
    };

    let mut lines = vec![
        "BEGIN:VTODO".to_string(),
        format!("UID:TODO-{uid}"),
        dtstamp(cx.now),
        cx.time.render("DTSTART", start, false, zone)?,
    ];

    if config.use_deadline.contains(&DeadlineUse::TodoDue) {
        match &entry.deadline {
            Some(deadline) if !deadline.is_diary() => {
                lines.push(cx.time.render("DUE", deadline, false, zone)?);
            }
            Some(_) => tracing::debug!(uid, "diary deadline cannot be a DUE date"),
            None => {}
        }
    }

    lines.push(format!("SUMMARY:{}", escape(&fields.summary)));
    push_descriptive(&mut lines, fields);
    lines.push(format!("CATEGORIES:{}", fields.categories));
    lines.push("SEQUENCE:1".to_string());
    lines.push(format!("PRIORITY:{}", ical_priority(config, entry.priority)));

    let status = match entry.todo_state {
        TodoState::Active => "NEEDS-ACTION",
        TodoState::Done | TodoState::None => "COMPLETED",
    };
    lines.push(format!("STATUS:{status}"));
    lines.push("END:VTODO".to_string());

    Ok(finish(&lines))
}

/// Generate a display alarm for a timed stamp, if one is configured.
///
/// The entry's own warning time wins over the global setting. Returned
/// text is unfolded and has no trailing newline.
pub fn valarm(
    cx: &ExportContext,
    ts: &Timestamp,
    summary: &str,
    warn_time: Option<u32>,
) -> Option<String> {
    if !ts.has_time() {
        return None;
    }

    let minutes = match warn_time {
        Some(m) if m > 0 => m,
        _ => cx.config.alarm_minutes,
    };
    if minutes == 0 && !cx.config.force_alarm {
        return None;
    }

    Some(format!(
        "BEGIN:VALARM\nACTION:DISPLAY\nDESCRIPTION:{}\nTRIGGER:-P0DT0H{minutes}M0S\nEND:VALARM",
        escape(summary)
    ))
}

/// Map an outline priority onto iCalendar's 1 (highest) to 9 (lowest).
pub fn ical_priority(config: &ExportConfig, priority: Option<i64>) -> i64 {
    let (min, max) = config.priority_bounds();
    let p = priority.unwrap_or(config.priority_default).clamp(min, max) as f64;
    let lowest = config.priority_lowest as f64;
    let highest = config.priority_highest as f64;

    (9.0 - 8.0 * (lowest - p) / (lowest - highest)).floor() as i64
}

fn push_descriptive(lines: &mut Vec<String>, fields: &EntryFields) {
    if let Some(location) = fields.location.as_deref().filter(|l| !l.trim().is_empty()) {
        lines.push(format!("LOCATION:{}", escape(location)));
    }
    if let Some(class) = &fields.class {
        lines.push(format!("CLASS:{class}"));
    }
    // Only non-blank descriptions
    if let Some(description) = fields.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(format!("DESCRIPTION:{}", escape(description)));
    }
}

fn finish(lines: &[String]) -> String {
    let mut text = fold(&lines.join("\n"));
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::outline::{EntrySource, Outline, OutlineSource, RepeaterUnit, TimePoint};
    use chrono::{TimeZone, Utc};

    fn context(config: ExportConfig) -> ExportContext {
        let config = ExportConfig {
            timezone: Some("Europe/Paris".into()),
            ..config
        };
        ExportContext::new(config)
            .unwrap()
            .with_now(Utc.with_ymd_and_hms(2025, 3, 20, 15, 4, 5).unwrap())
    }

    fn fields(summary: &str) -> EntryFields {
        EntryFields {
            summary: summary.to_string(),
            categories: "work".to_string(),
            ..EntryFields::default()
        }
    }

    fn single_entry(source: EntrySource) -> Outline {
        Outline::from_source(OutlineSource::new(vec![source]), "notes")
    }

    #[test]
    fn test_vevent_line_order() {
        let cx = context(ExportConfig::default());
        let ts = Timestamp::at(2024, 3, 1, 9, 0).repeat(RepeaterUnit::Week, 1);
        let mut f = fields("Standup");
        f.location = Some("Room 1".into());
        f.description = Some("Daily sync".into());

        let ics = vevent(&cx, &ts, "TS1-abc", "Standup", &f).unwrap();
        let lines: Vec<&str> = ics.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BEGIN:VEVENT",
                "DTSTAMP:20250320T150405Z",
                "UID:TS1-abc",
                "DTSTART:20240301T090000",
                "DTEND:20240301T110000",
                "RRULE:FREQ=WEEKLY;INTERVAL=1",
                "SUMMARY:Standup",
                "LOCATION:Room 1",
                "DESCRIPTION:Daily sync",
                "CATEGORIES:work",
                "END:VEVENT",
            ]
        );
        assert!(ics.ends_with("END:VEVENT\n"));
    }

    #[test]
    fn test_vevent_blank_description_omitted() {
        let cx = context(ExportConfig::default());
        let mut f = fields("Lunch");
        f.description = Some("  \n ".into());
        let ics = vevent(&cx, &Timestamp::date(2024, 3, 1), "u", "Lunch", &f).unwrap();
        assert!(!ics.contains("DESCRIPTION"), "{ics}");
        assert!(ics.contains("DTSTART;VALUE=DATE:20240301\n"));
        assert!(ics.contains("DTEND;VALUE=DATE:20240302\n"));
    }

    #[test]
    fn test_vevent_unsupported_repeater_omits_rrule() {
        let cx = context(ExportConfig::default());
        let ts = Timestamp::date(2024, 3, 1).repeat(RepeaterUnit::Unsupported, 3);
        let ics = vevent(&cx, &ts, "u", "x", &fields("x")).unwrap();
        assert!(!ics.contains("RRULE"), "{ics}");
        assert!(ics.contains("END:VEVENT"));
    }

    #[test]
    fn test_vevent_escapes_and_folds_summary() {
        let cx = context(ExportConfig::default());
        let summary = format!("Review; budget, {}", "long ".repeat(30));
        let ics = vevent(&cx, &Timestamp::date(2024, 3, 1), "u", &summary, &fields("x")).unwrap();
        assert!(ics.contains("SUMMARY:Review\\; budget\\, long"), "{ics}");
        for line in ics.lines() {
            assert!(line.len() <= 75, "line too long: {line}");
        }
    }

    #[test]
    fn test_vevent_with_timezone_property() {
        let cx = context(ExportConfig::default());
        let mut f = fields("Call");
        f.timezone = Some("America/New_York".into());
        let ics = vevent(&cx, &Timestamp::at(2024, 3, 1, 9, 0), "u", "Call", &f).unwrap();
        assert!(ics.contains("DTSTART;TZID=America/New_York:20240301T090000\n"), "{ics}");
    }

    #[test]
    fn test_vevent_missing_start_is_invalid_input() {
        let cx = context(ExportConfig::default());
        let mut ts = Timestamp::date(2024, 3, 1);
        ts.start = None;
        assert!(matches!(
            vevent(&cx, &ts, "u", "x", &fields("x")),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_vevent_diary_delegates() {
        let cx = context(ExportConfig::default());
        let ts = Timestamp::diary("<%%(diary-anniversary 5 17 1990)>");
        let ics = vevent(&cx, &ts, "DS1-u", "Wedding", &fields("Wedding")).unwrap();
        assert!(ics.contains("UID:DS1-u\n"), "{ics}");
        assert!(ics.contains("RRULE:FREQ=YEARLY;INTERVAL=1\n"), "{ics}");
        assert!(ics.contains("SUMMARY:Wedding\n"), "{ics}");
    }

    #[test]
    fn test_valarm_rules() {
        let timed = Timestamp::at(2024, 3, 1, 9, 0);
        let dated = Timestamp::date(2024, 3, 1);

        let cx = context(ExportConfig::default());
        assert_eq!(valarm(&cx, &timed, "x", None), None);
        assert_eq!(valarm(&cx, &dated, "x", Some(10)), None);
        let alarm = valarm(&cx, &timed, "Call mom", Some(10)).unwrap();
        assert!(alarm.contains("ACTION:DISPLAY\n"));
        assert!(alarm.contains("DESCRIPTION:Call mom\n"));
        assert!(alarm.contains("TRIGGER:-P0DT0H10M0S\n"));

        let cx = context(ExportConfig {
            alarm_minutes: 15,
            ..ExportConfig::default()
        });
        assert!(valarm(&cx, &timed, "x", None).unwrap().contains("TRIGGER:-P0DT0H15M0S"));
        assert!(valarm(&cx, &timed, "x", Some(0)).unwrap().contains("TRIGGER:-P0DT0H15M0S"));
        assert!(valarm(&cx, &timed, "x", Some(5)).unwrap().contains("TRIGGER:-P0DT0H5M0S"));

        let cx = context(ExportConfig {
            force_alarm: true,
            ..ExportConfig::default()
        });
        assert!(valarm(&cx, &timed, "x", None).unwrap().contains("TRIGGER:-P0DT0H0M0S"));
    }

    #[test]
    fn test_vevent_embeds_alarm() {
        let cx = context(ExportConfig::default());
        let mut f = fields("Dentist");
        f.warn_time = Some(30);
        let ics = vevent(&cx, &Timestamp::at(2024, 3, 1, 9, 0), "u", "Dentist", &f).unwrap();
        let alarm_at = ics.find("BEGIN:VALARM").unwrap();
        assert!(ics.find("CATEGORIES").unwrap() < alarm_at);
        assert!(alarm_at < ics.find("END:VEVENT").unwrap());
    }

    #[test]
    fn test_priority_mapping() {
        let config = ExportConfig::default();
        assert_eq!(ical_priority(&config, Some(65)), 1, "highest maps to 1");
        assert_eq!(ical_priority(&config, Some(67)), 9, "lowest maps to 9");
        assert_eq!(ical_priority(&config, Some(66)), 5);
        assert_eq!(ical_priority(&config, None), 5, "default priority is B");
        assert_eq!(ical_priority(&config, Some(10)), 1, "clamped to the range");
    }

    #[test]
    fn test_priority_mapping_numeric_range() {
        let config = ExportConfig {
            priority_highest: 1,
            priority_lowest: 5,
            priority_default: 3,
            ..ExportConfig::default()
        };
        assert_eq!(ical_priority(&config, Some(1)), 1);
        assert_eq!(ical_priority(&config, Some(5)), 9);
        assert_eq!(ical_priority(&config, Some(2)), 3);
    }

    #[test]
    fn test_vtodo_with_scheduled_start_and_due() {
        let cx = context(ExportConfig::default());
        let outline = single_entry(
            EntrySource::new("Write report")
                .todo("TODO")
                .priority(65)
                .scheduled(Timestamp::at(2024, 3, 1, 9, 0))
                .deadline(Timestamp::date(2024, 3, 5)),
        );
        let entry = outline.entry(outline.roots()[0]);
        let ics = vtodo(&cx, entry, "abc", &fields("Write report")).unwrap();
        let lines: Vec<&str> = ics.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BEGIN:VTODO",
                "UID:TODO-abc",
                "DTSTAMP:20250320T150405Z",
                "DTSTART:20240301T090000",
                "DUE;VALUE=DATE:20240305",
                "SUMMARY:Write report",
                "CATEGORIES:work",
                "SEQUENCE:1",
                "PRIORITY:1",
                "STATUS:NEEDS-ACTION",
                "END:VTODO",
            ]
        );
    }

    #[test]
    fn test_vtodo_without_schedule_starts_now() {
        let cx = context(ExportConfig {
            use_deadline: vec![DeadlineUse::EventIfNotTodo],
            ..ExportConfig::default()
        });
        let outline = single_entry(
            EntrySource::new("Done thing")
                .done("DONE")
                .deadline(Timestamp::date(2024, 3, 5)),
        );
        let entry = outline.entry(outline.roots()[0]);
        let ics = vtodo(&cx, entry, "abc", &fields("Done thing")).unwrap();
        // 15:04 UTC is 16:04 in Paris
        assert!(ics.contains("DTSTART:20250320T160400\n"), "{ics}");
        assert!(!ics.contains("DUE"), "{ics}");
        assert!(ics.contains("STATUS:COMPLETED\n"));
    }

    #[test]
    fn test_vtodo_scheduled_ignored_without_todo_start() {
        let cx = context(ExportConfig {
            use_scheduled: vec![],
            ..ExportConfig::default()
        });
        let outline = single_entry(
            EntrySource::new("Task")
                .todo("TODO")
                .scheduled(Timestamp::date(2024, 3, 1).until(TimePoint::date(2024, 3, 2))),
        );
        let entry = outline.entry(outline.roots()[0]);
        let ics = vtodo(&cx, entry, "abc", &fields("Task")).unwrap();
        assert!(ics.contains("DTSTART:20250320T160400\n"), "{ics}");
    }
}
