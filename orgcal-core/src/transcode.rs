//! Outline entries to calendar components.
//!
//! One entry yields, in this order: a deadline event, a scheduled event,
//! one event per plain timestamp, a task, and one event per diary
//! expression. Inline tasks nested in a headline follow it.

use std::collections::HashSet;

use crate::config::{DeadlineUse, IncludeBody, IncludeTodo, ScheduledUse, TimestampPolicy};
use crate::context::ExportContext;
use crate::error::ExportResult;
use crate::ics::generate::{EntryFields, vevent, vtodo};
use crate::outline::{EntryId, Outline, Timestamp, TimestampKind, TodoState};
use crate::resolve::{categories, is_blocked};

const CLASSES: [&str; 3] = ["PUBLIC", "PRIVATE", "CONFIDENTIAL"];

/// Which entries may emit their own components.
///
/// Entries outside the filter are still walked so their inline tasks get
/// evaluated on their own.
#[derive(Debug, Clone, Copy)]
pub enum EntryFilter<'a> {
    All,
    Marked(&'a HashSet<EntryId>),
    Nothing,
}

impl EntryFilter<'_> {
    pub fn includes(&self, id: EntryId) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Marked(ids) => ids.contains(&id),
            EntryFilter::Nothing => false,
        }
    }
}

/// Transcode a whole document, depth first in document order.
///
/// Footnote sections and subtrees carrying an excluded tag are skipped.
pub fn transcode_outline(outline: &Outline, cx: &ExportContext, filter: EntryFilter<'_>) -> String {
    let mut out = String::new();
    let mut stack: Vec<EntryId> = outline.roots().iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let entry = outline.entry(id);
        if entry.footnote_section {
            tracing::debug!(entry = id.0, "skipping footnote section");
            continue;
        }
        if is_excluded(outline, id, cx) {
            tracing::debug!(entry = id.0, "skipping excluded subtree");
            continue;
        }
        out.push_str(&transcode_entry(outline, id, cx, filter));
        stack.extend(outline.children(id).iter().rev().copied());
    }

    out
}

/// Transcode one headline or inline task, plus the inline tasks nested in
/// a headline's body.
pub fn transcode_entry(
    outline: &Outline,
    id: EntryId,
    cx: &ExportContext,
    filter: EntryFilter<'_>,
) -> String {
    let entry = outline.entry(id);
    if entry.footnote_section || is_excluded(outline, id, cx) {
        return String::new();
    }

    let mut out = if filter.includes(id) {
        own_components(outline, id, cx)
    } else {
        tracing::debug!(entry = id.0, "entry not marked, suppressing its components");
        String::new()
    };

    if entry.is_headline() {
        for task in outline.inline_tasks(id) {
            out.push_str(&transcode_entry(outline, task, cx, filter));
        }
    }

    out
}

fn own_components(outline: &Outline, id: EntryId, cx: &ExportContext) -> String {
    let entry = outline.entry(id);
    let config = &cx.config;
    let uid = entry
        .property("ID")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| cx.new_uid());
    let fields = entry_fields(outline, id, cx);
    let has_todo = entry.todo_keyword.is_some();

    let mut out = String::new();
    let mut count = 0;
    let mut emit = |component: &str, result: ExportResult<String>| match result {
        Ok(text) => {
            count += 1;
            out.push_str(&text);
        }
        Err(err) => {
            tracing::warn!(entry = id.0, uid = %uid, component, error = %err, "skipping component");
        }
    };

    // Deadline
    if let Some(deadline) = &entry.deadline {
        let wanted = if has_todo {
            config.use_deadline.contains(&DeadlineUse::EventIfTodo)
        } else {
            config.use_deadline.contains(&DeadlineUse::EventIfNotTodo)
        };
        if wanted {
            let summary = format!("{}{}", config.deadline_summary_prefix, fields.summary);
            emit("deadline", vevent(cx, deadline, &format!("DL-{uid}"), &summary, &fields));
        }
    }

    // Scheduled
    if let Some(scheduled) = &entry.scheduled {
        let wanted = if has_todo {
            config.use_scheduled.contains(&ScheduledUse::EventIfTodo)
        } else {
            config.use_scheduled.contains(&ScheduledUse::EventIfNotTodo)
        };
        if wanted {
            let summary = format!("{}{}", config.scheduled_summary_prefix, fields.summary);
            emit("scheduled", vevent(cx, scheduled, &format!("SC-{uid}"), &summary, &fields));
        }
    }

    // Plain timestamps
    let stamps = entry
        .timestamps()
        .filter(|ts| timestamp_qualifies(config.timestamps, ts));
    for (k, ts) in stamps.enumerate() {
        let ts_uid = format!("TS{}-{uid}", k + 1);
        emit("timestamp", vevent(cx, ts, &ts_uid, &fields.summary, &fields));
    }

    if wants_todo(outline, id, cx) {
        emit("todo", vtodo(cx, entry, &uid, &fields));
    }

    // Diary sexps, both as timestamps and as body lines
    if config.include_diary {
        let diaries = entry
            .timestamps()
            .filter(|ts| ts.is_diary())
            .cloned()
            .chain(entry.diary_expressions().map(|d| Timestamp::diary(d.as_str())));
        for (k, ts) in diaries.enumerate() {
            let ds_uid = format!("DS{}-{uid}", k + 1);
            emit("diary", vevent(cx, &ts, &ds_uid, &fields.summary, &fields));
        }
    }

    tracing::debug!(entry = id.0, uid = %uid, components = count, "transcoded entry");
    out
}

fn timestamp_qualifies(policy: TimestampPolicy, ts: &Timestamp) -> bool {
    match (policy, ts.kind) {
        (_, TimestampKind::Diary) => false,
        (TimestampPolicy::None, _) => false,
        (TimestampPolicy::All, _) => true,
        (TimestampPolicy::Active, kind) => kind == TimestampKind::Active,
        (TimestampPolicy::Inactive, kind) => kind == TimestampKind::Inactive,
    }
}

fn wants_todo(outline: &Outline, id: EntryId, cx: &ExportContext) -> bool {
    let entry = outline.entry(id);
    if entry.todo_state == TodoState::None {
        return false;
    }

    match &cx.config.include_todo {
        IncludeTodo::None => false,
        IncludeTodo::Unfinished => entry.is_active_todo(),
        IncludeTodo::Unblocked => {
            entry.is_active_todo() && entry.is_headline() && !is_blocked(outline, id)
        }
        IncludeTodo::All => true,
        IncludeTodo::Keywords(keywords) => entry
            .todo_keyword
            .as_ref()
            .is_some_and(|kw| keywords.contains(kw)),
    }
}

fn is_excluded(outline: &Outline, id: EntryId, cx: &ExportContext) -> bool {
    let excluded = &cx.config.exclude_tags;
    !excluded.is_empty() && outline.all_tags(id).iter().any(|t| excluded.contains(t))
}

/// Descriptive fields shared by all components of an entry.
fn entry_fields(outline: &Outline, id: EntryId, cx: &ExportContext) -> EntryFields {
    let entry = outline.entry(id);

    let summary = entry
        .property("SUMMARY")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| entry.title_text());

    let description = match entry.property("DESCRIPTION") {
        Some(explicit) => Some(explicit.to_string()),
        None => {
            let body = entry.body_text();
            let body = body.trim();
            match cx.config.include_body {
                IncludeBody::None => None,
                IncludeBody::All => Some(body.to_string()),
                IncludeBody::MaxChars(n) => Some(body.chars().take(n).collect()),
            }
        }
    };

    let class = entry.property("CLASS").and_then(|c| {
        let class = c.trim().to_ascii_uppercase();
        if CLASSES.contains(&class.as_str()) {
            Some(class)
        } else {
            tracing::debug!(entry = id.0, class = %c, "ignoring unknown CLASS");
            None
        }
    });

    EntryFields {
        summary,
        location: outline.inherited_property(id, "LOCATION").map(String::from),
        class,
        description,
        categories: categories(outline, id, &cx.config),
        timezone: outline.inherited_property(id, "TIMEZONE").map(String::from),
        warn_time: entry.warn_time(),
    }
}
