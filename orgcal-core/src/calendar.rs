//! VCALENDAR assembly: single documents and multi-file combination.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::context::ExportContext;
use crate::ics::text::{escape, fold};
use crate::outline::{EntryId, Outline};
use crate::provider::AnniversaryProvider;
use crate::transcode::{EntryFilter, transcode_outline};

/// Entry positions to include, keyed by source file.
pub type Restriction = HashMap<String, HashSet<EntryId>>;

/// Calendar-level metadata. Values are raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarHeader {
    pub name: String,
    pub owner: String,
    pub timezone: String,
    pub description: String,
    pub ttl: Option<String>,
}

impl CalendarHeader {
    /// Header for exporting a single document.
    pub fn for_outline(outline: &Outline, cx: &ExportContext) -> Self {
        CalendarHeader {
            name: outline
                .title
                .clone()
                .unwrap_or_else(|| outline.category.clone()),
            owner: cx.config.author.clone(),
            timezone: cx.time.timezone_name.clone(),
            description: outline.description.clone().unwrap_or_default(),
            ttl: cx.config.ttl.clone(),
        }
    }

    /// Header for a combined calendar.
    pub fn combined(cx: &ExportContext) -> Self {
        CalendarHeader {
            name: cx.config.combine_name.clone(),
            owner: cx.config.author.clone(),
            timezone: cx.time.timezone_name.clone(),
            description: cx.config.combine_description.clone(),
            ttl: cx.config.ttl.clone(),
        }
    }
}

/// One document taking part in a combined export.
#[derive(Debug, Clone)]
pub struct CombineSource {
    /// Key looked up in the [`Restriction`], usually the file path.
    pub key: String,
    pub outline: Outline,
}

/// Wrap component text in a VCALENDAR envelope.
pub fn wrap(header: &CalendarHeader, body: &str) -> String {
    let name = escape(&header.name);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("X-WR-CALNAME:{name}"),
        format!("PRODID:-//{}//{name}//EN", escape(&header.owner)),
        format!("X-WR-TIMEZONE:{}", escape(&header.timezone)),
        format!("X-WR-CALDESC:{}", escape(&header.description)),
        "CALSCALE:GREGORIAN".to_string(),
    ];
    if let Some(ttl) = header.ttl.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("X-PUBLISHED-TTL:{}", escape(ttl.trim())));
    }

    let mut out = fold(&lines.join("\n"));
    out.push('\n');
    out.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("END:VCALENDAR\n");
    out
}

/// Export one document as a complete calendar.
pub fn export_document(outline: &Outline, cx: &ExportContext) -> String {
    let body = transcode_outline(outline, cx, EntryFilter::All);
    tracing::info!(
        entries = outline.len(),
        components = count_components(&body),
        "exported document"
    );
    wrap(&CalendarHeader::for_outline(outline, cx), &body)
}

/// Combine several documents into one calendar.
///
/// With a restriction, only listed entries of listed files emit their own
/// components. Files are transcoded in parallel and joined in input order;
/// the anniversary block goes last.
pub fn combine(
    sources: &[CombineSource],
    restriction: Option<&Restriction>,
    anniversaries: &dyn AnniversaryProvider,
    cx: &ExportContext,
) -> String {
    let bodies: Vec<String> = sources
        .par_iter()
        .map(|source| {
            let filter = match restriction {
                None => EntryFilter::All,
                Some(r) => match r.get(&source.key) {
                    Some(ids) => EntryFilter::Marked(ids),
                    None => EntryFilter::Nothing,
                },
            };
            let body = transcode_outline(&source.outline, cx, filter);
            tracing::debug!(
                file = %source.key,
                components = count_components(&body),
                "transcoded file"
            );
            body
        })
        .collect();

    let mut body = bodies.concat();
    let extra = anniversaries.render_anniversaries();
    if !extra.is_empty() {
        body.push_str(&extra);
        if !extra.ends_with('\n') {
            body.push('\n');
        }
    }

    tracing::info!(
        files = sources.len(),
        components = count_components(&body),
        "combined calendar"
    );
    wrap(&CalendarHeader::combined(cx), &body)
}

fn count_components(body: &str) -> usize {
    body.lines()
        .filter(|l| *l == "BEGIN:VEVENT" || *l == "BEGIN:VTODO")
        .count()
}
