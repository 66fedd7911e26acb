//! Outline to iCalendar export engine.
//!
//! This crate turns an outline document (headlines, inline tasks,
//! timestamps, diary expressions) into RFC 5545 text:
//! - `outline` holds the document arena handed over by a parser
//! - `transcode` decides which components each entry yields
//! - `calendar` wraps them into a VCALENDAR, for one or many documents

pub mod calendar;
pub mod config;
pub mod context;
pub mod error;
pub mod ics;
pub mod outline;
pub mod provider;
pub mod resolve;
pub mod transcode;

pub use calendar::{CalendarHeader, CombineSource, Restriction, combine, export_document, wrap};
pub use config::ExportConfig;
pub use context::ExportContext;
pub use error::{ExportError, ExportResult};
pub use outline::{EntryId, Outline, OutlineSource};
pub use provider::{AnniversaryProvider, IdProvider, NoAnniversaries, SequentialIds, UuidProvider};
pub use transcode::EntryFilter;
