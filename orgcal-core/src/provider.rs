//! External collaborators the engine calls into.
//!
//! The engine never invents identifiers or reads anniversary data itself;
//! callers plug in implementations of these traits.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of fresh identifiers for entries without an ID property.
///
/// Identifiers must not repeat within a process lifetime.
pub trait IdProvider: Send + Sync {
    fn new_stable_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn new_stable_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>-1`, `<prefix>-2`, ... Useful for reproducible output.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        SequentialIds {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdProvider for SequentialIds {
    fn new_stable_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Pre-rendered block of anniversary VEVENTs appended to combined calendars.
pub trait AnniversaryProvider {
    /// Calendar text, or an empty string when disabled.
    fn render_anniversaries(&self) -> String;
}

/// No anniversaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnniversaries;

impl AnniversaryProvider for NoAnniversaries {
    fn render_anniversaries(&self) -> String {
        String::new()
    }
}

/// A block rendered ahead of time, e.g. read from a file.
impl AnniversaryProvider for String {
    fn render_anniversaries(&self) -> String {
        self.clone()
    }
}
