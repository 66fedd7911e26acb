//! State shared by every builder during one export pass.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};

use crate::config::ExportConfig;
use crate::error::ExportResult;
use crate::ics::diary::{DiaryRenderer, SexpDiaryRenderer};
use crate::ics::time::TimeSettings;
use crate::outline::Timestamp;
use crate::provider::{IdProvider, UuidProvider};

/// Configuration, clock and collaborators for one export.
///
/// `now` is captured once so every DTSTAMP of a pass agrees.
pub struct ExportContext {
    pub config: ExportConfig,
    pub time: TimeSettings,
    pub now: DateTime<Utc>,
    ids: Box<dyn IdProvider>,
    diary: Box<dyn DiaryRenderer>,
}

impl ExportContext {
    pub fn new(config: ExportConfig) -> ExportResult<Self> {
        config.validate()?;
        let time = TimeSettings::from_config(&config);
        Ok(ExportContext {
            config,
            time,
            now: Utc::now(),
            ids: Box::new(UuidProvider),
            diary: Box::new(SexpDiaryRenderer),
        })
    }

    /// Pin the export clock.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_id_provider(mut self, ids: impl IdProvider + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_diary_renderer(mut self, diary: impl DiaryRenderer + 'static) -> Self {
        self.diary = Box::new(diary);
        self
    }

    pub fn new_uid(&self) -> String {
        self.ids.new_stable_id()
    }

    pub fn diary(&self) -> &dyn DiaryRenderer {
        self.diary.as_ref()
    }

    /// Current civil time in the export zone, minute precision.
    pub fn local_now(&self) -> NaiveDateTime {
        let local = self.time.to_local(self.now);
        local
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local)
    }

    /// Active timestamp for "now", used as start of unscheduled tasks.
    pub fn now_timestamp(&self) -> Timestamp {
        let now = self.local_now();
        Timestamp::at(now.year(), now.month(), now.day(), now.hour(), now.minute())
    }
}
