//! Export configuration.

mod export_config;

pub use export_config::{
    CategorySource, DeadlineUse, DiaryDateStyle, ExportConfig, IncludeBody, IncludeTodo,
    ScheduledUse, TimestampPolicy,
};
