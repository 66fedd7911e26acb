//! Export options, loaded from `~/.config/orgcal/config.toml`.

use std::path::{Path, PathBuf};

use chrono::format::{Fixed, Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

/// Which todo entries become VTODO components.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeTodo {
    #[default]
    None,
    Unfinished,
    Unblocked,
    All,
    /// Only entries whose todo keyword is listed.
    Keywords(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeadlineUse {
    EventIfTodo,
    EventIfNotTodo,
    TodoDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduledUse {
    EventIfTodo,
    EventIfNotTodo,
    TodoStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategorySource {
    Category,
    TodoState,
    LocalTags,
    AllTags,
}

/// Which plain timestamps become events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    #[default]
    Active,
    Inactive,
    All,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeBody {
    None,
    #[default]
    All,
    MaxChars(usize),
}

/// Argument order of dates inside diary expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaryDateStyle {
    /// month day year
    #[default]
    American,
    /// day month year
    European,
    /// year month day
    Iso,
}

fn default_use_deadline() -> Vec<DeadlineUse> {
    vec![DeadlineUse::EventIfNotTodo, DeadlineUse::TodoDue]
}

fn default_use_scheduled() -> Vec<ScheduledUse> {
    vec![ScheduledUse::TodoStart]
}

fn default_categories() -> Vec<CategorySource> {
    vec![CategorySource::LocalTags, CategorySource::Category]
}

fn default_true() -> bool {
    true
}

fn default_date_time_format() -> String {
    ":%Y%m%dT%H%M%S".to_string()
}

fn default_priority_highest() -> i64 {
    i64::from(b'A')
}

fn default_priority_lowest() -> i64 {
    i64::from(b'C')
}

fn default_priority_default() -> i64 {
    i64::from(b'B')
}

fn default_exclude_tags() -> Vec<String> {
    vec!["noexport".to_string()]
}

fn default_deadline_prefix() -> String {
    "DL: ".to_string()
}

fn default_scheduled_prefix() -> String {
    "S: ".to_string()
}

fn default_combine_name() -> String {
    "OrgMode".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub include_todo: IncludeTodo,

    #[serde(default = "default_use_deadline")]
    pub use_deadline: Vec<DeadlineUse>,

    #[serde(default = "default_use_scheduled")]
    pub use_scheduled: Vec<ScheduledUse>,

    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySource>,

    #[serde(default)]
    pub timestamps: TimestampPolicy,

    #[serde(default = "default_true")]
    pub include_diary: bool,

    #[serde(default)]
    pub include_body: IncludeBody,

    /// Minutes before a timed event to raise an alarm; 0 disables.
    #[serde(default)]
    pub alarm_minutes: u32,

    /// Emit an alarm for timed events even when no warning time is set.
    #[serde(default)]
    pub force_alarm: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// strftime template for local date-times; `%Z` stands for the timezone.
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,

    /// Length in minutes of a timed event without an explicit end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_appointment_duration: Option<u32>,

    #[serde(default = "default_priority_highest")]
    pub priority_highest: i64,

    #[serde(default = "default_priority_lowest")]
    pub priority_lowest: i64,

    #[serde(default = "default_priority_default")]
    pub priority_default: i64,

    #[serde(default = "default_exclude_tags")]
    pub exclude_tags: Vec<String>,

    #[serde(default = "default_deadline_prefix")]
    pub deadline_summary_prefix: String,

    #[serde(default = "default_scheduled_prefix")]
    pub scheduled_summary_prefix: String,

    #[serde(default)]
    pub author: String,

    #[serde(default = "default_combine_name")]
    pub combine_name: String,

    #[serde(default)]
    pub combine_description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    #[serde(default)]
    pub diary_date_style: DiaryDateStyle,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            include_todo: IncludeTodo::default(),
            use_deadline: default_use_deadline(),
            use_scheduled: default_use_scheduled(),
            categories: default_categories(),
            timestamps: TimestampPolicy::default(),
            include_diary: true,
            include_body: IncludeBody::default(),
            alarm_minutes: 0,
            force_alarm: false,
            timezone: None,
            date_time_format: default_date_time_format(),
            default_appointment_duration: None,
            priority_highest: default_priority_highest(),
            priority_lowest: default_priority_lowest(),
            priority_default: default_priority_default(),
            exclude_tags: default_exclude_tags(),
            deadline_summary_prefix: default_deadline_prefix(),
            scheduled_summary_prefix: default_scheduled_prefix(),
            author: String::new(),
            combine_name: default_combine_name(),
            combine_description: String::new(),
            ttl: None,
            diary_date_style: DiaryDateStyle::default(),
        }
    }
}

impl ExportConfig {
    pub fn config_path() -> ExportResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ExportError::Config("Could not determine config directory".into()))?
            .join("orgcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> ExportResult<Self> {
        Self::load(&Self::config_path()?)
    }

    /// Load from `path` (`~` is expanded). A missing file yields defaults.
    pub fn load(path: &Path) -> ExportResult<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ExportResult<Self> {
        let config: ExportConfig =
            toml::from_str(content).map_err(|e| ExportError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExportResult<()> {
        if self.priority_highest == self.priority_lowest {
            return Err(ExportError::Config(format!(
                "priority_highest and priority_lowest are both {}",
                self.priority_highest
            )));
        }

        let (lo, hi) = self.priority_bounds();
        if !(lo..=hi).contains(&self.priority_default) {
            return Err(ExportError::Config(format!(
                "priority_default {} is outside {}..={}",
                self.priority_default, lo, hi
            )));
        }

        if StrftimeItems::new(&self.date_time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ExportError::Config(format!(
                "Invalid date_time_format '{}'",
                self.date_time_format
            )));
        }

        // `%Z` becomes the zone name before formatting; local date-times
        // carry no offset for the rest.
        if !self.format_is_utc() {
            let template = self.date_time_format.replace("%Z", "UTC");
            if StrftimeItems::new(&template).any(|item| needs_offset(&item)) {
                return Err(ExportError::Config(format!(
                    "date_time_format '{}' needs an offset; end it in Z to write UTC",
                    self.date_time_format
                )));
            }
        }

        Ok(())
    }

    /// Numeric (min, max) of the priority range.
    pub fn priority_bounds(&self) -> (i64, i64) {
        (
            self.priority_highest.min(self.priority_lowest),
            self.priority_highest.max(self.priority_lowest),
        )
    }

    /// Whether local date-times must be converted to UTC because the
    /// template ends in `Z`.
    pub fn format_is_utc(&self) -> bool {
        self.date_time_format.ends_with('Z')
    }
}

fn needs_offset(item: &Item<'_>) -> bool {
    matches!(
        item,
        Item::Fixed(
            Fixed::TimezoneName
                | Fixed::TimezoneOffset
                | Fixed::TimezoneOffsetColon
                | Fixed::TimezoneOffsetDoubleColon
                | Fixed::TimezoneOffsetTripleColon
                | Fixed::TimezoneOffsetColonZ
                | Fixed::TimezoneOffsetZ
                | Fixed::RFC2822
                | Fixed::RFC3339
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ExportConfig::from_toml_str("").unwrap();
        assert_eq!(config.include_todo, IncludeTodo::None);
        assert_eq!(
            config.use_deadline,
            vec![DeadlineUse::EventIfNotTodo, DeadlineUse::TodoDue]
        );
        assert_eq!(config.use_scheduled, vec![ScheduledUse::TodoStart]);
        assert_eq!(config.timestamps, TimestampPolicy::Active);
        assert_eq!(config.include_body, IncludeBody::All);
        assert_eq!(config.date_time_format, ":%Y%m%dT%H%M%S");
        assert_eq!(config.priority_highest, 65);
        assert_eq!(config.priority_lowest, 67);
        assert_eq!(config.exclude_tags, vec!["noexport"]);
    }

    #[test]
    fn test_parse_all_enum_shapes() {
        let config = ExportConfig::from_toml_str(
            r#"
include_todo = { keywords = ["TODO", "NEXT"] }
use_deadline = ["event-if-todo", "todo-due"]
use_scheduled = ["event-if-not-todo"]
categories = ["todo-state", "all-tags"]
timestamps = "all"
include_body = { max_chars = 40 }
alarm_minutes = 15
timezone = "Europe/Paris"
diary_date_style = "iso"
"#,
        )
        .unwrap();

        assert_eq!(
            config.include_todo,
            IncludeTodo::Keywords(vec!["TODO".into(), "NEXT".into()])
        );
        assert_eq!(
            config.categories,
            vec![CategorySource::TodoState, CategorySource::AllTags]
        );
        assert_eq!(config.timestamps, TimestampPolicy::All);
        assert_eq!(config.include_body, IncludeBody::MaxChars(40));
        assert_eq!(config.alarm_minutes, 15);
        assert_eq!(config.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(config.diary_date_style, DiaryDateStyle::Iso);
    }

    #[test]
    fn test_validate_rejects_bad_priorities() {
        let err = ExportConfig::from_toml_str(
            "priority_highest = 1\npriority_lowest = 1\npriority_default = 1",
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Config(_)), "got {err:?}");

        let err = ExportConfig::from_toml_str("priority_default = 90").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_validate_rejects_bad_format() {
        let err = ExportConfig::from_toml_str("date_time_format = \":%Y%m%dT%H%\"").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_validate_rejects_offset_in_local_format() {
        let err =
            ExportConfig::from_toml_str("date_time_format = \":%Y%m%dT%H%M%S%z\"").unwrap_err();
        assert!(matches!(err, ExportError::Config(_)), "got {err:?}");

        // Zone name placeholder and UTC templates stay valid
        ExportConfig::from_toml_str("date_time_format = \";TZID=%Z:%Y%m%dT%H%M%S\"").unwrap();
        ExportConfig::from_toml_str("date_time_format = \":%Y%m%dT%H%M%S%zZ\"").unwrap();
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.alarm_minutes, 0);

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "alarm_minutes = 10").unwrap();
        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.alarm_minutes, 10);
    }
}
