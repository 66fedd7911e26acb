pub mod combine;
pub mod export;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use orgcal_core::ics::to_crlf;
use orgcal_core::{ExportConfig, ExportContext, Outline, OutlineSource};
use owo_colors::OwoColorize;

/// Options shared by every command that writes a calendar.
#[derive(Args)]
pub struct OutputArgs {
    /// Config file (defaults to <config dir>/orgcal/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the calendar here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// End lines with CRLF
    #[arg(long)]
    pub crlf: bool,
}

impl OutputArgs {
    pub fn context(&self) -> Result<ExportContext> {
        let config = match &self.config {
            Some(path) => ExportConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ExportConfig::load_default().context("Failed to load config")?,
        };
        tracing::debug!(
            config = ?self.config,
            timezone = ?config.timezone,
            include_todo = ?config.include_todo,
            "loaded config"
        );
        Ok(ExportContext::new(config)?)
    }

    /// Calendar text with the requested line endings.
    fn line_endings(&self, calendar: &str) -> String {
        if self.crlf {
            to_crlf(calendar)
        } else {
            calendar.to_string()
        }
    }

    pub fn write(&self, calendar: &str) -> Result<()> {
        let text = self.line_endings(calendar);
        tracing::debug!(
            output = ?self.output,
            crlf = self.crlf,
            bytes = text.len(),
            "writing calendar"
        );

        match &self.output {
            Some(path) => {
                std::fs::write(path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("{} {}", "Wrote".green(), path.display());
            }
            None => print!("{text}"),
        }
        Ok(())
    }
}

/// Read an outline JSON file. The file stem is the default category.
pub fn read_outline(path: &Path) -> Result<Outline> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let source = OutlineSource::from_json(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let category = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let outline = Outline::from_source(source, &category);
    tracing::debug!(path = %path.display(), entries = outline.len(), "read outline");
    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: Option<PathBuf>, crlf: bool) -> OutputArgs {
        OutputArgs {
            config: None,
            output,
            crlf,
        }
    }

    #[test]
    fn test_read_outline_defaults_category_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work.json");
        std::fs::write(
            &path,
            r#"{"entries": [{"title": [{"type": "text", "text": "Dentist"}]}]}"#,
        )
        .unwrap();

        let outline = read_outline(&path).unwrap();
        assert_eq!(outline.category, "work");
        assert_eq!(outline.len(), 1);
    }

    #[test]
    fn test_read_outline_keeps_explicit_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work.json");
        std::fs::write(&path, r#"{"category": "home", "entries": []}"#).unwrap();

        assert_eq!(read_outline(&path).unwrap().category, "home");
    }

    #[test]
    fn test_read_outline_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_outline(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"), "{err}");
        assert!(read_outline(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_write_with_crlf_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ics");

        args(Some(path.clone()), true)
            .write("BEGIN:VCALENDAR\nEND:VCALENDAR\n")
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n"
        );

        assert_eq!(args(None, false).line_endings("A\nB\n"), "A\nB\n");
    }
}
