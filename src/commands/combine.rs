use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use orgcal_core::{CombineSource, EntryId, Restriction, combine};

use super::{OutputArgs, read_outline};

pub fn run(
    outline_paths: &[PathBuf],
    restrict: Option<&Path>,
    anniversaries: Option<&Path>,
    args: &OutputArgs,
) -> Result<()> {
    let cx = args.context()?;

    let sources = outline_paths
        .iter()
        .map(|path| {
            Ok(CombineSource {
                key: path.display().to_string(),
                outline: read_outline(path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let restriction = restrict.map(read_restriction).transpose()?;
    if let Some(r) = &restriction {
        tracing::debug!(files = r.len(), "loaded restriction");
    }

    // An empty block renders nothing
    let anniversaries = match anniversaries {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => String::new(),
    };

    let calendar = combine(&sources, restriction.as_ref(), &anniversaries, &cx);
    args.write(&calendar)
}

/// `{"path/to/outline.json": [0, 3, 4], ...}`
fn read_restriction(path: &Path) -> Result<Restriction> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw: HashMap<String, Vec<usize>> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse restriction file {}", path.display()))?;

    Ok(raw
        .into_iter()
        .map(|(file, positions)| (file, positions.into_iter().map(EntryId).collect()))
        .collect())
}
