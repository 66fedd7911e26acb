use std::path::Path;

use anyhow::Result;
use orgcal_core::export_document;

use super::{OutputArgs, read_outline};

pub fn run(outline_path: &Path, args: &OutputArgs) -> Result<()> {
    let cx = args.context()?;
    let outline = read_outline(outline_path)?;

    let calendar = export_document(&outline, &cx);
    args.write(&calendar)
}
