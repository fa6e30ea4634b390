use std::fs;
use std::io::Read;
use std::path::Path;

use crate::engine::Engine;
use crate::error::Result;
use crate::model::SubtreeSpec;
use crate::output::{self, Format};
use crate::tree;

/// Emit the tree-shaped JSON encoding of a project and its descendants.
pub fn export(engine: &Engine, work_item_id: String, format: Format) -> Result<()> {
    let spec = tree::export_subtree(engine.db(), &work_item_id)?;
    output::print_spec(&spec, format)
}

/// Recreate an exported tree from a file (or stdin with `-`), optionally
/// under an existing parent.
pub fn import(
    engine: &Engine,
    file: String,
    parent_work_item_id: Option<String>,
    format: Format,
) -> Result<()> {
    let raw = if file == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(Path::new(&file))?
    };
    let spec: SubtreeSpec = serde_json::from_str(&raw)?;
    let created = engine.import_tree(&spec, parent_work_item_id.as_deref())?;
    output::print_items(&created, format)
}
