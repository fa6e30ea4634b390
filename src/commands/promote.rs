use crate::engine::Engine;
use crate::error::Result;
use crate::output::{self, Format};

pub fn promote_to_project(engine: &Engine, work_item_id: String, format: Format) -> Result<()> {
    let item = engine.promote_to_project(&work_item_id)?;
    output::print_item(&item, format)
}
