use crate::engine::Engine;
use crate::error::Result;
use crate::output::{self, Format};

pub fn move_to_start(engine: &Engine, work_item_id: String, format: Format) -> Result<()> {
    let item = engine.move_to_start(&work_item_id)?;
    output::print_item(&item, format)
}

pub fn move_to_end(engine: &Engine, work_item_id: String, format: Format) -> Result<()> {
    let item = engine.move_to_end(&work_item_id)?;
    output::print_item(&item, format)
}

pub fn move_after(
    engine: &Engine,
    work_item_id: String,
    target_sibling_id: String,
    format: Format,
) -> Result<()> {
    let item = engine.move_after(&work_item_id, &target_sibling_id)?;
    output::print_item(&item, format)
}

pub fn move_before(
    engine: &Engine,
    work_item_id: String,
    target_sibling_id: String,
    format: Format,
) -> Result<()> {
    let item = engine.move_before(&work_item_id, &target_sibling_id)?;
    output::print_item(&item, format)
}
