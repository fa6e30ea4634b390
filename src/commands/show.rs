use crate::engine::Engine;
use crate::error::Result;
use crate::model::Status;
use crate::output::{self, Format};
use crate::scheduler::{self, NextTaskQuery};
use crate::store::ListFilter;
use crate::tree::{self, TreeOptions};

pub fn get_details(engine: &Engine, work_item_id: String, format: Format) -> Result<()> {
    let details = engine.db().item_details(&work_item_id)?;
    output::print_details(&details, format)
}

pub fn list(
    engine: &Engine,
    parent_work_item_id: Option<String>,
    roots_only: bool,
    status: Option<Status>,
    include_inactive: bool,
    format: Format,
) -> Result<()> {
    let items = engine.db().list_items(&ListFilter {
        parent_work_item_id,
        roots_only,
        status,
        include_inactive,
    })?;
    output::print_items(&items, format)
}

pub fn get_full_tree(
    engine: &Engine,
    work_item_id: String,
    include_inactive_items: bool,
    include_inactive_dependencies: bool,
    max_depth: usize,
    format: Format,
) -> Result<()> {
    let node = tree::full_tree(
        engine.db(),
        &work_item_id,
        &TreeOptions {
            include_inactive_items,
            include_inactive_dependencies,
            max_depth,
        },
    )?;
    output::print_tree(&node, format)
}

pub fn get_next_task(
    engine: &Engine,
    scope_item_id: Option<String>,
    include_tags: Vec<String>,
    exclude_tags: Vec<String>,
    format: Format,
) -> Result<()> {
    let next = scheduler::next_task(
        engine.db(),
        &NextTaskQuery {
            scope_item_id,
            include_tags,
            exclude_tags,
        },
    )?;
    output::print_item_opt(next.as_ref(), "no actionable task", format)
}
