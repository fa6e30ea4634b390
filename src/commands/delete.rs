use crate::engine::Engine;
use crate::error::Result;
use crate::output::{self, Format};

pub fn delete_project(engine: &Engine, project_id: String, format: Format) -> Result<()> {
    let summary = engine.delete_project(&project_id)?;
    output::print_summary(&summary, format)
}

pub fn delete_task(engine: &Engine, work_item_ids: Vec<String>, format: Format) -> Result<()> {
    let summary = engine.delete_tasks(&work_item_ids)?;
    output::print_summary(&summary, format)
}

pub fn delete_child_tasks(
    engine: &Engine,
    parent_work_item_id: String,
    child_task_ids: Vec<String>,
    delete_all_children: bool,
    format: Format,
) -> Result<()> {
    let selected = (!child_task_ids.is_empty()).then_some(child_task_ids);
    let summary = engine.delete_child_tasks(
        &parent_work_item_id,
        selected.as_deref(),
        delete_all_children,
    )?;
    output::print_summary(&summary, format)
}
