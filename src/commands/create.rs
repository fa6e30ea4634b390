use crate::commands::{InsertAt, parse_due_date, position_from_flags};
use crate::engine::{Engine, NewDependency, NewWorkItem};
use crate::error::Result;
use crate::model::{DependencyType, Priority, Status, SubtreeSpec};
use crate::output::{self, Format};

pub fn create_project(
    engine: &Engine,
    name: String,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let item = engine.create_project(name, description)?;
    output::print_item(&item, format)
}

#[allow(clippy::too_many_arguments)]
pub fn add_task(
    engine: &Engine,
    parent_work_item_id: String,
    name: String,
    description: Option<String>,
    status: Status,
    priority: Priority,
    due_date: Option<String>,
    depends_on: Vec<String>,
    dependency_type: DependencyType,
    insert_at: Option<InsertAt>,
    insert_after: Option<String>,
    insert_before: Option<String>,
    format: Format,
) -> Result<()> {
    let due_date = due_date.as_deref().map(parse_due_date).transpose()?;
    let position = position_from_flags(insert_at, insert_after, insert_before)?;
    let dependencies = depends_on
        .into_iter()
        .map(|id| NewDependency {
            depends_on_work_item_id: id,
            dependency_type,
        })
        .collect();

    let item = engine.add_work_item(NewWorkItem {
        parent_work_item_id: Some(parent_work_item_id),
        name,
        description,
        status,
        priority,
        due_date,
        dependencies,
        position,
    })?;
    output::print_item(&item, format)
}

/// Bulk-create a nested child forest from its JSON encoding.
pub fn add_child_tasks(
    engine: &Engine,
    parent_work_item_id: String,
    tree_json: String,
    format: Format,
) -> Result<()> {
    let specs: Vec<SubtreeSpec> = serde_json::from_str(&tree_json)?;
    let created = engine.add_child_tasks(&parent_work_item_id, &specs)?;
    output::print_items(&created, format)
}
