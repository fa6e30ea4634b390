use crate::engine::{Engine, NewDependency};
use crate::error::Result;
use crate::model::DependencyType;
use crate::output::{self, Format};

pub fn depend(
    engine: &Engine,
    work_item_id: String,
    on: Vec<String>,
    dependency_type: DependencyType,
    format: Format,
) -> Result<()> {
    let deps: Vec<NewDependency> = on
        .into_iter()
        .map(|id| NewDependency {
            depends_on_work_item_id: id,
            dependency_type,
        })
        .collect();
    let item = engine.add_dependencies(&work_item_id, &deps)?;
    output::print_item(&item, format)
}

pub fn undepend(
    engine: &Engine,
    work_item_id: String,
    on: Vec<String>,
    format: Format,
) -> Result<()> {
    let item = engine.delete_dependencies(&work_item_id, &on)?;
    output::print_item(&item, format)
}
