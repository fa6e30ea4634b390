use chrono::Utc;
use serde_json::json;

use crate::engine::Engine;
use crate::engine::add::upsert_dep_step;
use crate::error::{Result, WorkstackError};
use crate::model::{ActionType, Dependency, DependencyType, StepType, WorkItem, fmt_dt};
use crate::order_key;
use crate::store::{Edge, NewAction, StepData};

impl Engine {
    /// Detach a non-root item into a new root project, leaving a `linked`
    /// back-reference from the original parent so trees can still project
    /// the promoted branch.
    pub fn promote_to_project(&self, id: &str) -> Result<WorkItem> {
        let tx = self.db().conn().unchecked_transaction()?;
        let item = self.db().require_active_item(id)?;
        let Some(parent_id) = item.parent_work_item_id.clone() else {
            return Err(WorkstackError::Validation(format!(
                "work item {id} is already a root project"
            )));
        };

        let last_root = self
            .db()
            .sibling_edge_order_key(None, Edge::Last, Some(id))?;
        let key = order_key::key_between(last_root.as_deref(), None)?;
        let now = Utc::now();

        let mut new_data = serde_json::Map::new();
        new_data.insert("parent_work_item_id".into(), json!(null));
        new_data.insert("order_key".into(), json!(key));
        new_data.insert("updated_at".into(), json!(fmt_dt(now)));
        let old_data = json!({
            "parent_work_item_id": parent_id,
            "order_key": item.order_key,
            "updated_at": fmt_dt(item.updated_at),
        });
        self.db().write_row("work_items", id, &new_data)?;
        let mut steps = vec![StepData {
            step_type: StepType::Update,
            table_name: "work_items",
            record_id: id.to_string(),
            old_data: Some(old_data),
            new_data: Some(serde_json::Value::Object(new_data)),
        }];

        let existing = self.db().find_dependency(&parent_id, id)?;
        let link = Dependency {
            work_item_id: parent_id.clone(),
            depends_on_work_item_id: id.to_string(),
            dependency_type: DependencyType::Linked,
            is_active: true,
        };
        self.db().upsert_dependency(&link)?;
        steps.push(upsert_dep_step(existing.as_ref(), &link));

        let action = self.record(
            &NewAction {
                action_type: ActionType::Promote,
                description: format!("Promoted \"{}\" to a project", item.name),
                work_item_id: Some(id.to_string()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(WorkItem {
            parent_work_item_id: None,
            order_key: key,
            updated_at: now,
            ..item
        })
    }
}
