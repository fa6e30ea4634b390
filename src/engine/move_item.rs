use chrono::Utc;
use serde_json::json;

use crate::engine::Engine;
use crate::error::{Result, WorkstackError};
use crate::model::{ActionType, Position, StepType, WorkItem, fmt_dt};
use crate::order_key;
use crate::store::{NewAction, StepData};

impl Engine {
    pub fn move_to_start(&self, id: &str) -> Result<WorkItem> {
        self.move_item(id, Position::Start)
    }

    pub fn move_to_end(&self, id: &str) -> Result<WorkItem> {
        self.move_item(id, Position::End)
    }

    pub fn move_after(&self, id: &str, target_sibling_id: &str) -> Result<WorkItem> {
        self.move_item(id, Position::After(target_sibling_id.to_string()))
    }

    pub fn move_before(&self, id: &str, target_sibling_id: &str) -> Result<WorkItem> {
        self.move_item(id, Position::Before(target_sibling_id.to_string()))
    }

    /// Reposition an item within its sibling list. Only `order_key` (and
    /// `updated_at`) change; a move that recomputes the current key is a
    /// no-op and records nothing.
    pub fn move_item(&self, id: &str, position: Position) -> Result<WorkItem> {
        let tx = self.db().conn().unchecked_transaction()?;
        let item = self.db().require_active_item(id)?;

        if let Position::After(reference) | Position::Before(reference) = &position
            && reference.as_str() == id
        {
            return Err(WorkstackError::Validation(format!(
                "work item {id} cannot be moved relative to itself"
            )));
        }

        let (before, after) =
            self.resolve_neighbours(item.parent_work_item_id.as_deref(), &position, Some(id))?;
        let key = order_key::key_between(before.as_deref(), after.as_deref())?;
        if key == item.order_key {
            return Ok(item);
        }

        let now = Utc::now();
        let mut new_data = serde_json::Map::new();
        new_data.insert("order_key".into(), json!(key));
        new_data.insert("updated_at".into(), json!(fmt_dt(now)));
        let old_data = json!({
            "order_key": item.order_key,
            "updated_at": fmt_dt(item.updated_at),
        });
        self.db().write_row("work_items", id, &new_data)?;

        let action = self.record(
            &NewAction {
                action_type: ActionType::Move,
                description: format!("Moved \"{}\"", item.name),
                work_item_id: Some(id.to_string()),
            },
            &[StepData {
                step_type: StepType::Update,
                table_name: "work_items",
                record_id: id.to_string(),
                old_data: Some(old_data),
                new_data: Some(serde_json::Value::Object(new_data)),
            }],
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(WorkItem {
            order_key: key,
            updated_at: now,
            ..item
        })
    }
}
