use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::engine::{Engine, validate_description, validate_name};
use crate::error::Result;
use crate::model::{ActionType, Priority, Status, StepType, WorkItem, fmt_dt};
use crate::store::{NewAction, StepData};

/// A partial update. `None` leaves a field alone; the nested options on
/// `description` and `due_date` distinguish "set" from "clear".
#[derive(Debug, Default, Clone)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl Engine {
    /// Apply a partial update to an active item. A payload that changes no
    /// column records no action and returns the current item.
    pub fn update_fields(&self, id: &str, update: FieldUpdate) -> Result<WorkItem> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(description) = &update.description {
            validate_description(description.as_deref())?;
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let item = self.db().require_active_item(id)?;

        let mut old_data = Map::new();
        let mut new_data = Map::new();
        let mut record = |field: &str, old: Value, new: Value| {
            if old != new {
                old_data.insert(field.to_string(), old);
                new_data.insert(field.to_string(), new);
            }
        };

        if let Some(name) = &update.name {
            record("name", json!(item.name), json!(name));
        }
        if let Some(description) = &update.description {
            record("description", json!(item.description), json!(description));
        }
        if let Some(status) = update.status {
            record("status", json!(item.status.as_str()), json!(status.as_str()));
        }
        if let Some(priority) = update.priority {
            record(
                "priority",
                json!(item.priority.as_str()),
                json!(priority.as_str()),
            );
        }
        if let Some(due_date) = update.due_date {
            record(
                "due_date",
                json!(item.due_date.map(fmt_dt)),
                json!(due_date.map(fmt_dt)),
            );
        }

        if new_data.is_empty() {
            return Ok(item);
        }
        let fields: Vec<&str> = new_data.keys().map(String::as_str).collect();
        let summary = fields.join(", ");

        let now = Utc::now();
        old_data.insert("updated_at".into(), json!(fmt_dt(item.updated_at)));
        new_data.insert("updated_at".into(), json!(fmt_dt(now)));

        self.db().write_row("work_items", id, &new_data)?;
        let action = self.record(
            &NewAction {
                action_type: ActionType::UpdateFields,
                description: format!("Updated {summary} of \"{}\"", item.name),
                work_item_id: Some(id.to_string()),
            },
            &[StepData {
                step_type: StepType::Update,
                table_name: "work_items",
                record_id: id.to_string(),
                old_data: Some(Value::Object(old_data)),
                new_data: Some(Value::Object(new_data)),
            }],
        )?;
        tx.commit()?;
        self.notify(&action);
        self.db().require_active_item(id)
    }

    pub fn set_name(&self, id: &str, name: String) -> Result<WorkItem> {
        self.update_fields(
            id,
            FieldUpdate {
                name: Some(name),
                ..FieldUpdate::default()
            },
        )
    }

    pub fn set_description(&self, id: &str, description: Option<String>) -> Result<WorkItem> {
        self.update_fields(
            id,
            FieldUpdate {
                description: Some(description),
                ..FieldUpdate::default()
            },
        )
    }

    pub fn set_status(&self, id: &str, status: Status) -> Result<WorkItem> {
        self.update_fields(
            id,
            FieldUpdate {
                status: Some(status),
                ..FieldUpdate::default()
            },
        )
    }

    pub fn set_priority(&self, id: &str, priority: Priority) -> Result<WorkItem> {
        self.update_fields(
            id,
            FieldUpdate {
                priority: Some(priority),
                ..FieldUpdate::default()
            },
        )
    }

    /// `None` clears the due date.
    pub fn set_due_date(&self, id: &str, due_date: Option<DateTime<Utc>>) -> Result<WorkItem> {
        self.update_fields(
            id,
            FieldUpdate {
                due_date: Some(due_date),
                ..FieldUpdate::default()
            },
        )
    }
}
