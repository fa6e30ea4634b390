pub mod add;
pub mod delete;
pub mod deps;
pub mod move_item;
pub mod promote;
pub mod undo;
pub mod update;

pub use add::{NewDependency, NewWorkItem};
pub use delete::DeleteSummary;
pub use update::FieldUpdate;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Result, WorkstackError};
use crate::model::{Action, Dependency, WorkItem, fmt_dt};
use crate::store::{Db, NewAction, StepData};
use crate::store::replay::RECORD_ID_SEPARATOR;

/// Receives committed actions. Notified only after the transaction commits;
/// pre-commit notification is forbidden.
pub trait EventSink: Send + Sync {
    fn action_committed(&self, action: &Action);
}

/// The mutation engine. One method per mutation; each opens one transaction
/// covering the data change, the action insert, the undo-step inserts, and
/// the redo-tail invalidation.
pub struct Engine {
    db: Db,
    sink: Option<Box<dyn EventSink>>,
}

impl Engine {
    pub fn new(db: Db) -> Self {
        Self { db, sink: None }
    }

    pub fn with_sink(db: Db, sink: Box<dyn EventSink>) -> Self {
        Self {
            db,
            sink: Some(sink),
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn notify(&self, action: &Action) {
        debug!(
            action_type = action.action_type.as_str(),
            action_id = %action.action_id,
            "action committed"
        );
        if let Some(sink) = &self.sink {
            sink.action_committed(action);
        }
    }

    /// Append the action plus steps and clear the redo tail. Callers hold
    /// the transaction.
    pub(crate) fn record(&self, meta: &NewAction, steps: &[StepData]) -> Result<Action> {
        let action = self.db.record_action(meta, steps)?;
        self.db.invalidate_redo_tail(&action.action_id)?;
        Ok(action)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > 255 {
        return Err(WorkstackError::Validation(
            "name must be between 1 and 255 characters".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_description(description: Option<&str>) -> Result<()> {
    if let Some(d) = description
        && d.chars().count() > 1024
    {
        return Err(WorkstackError::Validation(
            "description must be at most 1024 characters".to_string(),
        ));
    }
    Ok(())
}

/// Full column snapshot of a work item, as stored.
pub(crate) fn item_row(item: &WorkItem) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("work_item_id".into(), json!(item.work_item_id));
    map.insert(
        "parent_work_item_id".into(),
        json!(item.parent_work_item_id),
    );
    map.insert("name".into(), json!(item.name));
    map.insert("description".into(), json!(item.description));
    map.insert("status".into(), json!(item.status.as_str()));
    map.insert("priority".into(), json!(item.priority.as_str()));
    map.insert("due_date".into(), json!(item.due_date.map(fmt_dt)));
    map.insert("order_key".into(), json!(item.order_key));
    map.insert("is_active".into(), json!(item.is_active));
    map.insert("created_at".into(), json!(fmt_dt(item.created_at)));
    map.insert("updated_at".into(), json!(fmt_dt(item.updated_at)));
    map
}

/// Full column snapshot of a dependency edge.
pub(crate) fn dep_row(dep: &Dependency) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("work_item_id".into(), json!(dep.work_item_id));
    map.insert(
        "depends_on_work_item_id".into(),
        json!(dep.depends_on_work_item_id),
    );
    map.insert(
        "dependency_type".into(),
        json!(dep.dependency_type.as_str()),
    );
    map.insert("is_active".into(), json!(dep.is_active));
    map
}

pub(crate) fn dep_record_id(work_item_id: &str, depends_on: &str) -> String {
    format!("{work_item_id}{RECORD_ID_SEPARATOR}{depends_on}")
}
