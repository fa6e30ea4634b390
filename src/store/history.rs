use chrono::{DateTime, Utc};
use rusqlite::{Row, params, params_from_iter, types::Value};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Action, ActionType, StepType, UndoStep, fmt_dt};
use crate::store::db::{Db, parse_dt};

const ACTION_COLUMNS: &str = "seq, action_id, work_item_id, action_type, description, \
     is_undone, undone_at_action_id, created_at";

/// Metadata for the action row a mutation appends.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub action_type: ActionType,
    pub description: String,
    pub work_item_id: Option<String>,
}

/// One not-yet-persisted undo step, in forward order.
#[derive(Debug, Clone)]
pub struct StepData {
    pub step_type: StepType,
    pub table_name: &'static str,
    pub record_id: String,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        seq: row.get(0)?,
        action_id: row.get(1)?,
        work_item_id: row.get(2)?,
        action_type: row.get(3)?,
        description: row.get(4)?,
        is_undone: row.get(5)?,
        undone_at_action_id: row.get(6)?,
        created_at: parse_dt(&row.get::<_, String>(7)?),
    })
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<UndoStep> {
    let old_data: Option<String> = row.get(5)?;
    let new_data: Option<String> = row.get(6)?;
    Ok(UndoStep {
        action_id: row.get(0)?,
        step_order: row.get(1)?,
        step_type: row.get(2)?,
        table_name: row.get(3)?,
        record_id: row.get(4)?,
        old_data: old_data.and_then(|s| serde_json::from_str(&s).ok()),
        new_data: new_data.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

impl Db {
    /// Append one action plus its ordered undo steps. Steps are given in
    /// forward order; `step_order` is assigned monotonically.
    pub fn record_action(&self, meta: &NewAction, steps: &[StepData]) -> Result<Action> {
        let action_id = Uuid::new_v4().to_string();
        let now = fmt_dt(Utc::now());
        self.conn().execute(
            "INSERT INTO action_history
                 (action_id, work_item_id, action_type, description, is_undone, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                action_id,
                meta.work_item_id,
                meta.action_type.to_string(),
                meta.description,
                now,
            ],
        )?;
        let seq = self.conn().last_insert_rowid();

        let mut stmt = self.conn().prepare(
            "INSERT INTO undo_steps
                 (action_id, step_order, step_type, table_name, record_id, old_data, new_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (i, step) in steps.iter().enumerate() {
            stmt.execute(params![
                action_id,
                i as i64 + 1,
                step.step_type.to_string(),
                step.table_name,
                step.record_id,
                step.old_data.as_ref().map(|v| v.to_string()),
                step.new_data.as_ref().map(|v| v.to_string()),
            ])?;
        }

        Ok(Action {
            action_id,
            seq,
            work_item_id: meta.work_item_id.clone(),
            action_type: meta.action_type,
            description: meta.description.clone(),
            is_undone: false,
            undone_at_action_id: None,
            created_at: parse_dt(&now),
        })
    }

    /// Re-point every prior undone-via-UNDO action at `current_action_id`.
    /// Such actions stay flagged undone but are no longer redoable.
    pub fn invalidate_redo_tail(&self, current_action_id: &str) -> Result<usize> {
        let changed = self.conn().execute(
            "UPDATE action_history SET undone_at_action_id = ?1
             WHERE is_undone = 1
               AND undone_at_action_id IN
                   (SELECT action_id FROM action_history WHERE action_type = 'UNDO_ACTION')
               AND seq < (SELECT seq FROM action_history WHERE action_id = ?1)",
            params![current_action_id],
        )?;
        Ok(changed)
    }

    /// The newest action that is not undone and not an undo/redo marker.
    pub fn latest_undoable_action(&self) -> Result<Option<Action>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM action_history
             WHERE is_undone = 0 AND action_type NOT IN ('UNDO_ACTION', 'REDO_ACTION')
             ORDER BY seq DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query_map([], action_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// The most recently undone action that has not been invalidated:
    /// its `undone_at_action_id` still points at an UNDO_ACTION. Ordering
    /// by the undo marker's sequence makes redo LIFO over undos, so a
    /// multi-step undo chain re-applies in original order.
    pub fn latest_redoable_action(&self) -> Result<Option<Action>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACTION_COLUMNS_A} FROM action_history a
             JOIN action_history meta ON meta.action_id = a.undone_at_action_id
             WHERE a.is_undone = 1 AND meta.action_type = 'UNDO_ACTION'
             ORDER BY meta.seq DESC LIMIT 1",
            ACTION_COLUMNS_A = "a.seq, a.action_id, a.work_item_id, a.action_type, \
                 a.description, a.is_undone, a.undone_at_action_id, a.created_at"
        ))?;
        let mut rows = stmt.query_map([], action_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn find_action(&self, action_id: &str) -> Result<Option<Action>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM action_history WHERE action_id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![action_id], action_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Steps of one action in forward (`step_order` ascending) order.
    pub fn find_steps(&self, action_id: &str) -> Result<Vec<UndoStep>> {
        let mut stmt = self.conn().prepare(
            "SELECT action_id, step_order, step_type, table_name, record_id, old_data, new_data
             FROM undo_steps WHERE action_id = ?1 ORDER BY step_order",
        )?;
        let rows = stmt.query_map(params![action_id], step_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn set_action_undone(
        &self,
        action_id: &str,
        is_undone: bool,
        undone_at_action_id: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE action_history SET is_undone = ?2, undone_at_action_id = ?3
             WHERE action_id = ?1",
            params![action_id, is_undone, undone_at_action_id],
        )?;
        Ok(())
    }

    /// History listing, newest first. `start` is inclusive, `end` exclusive.
    pub fn list_actions(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Action>> {
        let mut sql = format!("SELECT {ACTION_COLUMNS} FROM action_history WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();
        if let Some(start) = start {
            sql.push_str(" AND created_at >= ?");
            values.push(Value::Text(fmt_dt(start)));
        }
        if let Some(end) = end {
            sql.push_str(" AND created_at < ?");
            values.push(Value::Text(fmt_dt(end)));
        }
        sql.push_str(" ORDER BY seq DESC LIMIT ?");
        values.push(Value::Integer(limit as i64));

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), action_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}
