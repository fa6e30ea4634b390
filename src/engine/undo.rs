use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::Engine;
use crate::error::{Result, WorkstackError};
use crate::model::{Action, ActionType, StepType, UndoStep};
use crate::store::NewAction;

fn snapshot<'a>(step: &'a UndoStep, data: &'a Option<Value>, side: &str) -> Result<&'a Map<String, Value>> {
    data.as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| {
            WorkstackError::Validation(format!(
                "undo step {}#{} has no usable {side} snapshot",
                step.action_id, step.step_order
            ))
        })
}

impl Engine {
    /// Revert the most recent action that is not undone and not itself an
    /// undo/redo marker. Returns the reverted action, or `None` when the
    /// history is exhausted.
    pub fn undo_last_action(&self) -> Result<Option<Action>> {
        let tx = self.db().conn().unchecked_transaction()?;
        let Some(target) = self.db().latest_undoable_action()? else {
            return Ok(None);
        };

        let steps = self.db().find_steps(&target.action_id)?;
        for step in steps.iter().rev() {
            self.apply_inverse(step)?;
        }

        let marker = self.db().record_action(
            &NewAction {
                action_type: ActionType::UndoAction,
                description: format!("Undid: {}", target.description),
                work_item_id: target.work_item_id.clone(),
            },
            &[],
        )?;
        self.db()
            .set_action_undone(&target.action_id, true, Some(&marker.action_id))?;
        tx.commit()?;
        self.notify(&marker);
        debug!(action_id = %target.action_id, "undid action");
        self.db().find_action(&target.action_id)
    }

    /// Re-apply the most recently undone action that has not been
    /// invalidated by a later mutation. Returns the re-applied action, or
    /// `None` when nothing is redoable.
    pub fn redo_last_action(&self) -> Result<Option<Action>> {
        let tx = self.db().conn().unchecked_transaction()?;
        let Some(target) = self.db().latest_redoable_action()? else {
            return Ok(None);
        };

        let steps = self.db().find_steps(&target.action_id)?;
        for step in &steps {
            self.apply_forward(step)?;
        }

        self.db().set_action_undone(&target.action_id, false, None)?;
        let marker = self.db().record_action(
            &NewAction {
                action_type: ActionType::RedoAction,
                description: format!("Redid: {}", target.description),
                work_item_id: target.work_item_id.clone(),
            },
            &[],
        )?;
        tx.commit()?;
        self.notify(&marker);
        debug!(action_id = %target.action_id, "redid action");
        self.db().find_action(&target.action_id)
    }

    /// Invert one recorded step. The forward operation is named by
    /// `step_type`; undo applies its inverse.
    fn apply_inverse(&self, step: &UndoStep) -> Result<()> {
        match step.step_type {
            StepType::Update => self.db().write_row(
                &step.table_name,
                &step.record_id,
                snapshot(step, &step.old_data, "old_data")?,
            ),
            StepType::Insert => self.db().delete_row(&step.table_name, &step.record_id),
            StepType::Delete => self.db().write_row(
                &step.table_name,
                &step.record_id,
                snapshot(step, &step.new_data, "new_data")?,
            ),
        }
    }

    /// Re-apply one recorded step as originally performed.
    fn apply_forward(&self, step: &UndoStep) -> Result<()> {
        match step.step_type {
            StepType::Update | StepType::Insert => self.db().write_row(
                &step.table_name,
                &step.record_id,
                snapshot(step, &step.new_data, "new_data")?,
            ),
            StepType::Delete => self.db().delete_row(&step.table_name, &step.record_id),
        }
    }
}
