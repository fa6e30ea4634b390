use std::collections::HashSet;

use serde::Serialize;
use serde_json::json;

use crate::engine::{Engine, dep_record_id};
use crate::error::{Result, WorkstackError};
use crate::model::{Action, ActionType, StepType, WorkItem};
use crate::store::{NewAction, StepData};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteSummary {
    pub deleted_count: usize,
}

fn deactivate_item_step(id: &str) -> StepData {
    StepData {
        step_type: StepType::Update,
        table_name: "work_items",
        record_id: id.to_string(),
        old_data: Some(json!({"is_active": true})),
        new_data: Some(json!({"is_active": false})),
    }
}

fn deactivate_dep_step(work_item_id: &str, depends_on: &str) -> StepData {
    StepData {
        step_type: StepType::Update,
        table_name: "work_item_dependencies",
        record_id: dep_record_id(work_item_id, depends_on),
        old_data: Some(json!({"is_active": true})),
        new_data: Some(json!({"is_active": false})),
    }
}

impl Engine {
    /// Soft-delete a root project and its whole subtree.
    pub fn delete_project(&self, project_id: &str) -> Result<DeleteSummary> {
        let tx = self.db().conn().unchecked_transaction()?;
        let project = self.db().require_active_item(project_id)?;
        if !project.is_root() {
            return Err(WorkstackError::Validation(format!(
                "work item {project_id} is not a root project"
            )));
        }

        let (summary, action) = self.deactivate_subtrees(
            vec![project.clone()],
            &NewAction {
                action_type: ActionType::DeleteSubtree,
                description: format!("Deleted project \"{}\"", project.name),
                work_item_id: Some(project.work_item_id.clone()),
            },
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(summary)
    }

    /// Soft-delete one or more non-root tasks (each with its subtree) as a
    /// single action. Roots are rejected.
    pub fn delete_tasks(&self, work_item_ids: &[String]) -> Result<DeleteSummary> {
        if work_item_ids.is_empty() {
            return Err(WorkstackError::Validation(
                "work_item_ids must contain at least one id".to_string(),
            ));
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let mut targets = Vec::new();
        for id in work_item_ids {
            let item = self.db().require_active_item(id)?;
            if item.is_root() {
                return Err(WorkstackError::Conflict(format!(
                    "work item {id} is a root project; use delete_project"
                )));
            }
            targets.push(item);
        }

        let description = match targets.as_slice() {
            [only] => format!("Deleted task \"{}\"", only.name),
            many => format!("Deleted {} task(s)", many.len()),
        };
        let work_item_id = Some(targets[0].work_item_id.clone());
        let (summary, action) = self.deactivate_subtrees(
            targets,
            &NewAction {
                action_type: ActionType::DeleteSubtree,
                description,
                work_item_id,
            },
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(summary)
    }

    /// Soft-delete children of a parent: either the listed ones or, with
    /// `delete_all`, every active child. Exactly one selector must be used.
    pub fn delete_child_tasks(
        &self,
        parent_work_item_id: &str,
        child_task_ids: Option<&[String]>,
        delete_all: bool,
    ) -> Result<DeleteSummary> {
        if delete_all == child_task_ids.is_some() {
            return Err(WorkstackError::Validation(
                "specify exactly one of child_task_ids or delete_all_children".to_string(),
            ));
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let parent = self.db().require_active_item(parent_work_item_id)?;

        let targets = match child_task_ids {
            Some(ids) => {
                let mut targets = Vec::new();
                for id in ids {
                    let item = self.db().require_active_item(id)?;
                    if item.parent_work_item_id.as_deref() != Some(parent_work_item_id) {
                        return Err(WorkstackError::Validation(format!(
                            "work item {id} is not a child of {parent_work_item_id}"
                        )));
                    }
                    targets.push(item);
                }
                targets
            }
            None => self.db().find_children(
                Some(parent_work_item_id),
                crate::store::ActiveFilter::ActiveOnly,
                None,
            )?,
        };
        if targets.is_empty() {
            return Ok(DeleteSummary { deleted_count: 0 });
        }

        let description = format!(
            "Deleted {} child task(s) of \"{}\"",
            targets.len(),
            parent.name
        );
        let (summary, action) = self.deactivate_subtrees(
            targets,
            &NewAction {
                action_type: ActionType::DeleteSubtree,
                description,
                work_item_id: Some(parent.work_item_id.clone()),
            },
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(summary)
    }

    /// Deactivate the given roots plus all their descendants and every
    /// active dependency edge touching the set. One step per affected row.
    fn deactivate_subtrees(
        &self,
        roots: Vec<WorkItem>,
        meta: &NewAction,
    ) -> Result<(DeleteSummary, Action)> {
        let mut ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for root in &roots {
            if seen.insert(root.work_item_id.clone()) {
                ids.push(root.work_item_id.clone());
            }
            for descendant in self.db().find_descendants(&root.work_item_id)? {
                if descendant.is_active && seen.insert(descendant.work_item_id.clone()) {
                    ids.push(descendant.work_item_id);
                }
            }
        }

        let edges = self.db().find_edges_touching(&ids)?;
        let mut steps: Vec<StepData> = ids.iter().map(|id| deactivate_item_step(id)).collect();
        steps.extend(
            edges
                .iter()
                .map(|e| deactivate_dep_step(&e.work_item_id, &e.depends_on_work_item_id)),
        );

        self.db().soft_delete_items(&ids)?;
        self.db().deactivate_dependencies(
            &edges
                .iter()
                .map(|e| {
                    (
                        e.work_item_id.clone(),
                        e.depends_on_work_item_id.clone(),
                    )
                })
                .collect::<Vec<_>>(),
        )?;

        let action = self.record(meta, &steps)?;
        Ok((
            DeleteSummary {
                deleted_count: ids.len(),
            },
            action,
        ))
    }
}
