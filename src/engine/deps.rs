use std::collections::HashSet;

use serde_json::json;

use crate::engine::add::upsert_dep_step;
use crate::engine::{Engine, NewDependency, dep_record_id, dep_row};
use crate::error::{Result, WorkstackError};
use crate::model::{ActionType, Dependency, DependencyType, StepType, WorkItem};
use crate::store::{NewAction, StepData};

impl Engine {
    /// Upsert a set of outgoing edges for one item. Existing deactivated
    /// edges are reactivated; edges already active with the same type are
    /// skipped. Skipping everything makes the call a no-op with no action.
    pub fn add_dependencies(&self, id: &str, deps: &[NewDependency]) -> Result<WorkItem> {
        if deps.is_empty() {
            return Err(WorkstackError::Validation(
                "dependencies must contain at least one entry".to_string(),
            ));
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let item = self.db().require_active_item(id)?;

        let mut steps = Vec::new();
        let mut seen = HashSet::new();
        for dep in deps {
            let target = dep.depends_on_work_item_id.as_str();
            if !seen.insert(target.to_string()) {
                continue;
            }
            if target == id {
                return Err(WorkstackError::Validation(format!(
                    "work item {id} cannot depend on itself"
                )));
            }
            self.db().require_active_item(target)?;

            let existing = self.db().find_dependency(id, target)?;
            if let Some(prior) = &existing
                && prior.is_active
                && prior.dependency_type == dep.dependency_type
            {
                continue;
            }
            if dep.dependency_type == DependencyType::FinishToStart
                && self.db().would_cycle(id, target)?
            {
                return Err(WorkstackError::Validation(format!(
                    "dependency on {target} would create a dependency cycle"
                )));
            }

            let edge = Dependency {
                work_item_id: id.to_string(),
                depends_on_work_item_id: target.to_string(),
                dependency_type: dep.dependency_type,
                is_active: true,
            };
            self.db().upsert_dependency(&edge)?;
            steps.push(upsert_dep_step(existing.as_ref(), &edge));
        }

        if steps.is_empty() {
            return Ok(item);
        }
        let action = self.record(
            &NewAction {
                action_type: ActionType::AddDependencies,
                description: format!(
                    "Added {} dependency(ies) to \"{}\"",
                    steps.len(),
                    item.name
                ),
                work_item_id: Some(id.to_string()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(item)
    }

    /// Deactivate the listed outgoing edges. Every key must address an
    /// active edge.
    pub fn delete_dependencies(
        &self,
        id: &str,
        depends_on_work_item_ids: &[String],
    ) -> Result<WorkItem> {
        if depends_on_work_item_ids.is_empty() {
            return Err(WorkstackError::Validation(
                "depends_on_work_item_ids must contain at least one id".to_string(),
            ));
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let item = self.db().require_active_item(id)?;

        let mut steps = Vec::new();
        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        for target in depends_on_work_item_ids {
            if !seen.insert(target.clone()) {
                continue;
            }
            let edge = self
                .db()
                .find_dependency(id, target)?
                .filter(|d| d.is_active)
                .ok_or_else(|| {
                    WorkstackError::Validation(format!(
                        "no active dependency from {id} to {target}"
                    ))
                })?;
            steps.push(StepData {
                step_type: StepType::Update,
                table_name: "work_item_dependencies",
                record_id: dep_record_id(id, target),
                old_data: Some(serde_json::Value::Object(dep_row(&edge))),
                new_data: Some(json!({"is_active": false})),
            });
            keys.push((id.to_string(), target.clone()));
        }
        self.db().deactivate_dependencies(&keys)?;

        let action = self.record(
            &NewAction {
                action_type: ActionType::DeleteDependencies,
                description: format!(
                    "Removed {} dependency(ies) from \"{}\"",
                    keys.len(),
                    item.name
                ),
                work_item_id: Some(id.to_string()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NewDependency;
    use crate::store::{ActiveFilter, Db};

    fn engine() -> Engine {
        Engine::new(Db::open_memory().unwrap())
    }

    fn dep(target: &str, dependency_type: DependencyType) -> NewDependency {
        NewDependency {
            depends_on_work_item_id: target.to_string(),
            dependency_type,
        }
    }

    #[test]
    fn add_and_remove_edge_round_trip() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let b = engine.create_project("B".into(), None).unwrap();

        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&b.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();
        assert_eq!(
            engine
                .db()
                .find_dependencies(&a.work_item_id, ActiveFilter::ActiveOnly, None)
                .unwrap()
                .len(),
            1
        );

        engine
            .delete_dependencies(&a.work_item_id, &[b.work_item_id.clone()])
            .unwrap();
        assert!(
            engine
                .db()
                .find_dependencies(&a.work_item_id, ActiveFilter::ActiveOnly, None)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn self_dependency_is_rejected() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let err = engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&a.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn finish_to_start_cycles_are_rejected() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let b = engine.create_project("B".into(), None).unwrap();
        let c = engine.create_project("C".into(), None).unwrap();

        engine
            .add_dependencies(
                &b.work_item_id,
                &[dep(&a.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();
        engine
            .add_dependencies(
                &c.work_item_id,
                &[dep(&b.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();

        let err = engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&c.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap_err();
        assert!(err.to_string().contains("cycle"));

        // a linked back-reference over the same path is fine
        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&c.work_item_id, DependencyType::Linked)],
            )
            .unwrap();
    }

    #[test]
    fn re_adding_an_identical_active_edge_is_a_no_op() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let b = engine.create_project("B".into(), None).unwrap();
        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&b.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();

        let before = engine.db().list_actions(None, None, 10).unwrap().len();
        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&b.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();
        assert_eq!(
            engine.db().list_actions(None, None, 10).unwrap().len(),
            before
        );
    }

    #[test]
    fn deleting_a_missing_edge_is_rejected() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let b = engine.create_project("B".into(), None).unwrap();

        let err = engine
            .delete_dependencies(&a.work_item_id, &[b.work_item_id.clone()])
            .unwrap_err();
        assert!(err.to_string().contains("no active dependency"));
    }

    #[test]
    fn reactivation_records_the_prior_row_for_undo() {
        let engine = engine();
        let a = engine.create_project("A".into(), None).unwrap();
        let b = engine.create_project("B".into(), None).unwrap();
        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&b.work_item_id, DependencyType::FinishToStart)],
            )
            .unwrap();
        engine
            .delete_dependencies(&a.work_item_id, &[b.work_item_id.clone()])
            .unwrap();

        engine
            .add_dependencies(
                &a.work_item_id,
                &[dep(&b.work_item_id, DependencyType::Linked)],
            )
            .unwrap();
        let actions = engine.db().list_actions(None, None, 1).unwrap();
        let steps = engine.db().find_steps(&actions[0].action_id).unwrap();
        let old = steps[0].old_data.as_ref().unwrap().as_object().unwrap();
        // pre-reactivation snapshot: inactive finish-to-start row
        assert_eq!(old["is_active"], false);
        assert_eq!(old["dependency_type"], "finish-to-start");
    }
}
