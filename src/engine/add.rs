use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::engine::{
    Engine, dep_record_id, dep_row, item_row, validate_description, validate_name,
};
use crate::error::{Result, WorkstackError};
use crate::model::{
    ActionType, Dependency, DependencyType, Position, Priority, Status, StepType, SubtreeSpec,
    WorkItem,
};
use crate::order_key;
use crate::store::{Edge, NewAction, Side, StepData};

/// Parameters for a single work-item insert.
#[derive(Debug, Default, Clone)]
pub struct NewWorkItem {
    pub parent_work_item_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub dependencies: Vec<NewDependency>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct NewDependency {
    pub depends_on_work_item_id: String,
    pub dependency_type: DependencyType,
}

/// Undo step for a freshly inserted row: undo flips it back to inactive.
pub(crate) fn added_item_step(item: &WorkItem) -> StepData {
    StepData {
        step_type: StepType::Update,
        table_name: "work_items",
        record_id: item.work_item_id.clone(),
        old_data: Some(json!({"is_active": false})),
        new_data: Some(serde_json::Value::Object(item_row(item))),
    }
}

/// Undo step for a dependency upsert. A fresh insert records an inactive
/// `old_data` so undo deactivates it; a reactivation records the
/// pre-reactivation row.
pub(crate) fn upsert_dep_step(existing: Option<&Dependency>, dep: &Dependency) -> StepData {
    let old_data = match existing {
        Some(prior) => serde_json::Value::Object(dep_row(prior)),
        None => json!({"is_active": false}),
    };
    StepData {
        step_type: StepType::Update,
        table_name: "work_item_dependencies",
        record_id: dep_record_id(&dep.work_item_id, &dep.depends_on_work_item_id),
        old_data: Some(old_data),
        new_data: Some(serde_json::Value::Object(dep_row(dep))),
    }
}

impl Engine {
    pub fn create_project(&self, name: String, description: Option<String>) -> Result<WorkItem> {
        self.add_work_item(NewWorkItem {
            name,
            description,
            ..NewWorkItem::default()
        })
    }

    /// Insert one work item under an optional parent, positioned within its
    /// sibling list, with optional initial dependencies.
    pub fn add_work_item(&self, new: NewWorkItem) -> Result<WorkItem> {
        validate_name(&new.name)?;
        validate_description(new.description.as_deref())?;

        let tx = self.db().conn().unchecked_transaction()?;

        if let Some(parent_id) = new.parent_work_item_id.as_deref() {
            let parent = self.db().require_active_item(parent_id)?;
            if parent.status == Status::Done {
                return Err(WorkstackError::Validation(format!(
                    "cannot add a child under work item {parent_id} whose status is done"
                )));
            }
        }

        let (before, after) =
            self.resolve_neighbours(new.parent_work_item_id.as_deref(), &new.position, None)?;
        let now = Utc::now();
        let item = WorkItem {
            work_item_id: Uuid::new_v4().to_string(),
            parent_work_item_id: new.parent_work_item_id.clone(),
            name: new.name,
            description: new.description,
            status: new.status,
            priority: new.priority,
            due_date: new.due_date,
            order_key: order_key::key_between(before.as_deref(), after.as_deref())?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db().insert_item(&item)?;
        let mut steps = vec![added_item_step(&item)];

        let mut seen = HashSet::new();
        for dep in &new.dependencies {
            let target = dep.depends_on_work_item_id.as_str();
            if !seen.insert(target.to_string()) {
                continue;
            }
            self.db().require_active_item(target)?;
            let edge = Dependency {
                work_item_id: item.work_item_id.clone(),
                depends_on_work_item_id: target.to_string(),
                dependency_type: dep.dependency_type,
                is_active: true,
            };
            self.db().upsert_dependency(&edge)?;
            steps.push(upsert_dep_step(None, &edge));
        }

        let kind = if item.is_root() { "project" } else { "task" };
        let action = self.record(
            &NewAction {
                action_type: ActionType::Add,
                description: format!("Added {kind} \"{}\"", item.name),
                work_item_id: Some(item.work_item_id.clone()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        debug!(work_item_id = %item.work_item_id, "added work item");
        Ok(item)
    }

    /// Bulk-insert a nested task forest under an active parent as one
    /// action. Returns created items in depth-first order.
    pub fn add_child_tasks(
        &self,
        parent_id: &str,
        specs: &[SubtreeSpec],
    ) -> Result<Vec<WorkItem>> {
        if specs.is_empty() {
            return Err(WorkstackError::Validation(
                "child_tasks_tree must contain at least one task".to_string(),
            ));
        }

        let tx = self.db().conn().unchecked_transaction()?;
        let parent = self.db().require_active_item(parent_id)?;
        if parent.status == Status::Done {
            return Err(WorkstackError::Validation(format!(
                "cannot add a child under work item {parent_id} whose status is done"
            )));
        }

        let mut created = Vec::new();
        let mut steps = Vec::new();
        let mut end_keys = HashMap::new();
        self.insert_spec_forest(Some(parent_id), specs, &mut end_keys, &mut created, &mut steps)?;

        let action = self.record(
            &NewAction {
                action_type: ActionType::Add,
                description: format!(
                    "Added {} child task(s) under \"{}\"",
                    created.len(),
                    parent.name
                ),
                work_item_id: Some(parent.work_item_id.clone()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(created)
    }

    /// Recreate an exported subtree, optionally under a parent. The whole
    /// import is one action.
    pub fn import_tree(
        &self,
        spec: &SubtreeSpec,
        parent_id: Option<&str>,
    ) -> Result<Vec<WorkItem>> {
        let tx = self.db().conn().unchecked_transaction()?;
        if let Some(pid) = parent_id {
            let parent = self.db().require_active_item(pid)?;
            if parent.status == Status::Done {
                return Err(WorkstackError::Validation(format!(
                    "cannot add a child under work item {pid} whose status is done"
                )));
            }
        }

        let mut created = Vec::new();
        let mut steps = Vec::new();
        let mut end_keys = HashMap::new();
        self.insert_spec_forest(
            parent_id,
            std::slice::from_ref(spec),
            &mut end_keys,
            &mut created,
            &mut steps,
        )?;

        let action = self.record(
            &NewAction {
                action_type: ActionType::Add,
                description: format!(
                    "Imported \"{}\" ({} work item(s))",
                    spec.name,
                    created.len()
                ),
                work_item_id: created.first().map(|w| w.work_item_id.clone()),
            },
            &steps,
        )?;
        tx.commit()?;
        self.notify(&action);
        Ok(created)
    }

    fn insert_spec_forest(
        &self,
        parent_id: Option<&str>,
        specs: &[SubtreeSpec],
        end_keys: &mut HashMap<Option<String>, Option<String>>,
        created: &mut Vec<WorkItem>,
        steps: &mut Vec<StepData>,
    ) -> Result<()> {
        for spec in specs {
            validate_name(&spec.name)?;
            validate_description(spec.description.as_deref())?;

            let slot = parent_id.map(str::to_string);
            let last = match end_keys.get(&slot) {
                Some(cached) => cached.clone(),
                None => {
                    let key =
                        self.db()
                            .sibling_edge_order_key(parent_id, Edge::Last, None)?;
                    end_keys.insert(slot.clone(), key.clone());
                    key
                }
            };
            let key = order_key::key_between(last.as_deref(), None)?;
            end_keys.insert(slot, Some(key.clone()));

            let now = Utc::now();
            let item = WorkItem {
                work_item_id: Uuid::new_v4().to_string(),
                parent_work_item_id: parent_id.map(str::to_string),
                name: spec.name.clone(),
                description: spec.description.clone(),
                status: spec.status,
                priority: spec.priority,
                due_date: spec.due_date,
                order_key: key,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            self.db().insert_item(&item)?;
            steps.push(added_item_step(&item));
            let id = item.work_item_id.clone();
            created.push(item);

            self.insert_spec_forest(Some(&id), &spec.children, end_keys, created, steps)?;
        }
        Ok(())
    }

    /// The `(before, after)` order-key pair for an insert or move target
    /// slot. `exclude` is the item being moved, if any.
    pub(crate) fn resolve_neighbours(
        &self,
        parent_id: Option<&str>,
        position: &Position,
        exclude: Option<&str>,
    ) -> Result<(Option<String>, Option<String>)> {
        match position {
            Position::Start => Ok((
                None,
                self.db()
                    .sibling_edge_order_key(parent_id, Edge::First, exclude)?,
            )),
            Position::End => Ok((
                self.db()
                    .sibling_edge_order_key(parent_id, Edge::Last, exclude)?,
                None,
            )),
            Position::After(reference) | Position::Before(reference) => {
                let sibling = self.db().require_active_item(reference)?;
                if sibling.parent_work_item_id.as_deref() != parent_id {
                    return Err(WorkstackError::Validation(format!(
                        "work item {reference} is not a sibling under the target parent"
                    )));
                }
                let side = match position {
                    Position::After(_) => Side::After,
                    _ => Side::Before,
                };
                self.db()
                    .neighbour_order_keys(parent_id, reference, side, exclude)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Db;

    fn engine() -> Engine {
        Engine::new(Db::open_memory().unwrap())
    }

    #[test]
    fn create_project_lands_at_root_end() {
        let engine = engine();
        let a = engine.create_project("First".into(), None).unwrap();
        let b = engine.create_project("Second".into(), None).unwrap();
        assert!(a.is_root() && b.is_root());
        assert!(a.order_key < b.order_key);
    }

    #[test]
    fn add_task_requires_active_parent() {
        let engine = engine();
        let err = engine
            .add_work_item(NewWorkItem {
                parent_work_item_id: Some("missing".into()),
                name: "orphan".into(),
                ..NewWorkItem::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("not found or is inactive"));
    }

    #[test]
    fn add_task_under_done_parent_is_rejected() {
        let engine = engine();
        let project = engine.create_project("P".into(), None).unwrap();
        engine
            .set_status(&project.work_item_id, Status::Done)
            .unwrap();

        let err = engine
            .add_work_item(NewWorkItem {
                parent_work_item_id: Some(project.work_item_id.clone()),
                name: "late".into(),
                ..NewWorkItem::default()
            })
            .unwrap_err();
        assert!(matches!(err, WorkstackError::Validation(_)));
        assert!(err.to_string().contains("done"));
    }

    #[test]
    fn insert_before_and_after_position_correctly() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let add = |name: &str, position: Position| {
            engine
                .add_work_item(NewWorkItem {
                    parent_work_item_id: Some(p.work_item_id.clone()),
                    name: name.into(),
                    position,
                    ..NewWorkItem::default()
                })
                .unwrap()
        };
        let a = add("A", Position::End);
        let c = add("C", Position::End);
        let b = add("B", Position::After(a.work_item_id.clone()));
        let z = add("Z", Position::Start);
        let _ = b;

        let names: Vec<String> = engine
            .db()
            .find_children(Some(&p.work_item_id), crate::store::ActiveFilter::ActiveOnly, None)
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Z", "A", "B", "C"]);
        assert!(z.order_key < a.order_key && a.order_key < c.order_key);
    }

    #[test]
    fn insert_after_foreign_sibling_is_rejected() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let other = engine.create_project("Other".into(), None).unwrap();

        let err = engine
            .add_work_item(NewWorkItem {
                parent_work_item_id: Some(p.work_item_id),
                name: "task".into(),
                position: Position::After(other.work_item_id),
                ..NewWorkItem::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("not a sibling"));
    }

    #[test]
    fn add_with_dependencies_validates_targets() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();

        let err = engine
            .add_work_item(NewWorkItem {
                parent_work_item_id: Some(p.work_item_id.clone()),
                name: "task".into(),
                dependencies: vec![NewDependency {
                    depends_on_work_item_id: "ghost".into(),
                    dependency_type: DependencyType::FinishToStart,
                }],
                ..NewWorkItem::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("not found or is inactive"));

        // the failed insert rolled back entirely
        let children = engine
            .db()
            .find_children(Some(&p.work_item_id), crate::store::ActiveFilter::ActiveOnly, None)
            .unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn add_child_tasks_is_depth_first_and_one_action() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let specs: Vec<SubtreeSpec> = serde_json::from_value(serde_json::json!([
            {"name": "A", "children": [{"name": "A1"}, {"name": "A2"}]},
            {"name": "B"}
        ]))
        .unwrap();

        let created = engine.add_child_tasks(&p.work_item_id, &specs).unwrap();
        let names: Vec<_> = created.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A1", "A2", "B"]);

        let actions = engine.db().list_actions(None, None, 10).unwrap();
        // one for the project, one for the whole bulk add
        assert_eq!(actions.len(), 2);
        let steps = engine.db().find_steps(&actions[0].action_id).unwrap();
        assert_eq!(steps.len(), 4);
    }
}
