//! Next-task selection.
//!
//! A candidate is an active `todo` item, optionally restricted to a scope
//! subtree. An active finish-to-start dependency whose target is not done
//! blocks its dependent; `linked` edges never block. Survivors are ranked
//! by due date (nulls last), priority, order key, then creation time.

use rusqlite::params;
use tracing::debug;

use crate::error::Result;
use crate::model::WorkItem;
use crate::store::db::Db;
use crate::store::work_items::{ActiveFilter, ITEM_COLUMNS, item_from_row};

/// `include_tags`/`exclude_tags` are accepted for surface compatibility but
/// have no effect: the data model does not persist tags.
#[derive(Debug, Default, Clone)]
pub struct NextTaskQuery {
    pub scope_item_id: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
}

const BLOCKED_PREDICATE: &str = "NOT EXISTS (
        SELECT 1 FROM work_item_dependencies d
        JOIN work_items t ON t.work_item_id = d.depends_on_work_item_id
        WHERE d.work_item_id = w.work_item_id
          AND d.is_active = 1
          AND d.dependency_type = 'finish-to-start'
          AND t.status != 'done'
    )";

const RANKING: &str = "ORDER BY (w.due_date IS NULL), w.due_date,
        CASE w.priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
        w.order_key, w.created_at
    LIMIT 1";

/// Select the next actionable task, or `None` when everything is blocked,
/// done, or out of scope.
pub fn next_task(db: &Db, query: &NextTaskQuery) -> Result<Option<WorkItem>> {
    if !query.include_tags.is_empty() || !query.exclude_tags.is_empty() {
        debug!("tag filters are accepted but not persisted; ignoring");
    }

    if let Some(scope) = &query.scope_item_id {
        if db.find_item(scope, ActiveFilter::ActiveOnly)?.is_none() {
            return Ok(None);
        }
        let sql = format!(
            "WITH RECURSIVE scope(id) AS (
                SELECT ?1
                UNION
                SELECT w.work_item_id FROM work_items w
                JOIN scope s ON w.parent_work_item_id = s.id
            )
            SELECT {ITEM_COLUMNS_W} FROM work_items w
            WHERE w.is_active = 1 AND w.status = 'todo'
              AND w.work_item_id IN (SELECT id FROM scope)
              AND {BLOCKED_PREDICATE}
            {RANKING}",
            ITEM_COLUMNS_W = qualified_columns(),
        );
        let mut stmt = db.conn().prepare(&sql)?;
        let mut rows = stmt.query_map(params![scope], item_from_row)?;
        return rows.next().transpose().map_err(Into::into);
    }

    let sql = format!(
        "SELECT {ITEM_COLUMNS_W} FROM work_items w
         WHERE w.is_active = 1 AND w.status = 'todo'
           AND {BLOCKED_PREDICATE}
         {RANKING}",
        ITEM_COLUMNS_W = qualified_columns(),
    );
    let mut stmt = db.conn().prepare(&sql)?;
    let mut rows = stmt.query_map([], item_from_row)?;
    rows.next().transpose().map_err(Into::into)
}

fn qualified_columns() -> String {
    ITEM_COLUMNS
        .split(", ")
        .map(|c| format!("w.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, NewDependency, NewWorkItem};
    use crate::model::{DependencyType, Priority, Status};
    use chrono::{Duration, Utc};

    fn engine() -> Engine {
        Engine::new(Db::open_memory().unwrap())
    }

    fn add(
        engine: &Engine,
        parent: &str,
        name: &str,
        priority: Priority,
        due_in: Option<Duration>,
        deps: Vec<NewDependency>,
    ) -> WorkItem {
        engine
            .add_work_item(NewWorkItem {
                parent_work_item_id: Some(parent.to_string()),
                name: name.into(),
                priority,
                due_date: due_in.map(|d| Utc::now() + d),
                dependencies: deps,
                ..NewWorkItem::default()
            })
            .unwrap()
    }

    fn fts(target: &str) -> NewDependency {
        NewDependency {
            depends_on_work_item_id: target.to_string(),
            dependency_type: DependencyType::FinishToStart,
        }
    }

    #[test]
    fn due_date_beats_priority_and_blocked_items_are_skipped() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let pid = p.work_item_id.clone();

        let a1 = add(&engine, &pid, "A1", Priority::Medium, None, vec![]);
        let _a2 = add(&engine, &pid, "A2", Priority::High, None, vec![]);
        let a3 = add(
            &engine,
            &pid,
            "A3",
            Priority::Medium,
            Some(Duration::hours(1)),
            vec![],
        );
        // A6 is due soonest but blocked by the unfinished A1.
        let _a6 = add(
            &engine,
            &pid,
            "A6",
            Priority::High,
            Some(Duration::minutes(30)),
            vec![fts(&a1.work_item_id)],
        );

        let next = next_task(engine.db(), &NextTaskQuery::default())
            .unwrap()
            .unwrap();
        assert_eq!(next.work_item_id, a3.work_item_id);
    }

    #[test]
    fn done_dependency_unblocks_and_priority_breaks_due_ties() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let pid = p.work_item_id.clone();

        let a3 = add(
            &engine,
            &pid,
            "A3",
            Priority::Medium,
            Some(Duration::hours(1)),
            vec![],
        );
        let a5 = add(&engine, &pid, "A5", Priority::Medium, None, vec![]);
        engine.set_status(&a5.work_item_id, Status::Done).unwrap();
        let a7 = add(
            &engine,
            &pid,
            "A7",
            Priority::High,
            Some(Duration::hours(2)),
            vec![fts(&a5.work_item_id)],
        );

        engine.set_status(&a3.work_item_id, Status::Done).unwrap();
        let next = next_task(engine.db(), &NextTaskQuery::default())
            .unwrap()
            .unwrap();
        assert_eq!(next.work_item_id, a7.work_item_id);
    }

    #[test]
    fn linked_edges_never_block() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let pid = p.work_item_id.clone();

        let a = add(&engine, &pid, "A", Priority::Medium, None, vec![]);
        let b = add(
            &engine,
            &pid,
            "B",
            Priority::High,
            None,
            vec![NewDependency {
                depends_on_work_item_id: a.work_item_id.clone(),
                dependency_type: DependencyType::Linked,
            }],
        );

        let next = next_task(engine.db(), &NextTaskQuery::default())
            .unwrap()
            .unwrap();
        assert_eq!(next.work_item_id, b.work_item_id);
    }

    #[test]
    fn scope_restricts_to_a_subtree_including_itself() {
        let engine = engine();
        let p1 = engine.create_project("P1".into(), None).unwrap();
        let p2 = engine.create_project("P2".into(), None).unwrap();
        let urgent = add(
            &engine,
            &p2.work_item_id,
            "urgent",
            Priority::High,
            Some(Duration::minutes(5)),
            vec![],
        );
        let scoped = add(&engine, &p1.work_item_id, "scoped", Priority::Low, None, vec![]);
        // keep the project containers themselves out of the candidate set
        engine
            .set_status(&p1.work_item_id, Status::InProgress)
            .unwrap();
        engine
            .set_status(&p2.work_item_id, Status::InProgress)
            .unwrap();
        let _ = urgent;

        let next = next_task(
            engine.db(),
            &NextTaskQuery {
                scope_item_id: Some(p1.work_item_id.clone()),
                ..NextTaskQuery::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(next.work_item_id, scoped.work_item_id);
    }

    #[test]
    fn unknown_scope_yields_empty_result() {
        let engine = engine();
        engine.create_project("P".into(), None).unwrap();
        let next = next_task(
            engine.db(),
            &NextTaskQuery {
                scope_item_id: Some("ghost".into()),
                ..NextTaskQuery::default()
            },
        )
        .unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn returns_none_when_everything_is_blocked_or_done() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        engine.set_status(&p.work_item_id, Status::Done).unwrap();
        assert!(
            next_task(engine.db(), &NextTaskQuery::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn order_key_breaks_full_ties() {
        let engine = engine();
        let p = engine.create_project("P".into(), None).unwrap();
        let pid = p.work_item_id.clone();
        let first = add(&engine, &pid, "first", Priority::Medium, None, vec![]);
        let second = add(&engine, &pid, "second", Priority::Medium, None, vec![]);

        engine.move_to_start(&second.work_item_id).unwrap();
        let next = next_task(engine.db(), &NextTaskQuery::default())
            .unwrap()
            .unwrap();
        assert_eq!(next.work_item_id, second.work_item_id);
        let _ = first;
    }
}
