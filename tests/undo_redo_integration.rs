use workstack::engine::{Engine, NewDependency, NewWorkItem};
use workstack::model::{DependencyType, Priority, Status};
use workstack::store::{ActiveFilter, Db};

fn engine() -> Engine {
    Engine::new(Db::open_memory().unwrap())
}

fn add_task(engine: &Engine, parent: &str, name: &str) -> String {
    engine
        .add_work_item(NewWorkItem {
            parent_work_item_id: Some(parent.to_string()),
            name: name.into(),
            ..NewWorkItem::default()
        })
        .unwrap()
        .work_item_id
}

/// Order-insensitive snapshot of everything undo/redo is allowed to touch.
fn state_snapshot(engine: &Engine) -> Vec<String> {
    let mut rows = Vec::new();
    let conn = engine.db().conn();
    let mut stmt = conn
        .prepare(
            "SELECT work_item_id, COALESCE(parent_work_item_id, ''), name,
                    COALESCE(description, ''), status, priority, COALESCE(due_date, ''),
                    order_key, is_active, updated_at
             FROM work_items ORDER BY work_item_id",
        )
        .unwrap();
    let items = stmt
        .query_map([], |row| {
            Ok(format!(
                "item {} {} {} {} {} {} {} {} {} {}",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, String>(9)?,
            ))
        })
        .unwrap();
    for row in items {
        rows.push(row.unwrap());
    }

    let mut stmt = conn
        .prepare(
            "SELECT work_item_id, depends_on_work_item_id, dependency_type, is_active
             FROM work_item_dependencies
             ORDER BY work_item_id, depends_on_work_item_id",
        )
        .unwrap();
    let deps = stmt
        .query_map([], |row| {
            Ok(format!(
                "dep {} {} {} {}",
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .unwrap();
    for row in deps {
        rows.push(row.unwrap());
    }
    rows
}

#[test]
fn add_undo_redo_flips_activity_and_a_new_add_invalidates_redo() {
    let engine = engine();
    let item = engine.create_project("P".into(), None).unwrap();

    engine.undo_last_action().unwrap().unwrap();
    let row = engine
        .db()
        .find_item(&item.work_item_id, ActiveFilter::Any)
        .unwrap()
        .unwrap();
    assert!(!row.is_active, "undone add leaves the row inactive");

    engine.redo_last_action().unwrap().unwrap();
    let row = engine
        .db()
        .find_item(&item.work_item_id, ActiveFilter::Any)
        .unwrap()
        .unwrap();
    assert!(row.is_active, "redo reactivates the row");

    // undo again, then a fresh add invalidates the redo candidate
    engine.undo_last_action().unwrap().unwrap();
    engine.create_project("Q".into(), None).unwrap();
    assert!(engine.redo_last_action().unwrap().is_none());
}

#[test]
fn op_then_undo_restores_the_prior_state() {
    let engine = engine();
    let p = engine.create_project("P".into(), None).unwrap();
    let a = add_task(&engine, &p.work_item_id, "a");
    let b = add_task(&engine, &p.work_item_id, "b");
    engine
        .add_dependencies(
            &b,
            &[NewDependency {
                depends_on_work_item_id: a.clone(),
                dependency_type: DependencyType::FinishToStart,
            }],
        )
        .unwrap();

    let operations: Vec<Box<dyn Fn(&Engine)>> = vec![
        Box::new({
            let a = a.clone();
            move |e: &Engine| {
                e.set_status(&a, Status::InProgress).unwrap();
            }
        }),
        Box::new({
            let a = a.clone();
            move |e: &Engine| {
                e.set_priority(&a, Priority::High).unwrap();
            }
        }),
        Box::new({
            let b = b.clone();
            move |e: &Engine| {
                e.move_to_start(&b).unwrap();
            }
        }),
        Box::new({
            let b = b.clone();
            let a = a.clone();
            move |e: &Engine| {
                e.delete_dependencies(&b, &[a.clone()]).unwrap();
            }
        }),
        Box::new({
            let a = a.clone();
            move |e: &Engine| {
                e.delete_tasks(&[a.clone()]).unwrap();
            }
        }),
        Box::new({
            let a = a.clone();
            move |e: &Engine| {
                e.promote_to_project(&a).unwrap();
            }
        }),
    ];

    for (i, op) in operations.iter().enumerate() {
        let before = state_snapshot(&engine);
        op(&engine);
        let after = state_snapshot(&engine);
        assert_ne!(before, after, "operation {i} must change state");

        engine.undo_last_action().unwrap().unwrap();
        assert_eq!(
            state_snapshot(&engine),
            before,
            "undo of operation {i} must restore the prior state"
        );

        // replay it so the next operation sees the post-op state
        engine.redo_last_action().unwrap().unwrap();
        assert_eq!(
            state_snapshot(&engine),
            after,
            "redo of operation {i} must restore the post-op state"
        );

        // leave the op undone for delete/promote so later ops still see `a`
        if i >= 3 {
            engine.undo_last_action().unwrap().unwrap();
        }
    }
}

#[test]
fn undo_chain_walks_back_through_history() {
    let engine = engine();
    let p = engine.create_project("P".into(), None).unwrap();
    let a = add_task(&engine, &p.work_item_id, "a");
    engine.set_status(&a, Status::InProgress).unwrap();
    engine.set_status(&a, Status::Done).unwrap();

    engine.undo_last_action().unwrap();
    assert_eq!(
        engine.db().require_active_item(&a).unwrap().status,
        Status::InProgress
    );
    engine.undo_last_action().unwrap();
    assert_eq!(
        engine.db().require_active_item(&a).unwrap().status,
        Status::Todo
    );
    engine.undo_last_action().unwrap();
    assert!(
        engine
            .db()
            .find_item(&a, ActiveFilter::ActiveOnly)
            .unwrap()
            .is_none()
    );

    // redo everything in order
    engine.redo_last_action().unwrap();
    engine.redo_last_action().unwrap();
    engine.redo_last_action().unwrap();
    assert_eq!(
        engine.db().require_active_item(&a).unwrap().status,
        Status::Done
    );
}

#[test]
fn undo_promote_restores_parent_and_link_state() {
    let engine = engine();
    let p = engine.create_project("Main".into(), None).unwrap();
    let sub = add_task(&engine, &p.work_item_id, "Sub");

    let before = state_snapshot(&engine);
    engine.promote_to_project(&sub).unwrap();
    engine.undo_last_action().unwrap();
    assert_eq!(state_snapshot(&engine), before);

    let restored = engine.db().require_active_item(&sub).unwrap();
    assert_eq!(
        restored.parent_work_item_id.as_deref(),
        Some(p.work_item_id.as_str())
    );
}

#[test]
fn undo_dependency_add_distinguishes_fresh_and_reactivated_edges() {
    let engine = engine();
    let a = engine.create_project("A".into(), None).unwrap();
    let b = engine.create_project("B".into(), None).unwrap();
    let fts = |target: &str| NewDependency {
        depends_on_work_item_id: target.to_string(),
        dependency_type: DependencyType::FinishToStart,
    };

    // fresh edge: undo removes it from the active set
    engine
        .add_dependencies(&a.work_item_id, &[fts(&b.work_item_id)])
        .unwrap();
    engine.undo_last_action().unwrap();
    let edge = engine
        .db()
        .find_dependency(&a.work_item_id, &b.work_item_id)
        .unwrap()
        .unwrap();
    assert!(!edge.is_active);

    // reactivated edge with a type change: undo restores the old row
    engine
        .add_dependencies(
            &a.work_item_id,
            &[NewDependency {
                depends_on_work_item_id: b.work_item_id.clone(),
                dependency_type: DependencyType::Linked,
            }],
        )
        .unwrap();
    engine.undo_last_action().unwrap();
    let edge = engine
        .db()
        .find_dependency(&a.work_item_id, &b.work_item_id)
        .unwrap()
        .unwrap();
    assert!(!edge.is_active);
    assert_eq!(edge.dependency_type, DependencyType::FinishToStart);
}

#[test]
fn bulk_child_add_undoes_as_one_action() {
    let engine = engine();
    let p = engine.create_project("P".into(), None).unwrap();
    let specs: Vec<workstack::model::SubtreeSpec> = serde_json::from_value(serde_json::json!([
        {"name": "A", "children": [{"name": "A1"}]},
        {"name": "B"}
    ]))
    .unwrap();

    let visible_names = |engine: &Engine| -> Vec<String> {
        let mut names: Vec<String> = engine
            .db()
            .list_items(&workstack::store::ListFilter::default())
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        names.sort();
        names
    };

    let before = visible_names(&engine);
    engine.add_child_tasks(&p.work_item_id, &specs).unwrap();
    assert_eq!(visible_names(&engine).len(), before.len() + 3);

    engine.undo_last_action().unwrap();
    assert_eq!(visible_names(&engine), before);
}
