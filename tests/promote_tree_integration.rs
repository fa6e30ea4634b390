use workstack::engine::{Engine, NewWorkItem};
use workstack::store::{Db, ListFilter};
use workstack::tree::{self, TreeOptions};

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

#[test]
fn promoted_branch_is_projected_with_linked_suffix() {
    let engine = engine();
    let main = engine.create_project("Main".into(), None).unwrap();
    let sub1 = add_task(&engine, &main.work_item_id, "Sub1");
    add_task(&engine, &main.work_item_id, "Sub2");
    add_task(&engine, &main.work_item_id, "Sub3");
    for name in ["SubSub1", "SubSub2", "SubSub3"] {
        add_task(&engine, &sub1, name);
    }

    engine.promote_to_project(&sub1).unwrap();

    let node = tree::full_tree(engine.db(), &main.work_item_id, &TreeOptions::default())
        .unwrap();
    assert_eq!(node.children.len(), 3);
    let mut names: Vec<String> = node.children.iter().map(|n| n.item.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Sub1 (L)", "Sub2", "Sub3"]);

    let projected = node
        .children
        .iter()
        .find(|n| n.item.name == "Sub1 (L)")
        .unwrap();
    assert_eq!(projected.children.len(), 3);
    let mut sub_names: Vec<String> = projected
        .children
        .iter()
        .map(|n| n.item.name.clone())
        .collect();
    sub_names.sort();
    assert_eq!(sub_names, vec!["SubSub1 (L)", "SubSub2 (L)", "SubSub3 (L)"]);

    // the roots listing reports both projects, unsuffixed
    let roots = engine
        .db()
        .list_items(&ListFilter {
            roots_only: true,
            ..ListFilter::default()
        })
        .unwrap();
    let mut root_names: Vec<String> = roots.into_iter().map(|w| w.name).collect();
    root_names.sort();
    assert_eq!(root_names, vec!["Main", "Sub1"]);

    // the promoted project's own tree is unsuffixed
    let own = tree::full_tree(engine.db(), &sub1, &TreeOptions::default()).unwrap();
    assert_eq!(own.item.name, "Sub1");
    assert_eq!(own.children.len(), 3);
    assert!(own.children.iter().all(|n| !n.item.name.ends_with("(L)")));
}

#[test]
fn projection_does_not_duplicate_direct_children() {
    let engine = engine();
    let main = engine.create_project("Main".into(), None).unwrap();
    let child = add_task(&engine, &main.work_item_id, "Child");

    // a manual linked edge to an item that is still a direct child
    engine
        .add_dependencies(
            &main.work_item_id,
            &[workstack::engine::NewDependency {
                depends_on_work_item_id: child.clone(),
                dependency_type: workstack::model::DependencyType::Linked,
            }],
        )
        .unwrap();

    let node = tree::full_tree(engine.db(), &main.work_item_id, &TreeOptions::default())
        .unwrap();
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].item.name, "Child");
}

#[test]
fn projection_survives_round_trips_of_promotion() {
    let engine = engine();
    let main = engine.create_project("Main".into(), None).unwrap();
    let sub = add_task(&engine, &main.work_item_id, "Sub");

    engine.promote_to_project(&sub).unwrap();
    engine.undo_last_action().unwrap();

    // back to a plain child: no projection, no active link
    let node = tree::full_tree(engine.db(), &main.work_item_id, &TreeOptions::default())
        .unwrap();
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].item.name, "Sub");

    engine.redo_last_action().unwrap();
    let node = tree::full_tree(engine.db(), &main.work_item_id, &TreeOptions::default())
        .unwrap();
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.children[0].item.name, "Sub (L)");
}
