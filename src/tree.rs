//! Tree assembly.
//!
//! `full_tree` builds a project subtree with each node carrying its
//! dependency edges and children. A node's outgoing `linked` edges project
//! the promoted branch back into the tree: the target subtree is appended
//! as if it were a child, with every projected name suffixed " (L)".

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Result, WorkstackError};
use crate::model::{Dependency, DependencyType, SubtreeSpec, WorkItem};
use crate::store::db::Db;
use crate::store::work_items::ActiveFilter;

pub const LINKED_SUFFIX: &str = " (L)";

const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub include_inactive_items: bool,
    pub include_inactive_dependencies: bool,
    pub max_depth: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            include_inactive_items: false,
            include_inactive_dependencies: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: WorkItem,
    pub dependencies: Vec<Dependency>,
    pub dependents: Vec<Dependency>,
    pub children: Vec<TreeNode>,
}

/// Assemble the full subtree rooted at `root_id`.
pub fn full_tree(db: &Db, root_id: &str, options: &TreeOptions) -> Result<TreeNode> {
    let item_filter = if options.include_inactive_items {
        ActiveFilter::Any
    } else {
        ActiveFilter::ActiveOnly
    };
    let root = match db.find_item(root_id, ActiveFilter::Any)? {
        Some(item) if item.is_active || options.include_inactive_items => item,
        Some(_) => return Err(WorkstackError::NotFoundOrInactive(root_id.to_string())),
        None => return Err(WorkstackError::NotFound(root_id.to_string())),
    };

    let mut visited = HashSet::new();
    build_node(db, root, options, item_filter, 0, false, &mut visited)
}

fn build_node(
    db: &Db,
    mut item: WorkItem,
    options: &TreeOptions,
    item_filter: ActiveFilter,
    depth: usize,
    linked: bool,
    visited: &mut HashSet<String>,
) -> Result<TreeNode> {
    visited.insert(item.work_item_id.clone());

    let dep_filter = if options.include_inactive_dependencies {
        ActiveFilter::Any
    } else {
        ActiveFilter::ActiveOnly
    };
    let dependencies = db.find_dependencies(&item.work_item_id, dep_filter, None)?;
    let dependents = db.find_dependents(&item.work_item_id, dep_filter)?;

    let mut children = Vec::new();
    if depth < options.max_depth {
        let mut direct = db.find_children(Some(&item.work_item_id), item_filter, None)?;
        direct.sort_by(|a, b| {
            (&a.order_key, &a.name).cmp(&(&b.order_key, &b.name))
        });
        let direct_ids: HashSet<String> =
            direct.iter().map(|w| w.work_item_id.clone()).collect();

        for child in direct {
            if visited.contains(&child.work_item_id) {
                continue;
            }
            children.push(build_node(
                db,
                child,
                options,
                item_filter,
                depth + 1,
                linked,
                visited,
            )?);
        }

        // Project promoted branches: follow active linked edges to targets
        // that are not already direct children. Inactive or missing targets
        // are skipped silently.
        for edge in db.find_dependencies(
            &item.work_item_id,
            ActiveFilter::ActiveOnly,
            Some(DependencyType::Linked),
        )? {
            let target_id = &edge.depends_on_work_item_id;
            if direct_ids.contains(target_id) || visited.contains(target_id) {
                continue;
            }
            let Some(target) = db.find_item(target_id, ActiveFilter::ActiveOnly)? else {
                continue;
            };
            children.push(build_node(
                db,
                target,
                options,
                item_filter,
                depth + 1,
                true,
                visited,
            )?);
        }
    }

    if linked {
        item.name.push_str(LINKED_SUFFIX);
    }
    Ok(TreeNode {
        item,
        dependencies,
        dependents,
        children,
    })
}

/// Plain (projection-free) export of an active subtree as the tree-shaped
/// JSON interchange format.
pub fn export_subtree(db: &Db, root_id: &str) -> Result<SubtreeSpec> {
    let root = db.require_active_item(root_id)?;
    export_node(db, &root)
}

fn export_node(db: &Db, item: &WorkItem) -> Result<SubtreeSpec> {
    let children = db
        .find_children(Some(&item.work_item_id), ActiveFilter::ActiveOnly, None)?
        .iter()
        .map(|child| export_node(db, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(SubtreeSpec {
        name: item.name.clone(),
        description: item.description.clone(),
        status: item.status,
        priority: item.priority,
        due_date: item.due_date,
        children,
    })
}
