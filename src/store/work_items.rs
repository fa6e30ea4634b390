use rusqlite::{Row, params, params_from_iter, types::Value};
use serde::Serialize;

use crate::error::{Result, WorkstackError};
use crate::model::{Dependency, Status, WorkItem, fmt_dt};
use crate::store::db::{Db, parse_dt, parse_dt_opt};

pub(crate) const ITEM_COLUMNS: &str = "work_item_id, parent_work_item_id, name, description, \
     status, priority, due_date, order_key, is_active, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFilter {
    ActiveOnly,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Filters for the flat listing read.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub parent_work_item_id: Option<String>,
    pub roots_only: bool,
    pub status: Option<Status>,
    pub include_inactive: bool,
}

/// One item plus its immediate graph neighbourhood.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: WorkItem,
    pub dependencies: Vec<Dependency>,
    pub dependents: Vec<Dependency>,
    pub children: Vec<WorkItem>,
}

pub(crate) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        work_item_id: row.get(0)?,
        parent_work_item_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        due_date: parse_dt_opt(row.get(6)?),
        order_key: row.get(7)?,
        is_active: row.get(8)?,
        created_at: parse_dt(&row.get::<_, String>(9)?),
        updated_at: parse_dt(&row.get::<_, String>(10)?),
    })
}

impl Db {
    /// Get one item by id, or nothing. Invalid ids yield an empty result.
    pub fn find_item(&self, id: &str, filter: ActiveFilter) -> Result<Option<WorkItem>> {
        let sql = match filter {
            ActiveFilter::ActiveOnly => format!(
                "SELECT {ITEM_COLUMNS} FROM work_items WHERE work_item_id = ?1 AND is_active = 1"
            ),
            ActiveFilter::Any => {
                format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE work_item_id = ?1")
            }
        };
        let mut stmt = self.conn().prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], item_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Get one active item, failing with the "not found or is inactive"
    /// message clients parse.
    pub fn require_active_item(&self, id: &str) -> Result<WorkItem> {
        self.find_item(id, ActiveFilter::ActiveOnly)?
            .ok_or_else(|| WorkstackError::NotFoundOrInactive(id.to_string()))
    }

    /// Active children of a parent (or roots when `parent` is `None`),
    /// ordered by `(order_key, created_at)`.
    pub fn find_children(
        &self,
        parent: Option<&str>,
        filter: ActiveFilter,
        status: Option<Status>,
    ) -> Result<Vec<WorkItem>> {
        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE ");
        let mut values: Vec<Value> = Vec::new();
        match parent {
            Some(p) => {
                sql.push_str("parent_work_item_id = ?");
                values.push(Value::Text(p.to_string()));
            }
            None => sql.push_str("parent_work_item_id IS NULL"),
        }
        if matches!(filter, ActiveFilter::ActiveOnly) {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(s) = status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(s.to_string()));
        }
        sql.push_str(" ORDER BY order_key, created_at");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), item_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn find_roots(&self, filter: ActiveFilter, status: Option<Status>) -> Result<Vec<WorkItem>> {
        self.find_children(None, filter, status)
    }

    /// Flat listing used by the `list` verb.
    pub fn list_items(&self, filter: &ListFilter) -> Result<Vec<WorkItem>> {
        let active = if filter.include_inactive {
            ActiveFilter::Any
        } else {
            ActiveFilter::ActiveOnly
        };
        if filter.roots_only {
            return self.find_roots(active, filter.status);
        }
        if let Some(parent) = &filter.parent_work_item_id {
            return self.find_children(Some(parent), active, filter.status);
        }

        let mut sql = format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();
        if !filter.include_inactive {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(s) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(s.to_string()));
        }
        sql.push_str(" ORDER BY created_at");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), item_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Transitive closure of `parent_work_item_id`, excluding the root
    /// itself, regardless of active state. Used by cascades.
    pub fn find_descendants(&self, id: &str) -> Result<Vec<WorkItem>> {
        let mut stmt = self.conn().prepare(&format!(
            "WITH RECURSIVE sub(id) AS (
                SELECT work_item_id FROM work_items WHERE parent_work_item_id = ?1
                UNION
                SELECT w.work_item_id FROM work_items w
                JOIN sub s ON w.parent_work_item_id = s.id
            )
            SELECT {ITEM_COLUMNS} FROM work_items
            WHERE work_item_id IN (SELECT id FROM sub)
            ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(params![id], item_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Active siblings of `id` under `parent`, excluding `id` itself.
    pub fn find_siblings(&self, id: &str, parent: Option<&str>) -> Result<Vec<WorkItem>> {
        Ok(self
            .find_children(parent, ActiveFilter::ActiveOnly, None)?
            .into_iter()
            .filter(|w| w.work_item_id != id)
            .collect())
    }

    fn ordered_sibling_keys(
        &self,
        parent: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        let siblings = match exclude {
            Some(id) => self.find_siblings(id, parent)?,
            None => self.find_children(parent, ActiveFilter::ActiveOnly, None)?,
        };
        Ok(siblings
            .into_iter()
            .map(|w| (w.work_item_id, w.order_key))
            .collect())
    }

    /// Extreme sibling order key under `parent`, ignoring `exclude` (the
    /// item being moved, if any).
    pub fn sibling_edge_order_key(
        &self,
        parent: Option<&str>,
        edge: Edge,
        exclude: Option<&str>,
    ) -> Result<Option<String>> {
        let keys = self.ordered_sibling_keys(parent, exclude)?;
        Ok(match edge {
            Edge::First => keys.first().map(|(_, k)| k.clone()),
            Edge::Last => keys.last().map(|(_, k)| k.clone()),
        })
    }

    /// The `(before, after)` order-key pair bracketing the slot adjacent to
    /// `reference`, with `None` where no such neighbour exists.
    pub fn neighbour_order_keys(
        &self,
        parent: Option<&str>,
        reference: &str,
        side: Side,
        exclude: Option<&str>,
    ) -> Result<(Option<String>, Option<String>)> {
        let keys = self.ordered_sibling_keys(parent, exclude)?;
        let Some(pos) = keys.iter().position(|(id, _)| id == reference) else {
            return Err(WorkstackError::NotFoundOrInactive(reference.to_string()));
        };
        Ok(match side {
            Side::After => (
                Some(keys[pos].1.clone()),
                keys.get(pos + 1).map(|(_, k)| k.clone()),
            ),
            Side::Before => (
                pos.checked_sub(1).map(|p| keys[p].1.clone()),
                Some(keys[pos].1.clone()),
            ),
        })
    }

    pub fn insert_item(&self, item: &WorkItem) -> Result<()> {
        self.conn().execute(
            "INSERT INTO work_items (work_item_id, parent_work_item_id, name, description, \
             status, priority, due_date, order_key, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.work_item_id,
                item.parent_work_item_id,
                item.name,
                item.description,
                item.status.to_string(),
                item.priority.to_string(),
                item.due_date.map(fmt_dt),
                item.order_key,
                item.is_active,
                fmt_dt(item.created_at),
                fmt_dt(item.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Flip `is_active` off for the given items.
    pub fn soft_delete_items(&self, ids: &[String]) -> Result<()> {
        let mut stmt = self
            .conn()
            .prepare("UPDATE work_items SET is_active = 0 WHERE work_item_id = ?1")?;
        for id in ids {
            stmt.execute(params![id])?;
        }
        Ok(())
    }

    /// Item plus dependencies, dependents, and active children.
    pub fn item_details(&self, id: &str) -> Result<ItemDetails> {
        let item = self.require_active_item(id)?;
        Ok(ItemDetails {
            dependencies: self.find_dependencies(id, ActiveFilter::ActiveOnly, None)?,
            dependents: self.find_dependents(id, ActiveFilter::ActiveOnly)?,
            children: self.find_children(Some(id), ActiveFilter::ActiveOnly, None)?,
            item,
        })
    }
}
