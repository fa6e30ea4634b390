use rusqlite::{Row, params};

use crate::error::Result;
use crate::model::{Dependency, DependencyType};
use crate::store::db::Db;
use crate::store::work_items::ActiveFilter;

const DEP_COLUMNS: &str =
    "work_item_id, depends_on_work_item_id, dependency_type, is_active";

fn dep_from_row(row: &Row<'_>) -> rusqlite::Result<Dependency> {
    Ok(Dependency {
        work_item_id: row.get(0)?,
        depends_on_work_item_id: row.get(1)?,
        dependency_type: row.get(2)?,
        is_active: row.get(3)?,
    })
}

impl Db {
    /// Look up one edge by its composite key, regardless of active state.
    pub fn find_dependency(&self, id: &str, depends_on: &str) -> Result<Option<Dependency>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DEP_COLUMNS} FROM work_item_dependencies
             WHERE work_item_id = ?1 AND depends_on_work_item_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![id, depends_on], dep_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Outgoing edges of `id`, optionally restricted to one type.
    pub fn find_dependencies(
        &self,
        id: &str,
        filter: ActiveFilter,
        dependency_type: Option<DependencyType>,
    ) -> Result<Vec<Dependency>> {
        let mut sql = format!(
            "SELECT {DEP_COLUMNS} FROM work_item_dependencies WHERE work_item_id = ?1"
        );
        if matches!(filter, ActiveFilter::ActiveOnly) {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(t) = dependency_type {
            sql.push_str(&format!(" AND dependency_type = '{}'", t.as_str()));
        }
        sql.push_str(" ORDER BY depends_on_work_item_id");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![id], dep_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Incoming edges of `id`.
    pub fn find_dependents(&self, id: &str, filter: ActiveFilter) -> Result<Vec<Dependency>> {
        let mut sql = format!(
            "SELECT {DEP_COLUMNS} FROM work_item_dependencies WHERE depends_on_work_item_id = ?1"
        );
        if matches!(filter, ActiveFilter::ActiveOnly) {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY work_item_id");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![id], dep_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Active edges with either endpoint in `ids`. Bulk variant used by the
    /// soft-delete cascade.
    pub fn find_edges_touching(&self, ids: &[String]) -> Result<Vec<Dependency>> {
        let mut edges = Vec::new();
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DEP_COLUMNS} FROM work_item_dependencies
             WHERE is_active = 1 AND (work_item_id = ?1 OR depends_on_work_item_id = ?1)"
        ))?;
        for id in ids {
            let rows = stmt.query_map(params![id], dep_from_row)?;
            for dep in rows {
                edges.push(dep?);
            }
        }
        edges.sort_by(|a, b| {
            (&a.work_item_id, &a.depends_on_work_item_id)
                .cmp(&(&b.work_item_id, &b.depends_on_work_item_id))
        });
        edges.dedup();
        Ok(edges)
    }

    /// Insert an edge, or reactivate (and retype) it if the key exists.
    pub fn upsert_dependency(&self, dep: &Dependency) -> Result<()> {
        self.conn().execute(
            "INSERT INTO work_item_dependencies
                 (work_item_id, depends_on_work_item_id, dependency_type, is_active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(work_item_id, depends_on_work_item_id) DO UPDATE SET
                 dependency_type = excluded.dependency_type,
                 is_active = excluded.is_active",
            params![
                dep.work_item_id,
                dep.depends_on_work_item_id,
                dep.dependency_type.to_string(),
                dep.is_active,
            ],
        )?;
        Ok(())
    }

    /// Flip `is_active` off for the given composite keys.
    pub fn deactivate_dependencies(&self, keys: &[(String, String)]) -> Result<()> {
        let mut stmt = self.conn().prepare(
            "UPDATE work_item_dependencies SET is_active = 0
             WHERE work_item_id = ?1 AND depends_on_work_item_id = ?2",
        )?;
        for (id, depends_on) in keys {
            stmt.execute(params![id, depends_on])?;
        }
        Ok(())
    }

    /// Whether adding `work_item_id -> depends_on` would close a cycle over
    /// active finish-to-start edges.
    pub fn would_cycle(&self, work_item_id: &str, depends_on: &str) -> Result<bool> {
        if work_item_id == depends_on {
            return Ok(true);
        }
        let mut stmt = self.conn().prepare(
            "WITH RECURSIVE reachable(id) AS (
                SELECT ?1
                UNION
                SELECT d.depends_on_work_item_id FROM work_item_dependencies d
                JOIN reachable r ON d.work_item_id = r.id
                WHERE d.is_active = 1 AND d.dependency_type = 'finish-to-start'
            )
            SELECT EXISTS(SELECT 1 FROM reachable WHERE id = ?2)",
        )?;
        let exists: bool = stmt.query_row(params![depends_on, work_item_id], |row| row.get(0))?;
        Ok(exists)
    }
}
