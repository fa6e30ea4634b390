//! Table-agnostic row replay.
//!
//! Undo and redo re-apply recorded row snapshots without knowing which
//! mutation produced them. Everything they need — primary-key layout and
//! the writable column set per table — lives in the registry below, so the
//! replayable surface stays auditable in one place.

use rusqlite::{params_from_iter, types::Value};
use serde_json::Map;

use crate::error::{Result, WorkstackError};
use crate::store::db::Db;

/// Separator for composite `record_id` values ("{id}:{id}").
pub const RECORD_ID_SEPARATOR: char = ':';

struct TableSpec {
    name: &'static str,
    primary_key: &'static [&'static str],
    columns: &'static [&'static str],
}

const TABLES: &[TableSpec] = &[
    TableSpec {
        name: "work_items",
        primary_key: &["work_item_id"],
        columns: &[
            "work_item_id",
            "parent_work_item_id",
            "name",
            "description",
            "status",
            "priority",
            "due_date",
            "order_key",
            "is_active",
            "created_at",
            "updated_at",
        ],
    },
    TableSpec {
        name: "work_item_dependencies",
        primary_key: &["work_item_id", "depends_on_work_item_id"],
        columns: &[
            "work_item_id",
            "depends_on_work_item_id",
            "dependency_type",
            "is_active",
        ],
    },
];

fn table_spec(name: &str) -> Result<&'static TableSpec> {
    TABLES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| WorkstackError::Validation(format!("table '{name}' is not replayable")))
}

fn split_record_id<'a>(spec: &TableSpec, record_id: &'a str) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = record_id.split(RECORD_ID_SEPARATOR).collect();
    if parts.len() != spec.primary_key.len() || parts.iter().any(|p| p.is_empty()) {
        return Err(WorkstackError::Validation(format!(
            "record id '{record_id}' does not match the {} key of {}",
            spec.primary_key.len(),
            spec.name,
        )));
    }
    Ok(parts)
}

fn sql_value(v: &serde_json::Value) -> Result<Value> {
    match v {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Integer(*b as i64)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                Err(WorkstackError::Validation(format!(
                    "unrepresentable number {n} in row snapshot"
                )))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
            WorkstackError::Validation("nested json in row snapshot".to_string()),
        ),
    }
}

impl Db {
    /// Write a column snapshot to the addressed row: update by primary key,
    /// falling back to insert when the row does not exist (a replayed
    /// reinsert). Columns outside the registry are rejected.
    pub fn write_row(
        &self,
        table: &str,
        record_id: &str,
        data: &Map<String, serde_json::Value>,
    ) -> Result<()> {
        let spec = table_spec(table)?;
        let key_parts = split_record_id(spec, record_id)?;

        let mut set_cols: Vec<&str> = Vec::new();
        let mut set_values: Vec<Value> = Vec::new();
        for (col, value) in data {
            if !spec.columns.contains(&col.as_str()) {
                return Err(WorkstackError::Validation(format!(
                    "column '{col}' is not replayable on {table}"
                )));
            }
            if spec.primary_key.contains(&col.as_str()) {
                continue;
            }
            set_cols.push(col.as_str());
            set_values.push(sql_value(value)?);
        }
        if set_cols.is_empty() {
            return Ok(());
        }

        let assignments: Vec<String> = set_cols
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ?{}", i + 1))
            .collect();
        let predicates: Vec<String> = spec
            .primary_key
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ?{}", set_cols.len() + i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            spec.name,
            assignments.join(", "),
            predicates.join(" AND "),
        );
        let mut values = set_values.clone();
        values.extend(key_parts.iter().map(|p| Value::Text(p.to_string())));
        let changed = self.conn().execute(&sql, params_from_iter(values))?;
        if changed > 0 {
            return Ok(());
        }

        // Row is gone: reinsert it from the snapshot plus the addressed key.
        let mut insert_cols: Vec<String> =
            spec.primary_key.iter().map(|c| c.to_string()).collect();
        let mut insert_values: Vec<Value> =
            key_parts.iter().map(|p| Value::Text(p.to_string())).collect();
        for (col, value) in set_cols.iter().zip(set_values) {
            insert_cols.push(col.to_string());
            insert_values.push(value);
        }
        let placeholders: Vec<String> =
            (1..=insert_cols.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            spec.name,
            insert_cols.join(", "),
            placeholders.join(", "),
        );
        self.conn().execute(&sql, params_from_iter(insert_values))?;
        Ok(())
    }

    /// Physically delete the addressed row (inverse of a forward insert).
    pub fn delete_row(&self, table: &str, record_id: &str) -> Result<()> {
        let spec = table_spec(table)?;
        let key_parts = split_record_id(spec, record_id)?;
        let predicates: Vec<String> = spec
            .primary_key
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ?{}", i + 1))
            .collect();
        let sql = format!("DELETE FROM {} WHERE {}", spec.name, predicates.join(" AND "));
        self.conn().execute(
            &sql,
            params_from_iter(key_parts.iter().map(|p| Value::Text(p.to_string()))),
        )?;
        Ok(())
    }
}
