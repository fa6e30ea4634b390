use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(Self::Todo),
            "in-progress" => Some(Self::InProgress),
            "review" => Some(Self::Review),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Scheduling rank: lower sorts first.
    pub fn rank(&self) -> i64 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum DependencyType {
    /// Blocks scheduling of the dependent until the target is done.
    #[default]
    FinishToStart,
    /// Informational cross-reference; never blocks scheduling.
    Linked,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishToStart => "finish-to-start",
            Self::Linked => "linked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "finish-to-start" => Some(Self::FinishToStart),
            "linked" => Some(Self::Linked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Add,
    UpdateFields,
    DeleteSubtree,
    Move,
    Promote,
    AddDependencies,
    DeleteDependencies,
    UndoAction,
    RedoAction,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::UpdateFields => "UPDATE_FIELDS",
            Self::DeleteSubtree => "DELETE_SUBTREE",
            Self::Move => "MOVE",
            Self::Promote => "PROMOTE",
            Self::AddDependencies => "ADD_DEPENDENCIES",
            Self::DeleteDependencies => "DELETE_DEPENDENCIES",
            Self::UndoAction => "UNDO_ACTION",
            Self::RedoAction => "REDO_ACTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADD" => Some(Self::Add),
            "UPDATE_FIELDS" => Some(Self::UpdateFields),
            "DELETE_SUBTREE" => Some(Self::DeleteSubtree),
            "MOVE" => Some(Self::Move),
            "PROMOTE" => Some(Self::Promote),
            "ADD_DEPENDENCIES" => Some(Self::AddDependencies),
            "DELETE_DEPENDENCIES" => Some(Self::DeleteDependencies),
            "UNDO_ACTION" => Some(Self::UndoAction),
            "REDO_ACTION" => Some(Self::RedoAction),
            _ => None,
        }
    }
}

/// The forward operation a history step records; undo applies the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    Update,
    Insert,
    Delete,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "UPDATE",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPDATE" => Some(Self::Update),
            "INSERT" => Some(Self::Insert),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

macro_rules! display_and_from_sql {
    ($($ty:ident),+) => {$(
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                Self::parse(s).ok_or_else(|| {
                    FromSqlError::Other(
                        format!(concat!("unknown ", stringify!($ty), " '{}'"), s).into(),
                    )
                })
            }
        }
    )+};
}

display_and_from_sql!(Status, Priority, DependencyType, ActionType, StepType);

/// The single node type: a root (project) or a non-root (task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub work_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_work_item_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub order_key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn is_root(&self) -> bool {
        self.parent_work_item_id.is_none()
    }
}

/// Typed directed edge between two work items, keyed by
/// `(work_item_id, depends_on_work_item_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub work_item_id: String,
    pub depends_on_work_item_id: String,
    pub dependency_type: DependencyType,
    pub is_active: bool,
}

/// One user-initiated mutation in the history stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_id: String,
    /// Global history order (database sequence).
    pub seq: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item_id: Option<String>,
    pub action_type: ActionType,
    pub description: String,
    pub is_undone: bool,
    /// The meta-action that last reverted or invalidated this action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undone_at_action_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row-level inverse fragment within an action. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoStep {
    pub action_id: String,
    pub step_order: i64,
    pub step_type: StepType,
    pub table_name: String,
    /// Primitive or composite primary key; composite parts joined with `:`.
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<serde_json::Value>,
}

/// Where a new or moved item lands within its sibling list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Start,
    End,
    After(String),
    Before(String),
}

impl Default for Position {
    fn default() -> Self {
        Self::End
    }
}

/// Tree-shaped task specification used by bulk child creation and by
/// import/export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtreeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SubtreeSpec>,
}

/// Format a timestamp for storage. Fixed microsecond precision so that the
/// TEXT column ordering matches the chronological ordering.
pub fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
