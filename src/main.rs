use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use workstack::commands::InsertAt;
use workstack::engine::{Engine, EventSink};
use workstack::model::{Action, DependencyType, Priority, Status};
use workstack::output::Format;
use workstack::store::Db;

const DEFAULT_DB_FILE: &str = "workstack.db";

#[derive(Parser)]
#[command(
    name = "workstack",
    version,
    about = "Project and task management backend with transactional undo/redo"
)]
struct Cli {
    /// Database file (default: $WORKSTACK_DB, then ./workstack.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Log filter, e.g. "info" or "workstack=debug" (default: $WORKSTACK_LOG, then warn)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new root project
    CreateProject {
        /// Project name
        name: String,
        /// Project description
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Add a task under an existing parent
    AddTask {
        /// Parent work item ID
        parent_work_item_id: String,
        /// Task name
        name: String,
        /// Task description
        #[arg(long, short)]
        description: Option<String>,
        /// Initial status
        #[arg(long, value_enum, default_value = "todo")]
        status: Status,
        /// Priority
        #[arg(long, value_enum, default_value = "medium")]
        priority: Priority,
        /// Due date (RFC 3339)
        #[arg(long)]
        due_date: Option<String>,
        /// IDs this task depends on (comma-separated)
        #[arg(long, value_delimiter = ',')]
        depends_on: Vec<String>,
        /// Type for the listed dependencies
        #[arg(long, value_enum, default_value = "finish-to-start")]
        dependency_type: DependencyType,
        /// Insert at an edge of the sibling list
        #[arg(long, value_enum, conflicts_with_all = ["insert_after", "insert_before"])]
        insert_at: Option<InsertAt>,
        /// Insert directly after this sibling
        #[arg(long, conflicts_with = "insert_before")]
        insert_after: Option<String>,
        /// Insert directly before this sibling
        #[arg(long)]
        insert_before: Option<String>,
    },
    /// Bulk-add a nested child-task tree from JSON
    AddChildTasks {
        /// Parent work item ID
        parent_work_item_id: String,
        /// JSON array of {name, description?, status?, priority?, due_date?, children?}
        tree: String,
    },
    /// Soft-delete a root project and its subtree
    DeleteProject {
        /// Project (root) work item ID
        project_id: String,
    },
    /// Soft-delete one or more non-root tasks with their subtrees
    DeleteTask {
        /// Task IDs (comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        work_item_ids: Vec<String>,
    },
    /// Soft-delete children of a parent
    DeleteChildTasks {
        /// Parent work item ID
        parent_work_item_id: String,
        /// Specific child IDs to delete (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "delete_all_children")]
        child_task_ids: Vec<String>,
        /// Delete every active child
        #[arg(long)]
        delete_all_children: bool,
    },
    /// Show one item with dependencies, dependents, and children
    GetDetails {
        /// Work item ID
        work_item_id: String,
    },
    /// List and filter work items
    List {
        /// Restrict to children of this parent
        #[arg(long, conflicts_with = "roots_only")]
        parent_work_item_id: Option<String>,
        /// Only root projects
        #[arg(long)]
        roots_only: bool,
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Include soft-deleted items
        #[arg(long)]
        include_inactive: bool,
    },
    /// Print the full subtree of a work item
    GetFullTree {
        /// Root work item ID
        work_item_id: String,
        /// Include soft-deleted items
        #[arg(long)]
        include_inactive_items: bool,
        /// Include soft-deleted dependency edges
        #[arg(long)]
        include_inactive_dependencies: bool,
        /// Maximum traversal depth
        #[arg(long, default_value_t = 10)]
        max_depth: usize,
    },
    /// Select the next actionable task
    GetNextTask {
        /// Restrict candidates to this item's subtree
        #[arg(long)]
        scope_item_id: Option<String>,
        /// Accepted for compatibility; tags are not persisted
        #[arg(long = "include-tag")]
        include_tags: Vec<String>,
        /// Accepted for compatibility; tags are not persisted
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,
    },
    /// Rename a work item
    SetName {
        /// Work item ID
        work_item_id: String,
        /// New name
        name: String,
    },
    /// Set (or clear, when omitted) the description
    SetDescription {
        /// Work item ID
        work_item_id: String,
        /// New description; omit to clear
        description: Option<String>,
    },
    /// Set the status
    SetStatus {
        /// Work item ID
        work_item_id: String,
        /// New status
        #[arg(value_enum)]
        status: Status,
    },
    /// Set the priority
    SetPriority {
        /// Work item ID
        work_item_id: String,
        /// New priority
        #[arg(value_enum)]
        priority: Priority,
    },
    /// Set or clear the due date
    SetDueDate {
        /// Work item ID
        work_item_id: String,
        /// New due date (RFC 3339)
        due_date: Option<String>,
        /// Clear the due date
        #[arg(long, conflicts_with = "due_date")]
        clear: bool,
    },
    /// Update several fields at once (deprecated; prefer the set-* verbs)
    UpdateTask {
        /// Work item ID
        work_item_id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long, short)]
        description: Option<String>,
        /// New status
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// New priority
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// New due date (RFC 3339)
        #[arg(long)]
        due_date: Option<String>,
        /// Clear the due date
        #[arg(long, conflicts_with = "due_date")]
        clear_due_date: bool,
    },
    /// Add dependency edges from one item
    AddDependencies {
        /// Dependent work item ID
        work_item_id: String,
        /// IDs it depends on (comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        on: Vec<String>,
        /// Dependency type
        #[arg(long, value_enum, default_value = "finish-to-start")]
        dependency_type: DependencyType,
    },
    /// Remove dependency edges from one item
    DeleteDependencies {
        /// Dependent work item ID
        work_item_id: String,
        /// Target IDs to disconnect (comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        on: Vec<String>,
    },
    /// Promote a task to a root project, leaving a linked back-reference
    PromoteToProject {
        /// Work item ID
        work_item_id: String,
    },
    /// Move an item to the start of its sibling list
    MoveItemToStart {
        /// Work item ID
        work_item_id: String,
    },
    /// Move an item to the end of its sibling list
    MoveItemToEnd {
        /// Work item ID
        work_item_id: String,
    },
    /// Move an item directly after a sibling
    MoveItemAfter {
        /// Work item ID
        work_item_id: String,
        /// Sibling to land after
        target_sibling_id: String,
    },
    /// Move an item directly before a sibling
    MoveItemBefore {
        /// Work item ID
        work_item_id: String,
        /// Sibling to land before
        target_sibling_id: String,
    },
    /// Revert the most recent action
    UndoLastAction,
    /// Re-apply the most recently undone action
    RedoLastAction,
    /// List recorded actions, newest first
    ListHistory {
        /// Start date (inclusive, YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// End date (inclusive, YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Maximum number of actions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Export a project subtree as tree-shaped JSON
    ExportProject {
        /// Root work item ID
        work_item_id: String,
    },
    /// Import a tree-shaped JSON export (file path or - for stdin)
    ImportProject {
        /// Source file
        file: String,
        /// Attach the imported tree under this parent instead of the root list
        #[arg(long)]
        parent_work_item_id: Option<String>,
    },
}

/// Logs committed actions through the tracing layer.
struct LogSink;

impl EventSink for LogSink {
    fn action_committed(&self, action: &Action) {
        info!(
            action_type = action.action_type.as_str(),
            seq = action.seq,
            description = %action.description,
            "committed"
        );
    }
}

fn open_engine(cli_db: Option<PathBuf>) -> workstack::error::Result<Engine> {
    let path = cli_db
        .or_else(|| std::env::var_os("WORKSTACK_DB").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
    let db = Db::open(&path)?;
    Ok(Engine::with_sink(db, Box::new(LogSink)))
}

fn run(cli: Cli, format: Format) -> workstack::error::Result<()> {
    use workstack::commands as cmd;

    let engine = open_engine(cli.db)?;
    match cli.command {
        Commands::CreateProject { name, description } => {
            cmd::create::create_project(&engine, name, description, format)
        }
        Commands::AddTask {
            parent_work_item_id,
            name,
            description,
            status,
            priority,
            due_date,
            depends_on,
            dependency_type,
            insert_at,
            insert_after,
            insert_before,
        } => cmd::create::add_task(
            &engine,
            parent_work_item_id,
            name,
            description,
            status,
            priority,
            due_date,
            depends_on,
            dependency_type,
            insert_at,
            insert_after,
            insert_before,
            format,
        ),
        Commands::AddChildTasks {
            parent_work_item_id,
            tree,
        } => cmd::create::add_child_tasks(&engine, parent_work_item_id, tree, format),
        Commands::DeleteProject { project_id } => {
            cmd::delete::delete_project(&engine, project_id, format)
        }
        Commands::DeleteTask { work_item_ids } => {
            cmd::delete::delete_task(&engine, work_item_ids, format)
        }
        Commands::DeleteChildTasks {
            parent_work_item_id,
            child_task_ids,
            delete_all_children,
        } => cmd::delete::delete_child_tasks(
            &engine,
            parent_work_item_id,
            child_task_ids,
            delete_all_children,
            format,
        ),
        Commands::GetDetails { work_item_id } => {
            cmd::show::get_details(&engine, work_item_id, format)
        }
        Commands::List {
            parent_work_item_id,
            roots_only,
            status,
            include_inactive,
        } => cmd::show::list(
            &engine,
            parent_work_item_id,
            roots_only,
            status,
            include_inactive,
            format,
        ),
        Commands::GetFullTree {
            work_item_id,
            include_inactive_items,
            include_inactive_dependencies,
            max_depth,
        } => cmd::show::get_full_tree(
            &engine,
            work_item_id,
            include_inactive_items,
            include_inactive_dependencies,
            max_depth,
            format,
        ),
        Commands::GetNextTask {
            scope_item_id,
            include_tags,
            exclude_tags,
        } => cmd::show::get_next_task(&engine, scope_item_id, include_tags, exclude_tags, format),
        Commands::SetName { work_item_id, name } => {
            cmd::edit::set_name(&engine, work_item_id, name, format)
        }
        Commands::SetDescription {
            work_item_id,
            description,
        } => cmd::edit::set_description(&engine, work_item_id, description, format),
        Commands::SetStatus {
            work_item_id,
            status,
        } => cmd::edit::set_status(&engine, work_item_id, status, format),
        Commands::SetPriority {
            work_item_id,
            priority,
        } => cmd::edit::set_priority(&engine, work_item_id, priority, format),
        Commands::SetDueDate {
            work_item_id,
            due_date,
            clear,
        } => cmd::edit::set_due_date(&engine, work_item_id, due_date, clear, format),
        Commands::UpdateTask {
            work_item_id,
            name,
            description,
            status,
            priority,
            due_date,
            clear_due_date,
        } => cmd::edit::update_task(
            &engine,
            work_item_id,
            name,
            description,
            status,
            priority,
            due_date,
            clear_due_date,
            format,
        ),
        Commands::AddDependencies {
            work_item_id,
            on,
            dependency_type,
        } => cmd::deps::depend(&engine, work_item_id, on, dependency_type, format),
        Commands::DeleteDependencies { work_item_id, on } => {
            cmd::deps::undepend(&engine, work_item_id, on, format)
        }
        Commands::PromoteToProject { work_item_id } => {
            cmd::promote::promote_to_project(&engine, work_item_id, format)
        }
        Commands::MoveItemToStart { work_item_id } => {
            cmd::moves::move_to_start(&engine, work_item_id, format)
        }
        Commands::MoveItemToEnd { work_item_id } => {
            cmd::moves::move_to_end(&engine, work_item_id, format)
        }
        Commands::MoveItemAfter {
            work_item_id,
            target_sibling_id,
        } => cmd::moves::move_after(&engine, work_item_id, target_sibling_id, format),
        Commands::MoveItemBefore {
            work_item_id,
            target_sibling_id,
        } => cmd::moves::move_before(&engine, work_item_id, target_sibling_id, format),
        Commands::UndoLastAction => cmd::history::undo(&engine, format),
        Commands::RedoLastAction => cmd::history::redo(&engine, format),
        Commands::ListHistory {
            start_date,
            end_date,
            limit,
        } => cmd::history::log(&engine, start_date, end_date, limit, format),
        Commands::ExportProject { work_item_id } => {
            cmd::transfer::export(&engine, work_item_id, format)
        }
        Commands::ImportProject {
            file,
            parent_work_item_id,
        } => cmd::transfer::import(&engine, file, parent_work_item_id, format),
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = log_level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_env("WORKSTACK_LOG").ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    tracing::debug!(git_sha = ?workstack::build_info::git_sha(), "starting");

    let format = cli.format;
    if let Err(e) = run(cli, format) {
        let kind = if e.is_invalid_params() {
            "invalid_params"
        } else {
            "internal_error"
        };
        match format {
            Format::Json => eprintln!(
                "{}",
                serde_json::json!({
                    "error": kind,
                    "code": e.code(),
                    "message": e.to_string(),
                })
            ),
            Format::Pretty => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
