use crate::commands::parse_due_date;
use crate::engine::{Engine, FieldUpdate};
use crate::error::{Result, WorkstackError};
use crate::model::{Priority, Status};
use crate::output::{self, Format};

pub fn set_name(engine: &Engine, id: String, name: String, format: Format) -> Result<()> {
    let item = engine.set_name(&id, name)?;
    output::print_item(&item, format)
}

pub fn set_description(
    engine: &Engine,
    id: String,
    description: Option<String>,
    format: Format,
) -> Result<()> {
    let item = engine.set_description(&id, description)?;
    output::print_item(&item, format)
}

pub fn set_status(engine: &Engine, id: String, status: Status, format: Format) -> Result<()> {
    let item = engine.set_status(&id, status)?;
    output::print_item(&item, format)
}

pub fn set_priority(
    engine: &Engine,
    id: String,
    priority: Priority,
    format: Format,
) -> Result<()> {
    let item = engine.set_priority(&id, priority)?;
    output::print_item(&item, format)
}

/// Set or clear the due date. Exactly one of `due_date` / `clear` selects
/// the behaviour.
pub fn set_due_date(
    engine: &Engine,
    id: String,
    due_date: Option<String>,
    clear: bool,
    format: Format,
) -> Result<()> {
    let due_date = match (due_date, clear) {
        (Some(raw), false) => Some(parse_due_date(&raw)?),
        (None, true) => None,
        _ => {
            return Err(WorkstackError::Validation(
                "provide a due date or --clear".to_string(),
            ));
        }
    };
    let item = engine.set_due_date(&id, due_date)?;
    output::print_item(&item, format)
}

/// Deprecated general-purpose update; the single-field setters are the
/// supported surface.
#[allow(clippy::too_many_arguments)]
pub fn update_task(
    engine: &Engine,
    id: String,
    name: Option<String>,
    description: Option<String>,
    status: Option<Status>,
    priority: Option<Priority>,
    due_date: Option<String>,
    clear_due_date: bool,
    format: Format,
) -> Result<()> {
    let due_date = match (due_date, clear_due_date) {
        (Some(raw), false) => Some(Some(parse_due_date(&raw)?)),
        (None, true) => Some(None),
        (None, false) => None,
        (Some(_), true) => {
            return Err(WorkstackError::Validation(
                "due date and --clear-due-date are mutually exclusive".to_string(),
            ));
        }
    };
    let item = engine.update_fields(
        &id,
        FieldUpdate {
            name,
            description: description.map(Some),
            status,
            priority,
            due_date,
        },
    )?;
    output::print_item(&item, format)
}
