pub mod create;
pub mod delete;
pub mod deps;
pub mod edit;
pub mod history;
pub mod moves;
pub mod promote;
pub mod show;
pub mod transfer;

use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::error::{Result, WorkstackError};
use crate::model::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum InsertAt {
    Start,
    End,
}

/// Fold the three mutually-exclusive positioning flags into one directive.
pub fn position_from_flags(
    insert_at: Option<InsertAt>,
    insert_after: Option<String>,
    insert_before: Option<String>,
) -> Result<Position> {
    let given = usize::from(insert_at.is_some())
        + usize::from(insert_after.is_some())
        + usize::from(insert_before.is_some());
    if given > 1 {
        return Err(WorkstackError::Validation(
            "use at most one of insert-at, insert-after, insert-before".to_string(),
        ));
    }
    Ok(match (insert_at, insert_after, insert_before) {
        (Some(InsertAt::Start), _, _) => Position::Start,
        (_, Some(reference), _) => Position::After(reference),
        (_, _, Some(reference)) => Position::Before(reference),
        _ => Position::End,
    })
}

/// Parse an RFC 3339 due date argument.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WorkstackError::Validation(format!("invalid due date '{raw}': {e}")))
}
