use chrono::{Duration, NaiveDate, NaiveTime};

use crate::engine::Engine;
use crate::error::Result;
use crate::output::{self, Format};

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn undo(engine: &Engine, format: Format) -> Result<()> {
    let action = engine.undo_last_action()?;
    output::print_action(action.as_ref(), "nothing to undo", format)
}

pub fn redo(engine: &Engine, format: Format) -> Result<()> {
    let action = engine.redo_last_action()?;
    output::print_action(action.as_ref(), "nothing to redo", format)
}

pub fn log(
    engine: &Engine,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    limit: Option<usize>,
    format: Format,
) -> Result<()> {
    let start = start_date.map(|d| d.and_time(NaiveTime::MIN).and_utc());
    // end date is inclusive: filter up to (but excluding) the next midnight
    let end = end_date.map(|d| d.and_time(NaiveTime::MIN).and_utc() + Duration::days(1));
    let actions = engine
        .db()
        .list_actions(start, end, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?;
    output::print_actions(&actions, format)
}
