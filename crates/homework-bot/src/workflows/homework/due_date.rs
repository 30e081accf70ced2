use chrono::{Days, NaiveDate};

use super::domain::Task;

/// Days granted when the homework task carries no explicit due date.
pub const DEFAULT_DUE_DAYS: u64 = 8;

/// Effective deadline: the task's own due date, else creation day plus [`DEFAULT_DUE_DAYS`].
///
/// The creation day is taken in the timestamp's own offset, so the result is a
/// calendar date and unaffected by daylight-saving changes in between.
pub fn compute_due_date(task: &Task) -> NaiveDate {
    match task.due_date {
        Some(due) => due,
        None => add_days(task.created_at.date_naive(), DEFAULT_DUE_DAYS),
    }
}

/// Date mentioned to the candidate, one day ahead of the real deadline.
pub fn reminder_date(due: NaiveDate) -> NaiveDate {
    due.checked_sub_days(Days::new(1)).unwrap_or(due)
}

/// German rendering used in notes and mails.
pub fn format_due_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}
