use chrono::NaiveDate;

use super::domain::{Candidate, Issue, MailValues, OutgoingMail, Project};
use super::due_date::{format_due_date, reminder_date};
use super::fields::{single_line, FieldShapeError};
use super::settings::HomeworkSettings;

const TEAM_NAME: &str = "hacking talents";

/// Signature used when neither an override nor any admin names are available.
pub const DEFAULT_SIGNATURE: &str = "Dein Team der hacking talents";

/// Name used to greet the candidate: the override field, else the first name token.
pub fn salutation(
    candidate: &Candidate,
    settings: &HomeworkSettings,
) -> Result<String, FieldShapeError> {
    if let Some(custom) = single_line(candidate, &settings.salutation_field)? {
        return Ok(custom);
    }
    Ok(candidate
        .name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string())
}

/// Closing line: the override field, else the referenced admins, else [`DEFAULT_SIGNATURE`].
pub fn signature(
    candidate: &Candidate,
    settings: &HomeworkSettings,
) -> Result<String, FieldShapeError> {
    if let Some(custom) = single_line(candidate, &settings.signature_field)? {
        return Ok(custom);
    }
    Ok(signature_from_names(&candidate.admin_first_names))
}

pub fn signature_from_names(names: &[String]) -> String {
    let names: Vec<&str> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => DEFAULT_SIGNATURE.to_string(),
        [only] => format!("{only} von den {TEAM_NAME}"),
        [init @ .., last] => format!("{} und {last} von den {TEAM_NAME}", init.join(", ")),
    }
}

/// Mail announcing the homework; the mentioned deadline is one day before the real one.
pub fn compose(
    candidate: &Candidate,
    settings: &HomeworkSettings,
    fork: &Project,
    issue: &Issue,
    due_date: NaiveDate,
) -> Result<OutgoingMail, FieldShapeError> {
    Ok(OutgoingMail {
        template: settings.mail_template.clone(),
        to: candidate.emails.clone(),
        values: MailValues {
            applicant_name: salutation(candidate, settings)?,
            issue_url: issue.web_url.clone(),
            project_url: fork.web_url.clone(),
            homework_due_date: format_due_date(reminder_date(due_date)),
            signature: signature(candidate, settings)?,
        },
    })
}
