/// How missing or empty candidate data is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMode {
    /// Report the gap as an error note on the candidate.
    Strict,
    /// Log the gap and try again on the next pass.
    #[default]
    Lenient,
}

impl FieldMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lenient" => Some(Self::Lenient),
            _ => None,
        }
    }
}

/// Names and switches the homework workflow relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeworkSettings {
    /// Candidates must carry this tag to be processed.
    pub required_tag: Option<String>,
    /// Restricts batch passes to candidates on offers with this tag.
    pub offer_tag: Option<String>,
    pub delete_fork_after_send: bool,
    pub field_mode: FieldMode,
    pub task_title: String,
    pub homework_field: String,
    pub account_field: String,
    pub repository_field: String,
    pub salutation_field: String,
    pub signature_field: String,
    pub sent_stage: String,
    pub received_stage: String,
    pub mail_template: String,
    pub issue_title: String,
    pub template_namespace: String,
    pub target_namespace: String,
}

impl Default for HomeworkSettings {
    fn default() -> Self {
        Self {
            required_tag: None,
            offer_tag: None,
            delete_fork_after_send: false,
            field_mode: FieldMode::default(),
            task_title: "hausaufgabe".to_string(),
            homework_field: "Hausaufgabe".to_string(),
            account_field: "GitLab-Account".to_string(),
            repository_field: "Hausaufgaben-Repository".to_string(),
            salutation_field: "Anrede".to_string(),
            signature_field: "Signatur".to_string(),
            sent_stage: "Hausaufgabe versendet".to_string(),
            received_stage: "Hausaufgabe erhalten".to_string(),
            mail_template: "homework".to_string(),
            issue_title: "Hausaufgabe abgeben: Issue schließen, wenn du fertig bist".to_string(),
            template_namespace: "homework-templates".to_string(),
            target_namespace: "homework".to_string(),
        }
    }
}
