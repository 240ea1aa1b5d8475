// Answer validation against the catalog

use super::answers::{AnswerValue, Answers};
use super::catalog::{by_id, questions_in_step, STEP_COUNT};
use super::{InputKind, Question};
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of validating one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Validation {
    Ok,
    Invalid { reason: String },
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validation::Ok => None,
            Validation::Invalid { reason } => Some(reason),
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Validation::Invalid {
            reason: reason.into(),
        }
    }
}

/// Validate an answer for the question with identifier `question_id`
pub fn validate(answer: Option<&AnswerValue>, question_id: &str) -> Validation {
    match by_id(question_id) {
        Some(question) => validate_question(question, answer),
        None => Validation::invalid(format!("Unknown question '{}'", question_id)),
    }
}

/// Validate an answer against a catalog entry
pub fn validate_question(question: &Question, answer: Option<&AnswerValue>) -> Validation {
    let answer = answer.filter(|a| !a.is_blank());

    let Some(answer) = answer else {
        return if question.required {
            match question.kind {
                InputKind::Text | InputKind::Textarea => {
                    Validation::invalid(format!("{} is required", question.title))
                }
                InputKind::Radio => Validation::invalid("Please select an option"),
                InputKind::Checkbox => Validation::invalid("Please select at least one option"),
            }
        } else {
            Validation::Ok
        };
    };

    match question.kind {
        InputKind::Text | InputKind::Textarea => validate_text(question, answer),
        InputKind::Radio => validate_single(question, answer),
        InputKind::Checkbox => validate_multiple(question, answer),
    }
}

fn validate_text(question: &Question, answer: &AnswerValue) -> Validation {
    let Some(text) = answer.as_str() else {
        return Validation::invalid(format!("{} must be text", question.title));
    };
    if let Some(max) = question.max_length {
        if text.trim().chars().count() > max {
            return Validation::invalid(format!(
                "{} must be at most {} characters",
                question.title, max
            ));
        }
    }
    Validation::Ok
}

fn validate_single(question: &Question, answer: &AnswerValue) -> Validation {
    let Some(value) = answer.as_str() else {
        return Validation::invalid("Please select a single option");
    };
    if !question.has_option(value) {
        return Validation::invalid(format!(
            "'{}' is not a valid choice for {}",
            value, question.title
        ));
    }
    Validation::Ok
}

fn validate_multiple(question: &Question, answer: &AnswerValue) -> Validation {
    let Some(values) = answer.as_list() else {
        return Validation::invalid("Please select one or more options");
    };

    let mut seen = HashSet::new();
    for value in values {
        if !question.has_option(value) {
            return Validation::invalid(format!(
                "'{}' is not a valid choice for {}",
                value, question.title
            ));
        }
        if !seen.insert(value.as_str()) {
            return Validation::invalid(format!("'{}' is selected more than once", value));
        }
    }

    if let Some(exclusive) = question.exclusive_value {
        if values.len() > 1 && values.iter().any(|v| v == exclusive) {
            let label = question
                .option(exclusive)
                .map(|o| o.label)
                .unwrap_or(exclusive);
            return Validation::invalid(format!(
                "\"{}\" cannot be combined with other selections",
                label
            ));
        }
    }

    Validation::Ok
}

/// Validation result for a whole configure step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepValidation {
    pub step: usize,
    /// (question id, reason) for every invalid question in the step
    pub errors: Vec<(String, String)>,
}

impl StepValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First reason, for a one-line banner
    pub fn first_reason(&self) -> Option<&str> {
        self.errors.first().map(|(_, reason)| reason.as_str())
    }
}

/// A step is valid iff every question in it is valid
pub fn validate_step(answers: &Answers, step: usize) -> StepValidation {
    let mut errors = Vec::new();

    if step >= STEP_COUNT {
        errors.push((String::new(), format!("Unknown step {}", step)));
        return StepValidation { step, errors };
    }

    for question in questions_in_step(step) {
        if let Validation::Invalid { reason } = validate_question(question, answers.get(question.id))
        {
            errors.push((question.id.to_string(), reason));
        }
    }

    StepValidation { step, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: &str) -> AnswerValue {
        AnswerValue::from(value)
    }

    fn many(values: &[&str]) -> AnswerValue {
        AnswerValue::from(values.to_vec())
    }

    #[test]
    fn test_required_text_rejects_blank() {
        assert!(!validate(None, "project_name").is_ok());
        assert!(!validate(Some(&single("   ")), "project_name").is_ok());
        assert!(validate(Some(&single("Shop")), "project_name").is_ok());
    }

    #[test]
    fn test_optional_text_accepts_missing() {
        assert!(validate(None, "description").is_ok());
        assert!(validate(Some(&single("")), "description").is_ok());
    }

    #[test]
    fn test_text_length_limit() {
        let long = "x".repeat(101);
        let result = validate(Some(&single(&long)), "project_name");
        assert_eq!(
            result.reason(),
            Some("Project Name must be at most 100 characters")
        );
    }

    #[test]
    fn test_single_choice_must_be_an_option() {
        assert!(validate(Some(&single("serverless")), "compute_preference").is_ok());
        let result = validate(Some(&single("mainframe")), "compute_preference");
        assert!(!result.is_ok());
        assert!(!validate(Some(&many(&["serverless"])), "compute_preference").is_ok());
    }

    #[test]
    fn test_multi_choice_rules() {
        assert!(!validate(None, "compliance_requirements").is_ok());
        assert!(!validate(Some(&many(&[])), "compliance_requirements").is_ok());
        assert!(validate(Some(&many(&["pci", "hipaa"])), "compliance_requirements").is_ok());
        assert!(validate(Some(&many(&["none"])), "compliance_requirements").is_ok());

        let mixed = validate(Some(&many(&["none", "pci"])), "compliance_requirements");
        assert_eq!(
            mixed.reason(),
            Some("\"None\" cannot be combined with other selections")
        );

        assert!(!validate(Some(&many(&["pci", "pci"])), "compliance_requirements").is_ok());
        assert!(!validate(Some(&many(&["sox"])), "compliance_requirements").is_ok());
    }

    #[test]
    fn test_unknown_question_is_invalid() {
        assert_eq!(
            validate(Some(&single("x")), "favourite_colour").reason(),
            Some("Unknown question 'favourite_colour'")
        );
    }

    #[test]
    fn test_validate_step_reports_each_invalid_question() {
        let mut answers = Answers::new();
        answers.set("project_name", "Shop");

        let result = validate_step(&answers, 0);
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, "application_type");

        answers.set("application_type", "ecommerce");
        assert!(validate_step(&answers, 0).is_valid());
    }

    #[test]
    fn test_scale_step_requires_reach_and_availability() {
        let mut answers = Answers::new();
        answers.set("traffic_volume", "medium");
        let result = validate_step(&answers, 1);
        let blocked: Vec<&str> = result.errors.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(blocked, ["geographical_reach", "availability_requirements"]);

        answers.set("geographical_reach", "global");
        answers.set("availability_requirements", "high");
        assert!(validate_step(&answers, 1).is_valid());
    }

    #[test]
    fn test_security_step_requires_security_level() {
        let mut answers = Answers::new();
        answers.set("data_sensitivity", "internal");
        answers.set("compliance_requirements", vec!["pci"]);
        let result = validate_step(&answers, 3);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].0, "security_level");

        answers.set("security_level", "high");
        assert!(validate_step(&answers, 3).is_valid());
    }

    #[test]
    fn test_optional_questions_do_not_block_step() {
        let mut answers = Answers::new();
        answers.set("project_name", "Shop");
        answers.set("application_type", "ecommerce");
        assert!(answers.get("description").is_none());
        assert!(validate_step(&answers, 0).is_valid());
    }

    #[test]
    fn test_out_of_range_step_is_invalid() {
        assert!(!validate_step(&Answers::new(), STEP_COUNT).is_valid());
    }
}
