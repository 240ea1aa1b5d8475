//! Questionnaire catalog, answers and validation
//!
//! The catalog is immutable data built once per process. Validation is a pure
//! function over it, so every step of the create workflow (and the CLI) shares
//! the same rules.
//!
//! ## Steps
//!
//! 0. **Project basics** - name, description, application type
//! 1. **Scale & reach** - traffic, geography, availability
//! 2. **Compute & data** - compute model, database, storage
//! 3. **Security & compliance** - sensitivity, frameworks, security level
//! 4. **Budget & services** - budget, performance goals, service selection

pub mod answers;
pub mod catalog;
pub mod defaults;
pub mod validation;

pub use answers::{
    toggle_exclusive, AnswerValue, Answers, QuestionnaireData, ServiceSelection, NONE_VALUE,
};
pub use catalog::{by_id, list, questions_in_step, step_title, STEP_COUNT};
pub use defaults::{apply_defaults, default_answer, default_services};
pub use validation::{validate, validate_question, validate_step, StepValidation, Validation};

use serde::Serialize;

/// Topic a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Basics,
    Scale,
    Compute,
    Data,
    Security,
    Compliance,
    Budget,
    Performance,
}

/// How a question is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Single-line text
    Text,
    /// Multi-line text
    Textarea,
    /// Exactly one option
    Radio,
    /// Any number of options
    Checkbox,
}

impl InputKind {
    pub fn is_text(&self) -> bool {
        matches!(self, InputKind::Text | InputKind::Textarea)
    }

    pub fn is_choice(&self) -> bool {
        !self.is_text()
    }
}

/// Extra facts shown when an option is expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionDetails {
    pub aws_services: Vec<&'static str>,
    pub cost_range: &'static str,
    pub use_case: &'static str,
}

/// One selectable answer of a choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub recommended: bool,
    pub popular: bool,
    pub details: Option<OptionDetails>,
}

/// What a question influences in the generated architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Impact {
    pub services: &'static str,
    pub cost: &'static str,
    pub security: &'static str,
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub category: Category,
    /// Configure step (0-based) the question is asked in
    pub step: usize,
    pub title: &'static str,
    pub prompt: &'static str,
    pub explanation: &'static str,
    pub kind: InputKind,
    pub required: bool,
    pub options: Vec<QuestionOption>,
    pub impact: Option<Impact>,
    pub placeholder: Option<&'static str>,
    pub max_length: Option<usize>,
    /// Option value that cannot be combined with any other (multi-choice only)
    pub exclusive_value: Option<&'static str>,
}

impl Question {
    pub fn option(&self, value: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.value == value)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.option(value).is_some()
    }

    pub fn recommended_options(&self) -> impl Iterator<Item = &QuestionOption> {
        self.options.iter().filter(|o| o.recommended)
    }
}
