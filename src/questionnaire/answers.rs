// Questionnaire answers and service selection

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentinel option that excludes every other compliance choice
pub const NONE_VALUE: &str = "none";

/// Service selection categories offered on the last configure step
pub const SERVICE_CATEGORIES: &[&str] = &[
    "compute",
    "database",
    "storage",
    "networking",
    "analytics",
    "ml",
];

/// A single answer. Text and single-choice answers are strings, multi-choice
/// answers are lists. Anything else the server stored is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
    Raw(Value),
}

impl AnswerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnswerValue::Single(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AnswerValue::Multiple(values) => Some(values),
            _ => None,
        }
    }

    /// True for empty strings, empty lists and null
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Single(s) => s.trim().is_empty(),
            AnswerValue::Multiple(values) => values.is_empty(),
            AnswerValue::Raw(value) => value.is_null(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Single(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Single(value)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(values: Vec<String>) -> Self {
        AnswerValue::Multiple(values)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Multiple(values.into_iter().map(String::from).collect())
    }
}

/// Mapping from question identifier to answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<String, AnswerValue>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    /// Text or single-choice answer
    pub fn text(&self, id: &str) -> Option<&str> {
        self.0.get(id).and_then(AnswerValue::as_str)
    }

    /// Multi-choice answer, empty when unanswered
    pub fn values(&self, id: &str) -> &[String] {
        self.0
            .get(id)
            .and_then(AnswerValue::as_list)
            .unwrap_or(&[])
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<AnswerValue>) {
        self.0.insert(id.into(), value.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<AnswerValue> {
        self.0.remove(id)
    }

    /// Unanswered or answered with a blank value
    pub fn is_blank(&self, id: &str) -> bool {
        self.0.get(id).map(AnswerValue::is_blank).unwrap_or(true)
    }

    /// Toggle `value` in a multi-choice answer, honouring an exclusive sentinel
    pub fn toggle(&mut self, id: &str, value: &str, exclusive: Option<&str>) -> &[String] {
        let current = self.values(id).to_vec();
        let next = match exclusive {
            Some(exclusive) => toggle_exclusive(&current, value, exclusive),
            None => toggle_plain(&current, value),
        };
        self.0.insert(id.to_string(), AnswerValue::Multiple(next));
        self.values(id)
    }

    /// Toggle a compliance framework ("none" is exclusive)
    pub fn toggle_compliance(&mut self, value: &str) -> &[String] {
        self.toggle("compliance_requirements", value, Some(NONE_VALUE))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of these answers
    pub fn merge(&mut self, other: &Answers) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

impl FromIterator<(String, AnswerValue)> for Answers {
    fn from_iter<I: IntoIterator<Item = (String, AnswerValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn toggle_plain(current: &[String], value: &str) -> Vec<String> {
    if current.iter().any(|v| v == value) {
        current.iter().filter(|v| *v != value).cloned().collect()
    } else {
        let mut next = current.to_vec();
        next.push(value.to_string());
        next
    }
}

/// Toggle `value` in `current` where `exclusive` cannot coexist with others.
///
/// Turning the exclusive value on leaves only it selected; adding any other
/// value drops the exclusive one. Turning a selected value off just removes it.
pub fn toggle_exclusive(current: &[String], value: &str, exclusive: &str) -> Vec<String> {
    if current.iter().any(|v| v == value) {
        return current.iter().filter(|v| *v != value).cloned().collect();
    }
    if value == exclusive {
        return vec![exclusive.to_string()];
    }
    let mut next: Vec<String> = current
        .iter()
        .filter(|v| *v != exclusive)
        .cloned()
        .collect();
    next.push(value.to_string());
    next
}

/// Services chosen per category (`compute`, `database`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceSelection(BTreeMap<String, Vec<String>>);

impl ServiceSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no category has a selected service
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn services(&self, category: &str) -> &[String] {
        self.0.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, category: impl Into<String>, services: Vec<String>) {
        self.0.insert(category.into(), services);
    }

    /// Add a service to a category, ignoring duplicates
    pub fn add(&mut self, category: &str, service: &str) {
        let entry = self.0.entry(category.to_string()).or_default();
        if !entry.iter().any(|s| s == service) {
            entry.push(service.to_string());
        }
    }

    pub fn remove(&mut self, category: &str, service: &str) {
        if let Some(entry) = self.0.get_mut(category) {
            entry.retain(|s| s != service);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Total number of selected services
    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

/// The questionnaire as exchanged with the server (`questionnaire_data`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireData {
    #[serde(flatten)]
    pub answers: Answers,
    #[serde(default, skip_serializing_if = "ServiceSelection::is_empty")]
    pub selected_services: ServiceSelection,
}

impl QuestionnaireData {
    pub fn new(answers: Answers, selected_services: ServiceSelection) -> Self {
        Self {
            answers,
            selected_services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compliance_toggle_sequence() {
        let mut answers = Answers::new();
        assert_eq!(answers.toggle_compliance("none"), list(&["none"]).as_slice());
        assert_eq!(answers.toggle_compliance("pci"), list(&["pci"]).as_slice());
        assert_eq!(
            answers.toggle_compliance("hipaa"),
            list(&["pci", "hipaa"]).as_slice()
        );
        assert_eq!(answers.toggle_compliance("none"), list(&["none"]).as_slice());
    }

    #[test]
    fn test_toggle_exclusive_removes_selected_value() {
        let current = list(&["pci", "gdpr"]);
        assert_eq!(toggle_exclusive(&current, "pci", "none"), list(&["gdpr"]));
        assert_eq!(toggle_exclusive(&list(&["none"]), "none", "none"), list(&[]));
    }

    #[test]
    fn test_toggle_plain_has_no_exclusivity() {
        let mut answers = Answers::new();
        answers.toggle("performance_requirements", "caching", None);
        answers.toggle("performance_requirements", "real_time", None);
        assert_eq!(
            answers.values("performance_requirements"),
            list(&["caching", "real_time"]).as_slice()
        );
        answers.toggle("performance_requirements", "caching", None);
        assert_eq!(
            answers.values("performance_requirements"),
            list(&["real_time"]).as_slice()
        );
    }

    #[test]
    fn test_answers_wire_form_matches_server_shape() {
        let mut answers = Answers::new();
        answers.set("project_name", "Shop");
        answers.set("compliance_requirements", vec!["pci"]);

        let value = serde_json::to_value(&answers).unwrap();
        assert_eq!(
            value,
            json!({"project_name": "Shop", "compliance_requirements": ["pci"]})
        );

        let back: Answers = serde_json::from_value(value).unwrap();
        assert_eq!(back, answers);
    }

    #[test]
    fn test_unknown_answer_shapes_survive_roundtrip() {
        let value = json!({"project_name": "Shop", "expected_users": 5000, "beta": true});
        let answers: Answers = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(answers.text("project_name"), Some("Shop"));
        assert!(matches!(answers.get("expected_users"), Some(AnswerValue::Raw(_))));
        assert_eq!(serde_json::to_value(&answers).unwrap(), value);
    }

    #[test]
    fn test_questionnaire_data_flattens_answers() {
        let mut answers = Answers::new();
        answers.set("application_type", "api_microservices");
        let mut services = ServiceSelection::new();
        services.add("compute", "Lambda");
        services.add("compute", "Lambda");

        let data = QuestionnaireData::new(answers, services);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({
                "application_type": "api_microservices",
                "selected_services": {"compute": ["Lambda"]}
            })
        );

        let back: QuestionnaireData = serde_json::from_value(value).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_empty_selection_is_omitted() {
        let mut services = ServiceSelection::new();
        services.set("compute", Vec::new());
        assert!(services.is_empty());

        let data = QuestionnaireData::new(Answers::new(), services);
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({}));
    }

    #[test]
    fn test_blank_detection() {
        let mut answers = Answers::new();
        answers.set("project_name", "  ");
        answers.set("compliance_requirements", Vec::<String>::new());
        assert!(answers.is_blank("project_name"));
        assert!(answers.is_blank("compliance_requirements"));
        assert!(answers.is_blank("missing"));
    }
}
