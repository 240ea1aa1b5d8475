// Deterministic defaults applied before generation

use super::answers::{AnswerValue, Answers, ServiceSelection, NONE_VALUE};

/// Default project name when the user left it blank
pub const DEFAULT_PROJECT_NAME: &str = "Generated Architecture";

/// Default answer for a question, if it has one
pub fn default_answer(question_id: &str) -> Option<AnswerValue> {
    let value = match question_id {
        "project_name" => DEFAULT_PROJECT_NAME,
        "application_type" => "web_application",
        "geographical_reach" => "global",
        "availability_requirements" => "standard",
        "compute_preference" => "serverless",
        "traffic_volume" => "low",
        "storage_needs" => "minimal",
        "database_type" => "sql",
        "data_sensitivity" => "public",
        "budget_range" => "startup",
        "security_level" => "high",
        "compliance_requirements" => return Some(AnswerValue::from(vec![NONE_VALUE])),
        _ => return None,
    };
    Some(AnswerValue::from(value))
}

const DEFAULTED_QUESTIONS: &[&str] = &[
    "project_name",
    "application_type",
    "geographical_reach",
    "availability_requirements",
    "compute_preference",
    "traffic_volume",
    "storage_needs",
    "database_type",
    "data_sensitivity",
    "budget_range",
    "compliance_requirements",
    "security_level",
];

/// Default service selection for an application type
pub fn default_services(application_type: Option<&str>) -> ServiceSelection {
    let entries: &[(&str, &[&str])] = match application_type.unwrap_or_default() {
        "api_microservices" | "api" | "microservices" => &[
            ("compute", &["Lambda", "ECS"]),
            ("database", &["DynamoDB"]),
            ("networking", &["API Gateway"]),
        ],
        "data_analytics" | "analytics" => {
            &[("analytics", &["EMR", "Redshift"]), ("storage", &["S3"])]
        }
        "machine_learning" | "ml" => &[
            ("ml", &["SageMaker"]),
            ("compute", &["Lambda"]),
            ("storage", &["S3"]),
        ],
        _ => &[
            ("compute", &["Lambda"]),
            ("database", &["RDS"]),
            ("storage", &["S3"]),
            ("networking", &["CloudFront"]),
        ],
    };

    let mut selection = ServiceSelection::new();
    for (category, services) in entries {
        for service in *services {
            selection.add(category, service);
        }
    }
    selection
}

/// Fill blank answers and an empty service selection with defaults.
///
/// Returns the identifiers of the answers that were filled in.
pub fn apply_defaults(answers: &mut Answers, services: &mut ServiceSelection) -> Vec<&'static str> {
    let mut filled = Vec::new();

    for id in DEFAULTED_QUESTIONS {
        if answers.is_blank(id) {
            if let Some(value) = default_answer(id) {
                answers.set(*id, value);
                filled.push(*id);
            }
        }
    }

    if services.is_empty() {
        *services = default_services(answers.text("application_type"));
        log::debug!(
            "[questionnaire] Applied {} default services for {:?}",
            services.count(),
            answers.text("application_type")
        );
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::{by_id, validate};

    #[test]
    fn test_api_defaults() {
        let services = default_services(Some("api_microservices"));
        assert_eq!(services.services("compute"), ["Lambda", "ECS"]);
        assert_eq!(services.services("database"), ["DynamoDB"]);
        assert_eq!(services.services("networking"), ["API Gateway"]);
    }

    #[test]
    fn test_analytics_and_ml_defaults() {
        let analytics = default_services(Some("data_analytics"));
        assert_eq!(analytics.services("analytics"), ["EMR", "Redshift"]);
        assert_eq!(analytics.services("storage"), ["S3"]);

        let ml = default_services(Some("machine_learning"));
        assert_eq!(ml.services("ml"), ["SageMaker"]);
        assert_eq!(ml.services("compute"), ["Lambda"]);
        assert_eq!(ml.services("storage"), ["S3"]);
    }

    #[test]
    fn test_general_defaults_for_other_types() {
        for app in [None, Some("ecommerce"), Some("something_new")] {
            let services = default_services(app);
            assert_eq!(services.services("compute"), ["Lambda"]);
            assert_eq!(services.services("database"), ["RDS"]);
        }
    }

    #[test]
    fn test_apply_defaults_fills_only_blanks() {
        let mut answers = Answers::new();
        answers.set("project_name", "");
        answers.set("compute_preference", "containers");
        let mut services = ServiceSelection::new();

        let filled = apply_defaults(&mut answers, &mut services);

        assert_eq!(answers.text("project_name"), Some(DEFAULT_PROJECT_NAME));
        assert_eq!(answers.text("compute_preference"), Some("containers"));
        assert_eq!(answers.text("geographical_reach"), Some("global"));
        assert_eq!(answers.text("traffic_volume"), Some("low"));
        assert_eq!(answers.text("storage_needs"), Some("minimal"));
        assert_eq!(answers.text("database_type"), Some("sql"));
        assert_eq!(answers.text("data_sensitivity"), Some("public"));
        assert_eq!(answers.text("budget_range"), Some("startup"));
        assert_eq!(answers.text("security_level"), Some("high"));
        assert_eq!(answers.values("compliance_requirements"), ["none"]);
        assert!(filled.contains(&"project_name"));
        assert!(!filled.contains(&"compute_preference"));
        assert!(!services.is_empty());
    }

    #[test]
    fn test_existing_selection_is_kept() {
        let mut answers = Answers::new();
        answers.set("application_type", "api_microservices");
        let mut services = ServiceSelection::new();
        services.add("compute", "EC2");

        apply_defaults(&mut answers, &mut services);
        assert_eq!(services.services("compute"), ["EC2"]);
        assert!(services.services("database").is_empty());
    }

    #[test]
    fn test_defaults_are_valid_answers() {
        for id in DEFAULTED_QUESTIONS {
            assert!(by_id(id).is_some(), "{} is not in the catalog", id);
            let value = default_answer(id).unwrap();
            assert!(validate(Some(&value), id).is_ok(), "default for {} is invalid", id);
        }
    }
}
