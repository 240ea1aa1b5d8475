// Static questionnaire catalog

use super::{Category, Impact, InputKind, OptionDetails, Question, QuestionOption};
use std::sync::OnceLock;

/// Number of configure steps in the create workflow
pub const STEP_COUNT: usize = 5;

const STEP_TITLES: [&str; STEP_COUNT] = [
    "Project Basics",
    "Scale & Reach",
    "Compute & Data",
    "Security & Compliance",
    "Budget & Services",
];

static CATALOG: OnceLock<Vec<Question>> = OnceLock::new();

/// All questions in asking order
pub fn list() -> &'static [Question] {
    CATALOG.get_or_init(build_catalog)
}

/// Look up a question by identifier
pub fn by_id(id: &str) -> Option<&'static Question> {
    list().iter().find(|q| q.id == id)
}

/// Questions asked in configure step `step`
pub fn questions_in_step(step: usize) -> impl Iterator<Item = &'static Question> {
    list().iter().filter(move |q| q.step == step)
}

pub fn step_title(step: usize) -> Option<&'static str> {
    STEP_TITLES.get(step).copied()
}

fn opt(value: &'static str, label: &'static str, description: &'static str) -> QuestionOption {
    QuestionOption {
        value,
        label,
        description,
        recommended: false,
        popular: false,
        details: None,
    }
}

impl QuestionOption {
    fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    fn popular(mut self) -> Self {
        self.popular = true;
        self
    }

    fn details(
        mut self,
        aws_services: &[&'static str],
        cost_range: &'static str,
        use_case: &'static str,
    ) -> Self {
        self.details = Some(OptionDetails {
            aws_services: aws_services.to_vec(),
            cost_range,
            use_case,
        });
        self
    }
}

struct QuestionBuilder(Question);

fn question(
    id: &'static str,
    category: Category,
    step: usize,
    kind: InputKind,
    title: &'static str,
    prompt: &'static str,
) -> QuestionBuilder {
    QuestionBuilder(Question {
        id,
        category,
        step,
        title,
        prompt,
        explanation: "",
        kind,
        required: true,
        options: Vec::new(),
        impact: None,
        placeholder: None,
        max_length: None,
        exclusive_value: None,
    })
}

impl QuestionBuilder {
    fn explanation(mut self, text: &'static str) -> Self {
        self.0.explanation = text;
        self
    }

    fn optional(mut self) -> Self {
        self.0.required = false;
        self
    }

    fn options(mut self, options: Vec<QuestionOption>) -> Self {
        self.0.options = options;
        self
    }

    fn impact(mut self, services: &'static str, cost: &'static str, security: &'static str) -> Self {
        self.0.impact = Some(Impact {
            services,
            cost,
            security,
        });
        self
    }

    fn placeholder(mut self, text: &'static str) -> Self {
        self.0.placeholder = Some(text);
        self
    }

    fn max_length(mut self, len: usize) -> Self {
        self.0.max_length = Some(len);
        self
    }

    fn exclusive(mut self, value: &'static str) -> Self {
        self.0.exclusive_value = Some(value);
        self
    }

    fn build(self) -> Question {
        self.0
    }
}

fn build_catalog() -> Vec<Question> {
    vec![
        // Step 0: project basics
        question(
            "project_name",
            Category::Basics,
            0,
            InputKind::Text,
            "Project Name",
            "What should we call this project?",
        )
        .explanation("Used to label the project, its diagram and the generated templates.")
        .placeholder("e.g. Online Shop")
        .max_length(100)
        .build(),
        question(
            "description",
            Category::Basics,
            0,
            InputKind::Textarea,
            "Description",
            "Describe what the application does.",
        )
        .explanation("Free-form context that helps explain the generated architecture.")
        .placeholder("A storefront with a product catalog, cart and checkout...")
        .max_length(1000)
        .optional()
        .build(),
        question(
            "application_type",
            Category::Basics,
            0,
            InputKind::Radio,
            "Application Type",
            "What kind of application are you building?",
        )
        .explanation("The application type drives the default service selection.")
        .impact(
            "Selects the baseline compute, data and networking services",
            "Sets the starting cost profile",
            "Determines the default exposure surface",
        )
        .options(vec![
            opt("web_application", "Web Application", "Server-rendered or single-page web app")
                .popular()
                .details(
                    &["CloudFront", "S3", "Lambda", "RDS"],
                    "$50 - $500/month",
                    "Marketing sites, dashboards, SaaS front ends",
                ),
            opt("ecommerce", "E-commerce", "Storefront with catalog, cart and payments")
                .popular()
                .details(
                    &["CloudFront", "ECS", "RDS", "ElastiCache"],
                    "$200 - $2,000/month",
                    "Online shops and marketplaces",
                ),
            opt("api_microservices", "API / Microservices", "Backend services exposed over HTTP")
                .recommended()
                .details(
                    &["API Gateway", "Lambda", "ECS", "DynamoDB"],
                    "$30 - $800/month",
                    "Mobile backends, partner APIs, service meshes",
                ),
            opt("data_analytics", "Data Analytics", "Pipelines, warehousing and reporting")
                .details(
                    &["EMR", "Redshift", "S3", "Glue"],
                    "$300 - $5,000/month",
                    "BI dashboards and batch analytics",
                ),
            opt("machine_learning", "Machine Learning", "Model training and inference")
                .details(
                    &["SageMaker", "Lambda", "S3"],
                    "$200 - $10,000/month",
                    "Recommendation engines, forecasting, vision",
                ),
            opt("mobile_backend", "Mobile Backend", "Sync, auth and push for mobile apps").details(
                &["Amplify", "Cognito", "AppSync", "DynamoDB"],
                "$20 - $400/month",
                "Consumer mobile applications",
            ),
            opt("content_management", "Content Management", "Publishing and media delivery")
                .details(
                    &["CloudFront", "S3", "EC2", "RDS"],
                    "$50 - $600/month",
                    "Blogs, news sites, documentation portals",
                ),
            opt("iot", "IoT Platform", "Device telemetry ingestion and control").details(
                &["IoT Core", "Kinesis", "Timestream", "Lambda"],
                "$100 - $3,000/month",
                "Sensor networks and fleet telemetry",
            ),
        ])
        .build(),
        // Step 1: scale & reach
        question(
            "traffic_volume",
            Category::Scale,
            1,
            InputKind::Radio,
            "Expected Traffic",
            "How much traffic do you expect?",
        )
        .explanation("Traffic sizes load balancing, auto scaling and caching.")
        .impact(
            "Adds load balancers, auto scaling and caching tiers as traffic grows",
            "Largest single driver of monthly cost",
            "Higher traffic raises the value of WAF and DDoS protection",
        )
        .options(vec![
            opt("low", "Low", "Under 1,000 requests per day").recommended(),
            opt("medium", "Medium", "1,000 to 100,000 requests per day").popular(),
            opt("high", "High", "100,000 to 10 million requests per day"),
            opt("very_high", "Very High", "More than 10 million requests per day").details(
                &["CloudFront", "ElastiCache", "Auto Scaling", "Shield Advanced"],
                "$2,000+/month",
                "Consumer platforms with viral peaks",
            ),
        ])
        .build(),
        question(
            "geographical_reach",
            Category::Scale,
            1,
            InputKind::Radio,
            "Geographical Reach",
            "Where are your users located?",
        )
        .explanation("Determines regions, edge caching and data residency.")
        .options(vec![
            opt("single_region", "Single Region", "Users concentrated in one area"),
            opt("multi_region", "Multi-Region", "Users across a few continents")
                .details(&["Route 53", "Aurora Global Database"], "+30-60% cost", "Regional failover"),
            opt("global", "Global", "Users everywhere")
                .recommended()
                .details(&["CloudFront", "Global Accelerator"], "+10-40% cost", "Worldwide audiences"),
        ])
        .build(),
        question(
            "availability_requirements",
            Category::Scale,
            1,
            InputKind::Radio,
            "Availability",
            "How much downtime can you tolerate?",
        )
        .explanation("Availability targets decide multi-AZ and multi-region redundancy.")
        .options(vec![
            opt("standard", "Standard (99.5%)", "Single AZ with backups").recommended(),
            opt("high", "High (99.9%)", "Multi-AZ deployment").popular(),
            opt("mission_critical", "Mission Critical (99.99%)", "Multi-region active-active"),
        ])
        .build(),
        // Step 2: compute & data
        question(
            "compute_preference",
            Category::Compute,
            2,
            InputKind::Radio,
            "Compute Preference",
            "How would you like to run your code?",
        )
        .explanation("Serverless minimises operations; containers and VMs give more control.")
        .impact(
            "Chooses between Lambda, ECS/EKS and EC2",
            "Serverless is cheapest at low traffic",
            "Managed runtimes reduce the patching burden",
        )
        .options(vec![
            opt("serverless", "Serverless", "Functions that scale to zero")
                .recommended()
                .popular()
                .details(&["Lambda", "API Gateway"], "$0 - $300/month", "Event-driven and spiky workloads"),
            opt("containers", "Containers", "Docker workloads on a managed orchestrator")
                .details(&["ECS", "Fargate", "EKS"], "$70 - $1,500/month", "Long-running services"),
            opt("virtual_machines", "Virtual Machines", "Full control over instances")
                .details(&["EC2", "Auto Scaling"], "$30 - $3,000/month", "Legacy or specialised software"),
            opt("hybrid", "Hybrid", "Mix of functions and containers"),
        ])
        .build(),
        question(
            "database_type",
            Category::Data,
            2,
            InputKind::Radio,
            "Database",
            "What kind of data store fits your data?",
        )
        .explanation("Relational for structured data, NoSQL for flexible schemas and scale.")
        .options(vec![
            opt("sql", "Relational (SQL)", "Structured data with joins and transactions")
                .recommended()
                .popular()
                .details(&["RDS", "Aurora"], "$15 - $2,000/month", "Orders, accounts, inventories"),
            opt("nosql", "NoSQL", "Key-value or document data at scale")
                .details(&["DynamoDB", "DocumentDB"], "$0 - $1,000/month", "Sessions, catalogs, events"),
            opt("both", "Both", "Relational core with NoSQL side stores"),
            opt("data_warehouse", "Data Warehouse", "Analytical queries over large datasets")
                .details(&["Redshift"], "$180+/month", "Reporting and BI"),
            opt("none", "No Database", "Stateless or file-based application"),
        ])
        .build(),
        question(
            "storage_needs",
            Category::Data,
            2,
            InputKind::Radio,
            "Storage Needs",
            "How much file and object storage do you need?",
        )
        .options(vec![
            opt("minimal", "Minimal", "Under 10 GB").recommended(),
            opt("moderate", "Moderate", "10 GB to 1 TB").popular(),
            opt("large", "Large", "1 TB to 100 TB"),
            opt("massive", "Massive", "More than 100 TB")
                .details(&["S3 Intelligent-Tiering", "S3 Glacier"], "$2,000+/month", "Media archives, data lakes"),
        ])
        .build(),
        // Step 3: security & compliance
        question(
            "data_sensitivity",
            Category::Security,
            3,
            InputKind::Radio,
            "Data Sensitivity",
            "How sensitive is the data you handle?",
        )
        .explanation("Sensitivity drives encryption, key management and network isolation.")
        .impact(
            "Adds KMS, private subnets and Macie for sensitive data",
            "Encryption and isolation add modest cost",
            "Primary input to the security baseline",
        )
        .options(vec![
            opt("public", "Public", "Data meant to be public").recommended(),
            opt("internal", "Internal", "Business data, not public").popular(),
            opt("confidential", "Confidential", "Customer PII or financial records"),
            opt("restricted", "Restricted", "Regulated or highly sensitive data"),
        ])
        .build(),
        question(
            "compliance_requirements",
            Category::Compliance,
            3,
            InputKind::Checkbox,
            "Compliance",
            "Which compliance frameworks apply?",
        )
        .explanation("Select every framework you must satisfy, or \"None\".")
        .impact(
            "Enables Config rules, CloudTrail and audit logging",
            "Audit tooling adds recurring cost",
            "Maps controls to the chosen frameworks",
        )
        .exclusive("none")
        .options(vec![
            opt("none", "None", "No formal compliance requirements").recommended(),
            opt("pci", "PCI DSS", "Card payment data").popular(),
            opt("hipaa", "HIPAA", "US health information"),
            opt("gdpr", "GDPR", "EU personal data").popular(),
            opt("soc2", "SOC 2", "Service organisation controls"),
            opt("iso27001", "ISO 27001", "Information security management"),
            opt("fedramp", "FedRAMP", "US federal workloads"),
        ])
        .build(),
        question(
            "security_level",
            Category::Security,
            3,
            InputKind::Radio,
            "Security Level",
            "How much security hardening do you want?",
        )
        .options(vec![
            opt("basic", "Basic", "Sensible defaults"),
            opt("standard", "Standard", "WAF and centralised logging"),
            opt("high", "High", "GuardDuty, Security Hub, strict IAM")
                .recommended()
                .popular(),
            opt("maximum", "Maximum", "Defense in depth with continuous auditing"),
        ])
        .build(),
        // Step 4: budget & services
        question(
            "budget_range",
            Category::Budget,
            4,
            InputKind::Radio,
            "Monthly Budget",
            "What is your monthly infrastructure budget?",
        )
        .explanation("The generator trades redundancy for cost within this range.")
        .impact(
            "Caps instance sizes and redundancy",
            "Defines the cost ceiling of the estimate",
            "Very low budgets may skip paid security services",
        )
        .options(vec![
            opt("startup", "Startup", "Under $100/month").recommended(),
            opt("small_business", "Small Business", "$100 - $1,000/month").popular(),
            opt("medium", "Medium", "$1,000 - $10,000/month"),
            opt("enterprise", "Enterprise", "More than $10,000/month"),
        ])
        .build(),
        question(
            "performance_requirements",
            Category::Performance,
            4,
            InputKind::Checkbox,
            "Performance Goals",
            "Which performance characteristics matter?",
        )
        .optional()
        .options(vec![
            opt("low_latency", "Low Latency", "Fast responses for interactive users").popular(),
            opt("high_throughput", "High Throughput", "Many requests or records per second"),
            opt("real_time", "Real Time", "Streaming updates to clients"),
            opt("batch_processing", "Batch Processing", "Scheduled bulk jobs"),
            opt("caching", "Caching", "Aggressive caching of hot data"),
        ])
        .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_question_ids_are_unique() {
        let mut seen = HashSet::new();
        for q in list() {
            assert!(seen.insert(q.id), "duplicate question id {}", q.id);
        }
    }

    #[test]
    fn test_option_values_are_unique_per_question() {
        for q in list() {
            let mut seen = HashSet::new();
            for o in &q.options {
                assert!(seen.insert(o.value), "duplicate option {} in {}", o.value, q.id);
            }
        }
    }

    #[test]
    fn test_choice_questions_have_options_and_text_questions_do_not() {
        for q in list() {
            if q.kind.is_choice() {
                assert!(!q.options.is_empty(), "{} has no options", q.id);
            } else {
                assert!(q.options.is_empty(), "{} is text but has options", q.id);
            }
        }
    }

    #[test]
    fn test_every_step_has_a_required_question() {
        for step in 0..STEP_COUNT {
            assert!(
                questions_in_step(step).any(|q| q.required),
                "step {} has no required question",
                step
            );
            assert!(step_title(step).is_some());
        }
        assert!(step_title(STEP_COUNT).is_none());
        assert!(list().iter().all(|q| q.step < STEP_COUNT));
    }

    #[test]
    fn test_by_id_lookup() {
        let q = by_id("compliance_requirements").unwrap();
        assert_eq!(q.kind, InputKind::Checkbox);
        assert_eq!(q.exclusive_value, Some("none"));
        assert!(q.has_option("pci"));
        assert!(!q.has_option("sox"));
        assert!(by_id("unknown").is_none());
    }

    #[test]
    fn test_exclusive_value_is_an_option() {
        for q in list() {
            if let Some(value) = q.exclusive_value {
                assert_eq!(q.kind, InputKind::Checkbox);
                assert!(q.has_option(value));
            }
        }
    }
}
