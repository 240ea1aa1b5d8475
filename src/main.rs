use anyhow::{anyhow, bail, Context, Result};
use archgen_lib::config::{load_config, PartialConfig};
use archgen_lib::jobs::JobEvent;
use archgen_lib::models::{ArchitectureData, DeployRequest};
use archgen_lib::questionnaire::{catalog, QuestionnaireData, STEP_COUNT};
use archgen_lib::workflow::{
    CreateInput, CreateState, DeployInput, DeployState, ImportInput, ImportState,
    WorkflowController, WorkflowKind,
};
use archgen_lib::App;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Archgen - workflow client for the AWS Architecture Generator
#[derive(Parser, Debug)]
#[command(name = "archgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API base URL (overrides API_BASE_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Trace every request and response
    #[arg(long, global = true)]
    debug: bool,

    /// Directory holding config.toml and saved state
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the questionnaire, step by step
    Questions,

    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long, env = "ARCHGEN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the session and forget saved state
    Logout,

    /// Generate an architecture from an answers file (JSON or YAML)
    Generate {
        #[arg(long)]
        answers: PathBuf,
    },

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Import the infrastructure of an AWS account
    Import {
        #[arg(long)]
        account: String,
        /// Region to scan; repeat for several
        #[arg(long = "region")]
        regions: Vec<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Deploy a project's architecture to an AWS account
    Deploy {
        #[arg(long)]
        project: String,
        #[arg(long)]
        account: String,
        #[arg(long)]
        region: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectsAction {
    List,
    Show { id: String },
    Delete { id: String },
    Regenerate { id: String },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(cli)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Questions = cli.command {
        print_questions();
        return Ok(());
    }

    let overrides = PartialConfig {
        api_base_url: cli.api_url,
        debug: cli.debug.then_some(true),
        state_dir: cli.state_dir,
        ..PartialConfig::default()
    };
    let config = load_config(Some(overrides)).context("Invalid configuration")?;
    let app = App::new(config).map_err(|e| anyhow!("{}", e))?;

    if let Command::Login { username, password } = &cli.command {
        let user = app.login(username, password).await?;
        println!("Logged in as {}", user.display_name());
        return Ok(());
    }

    let (auth, _follower) = app.start().await;
    if !auth.is_authenticated() {
        bail!("Not logged in. Run `archgen login <username>` first.");
    }

    match cli.command {
        Command::Questions | Command::Login { .. } => Ok(()),
        Command::Logout => {
            app.logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Generate { answers } => generate(&app, &answers).await,
        Command::Projects { action } => projects(&app, action).await,
        Command::Import {
            account,
            regions,
            name,
        } => import(&app, account, regions, name).await,
        Command::Deploy {
            project,
            account,
            region,
        } => deploy(&app, project, account, region).await,
    }
}

fn print_questions() {
    for step in 0..STEP_COUNT {
        println!(
            "Step {}: {}",
            step + 1,
            catalog::step_title(step).unwrap_or_default()
        );
        for question in catalog::questions_in_step(step) {
            let marker = if question.required { "*" } else { " " };
            println!("  {}{} - {}", marker, question.id, question.title);
            for option in &question.options {
                println!("      {:<20} {}", option.value, option.label);
            }
        }
        println!();
    }
}

fn read_answers(path: &Path) -> Result<QuestionnaireData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file {:?}", path))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let data = if is_yaml {
        serde_yaml::from_str(&text).context("Answers file is not valid YAML")?
    } else {
        serde_json::from_str(&text).context("Answers file is not valid JSON")?
    };
    Ok(data)
}

/// Report job events until the workflow's job ends
async fn follow_job(workflows: &mut WorkflowController) -> Result<()> {
    while let Some((_, event)) = workflows.next_event().await {
        print_event(&event);
        if event.is_terminal() {
            return Ok(());
        }
    }
    bail!("Job event stream closed unexpectedly")
}

fn print_event(event: &JobEvent) {
    match event {
        JobEvent::Started { job_id } => println!("Started job {}", job_id),
        JobEvent::Progress { snapshot, .. } => println!(
            "[{:>3}%] {}",
            snapshot.progress_percentage,
            snapshot.current_step.as_deref().unwrap_or("")
        ),
        JobEvent::Log { line, .. } => println!("      {}", line),
        JobEvent::Completed { .. } => println!("Done"),
        JobEvent::Failed { reason, .. } => println!("Failed: {}", reason),
        JobEvent::Cancelled { .. } => println!("Stopped"),
    }
}

async fn generate(app: &App, path: &Path) -> Result<()> {
    let data = read_answers(path)?;
    let mut workflows = app.workflows();
    workflows.navigate("/create").await;
    workflows.create(CreateInput::CreateNew).await?;

    for (question_id, value) in data.answers.iter() {
        workflows
            .create(CreateInput::SetAnswer {
                question_id: question_id.clone(),
                value: value.clone(),
            })
            .await?;
    }
    if !data.selected_services.is_empty() {
        workflows
            .create(CreateInput::SetServices(data.selected_services))
            .await?;
    }
    for _ in 1..STEP_COUNT {
        workflows.create(CreateInput::Next).await?;
    }
    workflows.create(CreateInput::Generate).await?;
    follow_job(&mut workflows).await?;

    match workflows.create_machine().state() {
        CreateState::Review { .. } => {}
        _ => bail!(
            "{}",
            workflows
                .create_machine()
                .error()
                .unwrap_or("Architecture generation did not complete")
        ),
    }
    let project = app
        .architecture
        .current()
        .ok_or_else(|| anyhow!("The generated project could not be loaded"))?;
    println!("Project {} ({})", project.project_name, project.id);
    if let Some(architecture) = &project.architecture_data {
        print_architecture(architecture);
    }
    Ok(())
}

fn print_architecture(architecture: &ArchitectureData) {
    for (category, service) in &architecture.services {
        println!("  {:<14} {}", category, service);
    }
    if let Some(cost) = &architecture.estimated_cost {
        println!("  Estimated cost: {}", cost);
    }
    if !architecture.security_features.is_empty() {
        println!("  Security: {}", architecture.security_features.join(", "));
    }
}

async fn projects(app: &App, action: ProjectsAction) -> Result<()> {
    let projects = &app.services.projects;
    match action {
        ProjectsAction::List => {
            for project in projects.list(0, 100).await? {
                let created = project
                    .created_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!("{:<10} {:<12} {}", project.id, created, project.project_name);
            }
        }
        ProjectsAction::Show { id } => {
            let project = app.architecture.get(&id).await?;
            println!("Project {} ({})", project.project_name, project.id);
            if let Some(description) = &project.description {
                println!("  {}", description);
            }
            match &project.architecture_data {
                Some(architecture) => print_architecture(architecture),
                None => println!("  No architecture generated yet"),
            }
        }
        ProjectsAction::Delete { id } => {
            projects.delete(&id).await?;
            app.architecture.evict(&id);
            println!("Deleted project {}", id);
        }
        ProjectsAction::Regenerate { id } => {
            let architecture = projects.regenerate(&id).await?;
            println!("Regenerated project {}", id);
            print_architecture(&architecture);
        }
    }
    Ok(())
}

async fn import(
    app: &App,
    account: String,
    regions: Vec<String>,
    name: Option<String>,
) -> Result<()> {
    let mut workflows = app.workflows();
    workflows.navigate("/import").await;
    workflows
        .import(ImportInput::SelectAccount(Some(account)))
        .await?;
    if !regions.is_empty() {
        workflows.import(ImportInput::SetRegions(regions)).await?;
    }
    if let Some(name) = name {
        workflows.import(ImportInput::SetProjectName(name)).await?;
    }
    workflows.import(ImportInput::Submit).await?;
    follow_job(&mut workflows).await?;

    let machine = workflows.import_machine();
    if machine.state() != &ImportState::Review {
        bail!("Import did not complete");
    }
    println!(
        "Import {} finished with {} security gap(s)",
        machine.import_id().unwrap_or_default(),
        machine.findings().len()
    );
    for finding in machine.findings() {
        println!("  [{}] {} - {}", finding.severity, finding.id, finding.title);
    }
    Ok(())
}

async fn deploy(
    app: &App,
    project: String,
    account: String,
    region: Option<String>,
) -> Result<()> {
    let mut workflows = app.workflows();
    workflows.navigate("/production").await;
    workflows
        .deploy(DeployInput::Start(DeployRequest {
            project_id: project,
            aws_account_id: account,
            region,
            environment: None,
        }))
        .await?;

    loop {
        tokio::select! {
            event = workflows.next_event() => {
                let Some((workflow, event)) = event else {
                    bail!("Job event stream closed unexpectedly");
                };
                print_event(&event);
                if workflow == WorkflowKind::Deploy && event.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("[archgen] Interrupt received, stopping deployment");
                workflows.deploy(DeployInput::Stop).await?;
            }
        }
    }

    match workflows.deploy_machine().state() {
        DeployState::Deployed => Ok(()),
        DeployState::Error { reason } => bail!("Deployment failed: {}", reason),
        _ => bail!("Deployment stopped"),
    }
}
