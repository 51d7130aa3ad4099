//! Ronzz CLI entrypoint.
//!
//! This is the main entrypoint for the ronzz command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ronzz_deploy::cli::{Cli, Commands, OutputFormat, OutputFormatter, StateCommands};
use ronzz_deploy::config::{
    expand_path, find_config_file, ConfigParser, ConfigValidator, DeployConfig, DeployInputs,
};
use ronzz_deploy::error::{Result, RonzzError};
use ronzz_deploy::oci::{OciClient, OciCredentials, ResourceKind};
use ronzz_deploy::planner::{ActionType, DeploymentPlan, PlanExecutor};
use ronzz_deploy::provision::{ImageResolver, OutputExporter};
use ronzz_deploy::state::{DeploymentState, LocalStateStore, StateStore, STATE_DIR};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.output == OutputFormat::Json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Log lines are JSON when the output format is JSON.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Preview { skip_image } => cmd_preview(config_path, skip_image, &formatter).await,
        Commands::Apply { yes } => cmd_apply(config_path, yes, &formatter).await,
        Commands::Outputs => cmd_outputs(config_path, &formatter).await,
        Commands::Status => cmd_status(config_path, &formatter).await,
        Commands::Images { limit } => cmd_images(config_path, limit, &formatter).await,
        Commands::Destroy { yes } => cmd_destroy(config_path, yes, &formatter).await,
        Commands::State { command } => cmd_state(config_path, command, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new Ronzz project in: {}", path.display());

    let config_path = path.join("ronzz.deploy.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/ronzz.deploy.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    let state_entry = format!("{STATE_DIR}/");
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let has_env = existing.lines().any(|l| l.trim() == ".env");
        let has_state = existing.lines().any(|l| l.trim() == state_entry);
        if !has_env || !has_state {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# Ronzz")?;
            if !has_env {
                writeln!(file, ".env")?;
            }
            if !has_state {
                writeln!(file, "{state_entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!(".env\n{state_entry}\n"))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your compartment and availability domain");
    eprintln!("  2. Make sure ~/.oci/config holds an API signing key for your user");
    eprintln!("  3. Run 'ronzz validate' to check your configuration");
    eprintln!("  4. Run 'ronzz preview' to see what will be created");
    eprintln!("  5. Run 'ronzz apply' to create the VM");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);

    let summary = [
        ("Project", config.project.name.clone()),
        (
            "Region",
            config
                .project
                .region
                .clone()
                .unwrap_or_else(|| String::from("from OCI profile")),
        ),
        ("Shape", config.instance.shape.clone()),
        (
            "Image",
            config.image.id.clone().unwrap_or_else(|| {
                format!(
                    "latest {} {}",
                    config.image.operating_system, config.image.operating_system_version
                )
            }),
        ),
        (
            "Network",
            match (&config.network.subnet_id, &config.network.vcn_id) {
                (Some(subnet), _) => format!("existing subnet {subnet}"),
                (None, Some(vcn)) => format!("new subnet in VCN {vcn}"),
                (None, None) => format!("new VCN {}", config.network.vcn_cidr),
            },
        ),
    ];

    println!("{}", formatter.format_validation(&result, &summary, show_warnings));

    if result.is_valid() {
        Ok(())
    } else {
        ConfigValidator::new().validate(&config).map(|_| ())
    }
}

/// Show what apply would do.
async fn cmd_preview(
    config_path: Option<&PathBuf>,
    skip_image: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let state = workspace.store.load().await?;

    let (inputs, client) = if skip_image {
        let region = match &workspace.config.project.region {
            Some(region) => region.clone(),
            None => OciCredentials::load()?.region,
        };
        (workspace.inputs(&region)?, None)
    } else {
        let (inputs, client) = workspace.connect()?;
        (inputs, Some(client))
    };

    let plan = DeploymentPlan::for_apply(&inputs, state.as_ref())?;

    let needs_image = plan
        .actions
        .iter()
        .any(|a| a.action_type == ActionType::ResolveImage);
    let image = match &client {
        Some(client) if needs_image => Some(ImageResolver::new(client, &inputs).resolve().await?),
        _ => None,
    };

    println!("{}", formatter.format_plan(&plan, image.as_ref()));
    Ok(())
}

/// Apply the deployment.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let (inputs, client) = workspace.connect()?;

    let mut state = workspace
        .store
        .load()
        .await?
        .unwrap_or_else(|| DeploymentState::new(&inputs.project));

    let plan = DeploymentPlan::for_apply(&inputs, Some(&state))?;

    eprintln!("{}", formatter.format_plan(&plan, None));

    if !plan.is_noop() && !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let executor = PlanExecutor::new(&client, &inputs);
    let execution = executor.execute(&plan, &mut state).await;

    // Whatever was created before a failure must stay destroyable.
    workspace.store.save(&state).await?;
    let result = execution?;

    println!("{}", formatter.format_execution(&result));

    if result.success {
        Ok(())
    } else {
        Err(RonzzError::internal(format!(
            "apply failed; state saved to {}. Fix the problem and re-run apply, or run destroy",
            workspace.store.location()
        )))
    }
}

/// Print recorded outputs.
async fn cmd_outputs(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let workspace = Workspace::load(config_path)?;

    match workspace.store.load().await?.and_then(|s| s.outputs) {
        Some(outputs) => println!("{}", formatter.format_outputs(&outputs)),
        None => eprintln!("{}", formatter.warning("No outputs recorded. Run 'ronzz apply' first.")),
    }
    Ok(())
}

/// Re-read the instance and print fresh outputs.
async fn cmd_status(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let Some(mut state) = workspace.store.load().await? else {
        eprintln!("{}", formatter.warning("No state found. Run 'ronzz apply' first."));
        return Ok(());
    };

    let Some(instance_id) = state
        .resource(ResourceKind::Instance)
        .map(|r| r.id.clone())
    else {
        eprintln!("{}", formatter.warning("No instance recorded in state."));
        return Ok(());
    };

    let (inputs, client) = workspace.connect()?;
    let outputs = OutputExporter::export(&client, &inputs.compartment_id, &instance_id).await?;

    state.outputs = Some(outputs.clone());
    workspace.store.save(&state).await?;

    println!("{}", formatter.format_outputs(&outputs));
    Ok(())
}

/// List the newest matching catalog images.
async fn cmd_images(
    config_path: Option<&PathBuf>,
    limit: u32,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let (inputs, client) = workspace.connect()?;

    let images = ImageResolver::new(&client, &inputs).list_latest(limit).await?;
    println!("{}", formatter.format_images(&images));
    Ok(())
}

/// Destroy the deployment.
async fn cmd_destroy(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;
    let Some(mut state) = workspace.store.load().await? else {
        eprintln!("No state found. Nothing to destroy.");
        return Ok(());
    };

    let plan = DeploymentPlan::for_destroy(&state);
    if plan.actions.is_empty() {
        eprintln!("No resources owned by this deployment.");
        workspace.store.delete().await?;
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan, None));

    if !auto_approve
        && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let (inputs, client) = workspace.connect()?;
    let result = PlanExecutor::new(&client, &inputs)
        .execute(&plan, &mut state)
        .await?;

    println!("{}", formatter.format_execution(&result));

    if result.success {
        if state.is_empty() || state.owned_count() == 0 {
            workspace.store.delete().await?;
        } else {
            workspace.store.save(&state).await?;
        }
        eprintln!("{}", formatter.success("All owned resources destroyed."));
        Ok(())
    } else {
        workspace.store.save(&state).await?;
        Err(RonzzError::internal(
            "destroy did not complete; re-run destroy to remove the remaining resources",
        ))
    }
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workspace = Workspace::load(config_path)?;

    match command {
        StateCommands::Show => {
            if let Some(state) = workspace.store.load().await? {
                println!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found at {}.", workspace.store.location());
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A loaded and validated configuration with its state store.
struct Workspace {
    config: DeployConfig,
    base_dir: PathBuf,
    store: Box<dyn StateStore>,
}

impl Workspace {
    /// Loads `.env`, the configuration file and environment overrides, then validates.
    fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let config_file = resolve_config_path(config_path)?;
        debug!("Loading configuration from: {}", config_file.display());

        let parser = parser_for(&config_file);
        parser.load_dotenv()?;
        let config = parser.load_with_env(&config_file)?;

        let result = ConfigValidator::new().validate(&config)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }

        let base_dir = parser.base_dir();
        let store: Box<dyn StateStore> = match config.state.path.as_deref() {
            Some(path) => Box::new(LocalStateStore::with_base_dir(expand_path(path, &base_dir))),
            None => Box::new(LocalStateStore::in_dir(&base_dir)),
        };

        Ok(Self {
            config,
            base_dir,
            store,
        })
    }

    fn inputs(&self, default_region: &str) -> Result<DeployInputs> {
        DeployInputs::resolve(&self.config, default_region, &self.base_dir)
    }

    /// Loads OCI credentials and builds the client for the deployment region.
    fn connect(&self) -> Result<(DeployInputs, OciClient)> {
        let credentials = OciCredentials::load()?;
        let inputs = self.inputs(&credentials.region)?;
        let client = OciClient::new(&credentials, &inputs.region)?;
        Ok((inputs, client))
    }
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Prompts on stderr and returns true if the answer matches `expected`.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}
