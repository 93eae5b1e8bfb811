mod config;
mod error;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use capability::Grants;
use clap::{Parser, Subcommand};
use host::{CapabilityProvider, Driver, WasmComponent};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use value::{EvaluationRequest, StructuredValue};

use config::{Config, LogConfig};
use error::{Error, Result};

const CONFIG_FILE: &str = "host.toml";

#[derive(Parser)]
#[command(name = "policy-host")]
#[command(about = "Run a sandboxed policy engine component", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./host.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine component, overriding guest.component
    #[arg(long, global = true)]
    component: Option<PathBuf>,

    /// Grants file, replacing the config's [capabilities] table
    #[arg(long, global = true)]
    grants: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the engine's version
    Version,
    /// Evaluate a pattern against a JSON input
    Eval {
        /// Policy source file holding the pattern
        #[arg(short, long)]
        policy: PathBuf,
        /// Name of the pattern to evaluate
        #[arg(short, long)]
        name: String,
        /// JSON input file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Additional policy sources
        #[arg(long = "with-policy")]
        policies: Vec<PathBuf>,
        /// Additional data sources
        #[arg(long = "with-data")]
        data: Vec<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.log);

    let component_path = cli
        .component
        .or_else(|| config.guest.component.clone())
        .ok_or(Error::MissingComponent)?;
    let component = WasmComponent::from_file(&component_path)?;
    info!(component = %component_path.display(), "guest component loaded");
    let grants = resolve_grants(cli.grants.as_deref(), &config)?;
    let provider = CapabilityProvider::from_grants(&grants);

    match cli.command {
        Commands::Version => cmd_version(component, provider),
        Commands::Eval {
            policy,
            name,
            input,
            policies,
            data,
        } => {
            let mut request =
                EvaluationRequest::new(std::fs::read_to_string(&policy)?, name, read_input(input)?);
            for path in &policies {
                request = request.with_policy(std::fs::read_to_string(path)?);
            }
            for path in &data {
                request = request.with_data(std::fs::read_to_string(path)?);
            }
            cmd_eval(component, provider, &request)
        }
    }
}

fn cmd_version(component: WasmComponent, provider: CapabilityProvider) -> Result<()> {
    let mut driver = Driver::new(component, provider);
    driver.instantiate()?;
    driver.bind()?;
    println!("{}", driver.version()?);
    Ok(())
}

fn cmd_eval(
    component: WasmComponent,
    provider: CapabilityProvider,
    request: &EvaluationRequest,
) -> Result<()> {
    let result = Driver::run(component, provider, request)?;
    let json = serde_json::to_string_pretty(&result.to_structured().to_json())?;
    println!("{json}");
    if !result.satisfied() {
        std::process::exit(2);
    }
    Ok(())
}

fn read_input(path: Option<PathBuf>) -> Result<StructuredValue> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let json: serde_json::Value = serde_json::from_str(&text)?;
    Ok(json.into())
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

/// A grants file, when given, takes the place of the config's grants.
fn resolve_grants(explicit: Option<&Path>, config: &Config) -> Result<Grants> {
    match explicit {
        Some(path) => {
            let grants = Grants::load(path)?;
            info!(grants = %path.display(), "grants loaded");
            Ok(grants)
        }
        None => Ok(config.capabilities.clone()),
    }
}

/// Logs go to stderr; stdout belongs to the guest and to results.
fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.level.as_str()));

    if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr).with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}
