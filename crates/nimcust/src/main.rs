//! nimcust
//!
//! Applies IBM NIM lpp_source bundles to standalone AIX clients from the NIM
//! master, one machine at a time or as a single asynchronous operation.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use eyre::WrapErr;
use nimcust_api::{CustMode, CustRequest};
use nimcust_core::{CoreError, Orchestrator};
use nimcust_exec::{CommandExecutor, CommandSpec, LocalExecutor};
use nimcust_inventory::{CommandInventory, InventorySource, JsonFileInventory};
use nimcust_nim::NimCustomizer;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod console;

use config::{Config, InventoryConfig, LogConfig, LogFormat};
use console::{ConsoleSink, render_report, render_targets};

#[derive(Parser)]
#[command(name = "nimcust", version)]
#[command(about = "Update AIX NIM standalone clients to an lpp_source level", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inventory snapshot file (overrides the configuration)
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    /// nim program name or path
    #[arg(long, global = true)]
    nim: Option<String>,

    /// Log level or filter directive
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring targets up to the level of an lpp_source
    Update(CustArgs),
    /// Accepted for compatibility; changes nothing
    Check(CustArgs),
    /// Show which machines a target list selects
    Resolve {
        /// Comma-separated machine names, `*` wildcards allowed
        #[arg(long)]
        targets: Option<String>,
    },
}

#[derive(Args)]
struct CustArgs {
    /// lpp_source name, YYYY-MM-DD-NNNN-lpp_source
    #[arg(long)]
    lpp_source: String,

    /// Comma-separated machine names, `*` wildcards allowed (default: all)
    #[arg(long)]
    targets: Option<String>,

    /// Submit one asynchronous nim operation for all targets
    #[arg(long = "async")]
    is_async: bool,

    /// Free-form description of the run
    #[arg(long, default_value = "")]
    desc: String,

    /// Resolve and compare levels without running nim
    #[arg(long)]
    dry_run: bool,

    /// Report layout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

impl CustArgs {
    fn request(&self) -> CustRequest {
        let request = CustRequest::new(&self.lpp_source)
            .with_desc(&self.desc)
            .with_mode(CustMode::from_async_flag(self.is_async))
            .with_dry_run(self.dry_run);
        match &self.targets {
            Some(targets) => request.with_targets(targets),
            None => request,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (mut config, config_path) = Config::load_default(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    init_tracing(&config.log)?;
    match &config_path {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => warn!("no config file found, using defaults"),
    }

    let executor: Arc<dyn CommandExecutor> = Arc::new(LocalExecutor::new());
    let inventory = inventory_source(&config.inventory, executor.clone())?;
    let customizer =
        Arc::new(NimCustomizer::new(executor).with_nim_command(&config.nim.command));

    let interactive = std::io::stderr().is_terminal() && config.log.format == LogFormat::Text;
    let sink = Arc::new(ConsoleSink::new(interactive));
    let orchestrator = Orchestrator::new(inventory, customizer, sink);

    match cli.command {
        Commands::Update(args) => {
            let report = orchestrator
                .run(&args.request())
                .await
                .map_err(|e| step_report(e, &args.lpp_source))?;
            match args.format {
                ReportFormat::Text => println!("{}", render_report(&report)),
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Check(args) => {
            orchestrator
                .check(&args.request())
                .await
                .map_err(|e| step_report(e, &args.lpp_source))?;
        }
        Commands::Resolve { targets } => {
            let preview = orchestrator
                .preview_targets(targets.as_deref())
                .await
                .wrap_err("cannot resolve targets")?;
            println!("{}", render_targets(&preview));
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.inventory {
        config.inventory.path = path.clone();
        config.inventory.command = None;
    }
    if let Some(nim) = &cli.nim {
        config.nim.command = nim.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
}

/// RUST_LOG wins over the configured level
fn init_tracing(log: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .wrap_err_with(|| format!("invalid log level '{}'", log.level))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

fn inventory_source(
    config: &InventoryConfig,
    executor: Arc<dyn CommandExecutor>,
) -> Result<Arc<dyn InventorySource>> {
    Ok(match &config.command {
        Some(argv) => {
            let command =
                CommandSpec::from_argv(argv).wrap_err("invalid [inventory] command")?;
            Arc::new(CommandInventory::new(executor, command))
        }
        None => Arc::new(JsonFileInventory::new(&config.path)),
    })
}

fn step_report(error: CoreError, lpp_source: &str) -> eyre::Report {
    let step = error.step();
    eyre::Report::new(error).wrap_err(format!("{step} failed for lpp_source {lpp_source}"))
}
