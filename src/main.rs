//! Stratus CLI
//!
//! Entry point for the `stratus` command-line tool.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use stratus_deploy::deploy::{clean_local_state, Executor, Operation};
use stratus_deploy::external::SystemRunner;
use stratus_deploy::{DeploySettings, EffectiveConfig};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Deployment environment resolver and orchestrator", version)]
struct Cli {
    /// Deployment name (falls back to STRATUS_DEPLOYMENT, then settings)
    #[arg(long, short = 'd', global = true)]
    deployment: Option<String>,

    /// Verbose progress output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved effective configuration
    Env {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Initialize and validate the infrastructure sources
    Validate,

    /// Validate, then compute an execution plan
    Plan,

    /// Run the full apply sequence
    Apply {
        /// Skip the engine's interactive approval (warning delay applies)
        #[arg(long)]
        auto_approve: bool,
    },

    /// Tear down the deployment's infrastructure
    Destroy {
        /// Skip the engine's interactive approval (warning delay applies)
        #[arg(long)]
        auto_approve: bool,
    },

    /// Remove local engine state and run artifacts
    Clean,
}

fn main() {
    let cli = Cli::parse();

    let project_root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error determining working directory: {}", e);
            process::exit(1);
        }
    };

    let settings = match DeploySettings::load_or_default(&project_root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Env { json } => {
            run_env(&project_root, &settings, cli.deployment, json);
        }
        Commands::Validate => {
            run_operation(&project_root, settings, cli.deployment, Operation::Validate, cli.verbose);
        }
        Commands::Plan => {
            run_operation(&project_root, settings, cli.deployment, Operation::Plan, cli.verbose);
        }
        Commands::Apply { auto_approve } => {
            let operation = if auto_approve {
                Operation::AutoApply
            } else {
                Operation::Apply
            };
            run_operation(&project_root, settings, cli.deployment, operation, cli.verbose);
        }
        Commands::Destroy { auto_approve } => {
            let operation = if auto_approve {
                Operation::AutoDestroy
            } else {
                Operation::Destroy
            };
            run_operation(&project_root, settings, cli.deployment, operation, cli.verbose);
        }
        Commands::Clean => {
            if let Err(e) = clean_local_state(&settings, &project_root, cli.verbose) {
                eprintln!("Error: {}", e);
                process::exit(e.exit_code());
            }
        }
    }
}

/// Pick the deployment: CLI flag, then STRATUS_DEPLOYMENT, then settings
fn resolve_deployment(flag: Option<String>, settings: &DeploySettings) -> String {
    if let Some(name) = flag {
        return name;
    }
    if let Ok(name) = std::env::var("STRATUS_DEPLOYMENT") {
        if !name.is_empty() {
            return name;
        }
    }
    match settings.default_deployment {
        Some(ref name) => name.clone(),
        None => {
            eprintln!("No deployment selected. Pass --deployment, set STRATUS_DEPLOYMENT, or set default_deployment in .stratus/deploy.toml.");
            process::exit(2);
        }
    }
}

fn build_config(project_root: &Path, settings: &DeploySettings, flag: Option<String>) -> EffectiveConfig {
    let deployment = resolve_deployment(flag, settings);

    match EffectiveConfig::build(project_root, &deployment) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(10);
        }
    }
}

fn run_env(project_root: &Path, settings: &DeploySettings, flag: Option<String>, json: bool) {
    let config = build_config(project_root, settings, flag);
    let snapshot = config.redacted();

    if json {
        match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("Deployment: {}", snapshot.deployment);
    println!();
    println!("Sources:");
    for source in &snapshot.sources {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => {
                println!("  {} {} (sha256:{})", source.origin, path, &digest[..12]);
            }
            _ => println!("  {} (built-in)", source.origin),
        }
    }
    println!();
    println!("Variables ({}):", snapshot.vars.len());
    for (name, var) in &snapshot.vars {
        println!("  {}={}  [{} via {}]", name, var.value, var.form.keyword(), var.origin);
    }
    if !snapshot.redactions.is_empty() {
        println!();
        println!("Redacted: {}", snapshot.redactions.join(", "));
    }
}

fn run_operation(
    project_root: &Path,
    settings: DeploySettings,
    flag: Option<String>,
    operation: Operation,
    verbose: bool,
) {
    let config = build_config(project_root, &settings, flag);

    let executor = Executor::new(
        settings,
        config,
        PathBuf::from(project_root),
        Arc::new(SystemRunner::new()),
        verbose,
    );

    match executor.execute(operation) {
        Ok(summary) => {
            println!("{}", summary.human_summary);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}
