//! reqlink - Requirement traceability for plain-text requirement documents
//!
//! reqlink reads requirement documents (`*.shalldn`), finds the source files
//! claiming to implement them (`$$Implements Id` markers) and reports what is
//! broken: malformed requirements, duplicates, dangling references and
//! requirements nobody implements.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::Result;
use owo_colors::OwoColorize;
use reqlink::check::{OutputFormat, render_report, run_check};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "reqlink", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a project once and report every finding (exit 1 on errors)
    Check {
        /// Project root (default: nearest directory with a config or .git)
        root: Option<PathBuf>,

        /// Path to config file (default: .config/reqlink/config.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Start the language server on stdio
    Lsp {
        /// Project root used until the client names a workspace
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries reports and LSP traffic, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            root,
            config,
            format,
        } => run_check_command(root, config, format),
        Command::Lsp { root } => {
            let root = match root {
                Some(root) => root,
                None => reqlink::find_project_root()?,
            };
            reqlink::lsp::run(root).await
        }
    }
}

fn run_check_command(
    root: Option<PathBuf>,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => reqlink::find_project_root()?,
    };
    let config_path = config.unwrap_or_else(|| reqlink::config_path(&root));
    let config = reqlink::load_config(&config_path)?;

    if format == OutputFormat::Text {
        eprintln!(
            "{} Checking {}...",
            "->".blue().bold(),
            root.display()
        );
    }

    let report = run_check(&root, &config)?;
    print!("{}", render_report(&report, format)?);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}
