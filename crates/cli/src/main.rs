use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::env::EnvOverrides;
use cli::summary;
use dossier_core::config::{self, AppConfig};
use dossier_core::expectations::check_expectations;
use dossier_core::pipeline::{self, PipelineMode};
use std::path::{Path, PathBuf};
use storage::{SnapshotStore, Stage};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;
    let env = EnvOverrides::from_env();
    env.apply(&mut cfg);
    if let Some(patterns) = cli.patterns {
        cfg.patterns_path = patterns;
    }
    debug!(?cfg, "settings loaded");
    let user_name = env.user_name.as_deref();

    match cli.command {
        Commands::Scan { json } => run_pipeline(&cfg, PipelineMode::Scan, user_name, json).await,
        Commands::Classify { json } => {
            run_pipeline(&cfg, PipelineMode::Classify, user_name, json).await
        }
        Commands::Run { json } => run_pipeline(&cfg, PipelineMode::All, user_name, json).await,
        Commands::Report { out } => run_report(&cfg, out.as_deref()),
        Commands::Confirm { json } => run_confirm(&cfg, user_name, json),
    }
}

#[derive(Parser)]
#[command(name = "dossier")]
#[command(about = "Resume folder scanner and document classifier", long_about = None)]
struct Cli {
    /// Path to settings TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Pattern configuration JSON, overrides `patterns_path`
    #[arg(short, long)]
    patterns: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the resume folder and write the stage 1 inventory
    Scan {
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Classify ownership and document type into the stage 2 inventory
    Classify {
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Render the stage 2 inventory as a Markdown report
    Report {
        /// Output file; defaults to the data directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the stage 2 inventory against the configured test cases
    Confirm {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan, classify and report
    Run {
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
}

async fn run_pipeline(
    cfg: &AppConfig,
    mode: PipelineMode,
    user_name: Option<&str>,
    json: bool,
) -> Result<()> {
    let result = pipeline::run_with_mode_summary(cfg, mode, user_name).await?;
    if json {
        let mut summary_json = serde_json::to_value(&result)?;
        if let Some(obj) = summary_json.as_object_mut() {
            obj.insert("status".into(), "ok".into());
            obj.insert("mode".into(), mode.label().into());
        }
        println!("{}", serde_json::to_string_pretty(&summary_json)?);
        return Ok(());
    }

    if let Some(discovered) = result.discovered {
        println!("scan: discovered {discovered} files");
    }
    if let Some(classification) = &result.classification {
        println!("{}", summary::classification_line(classification));
        for skipped in &classification.skipped {
            println!("  skipped record {}: {}", skipped.index, skipped.reason);
        }
    }
    for path in &result.snapshots {
        println!("wrote {}", path.display());
    }
    if let Some(report) = &result.report {
        println!("report: {}", report.display());
    }
    Ok(())
}

fn report_root(cfg: &AppConfig) -> Option<&Path> {
    match cfg.scan.include.as_slice() {
        [single] => Some(Path::new(single)),
        _ => None,
    }
}

fn run_report(cfg: &AppConfig, out: Option<&Path>) -> Result<()> {
    let store = SnapshotStore::new(&cfg.data_dir);
    let records = pipeline::read_stage(&store, Stage::Classified)
        .context("run `dossier classify` first")?;
    let path = pipeline::write_report(&store, &records, report_root(cfg), out)?;
    println!("report: {}", path.display());
    Ok(())
}

fn run_confirm(cfg: &AppConfig, user_name: Option<&str>, json: bool) -> Result<()> {
    let patterns = pipeline::load_patterns(&cfg.patterns_path, user_name)?;
    let store = SnapshotStore::new(&cfg.data_dir);
    let records = pipeline::read_stage(&store, Stage::Classified)
        .context("run `dossier classify` first")?;
    let report = check_expectations(&records, &patterns.expectations);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in summary::expectation_lines(&report) {
            println!("{line}");
        }
    }
    if !report.is_success() {
        anyhow::bail!(
            "{} expectation(s) failed, {} missing",
            report.failed.len(),
            report.missing.len()
        );
    }
    Ok(())
}
