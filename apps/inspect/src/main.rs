// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLT-Lite Inspector - imports OpenFlight databases and reports on them.
//!
//! Each file runs through the parse and prepare passes, then is printed as a
//! text summary, a JSON summary or an indented scene tree, followed by the
//! import diagnostics.
//!
//! # Environment
//!
//! - `FLT_SEARCH_DIRS` - extra search directories (platform path list)
//! - `FLT_WORKER_THREADS` - worker threads for preparation
//! - `FLT_OUTPUT` - `summary`, `json` or `tree`
//! - `RUST_LOG` - log filter

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use flt_lite_core::{ImportSettings, Severity};
use flt_lite_processing::{emit, import_many, parse_async, ImportResult, ImportSummary};

mod config;
mod error;
mod tree;

use config::{Config, OutputFormat};
use tree::TreePrinter;

#[derive(Parser)]
#[command(name = "flt-inspect")]
#[command(about = "Import OpenFlight (.flt) databases and report their structure")]
#[command(version)]
struct Cli {
    /// Root databases to import
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Additional directory searched for external references and textures
    #[arg(short = 'd', long = "search-dir")]
    search_dirs: Vec<PathBuf>,

    /// Output format (overrides FLT_OUTPUT)
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Worker threads (overrides FLT_WORKER_THREADS)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Keep external references as empty nodes
    #[arg(long)]
    no_references: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,flt_lite=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every root database imported
async fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::from_env()?;
    config.search_dirs.extend(cli.search_dirs);
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(threads) = cli.threads.filter(|&n| n > 0) {
        config.worker_threads = threads;
    }

    tracing::info!(
        files = cli.files.len(),
        worker_threads = config.worker_threads,
        search_dirs = config.search_dirs.len(),
        output = ?config.output,
        "Starting FLT-Lite inspector"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let mut settings = ImportSettings {
        additional_search_directories: config.search_dirs.clone(),
        ..ImportSettings::default()
    };
    if cli.no_references {
        settings = settings.without_references();
    }

    let results = if let [file] = cli.files.as_slice() {
        vec![(file.clone(), parse_async(file.clone(), settings).await)]
    } else {
        let files = cli.files.clone();
        tokio::task::spawn_blocking(move || import_many(files.as_slice(), &settings))
            .await
            .context("Batch import task failed")?
    };

    let mut all_ok = true;
    let mut summaries = Vec::new();
    for (path, result) in results {
        match result {
            Ok(result) => {
                let summary = ImportSummary::from_result(&result);
                match config.output {
                    OutputFormat::Summary => println!("{}", summary),
                    OutputFormat::Tree => println!("{}", render_tree(&result)?),
                    OutputFormat::Json => {}
                }
                print_diagnostics(&summary);
                summaries.push(summary);
            }
            Err(err) => {
                all_ok = false;
                tracing::error!(path = %path.display(), error = %err, "Import failed");
                eprintln!("{}: {}", path.display(), err);
            }
        }
    }

    if config.output == OutputFormat::Json {
        let json = if let [summary] = summaries.as_slice() {
            summary.to_json()?
        } else {
            serde_json::to_string_pretty(&summaries)?
        };
        println!("{}", json);
    }

    Ok(all_ok)
}

fn render_tree(result: &ImportResult) -> Result<String> {
    let mut printer = TreePrinter::new();
    emit(result, &mut printer)?;
    Ok(printer.finish())
}

fn print_diagnostics(summary: &ImportSummary) {
    for entry in summary
        .diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Warning)
    {
        eprintln!("{}: {}", summary.file, entry);
    }
}
