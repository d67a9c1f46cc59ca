mod cli;

use avmerge::processor;
use avmerge_av::ToolRegistry;
use avmerge_common::config::Config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "avmerge=debug,avmerge_av=debug,avmerge_common=debug".to_string()
        } else {
            "avmerge=info,avmerge_av=info,avmerge_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(ffmpeg) = cli.ffmpeg {
        config.tools.ffmpeg_path = Some(ffmpeg);
    }

    match cli.command {
        Commands::Merge {
            dir,
            jobs,
            mode,
            strict,
        } => {
            if let Some(jobs) = jobs {
                config.merge.concurrency = Some(jobs);
            }
            if let Some(mode) = mode {
                config.media.pair_mode = mode.into();
            }
            if strict {
                config.merge.fail_on_task_error = true;
            }
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir().context("failed to read current directory")?,
            };
            runtime()?.block_on(merge(dir, config))
        }
        Commands::Concat { files, output } => {
            runtime()?.block_on(concat(files, output, config))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckTools => check_tools(&config),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

/// Cancel `token` on Ctrl-C so in-flight ffmpeg processes are killed.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping ffmpeg processes");
            token.cancel();
        }
    });
}

async fn merge(dir: PathBuf, config: Config) -> Result<ExitCode> {
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let tools = ToolRegistry::discover(&config.tools);
    let summary = processor::merge_directory(&dir, &config, &tools, cancel).await?;

    if summary.was_cancelled() {
        tracing::error!(
            "Merge interrupted: {} succeeded, {} not merged",
            summary.succeeded,
            summary.failed() + summary.skipped
        );
        return Ok(ExitCode::FAILURE);
    }
    if config.merge.fail_on_task_error && !summary.is_success() {
        tracing::error!(
            "{} of {} pairs failed",
            summary.failed() + summary.skipped,
            summary.dispatched + summary.skipped
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn concat(files: Vec<PathBuf>, output: PathBuf, config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let tools = ToolRegistry::discover(&config.tools);
    avmerge_av::concat(&tools, &files, &output, &cancel).await?;
    Ok(())
}

fn check_tools(config: &Config) -> Result<ExitCode> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg or pass --ffmpeg.");
    }

    Ok(ExitCode::SUCCESS)
}
