//! Build tray monitor - Entry Point
//!
//! Polls the configured build servers and reports build transitions until
//! interrupted, or polls once and prints a summary with `--once`.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::{ColoredString, Colorize};
use tracing::{error, info};

use buildtray::app::options::AppOptions;
use buildtray::app::run::{poll_once, run, OnceReport};
use buildtray::logs::{init_logging, LogOptions};
use buildtray::status::ProjectState;
use buildtray::storage::settings::Settings;
use buildtray::utils::{format_duration, version_info};
use buildtray::view::ViewNode;

const DEFAULT_SETTINGS_FILE: &str = "buildtray.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version info: {e}"),
        }
        return;
    }

    if let Err(e) = run_main(&cli_args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_main(cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    let settings_path = cli_args
        .get("settings")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let once = cli_args.contains_key("once");

    // Retrieve the settings file, writing defaults on first start
    let (settings, created) = load_or_create_settings(&settings_path)
        .await
        .with_context(|| format!("Unable to read settings file {}", settings_path.display()))?;

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        stdout: !once,
        ..Default::default()
    };
    let _log_guard = init_logging(log_options).context("Failed to initialize logging")?;
    if created {
        info!("Wrote default settings to {}", settings_path.display());
    }

    let options = AppOptions::from_settings(&settings);

    if once {
        let report = poll_once(&options).await.context("Poll failed")?;
        print_report(&report);
        return Ok(());
    }

    info!(
        "Running build monitor {} ({} projects, {} servers, every {:?})",
        version_info().version,
        options.projects.len(),
        options.servers.len(),
        options.poller.interval
    );
    run(options, await_shutdown_signal())
        .await
        .context("Build monitor stopped with an error")?;
    Ok(())
}

async fn load_or_create_settings(path: &Path) -> anyhow::Result<(Settings, bool)> {
    if tokio::fs::try_exists(path).await? {
        return Ok((Settings::load(path).await?, false));
    }

    let settings = Settings::default();
    settings.save(path).await?;
    Ok((settings, true))
}

fn paint_state(state: ProjectState) -> ColoredString {
    let text = state.to_string();
    match state {
        ProjectState::Success => text.green(),
        ProjectState::Building => text.yellow(),
        ProjectState::Broken | ProjectState::BrokenAndBuilding => text.red().bold(),
        ProjectState::NotConnected => text.dimmed(),
    }
}

fn print_node(node: &ViewNode, depth: usize) {
    println!("{}{}", "  ".repeat(depth), node.label);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn print_report(report: &OnceReport) {
    println!("{} {}", "Overall:".bold(), paint_state(report.state));

    for project in &report.projects {
        let snapshot = &project.snapshot;
        let mut line = format!("  {} {}", paint_state(snapshot.state), snapshot.project_name.bold());

        let label = snapshot.last_build_label();
        if !label.is_empty() {
            line.push_str(&format!(" ({})", label));
        }
        if let Some(remaining) = project.estimated_time_remaining {
            line.push_str(&format!(" ~{} left", format_duration(remaining)));
        }
        if let Some(error) = &snapshot.connect_error {
            line.push_str(&format!(" {}", error.to_string().dimmed()));
        }
        println!("{}", line);
    }

    for tree in &report.queues {
        for root in tree.roots() {
            print_node(root, 0);
        }
    }

    println!("{}", report.summary);
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) =
            (signal(SignalKind::terminate()), signal(SignalKind::interrupt()))
        else {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl+C received, shutting down...");
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
