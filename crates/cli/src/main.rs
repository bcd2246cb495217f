//! remapmirror command-line tool.
//!
//! Replays upstream history through the configured remapper (`run`), reports
//! where the next run would start (`status`), and generates / validates
//! configuration files.

mod signals;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use remapmirror_core::config::MirrorConfig;
use remapmirror_core::models::ReplayStats;
use remapmirror_core::replay::StatusReport;
use remapmirror_core::Replayer;

/// Exit status of a run stopped by SIGINT/SIGTERM between commits.
const EXIT_INTERRUPTED: u8 = 130;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Replay an upstream Git history through a source remapper.
#[derive(Parser, Debug)]
#[command(
    name = "remapmirror",
    version,
    about = "Mirror an upstream Git history through a source remapper"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "remapmirror.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay every upstream commit not yet present in the output repository.
    Run,

    /// Show the resume point and the number of pending commits.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./remapmirror.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = expand_tilde(&cli.config);

    match cli.command {
        Commands::Init { output, force } => {
            init_tracing("warn");
            cmd_init(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            init_tracing("warn");
            cmd_validate(&config_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run => {
            let config = load_config(&config_path)?;
            init_tracing(&config.mirror.log_level);
            cmd_run(config).await
        }
        Commands::Status { json } => {
            let config = load_config(&config_path)?;
            init_tracing(&config.mirror.log_level);
            cmd_status(config, json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` wins; otherwise `default_level`. Logs go to stderr so `status
/// --json` output stays parseable.
fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: &Path) -> Result<MirrorConfig> {
    MirrorConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_run(config: MirrorConfig) -> Result<ExitCode> {
    let shutdown = signals::setup_signal_handlers();
    let replayer = Replayer::new(config);

    let flag = shutdown.clone();
    let stats = tokio::task::spawn_blocking(move || replayer.run(&flag))
        .await
        .context("replay task panicked")?
        .context("replay aborted")?;

    print_run_summary(&stats);

    if stats.interrupted {
        Ok(ExitCode::from(EXIT_INTERRUPTED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_run_summary(stats: &ReplayStats) {
    println!();
    if let Some(start) = &stats.resumed_from {
        println!("  Resumed after  {}", style::commit_id(start));
    }
    for commit in &stats.replayed {
        println!(
            "  {} {} {}",
            style::commit_id(&commit.source_id),
            style::dim(&format!("-> {}", &commit.output_sha)),
            commit.short_message
        );
    }
    println!();

    let replayed = stats.replayed_count();
    if stats.interrupted {
        println!(
            "{}",
            style::warn(&format!(
                "Interrupted after {} of {} commits; run again to continue.",
                replayed, stats.pending
            ))
        );
    } else if replayed == 0 {
        println!("{}", style::success("Output repository is up to date."));
    } else {
        println!(
            "{}",
            style::success(&format!("Replayed {} commit(s).", replayed))
        );
    }
    if stats.deferred > 0 && !stats.interrupted {
        println!(
            "{}",
            style::dim(&format!(
                "{} more commit(s) left for the next run (options.max_commits).",
                stats.deferred
            ))
        );
    }
}

fn cmd_status(config: MirrorConfig, json: bool) -> Result<()> {
    let replayer = Replayer::new(config);
    let report = replayer.status().context("failed to inspect repositories")?;

    if json {
        let out =
            serde_json::to_string_pretty(&report).context("failed to serialize status report")?;
        println!("{}", out);
        return Ok(());
    }

    print_status(replayer.output_path(), &report);
    Ok(())
}

fn print_status(output_path: &Path, report: &StatusReport) {
    println!();
    println!("{}", style::header("remapmirror status"));
    println!("{}", "═".repeat(18));
    println!();
    println!("  Output       {}", output_path.display());
    println!(
        "  Resume after {} {}",
        style::commit_id(&report.resume_point.commit),
        style::dim(&format!("({})", report.resume_point.source))
    );

    match (report.pending, &report.pending_error) {
        (Some(n), _) => println!("  Pending      {}", n),
        (None, Some(err)) => println!("  Pending      {}", style::dim(&format!("unknown: {}", err))),
        (None, None) => println!("  Pending      {}", style::dim("unknown")),
    }

    if report.dirty_paths.is_empty() {
        println!("  Output tree  clean");
    } else {
        println!(
            "  Output tree  {}",
            style::warn(&format!("{} uncommitted path(s)", report.dirty_paths.len()))
        );
        for path in report.dirty_paths.iter().take(10) {
            println!("               {}", style::dim(path));
        }
    }
    println!();
}

fn cmd_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "file already exists: {}. Use --force to overwrite it.",
            output.display()
        );
    }

    std::fs::write(output, MirrorConfig::default_template())
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Point [upstream] and [output] at your repositories");
    println!("  2. Set [remapper] to the transformation command");
    println!(
        "  3. Validate with: remapmirror validate --config {}",
        output.display()
    );
    println!("  4. Replay with:   remapmirror run --config {}", output.display());

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        MirrorConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));

    let upstream = &config.upstream;
    let options = &config.options;
    println!();
    println!("Configuration summary:");
    println!(
        "  Upstream URL   : {}",
        upstream.clone_url.as_deref().unwrap_or("(existing working copy)")
    );
    println!("  Working copy   : {}", upstream.path.display());
    println!("  Branch         : {}/{}", upstream.remote, upstream.branch);
    println!("  Default start  : {}", upstream.default_start_commit);
    println!("  Commit URL     : {}", upstream.commit_url);
    println!(
        "  Output         : {} ({})",
        config.output.path.display(),
        config.output.subtree.display()
    );
    println!("  Remapper       : {} {}", config.remapper.program, config.remapper.args.join(" "));
    println!("  Remapper output: {}", config.remapper.output_dir.display());
    println!(
        "  Options        : clone_fresh={} pull_latest={} checkout_branch_first={} max_commits={}",
        options.clone_fresh, options.pull_latest, options.checkout_branch_first, options.max_commits
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
