//! `launcherctl` – headless CLI test harness for the launcher engine.
//!
//! Drives the same bridge and status mirror the GUI uses, either against
//! the in-process host backend or a daemon over a Unix socket.

#[cfg(unix)]
mod serve;

use clap::{Parser, Subcommand};
use engine::commands::{describe_registry, GetRequirements};
use engine::config::AppConfig;
use engine::scenario;
use engine::types::*;
use engine::{AppContext, BackendTarget, CommandResult};
use std::path::{Path, PathBuf};
use std::time::Instant;

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(
    name = "launcherctl",
    version,
    about = "CLI test harness for the launcher engine"
)]
struct Cli {
    /// Talk to a daemon on this Unix socket instead of the in-process host
    /// backend. For `serve`, the socket to listen on.
    #[cfg(unix)]
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered backend commands and their shapes.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Invoke a backend command by name.
    Call {
        /// Command name (e.g. "get_requirements").
        cmd: String,
        /// JSON object of arguments.
        #[arg(long)]
        args: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Refresh the status mirror and print it.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show each requirement check and the detected game paths.
    Requirements {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a scripted scenario from a YAML file.
    RunScenario {
        /// Path to the scenario YAML file.
        file: PathBuf,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the host backend over a Unix socket.
    #[cfg(unix)]
    Serve,
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match engine::config::get_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to load configuration: {}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = engine::logging::init_logging(&config.logging) {
        eprintln!("warning: logging already initialised: {}", e);
    }

    let target = backend_target(&cli);
    match cli.command {
        Commands::List { json } => cmd_list(json),
        Commands::Call { cmd, args, json } => {
            cmd_call(&cmd, args.as_deref(), json, &connect(target, config)).await
        }
        Commands::Status { json } => cmd_status(json, &connect(target, config)).await,
        Commands::Requirements { json } => {
            cmd_requirements(json, &connect(target, config)).await
        }
        Commands::RunScenario { file, json } => {
            cmd_run_scenario(&file, json, &connect(target, config)).await
        }
        #[cfg(unix)]
        Commands::Serve => {
            let socket = cli.socket.unwrap_or_else(|| config.daemon.socket.clone());
            serve::run_daemon(socket, config).await
        }
    }
}

#[cfg(unix)]
fn backend_target(cli: &Cli) -> BackendTarget {
    match &cli.socket {
        Some(path) => BackendTarget::Socket(path.clone()),
        None => BackendTarget::Host,
    }
}

#[cfg(not(unix))]
fn backend_target(_cli: &Cli) -> BackendTarget {
    BackendTarget::Host
}

fn connect(target: BackendTarget, config: &AppConfig) -> AppContext {
    tracing::debug!(?target, "connecting to backend");
    AppContext::connect(target, config)
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

fn cmd_list(json: bool) {
    let mut r = result_ok("list", "registry", &new_run_id(), 0);
    r.data = Some(describe_registry());
    output_result(&r, json);
}

async fn cmd_call(cmd: &str, args_str: Option<&str>, json: bool, ctx: &AppContext) {
    let args = match args_str.map(serde_json::from_str::<serde_json::Value>) {
        None => None,
        Some(Ok(v)) => Some(v),
        Some(Err(e)) => {
            let r = result_err(
                "call",
                cmd,
                &new_run_id(),
                0,
                ErrorInfo {
                    code: ErrorCode::InvalidInput,
                    message: format!("invalid JSON args: {}", e),
                    details: serde_json::Value::Null,
                },
            );
            output_result(&r, json);
            return;
        }
    };

    let result = scenario::call_command(ctx, cmd, args).await;
    output_result(&result, json);
}

async fn cmd_status(json: bool, ctx: &AppContext) {
    let result = scenario::refresh_status(ctx).await;
    output_result(&result, json);
}

async fn cmd_requirements(json: bool, ctx: &AppContext) {
    let run_id = new_run_id();
    let start = Instant::now();

    let result = match ctx.bridge().try_invoke::<GetRequirements>().await {
        Ok(reqs) => {
            let mut r = result_ok(
                "requirements",
                "backend",
                &run_id,
                start.elapsed().as_millis() as u64,
            );
            let paths: Vec<_> = [
                ("mw3_path", &reqs.mw3_path),
                ("bo2_path", &reqs.bo2_path),
                ("bo2_mp_path", &reqs.bo2_mp_path),
                ("bo1_path", &reqs.bo1_path),
                ("bo1_mp_path", &reqs.bo1_mp_path),
                ("waw_path", &reqs.waw_path),
            ]
            .into_iter()
            .map(|(key, path)| {
                serde_json::json!({
                    "key": capitalised(&key.replace('_', " ")),
                    "path": path,
                })
            })
            .collect();
            r.data = Some(serde_json::json!({
                "all_met": reqs.all_met,
                "checks": reqs.display_rows(),
                "paths": paths,
            }));
            if !reqs.all_met {
                r.status = Status::Fail;
            }
            r
        }
        Err(e) => result_err(
            "requirements",
            "backend",
            &run_id,
            start.elapsed().as_millis() as u64,
            e.to_error_info(),
        ),
    };
    output_result(&result, json);
}

async fn cmd_run_scenario(file: &Path, json: bool, ctx: &AppContext) {
    let target = file.display().to_string();
    let yaml = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let r = result_err(
                "run-scenario",
                &target,
                &new_run_id(),
                0,
                ErrorInfo {
                    code: ErrorCode::IoError,
                    message: format!("cannot read scenario file: {}", e),
                    details: serde_json::Value::Null,
                },
            );
            output_result(&r, json);
            return;
        }
    };

    let scenario = match scenario::load_scenario(&yaml) {
        Ok(s) => s,
        Err(e) => {
            let r = result_err(
                "run-scenario",
                &target,
                &new_run_id(),
                0,
                ErrorInfo {
                    code: ErrorCode::InvalidInput,
                    message: e,
                    details: serde_json::Value::Null,
                },
            );
            output_result(&r, json);
            return;
        }
    };

    let scenario_result = scenario::run_scenario(&scenario, ctx).await;

    if json {
        let j = serde_json::to_string_pretty(&scenario_result).unwrap_or_default();
        println!("{}", j);
    } else {
        println!(
            "Scenario: {}",
            scenario_result.name.as_deref().unwrap_or("<unnamed>")
        );
        println!("Overall: {:?}", scenario_result.overall_status);
        for (i, sr) in scenario_result.step_results.iter().enumerate() {
            println!(
                "  Step {}: {} {} -> {:?} ({}ms)",
                i, sr.command, sr.target, sr.status, sr.timing_ms.total
            );
        }
    }

    exit_for(scenario_result.overall_status);
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn output_result(result: &CommandResult, json: bool) {
    if json {
        let j = serde_json::to_string_pretty(result).unwrap_or_default();
        println!("{}", j);
    } else {
        print_human(result);
    }
    exit_for(result.status);
}

/// Exit non-zero on fail/error.
fn exit_for(status: Status) {
    match status {
        Status::Pass | Status::Skip => {}
        Status::Fail => std::process::exit(1),
        Status::Error => std::process::exit(2),
    }
}

fn print_human(r: &CommandResult) {
    let status_icon = match r.status {
        Status::Pass => "PASS",
        Status::Fail => "FAIL",
        Status::Skip => "SKIP",
        Status::Error => "ERROR",
    };

    println!("[{}] {} {}", status_icon, r.command, r.target);
    println!("  run_id: {}", r.run_id);
    println!("  timing: {}ms", r.timing_ms.total);

    if let Some(ref err) = r.error {
        println!("  error:  {} – {}", err.code, err.message);
    }

    if let Some(ref data) = r.data {
        if let Ok(s) = serde_json::to_string_pretty(data) {
            for line in s.lines() {
                println!("  {}", line);
            }
        }
    }
}
