//! Scenario runner – execute scripted flows from YAML files.

use crate::context::AppContext;
use crate::types::*;
use std::time::Instant;

/// Load a scenario from a YAML string.
pub fn load_scenario(yaml: &str) -> Result<Scenario, String> {
    serde_yaml::from_str(yaml).map_err(|e| format!("failed to parse scenario YAML: {}", e))
}

/// Invoke a command by name and wrap the outcome in a CommandResult.
pub async fn call_command(
    ctx: &AppContext,
    name: &str,
    args: Option<serde_json::Value>,
) -> CommandResult {
    let run_id = new_run_id();
    let start = Instant::now();
    match ctx.bridge().call(name, args).await {
        Ok(data) => {
            let mut r = result_ok("call", name, &run_id, elapsed_ms(start));
            r.data = Some(data);
            r
        }
        Err(e) => result_err("call", name, &run_id, elapsed_ms(start), e.to_error_info()),
    }
}

/// Refresh the status mirror and report its snapshot.
pub async fn refresh_status(ctx: &AppContext) -> CommandResult {
    let run_id = new_run_id();
    let start = Instant::now();
    let outcome = ctx.status().refresh().await;
    let snapshot = serde_json::to_value(ctx.status().snapshot()).ok();

    let mut r = match outcome {
        Ok(()) => result_ok("refresh", "status", &run_id, elapsed_ms(start)),
        Err(e) => result_err(
            "refresh",
            "status",
            &run_id,
            elapsed_ms(start),
            ErrorInfo {
                code: e.error_code(),
                message: format!("status refresh failed: {}", e),
                details: serde_json::Value::Null,
            },
        ),
    };
    r.data = snapshot;
    r
}

/// Execute a scenario and return the overall result.
pub async fn run_scenario(scenario: &Scenario, ctx: &AppContext) -> ScenarioResult {
    let mut step_results = Vec::new();
    let mut overall = Status::Pass;

    for (i, step) in scenario.steps.iter().enumerate() {
        let result = match step {
            ScenarioStep::Call {
                call,
                args,
                expect_status,
            } => {
                let r = call_command(ctx, call, args.clone()).await;
                if r.status != *expect_status {
                    tracing::warn!(
                        step = i,
                        expected = expect_status.as_str(),
                        actual = r.status.as_str(),
                        "scenario step status mismatch"
                    );
                    overall = Status::Fail;
                }
                r
            }
            ScenarioStep::Refresh {
                refresh,
                expect_supported,
            } => {
                if !refresh {
                    continue;
                }
                let mut r = refresh_status(ctx).await;
                if r.status != Status::Pass {
                    overall = Status::Fail;
                } else if let Some(expected) = expect_supported {
                    let actual = ctx.status().supported();
                    if actual != *expected {
                        tracing::warn!(step = i, expected, actual, "platform support mismatch");
                        r.status = Status::Fail;
                        overall = Status::Fail;
                    }
                }
                r
            }
        };
        step_results.push(result);
    }

    ScenarioResult {
        name: scenario.name.clone(),
        overall_status: overall,
        step_results,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
