//! Land Registry - scenario runner
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌──────────┐
//! │  Config  │───▶│ Registry │───▶│ MemoryLedger │───▶│  Output  │
//! │  (YAML)  │    │ (policy) │    │ (1 unit/step)│    │ (JSONL)  │
//! └──────────┘    └──────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! Usage: `land-registry [--env dev] [--config path.yaml] --scenario steps.yaml`

use anyhow::{Context, Result, bail};

use land_registry::config::AppConfig;
use land_registry::ledger::MemoryLedger;
use land_registry::registry::LandRegistry;
use land_registry::scenario::{Outcome, Scenario, ScenarioRunner};

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn main() -> Result<()> {
    let env = get_env();
    let app_config = match get_arg(&["--config", "-c"]) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::load(&env)?,
    };
    let _log_guard = land_registry::logging::init_logging(&app_config);

    let Some(scenario_path) = get_arg(&["--scenario", "-s"]) else {
        bail!("missing --scenario <file.yaml>");
    };
    let scenario = Scenario::from_file(&scenario_path)?;

    tracing::info!(
        env = %env,
        steps = scenario.steps.len(),
        orgs = ?app_config.registry.authorized_orgs,
        "Replaying scenario"
    );

    let registry = LandRegistry::from_config(&app_config.registry);
    let ledger = MemoryLedger::new();
    let reports = ScenarioRunner::new(&registry, &ledger).run(&scenario);

    for report in &reports {
        let line = serde_json::to_string(report).context("failed to encode step report")?;
        println!("{}", line);
    }

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Error { .. }))
        .count();
    tracing::info!(
        steps = reports.len(),
        height = ledger.height(),
        failed,
        "Scenario finished"
    );
    Ok(())
}
