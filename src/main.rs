//! Scenecheck - runs the built-in editor acceptance scenarios
//!
//! Each scenario gets a fresh simulated editor. Exits nonzero if any
//! scenario fails.
//!
//! Usage:
//!   cargo run -- --help
//!   cargo run -- MeshBlocker --verbose
//!   cargo run -- --report reports/latest.json --db results.db

use scenecheck::report::publish;
use scenecheck::{HarnessSettings, RunReport, Scenario, SimHost, run_scenario, scenarios};

const USAGE: &str = r#"Scenecheck - built-in editor acceptance scenarios

USAGE:
    cargo run -- [OPTIONS] [FILTER]..."#;

fn main() {
    let settings = HarnessSettings::from_args(USAGE);

    let mut reports: Vec<RunReport> = Vec::new();
    for scenario in scenarios::builtin(&settings) {
        if !settings.matches_filter(scenario.name()) {
            continue;
        }

        let host = match SimHost::spawn(settings.sim_config()) {
            Ok(host) => host,
            Err(e) => {
                eprintln!("Could not start simulated editor: {}", e);
                std::process::exit(2);
            }
        };
        reports.push(run_scenario(&host, scenario.as_ref(), &settings));
    }

    if reports.is_empty() {
        println!("No scenarios matched {:?}", settings.filters);
        std::process::exit(1);
    }

    println!();
    for report in &reports {
        let status = if report.passed { "PASS" } else { "FAIL" };
        println!("  {} ... {} ({:.2}s)", report.scenario, status, report.duration_secs);
        if !report.passed || settings.verbose {
            for step in &report.steps {
                if !step.passed || settings.verbose {
                    println!("    [{}] {}: {}", step.stage, step.name, step.detail);
                }
            }
            if let Some(reason) = &report.aborted {
                println!("    aborted: {}", reason);
            }
        }
    }

    if let Err(e) = publish(&reports, &settings) {
        eprintln!("Failed to write results: {}", e);
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    println!("\nResults: {} passed, {} failed", reports.len() - failed, failed);
    if failed > 0 {
        std::process::exit(1);
    }
}
