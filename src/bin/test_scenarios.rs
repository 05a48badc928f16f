//! Scenario file runner CLI
//!
//! Usage:
//!   cargo run --bin test-scenarios              # Run all scenarios
//!   cargo run --bin test-scenarios -- vegetation/   # Run category
//!   cargo run --bin test-scenarios -- vegetation/mesh_blocker  # Run one file
//!   cargo run --bin test-scenarios -- --verbose # Show every step

use std::path::Path;

use scenecheck::report::publish;
use scenecheck::testing::{SCENARIOS_DIR, discover_scenarios, parse_test_file, run_definition};
use scenecheck::{HarnessSettings, RunReport, SimHost};

const USAGE: &str = r#"Scenario file runner - TOML scenarios under tests/scenarios/

USAGE:
    cargo run --bin test-scenarios -- [OPTIONS] [FILTER]"#;

fn main() {
    let settings = HarnessSettings::from_args(USAGE);

    println!("Scenario Tests");
    println!("==============\n");

    let scenarios_path = Path::new(SCENARIOS_DIR);
    if !scenarios_path.exists() {
        println!("No scenarios directory found at {}", SCENARIOS_DIR);
        println!("Create scenario files in tests/scenarios/");
        std::process::exit(1);
    }

    let filter = settings.filters.first().map(String::as_str);
    let files = discover_scenarios(scenarios_path, filter);

    if files.is_empty() {
        println!("No scenario files found.");
        if let Some(f) = filter {
            println!("Filter: {}", f);
        }
        std::process::exit(1);
    }

    let mut reports: Vec<RunReport> = Vec::new();
    let mut errors = 0;
    let mut current_category = String::new();

    for path in &files {
        let rel_path = path.strip_prefix(scenarios_path).unwrap_or(path);

        if let Some(parent) = rel_path.parent() {
            let category = parent.to_string_lossy().to_string();
            if category != current_category && !category.is_empty() {
                if !current_category.is_empty() {
                    println!();
                }
                println!("{}/", category);
                current_category = category;
            }
        }

        let name = rel_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let dots = ".".repeat(40 - name.len().min(39));

        let def = match parse_test_file(path) {
            Ok(def) => def,
            Err(e) => {
                println!("  {} {} ERROR", name, dots);
                println!("    {}", e);
                errors += 1;
                continue;
            }
        };

        let host = match SimHost::spawn(settings.sim_config()) {
            Ok(host) => host,
            Err(e) => {
                println!("  {} {} ERROR", name, dots);
                println!("    could not start simulated editor: {}", e);
                errors += 1;
                continue;
            }
        };

        let report = run_definition(&host, &def, &settings);
        print_report(&name, &dots, &report, settings.verbose);
        reports.push(report);
    }

    if let Err(e) = publish(&reports, &settings) {
        eprintln!("Failed to write results: {}", e);
    }

    let passed = reports.iter().filter(|r| r.passed).count();
    let failed = reports.len() - passed;
    println!("\n==============");
    println!(
        "Results: {} passed, {} failed, {} errors",
        passed, failed, errors
    );

    if failed > 0 || errors > 0 {
        std::process::exit(1);
    }
}

fn print_report(name: &str, dots: &str, report: &RunReport, verbose: bool) {
    if report.passed {
        println!("  {} {} PASS ({} steps)", name, dots, report.steps.len());
    } else {
        println!("  {} {} FAIL", name, dots);
    }

    for step in &report.steps {
        if verbose || !step.passed {
            let mark = if step.passed { "ok" } else { "FAILED" };
            println!("    {} [{}] {}: {}", mark, step.stage, step.name, step.detail);
        }
    }
    if let Some(reason) = &report.aborted {
        println!("    aborted: {}", reason);
    }
}
