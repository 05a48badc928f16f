//! Declarative scenario testing
//!
//! Scenarios are TOML files describing a level, the entities to build and
//! the expectations to check. They run through the same controller as the
//! built-in scenarios.

pub mod parser;
pub mod runner;

pub use parser::{
    CameraDef, EntityDef, Expectation, PropertyDef, PropertyValueDef, ScenarioDefinition,
    parse_test_file,
};
pub use runner::{DefinitionScenario, run_definition};

use std::fs;
use std::path::{Path, PathBuf};

/// Default path for scenario files
pub const SCENARIOS_DIR: &str = "tests/scenarios";

/// Every `.toml` file under `base`, sorted. With a filter, only files whose
/// path relative to `base` contains it.
pub fn discover_scenarios(base: &Path, filter: Option<&str>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    discover_recursive(base, base, filter, &mut found);
    found.sort();
    found
}

fn discover_recursive(base: &Path, current: &Path, filter: Option<&str>, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(current) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_dir() {
            discover_recursive(base, &path, filter, found);
        } else if path.extension().map(|e| e == "toml").unwrap_or(false) {
            if let Some(f) = filter {
                let rel = path.strip_prefix(base).unwrap_or(&path).to_string_lossy();
                if !rel.contains(f) {
                    continue;
                }
            }
            found.push(path);
        }
    }
}
