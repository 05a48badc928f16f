//! Harness settings
//!
//! Loaded from `config/harness_settings.json`, falling back to the checked-in
//! template and then to built-in defaults. Command line flags override
//! whatever the files say.

use bevy::log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::*;
use crate::sim::SimConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Simulated host configuration, used for every run
    pub sim: SimConfig,
    /// Sleep between condition polls, milliseconds
    pub poll_interval_ms: u64,
    /// Level name for the built-in scenarios (None = scenario default)
    pub level: Option<String>,
    /// Write all run reports to this JSON file
    pub report_path: Option<String>,
    /// Store run reports in this SQLite database
    pub db_path: Option<String>,
    /// Log at debug level and print every step
    pub verbose: bool,
    /// Only run scenarios whose name contains one of these
    pub filters: Vec<String>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            level: None,
            report_path: None,
            db_path: None,
            verbose: false,
            filters: Vec::new(),
        }
    }
}

impl HarnessSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Host config with logging turned on at the level `verbose` asks for
    pub fn sim_config(&self) -> SimConfig {
        let mut sim = self.sim.clone();
        sim.log = Some(if self.verbose { "debug" } else { "info" }.to_string());
        sim
    }

    pub fn matches_filter(&self, name: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| name.contains(f.as_str()))
    }

    /// Load settings from a JSON settings file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
    }

    /// Priority: local settings > template settings > built-in defaults
    pub fn from_config_files() -> Self {
        if let Ok(settings) = Self::from_file(HARNESS_SETTINGS_FILE) {
            return settings;
        }
        if let Ok(settings) = Self::from_file(HARNESS_SETTINGS_TEMPLATE) {
            return settings;
        }
        Self::default()
    }

    /// Settings for this process: config files, then command line overrides
    pub fn from_args(usage: &str) -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let mut settings = match settings_file_arg(&args) {
            Some(path) => Self::from_file(path).unwrap_or_else(|e| {
                eprintln!("Warning: {}", e);
                Self::from_config_files()
            }),
            None => Self::from_config_files(),
        };

        if !settings.apply_args(&args) {
            print_help(usage);
            std::process::exit(0);
        }
        settings
    }

    /// Apply command line overrides. Returns false when help was requested.
    pub fn apply_args(&mut self, args: &[String]) -> bool {
        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--settings", Some(_)) => i += 1,
                ("--level", Some(v)) => {
                    self.level = Some(v.clone());
                    i += 1;
                }
                ("--poll-interval", Some(v)) => {
                    self.poll_interval_ms = parse_or_warn(v, "--poll-interval", self.poll_interval_ms);
                    i += 1;
                }
                ("--tick-hz", Some(v)) => {
                    self.sim.tick_hz = parse_or_warn(v, "--tick-hz", self.sim.tick_hz);
                    i += 1;
                }
                ("--settle-ticks", Some(v)) => {
                    self.sim.settle_ticks = parse_or_warn(v, "--settle-ticks", self.sim.settle_ticks);
                    i += 1;
                }
                ("--seed", Some(v)) => {
                    self.sim.seed = parse_or_warn(v, "--seed", self.sim.seed);
                    i += 1;
                }
                ("--report", Some(v)) => {
                    self.report_path = Some(v.clone());
                    i += 1;
                }
                ("--db", Some(v)) => {
                    self.db_path = Some(v.clone());
                    i += 1;
                }
                ("--verbose" | "-v", _) => self.verbose = true,
                ("--help" | "-h", _) => return false,
                (arg, _) if arg.starts_with('-') => {
                    warn!("Ignoring unknown or incomplete option {}", arg);
                }
                (filter, _) => self.filters.push(filter.to_string()),
            }
            i += 1;
        }
        true
    }
}

fn settings_file_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--settings")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_or_warn<T: std::str::FromStr>(value: &str, flag: &str, fallback: T) -> T {
    value.parse().unwrap_or_else(|_| {
        warn!("Invalid value '{}' for {}", value, flag);
        fallback
    })
}

fn print_help(usage: &str) {
    println!(
        r#"{usage}

OPTIONS:
    --settings <FILE>       Load settings from JSON file (CLI args override file settings)
    --level <NAME>          Level name for the built-in scenarios
    --poll-interval <MS>    Sleep between condition polls (default: 100)
    --tick-hz <HZ>          Simulated host tick rate (default: 60)
    --settle-ticks <N>      Quiet ticks before vegetation rebuilds (default: 4)
    --seed <N>              Seed for spawner jitter
    --report <FILE>         Write run reports as JSON
    --db <FILE>             Store run reports in SQLite database
    --verbose, -v           Debug logging and per-step output
    --help, -h              Show this help

Any other argument filters scenarios by name."#
    );
}
