//! Run reports
//!
//! A [`RunReport`] is the outcome of one scenario run. It can be written as
//! JSON or stored in a [`ResultsDb`].

pub mod db;

pub use db::{ResultsDb, RunSummary};

use bevy::log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::{Stage, StepRecord};
use crate::error::{HarnessError, HarnessResult};
use crate::settings::HarnessSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub id: String,
    pub scenario: String,
    pub level: String,
    /// RFC 3339, UTC
    pub finished_at: String,
    pub duration_secs: f64,
    pub stage: Stage,
    pub passed: bool,
    /// Fault that stopped the scenario early, if any
    pub aborted: Option<String>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn new(
        scenario: &str,
        level: &str,
        stage: Stage,
        steps: Vec<StepRecord>,
        duration: Duration,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scenario: scenario.to_string(),
            level: level.to_string(),
            finished_at: chrono::Utc::now().to_rfc3339(),
            duration_secs: duration.as_secs_f64(),
            stage,
            passed: stage == Stage::Passed,
            aborted: None,
            steps,
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.passed)
    }

    pub fn to_json(&self) -> HarnessResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::Serialization(e.to_string()))
    }

    /// Write `reports` as a JSON array, creating parent directories
    pub fn write_json(reports: &[RunReport], path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(reports)
            .map_err(|e| HarnessError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Write `reports` wherever `settings` asks: a JSON file, a results
/// database, or both
pub fn publish(reports: &[RunReport], settings: &HarnessSettings) -> HarnessResult<()> {
    if let Some(path) = &settings.report_path {
        RunReport::write_json(reports, Path::new(path))?;
        info!("Report written to {}", path);
    }
    if let Some(path) = &settings.db_path {
        let mut db = ResultsDb::open(Path::new(path))?;
        for report in reports {
            db.insert_report(report)?;
        }
        info!("{} run(s) stored in {}", reports.len(), path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::FailureKind;

    fn sample() -> RunReport {
        RunReport::new(
            "sample",
            "sample_level",
            Stage::Failed,
            vec![StepRecord {
                stage: Stage::Verified,
                name: "instance count".to_string(),
                passed: false,
                failure: Some(FailureKind::Timeout),
                detail: "timed out".to_string(),
            }],
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn test_passed_follows_terminal_stage() {
        assert!(!sample().passed);
        let passed = RunReport::new("ok", "lvl", Stage::Passed, Vec::new(), Duration::ZERO);
        assert!(passed.passed);
        assert_ne!(passed.id, sample().id);
    }

    #[test]
    fn test_json_uses_snake_case_failures() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"failure\": \"timeout\""));
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.failed_steps().count(), 1);
    }

    #[test]
    fn test_write_json_creates_directories() {
        let dir = std::env::temp_dir().join(format!("scenecheck_report_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("report.json");
        RunReport::write_json(&[sample()], &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: Vec<RunReport> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 1);
        let _ = fs::remove_dir_all(dir);
    }
}
