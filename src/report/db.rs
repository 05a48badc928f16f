//! SQLite store for run reports
//!
//! Uses WAL mode so a dashboard can read while runs are written.

use rusqlite::{Connection, Result, params};
use std::path::Path;

use super::RunReport;

/// Database wrapper for scenario results
pub struct ResultsDb {
    conn: Connection,
}

/// One row of the runs table
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub id: String,
    pub scenario: String,
    pub passed: bool,
    pub aborted: Option<String>,
    pub step_count: i64,
    pub failed_steps: i64,
}

impl ResultsDb {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                scenario TEXT NOT NULL,
                level TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                duration_secs REAL NOT NULL,
                stage TEXT NOT NULL,
                passed INTEGER NOT NULL,
                aborted TEXT
            );

            CREATE TABLE IF NOT EXISTS steps (
                id INTEGER PRIMARY KEY,
                run_id TEXT REFERENCES runs(id),
                seq INTEGER NOT NULL,
                stage TEXT NOT NULL,
                name TEXT NOT NULL,
                passed INTEGER NOT NULL,
                failure TEXT,
                detail TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_scenario ON runs(scenario);
            CREATE INDEX IF NOT EXISTS idx_steps_run ON steps(run_id);
            "#,
        )?;
        Ok(())
    }

    /// Insert a report and its steps in one transaction
    pub fn insert_report(&mut self, report: &RunReport) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"INSERT INTO runs
               (id, scenario, level, finished_at, duration_secs, stage, passed, aborted)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                report.id,
                report.scenario,
                report.level,
                report.finished_at,
                report.duration_secs,
                report.stage.to_string(),
                report.passed,
                report.aborted,
            ],
        )?;

        for (seq, step) in report.steps.iter().enumerate() {
            let failure = step
                .failure
                .map(|f| format!("{:?}", f).to_lowercase());
            tx.execute(
                r#"INSERT INTO steps (run_id, seq, stage, name, passed, failure, detail)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![
                    report.id,
                    seq as i64,
                    step.stage.to_string(),
                    step.name,
                    step.passed,
                    failure,
                    step.detail,
                ],
            )?;
        }
        tx.commit()
    }

    /// Most recent runs of `scenario`, newest first
    pub fn recent_runs(&self, scenario: &str, limit: usize) -> Result<Vec<RunSummary>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT r.id, r.scenario, r.passed, r.aborted,
                      COUNT(s.id),
                      COALESCE(SUM(CASE WHEN s.passed = 0 THEN 1 ELSE 0 END), 0)
               FROM runs r
               LEFT JOIN steps s ON s.run_id = r.id
               WHERE r.scenario = ?1
               GROUP BY r.id
               ORDER BY r.finished_at DESC, r.rowid DESC
               LIMIT ?2"#,
        )?;

        let rows = stmt.query_map(params![scenario, limit as i64], |row| {
            Ok(RunSummary {
                id: row.get(0)?,
                scenario: row.get(1)?,
                passed: row.get(2)?,
                aborted: row.get(3)?,
                step_count: row.get(4)?,
                failed_steps: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// (passed, total) over every stored run of `scenario`
    pub fn pass_rate(&self, scenario: &str) -> Result<(i64, i64)> {
        self.conn.query_row(
            "SELECT COALESCE(SUM(passed), 0), COUNT(*) FROM runs WHERE scenario = ?1",
            params![scenario],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{FailureKind, Stage, StepRecord};
    use std::time::Duration;

    fn report(passed: bool) -> RunReport {
        let stage = if passed { Stage::Passed } else { Stage::Failed };
        RunReport::new(
            "mesh_blocker",
            "tmp_level",
            stage,
            vec![
                StepRecord {
                    stage: Stage::LevelReady,
                    name: "create_level".to_string(),
                    passed: true,
                    failure: None,
                    detail: "ok".to_string(),
                },
                StepRecord {
                    stage: Stage::Verified,
                    name: "instance count".to_string(),
                    passed,
                    failure: (!passed).then_some(FailureKind::Timeout),
                    detail: String::new(),
                },
            ],
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_insert_and_query_runs() {
        let mut db = ResultsDb::open_in_memory().unwrap();
        db.insert_report(&report(true)).unwrap();
        db.insert_report(&report(false)).unwrap();

        let runs = db.recent_runs("mesh_blocker", 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.step_count == 2));
        assert_eq!(runs.iter().map(|r| r.failed_steps).sum::<i64>(), 1);
        assert_eq!(db.pass_rate("mesh_blocker").unwrap(), (1, 2));
    }

    #[test]
    fn test_unknown_scenario_is_empty() {
        let db = ResultsDb::open_in_memory().unwrap();
        assert!(db.recent_runs("nothing", 5).unwrap().is_empty());
        assert_eq!(db.pass_rate("nothing").unwrap(), (0, 0));
    }
}
