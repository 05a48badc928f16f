//! Test controller - sequences a scenario and accumulates its verdict

use bevy::log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::assets::{AssetReference, AssetResolver};
use crate::entity::EntityBuilder;
use crate::error::HarnessResult;
use crate::host::HostClient;
use crate::level::{CameraPose, LevelParams, SceneBootstrap};
use crate::poller::ConditionPoller;
use crate::report::RunReport;
use crate::settings::HarnessSettings;

/// Scenario stages, in the only order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    NotStarted,
    LevelReady,
    ScenePopulated,
    Verified,
    Passed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::NotStarted => "not_started",
            Stage::LevelReady => "level_ready",
            Stage::ScenePopulated => "scene_populated",
            Stage::Verified => "verified",
            Stage::Passed => "passed",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// AND-accumulator over every recorded outcome. Once false, stays false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict(bool);

impl Default for Verdict {
    fn default() -> Self {
        Verdict(true)
    }
}

impl Verdict {
    pub fn and(&mut self, passed: bool) {
        self.0 = self.0 && passed;
    }

    pub fn is_passing(&self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Creation,
    Property,
    Resolution,
    Timeout,
    Rejected,
    Check,
}

/// One ledger line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub name: String,
    pub passed: bool,
    pub failure: Option<FailureKind>,
    pub detail: String,
}

/// Drives one scenario against one host.
///
/// Host-dependent helpers borrow the host for `'h`, so predicates handed to
/// [`wait_for_condition`](Self::wait_for_condition) can use [`host`](Self::host)
/// without borrowing the controller.
pub struct TestController<'h> {
    host: &'h dyn HostClient,
    builder: EntityBuilder<'h>,
    poller: ConditionPoller,
    prefix: String,
    scenario: String,
    level: String,
    stage: Stage,
    verdict: Verdict,
    steps: Vec<StepRecord>,
    started: Instant,
}

impl<'h> TestController<'h> {
    pub fn new(host: &'h dyn HostClient, scenario: &str, poller: ConditionPoller) -> Self {
        Self {
            host,
            builder: EntityBuilder::new(host),
            poller,
            prefix: scenario.to_string(),
            scenario: scenario.to_string(),
            level: String::new(),
            stage: Stage::NotStarted,
            verdict: Verdict::default(),
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Prefix for narrative log lines (defaults to the scenario name)
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn host(&self) -> &'h dyn HostClient {
        self.host
    }

    pub fn builder(&mut self) -> &mut EntityBuilder<'h> {
        &mut self.builder
    }

    pub fn resolver(&self) -> AssetResolver<'h> {
        AssetResolver::new(self.host)
    }

    pub fn poller(&self) -> &ConditionPoller {
        &self.poller
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    fn advance(&mut self, to: Stage) {
        if to <= self.stage {
            warn!("{}: ignoring transition {} -> {}", self.prefix, self.stage, to);
            return;
        }
        self.stage = to;
    }

    /// Bootstrap the level, record the outcome and move to `LevelReady`
    pub fn create_level(&mut self, params: &LevelParams, camera: &CameraPose) -> HarnessResult<bool> {
        self.level = params.name.clone();
        let created = SceneBootstrap::new(self.host)
            .with_camera(*camera)
            .create_level(params)?;
        let detail = if created {
            format!("level '{}' created", params.name)
        } else {
            format!("level '{}' was not created", params.name)
        };
        self.record(
            "create_level",
            created,
            (!created).then_some(FailureKind::Rejected),
            detail,
        );
        self.advance(Stage::LevelReady);
        Ok(created)
    }

    pub fn scene_populated(&mut self) {
        self.advance(Stage::ScenePopulated);
    }

    pub fn verified(&mut self) {
        self.advance(Stage::Verified);
    }

    pub fn record(
        &mut self,
        name: &str,
        passed: bool,
        failure: Option<FailureKind>,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        if passed {
            info!("{}: {} passed", self.prefix, name);
        } else {
            warn!("{}: {} failed: {}", self.prefix, name, detail);
        }
        self.verdict.and(passed);
        self.steps.push(StepRecord {
            stage: self.stage,
            name: name.to_string(),
            passed,
            failure: if passed { None } else { failure },
            detail,
        });
    }

    pub fn check(&mut self, name: &str, passed: bool) -> bool {
        let detail = if passed { "ok" } else { "check failed" };
        self.record(name, passed, Some(FailureKind::Check), detail);
        passed
    }

    /// Poll `predicate` with the controller's poller; a timeout degrades
    /// the verdict
    pub fn wait_for_condition<F>(&mut self, name: &str, predicate: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let outcome = self.poller.poll(predicate, timeout);
        let detail = format!(
            "{} after {} polls in {:.2}s (budget {:.2}s)",
            if outcome.satisfied { "satisfied" } else { "timed out" },
            outcome.polls,
            outcome.elapsed.as_secs_f32(),
            timeout.as_secs_f32()
        );
        self.record(name, outcome.satisfied, Some(FailureKind::Timeout), detail);
        outcome.satisfied
    }

    /// Record whether `reference` resolved; a null handle degrades the verdict
    pub fn expect_resolved(&mut self, reference: &AssetReference) -> bool {
        let resolved = reference.is_resolved();
        let detail = if resolved {
            format!("'{}' resolved to {}", reference.path, reference.handle)
        } else {
            format!("'{}' did not resolve", reference.path)
        };
        self.record(
            &format!("resolve {}", reference.path),
            resolved,
            Some(FailureKind::Resolution),
            detail,
        );
        resolved
    }

    /// Enter the terminal stage and produce the report
    pub fn finish(mut self) -> RunReport {
        let terminal = if self.verdict.is_passing() {
            Stage::Passed
        } else {
            Stage::Failed
        };
        self.advance(terminal);
        RunReport::new(
            &self.scenario,
            &self.level,
            self.stage,
            self.steps,
            self.started.elapsed(),
        )
    }

    fn abort(mut self, reason: String) -> RunReport {
        self.verdict.and(false);
        let mut report = self.finish();
        report.aborted = Some(reason);
        report
    }
}

/// A scripted acceptance scenario
pub trait Scenario {
    fn name(&self) -> &str;

    /// Name of the level the scenario creates
    fn level_name(&self) -> &str;

    /// Build the scene and verify it. `Err` aborts the run.
    fn run(&self, controller: &mut TestController<'_>) -> HarnessResult<()>;
}

/// Execute `scenario` against `host` and report the outcome.
///
/// Never fails: a fault inside the scenario becomes an aborted, failed
/// report.
pub fn run_scenario(
    host: &dyn HostClient,
    scenario: &dyn Scenario,
    settings: &HarnessSettings,
) -> RunReport {
    let prefix = scenario.name().to_string();
    let mut controller =
        TestController::new(host, scenario.name(), ConditionPoller::new(settings.poll_interval()))
            .with_prefix(&prefix);

    info!("{}: test started", prefix);
    let report = match scenario.run(&mut controller) {
        Ok(()) => controller.finish(),
        Err(e) => {
            error!("{}: aborted: {}", prefix, e);
            controller.abort(e.to_string())
        }
    };

    info!(
        "{}: result={}",
        prefix,
        if report.passed { "SUCCESS" } else { "FAILURE" }
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CreationError, HarnessError};
    use crate::sim::{SimConfig, SimHost};
    use bevy::math::Vec3;

    fn controller(host: &SimHost) -> TestController<'_> {
        TestController::new(host, "controller_test", ConditionPoller::new(Duration::from_millis(5)))
    }

    #[test]
    fn test_verdict_is_monotonic() {
        let mut verdict = Verdict::default();
        verdict.and(true);
        assert!(verdict.is_passing());
        verdict.and(false);
        verdict.and(true);
        assert!(!verdict.is_passing());
    }

    #[test]
    fn test_stages_only_move_forward() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let mut controller = controller(&host);
        controller.scene_populated();
        assert_eq!(controller.stage(), Stage::ScenePopulated);
        controller
            .create_level(&LevelParams::new("late_level"), &CameraPose::default())
            .unwrap();
        assert_eq!(controller.stage(), Stage::ScenePopulated);
    }

    #[test]
    fn test_level_rejection_degrades_verdict() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let mut controller = controller(&host);
        let mut params = LevelParams::new("bad level name");
        params.heightmap_resolution = 1000;
        assert!(!controller.create_level(&params, &CameraPose::default()).unwrap());
        assert_eq!(controller.stage(), Stage::LevelReady);

        let report = controller.finish();
        assert!(!report.passed);
        assert_eq!(report.stage, Stage::Failed);
        assert_eq!(report.steps[0].failure, Some(FailureKind::Rejected));
    }

    #[test]
    fn test_timeout_and_resolution_are_recorded() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let mut controller = controller(&host);
        controller.check("sanity", true);
        assert!(!controller.wait_for_condition("never", || false, Duration::from_millis(20)));
        let reference = controller.resolver().resolve("slices/missing.dynamicslice");
        assert!(!controller.expect_resolved(&reference));

        let kinds: Vec<_> = controller.steps().iter().map(|s| s.failure).collect();
        assert_eq!(kinds, vec![None, Some(FailureKind::Timeout), Some(FailureKind::Resolution)]);
        assert!(!controller.finish().passed);
    }

    #[test]
    fn test_all_passing_steps_pass() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let mut controller = controller(&host);
        controller
            .create_level(&LevelParams::new("all_pass"), &CameraPose::new(Vec3::ONE, Vec3::ZERO))
            .unwrap();
        controller.scene_populated();
        assert!(controller.wait_for_condition("eventually", || true, Duration::from_millis(20)));
        controller.verified();

        let report = controller.finish();
        assert!(report.passed);
        assert_eq!(report.stage, Stage::Passed);
        assert_eq!(report.level, "all_pass");
        assert!(report.aborted.is_none());
    }

    struct Failing;

    impl Scenario for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn level_name(&self) -> &str {
            "failing_level"
        }

        fn run(&self, controller: &mut TestController<'_>) -> HarnessResult<()> {
            controller.check("before abort", true);
            Err(HarnessError::Creation(CreationError::UnknownComponent(
                "Imaginary".to_string(),
            )))
        }
    }

    #[test]
    fn test_run_scenario_turns_errors_into_failed_report() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let report = run_scenario(&host, &Failing, &HarnessSettings::default());
        assert!(!report.passed);
        assert_eq!(report.steps.len(), 1);
        assert!(report.aborted.as_deref().unwrap().contains("Imaginary"));
    }
}
