//! Simulated editor host
//!
//! A headless Bevy app standing in for the external editor. It owns the
//! scene, the asset catalog and the vegetation system, and keeps ticking on
//! its own thread while the harness talks to it through [`SimHost`].

pub mod catalog;
pub mod components;
pub mod scene;
pub mod vegetation;

use bevy::log::{Level, LogPlugin, info, warn};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::error::{HarnessError, HarnessResult};
use crate::host::{HostClient, HostError, Request, Target, Value};
use catalog::{AssetCatalog, CatalogEntry};
use scene::{
    LevelRegistry, SceneIndex, SceneRevision, SimClock, SimSettings, ViewCamera, advance_clock,
};
use vegetation::{VegetationState, detect_scene_edits, place_instances, rebuild_vegetation};

/// Configuration for one simulated host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second of the free-running update loop
    pub tick_hz: f32,
    /// Quiet ticks after an edit before vegetation is rebuilt
    pub settle_ticks: u64,
    /// Instances placed per tick while filling in
    pub instances_per_tick: usize,
    pub max_entities: usize,
    /// Base seed for spawner jitter
    pub seed: u64,
    /// Level names that already exist when the host starts
    pub existing_levels: Vec<String>,
    /// Catalog contents (empty = built-in entries)
    pub catalog: Vec<CatalogEntry>,
    /// Install the global log subscriber at this level ("info", "debug", ...)
    pub log: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            settle_ticks: DEFAULT_SETTLE_TICKS,
            instances_per_tick: DEFAULT_INSTANCES_PER_TICK,
            max_entities: DEFAULT_MAX_ENTITIES,
            seed: 0,
            existing_levels: Vec::new(),
            catalog: Vec::new(),
            log: None,
        }
    }
}

impl SimConfig {
    /// Fast-ticking host for unit tests
    pub fn for_tests() -> Self {
        Self {
            tick_hz: 240.0,
            settle_ticks: 2,
            instances_per_tick: 64,
            ..Default::default()
        }
    }

    fn tick_period(&self) -> Option<Duration> {
        (self.tick_hz.is_finite() && self.tick_hz > 0.0)
            .then(|| Duration::from_secs_f32(1.0 / self.tick_hz))
    }
}

static LOG_INSTALLED: Once = Once::new();

/// The editor's Bevy app plus a request entry point
pub struct SimulatedEditor {
    app: App,
}

impl SimulatedEditor {
    pub fn new(config: &SimConfig) -> Self {
        let mut app = App::new();

        if let Some(level) = &config.log {
            let level = level.parse::<Level>().unwrap_or(Level::INFO);
            LOG_INSTALLED.call_once(|| {
                app.add_plugins(LogPlugin {
                    level,
                    ..default()
                });
            });
        }

        let entries = if config.catalog.is_empty() {
            catalog::default_entries()
        } else {
            config.catalog.clone()
        };

        app.insert_resource(SimSettings {
            settle_ticks: config.settle_ticks,
            instances_per_tick: config.instances_per_tick.max(1),
            max_entities: config.max_entities,
            seed: config.seed,
        });
        app.insert_resource(LevelRegistry {
            known: config.existing_levels.iter().cloned().collect(),
            current: None,
        });
        app.insert_resource(AssetCatalog::from_entries(&entries));
        app.init_resource::<ViewCamera>();
        app.init_resource::<SceneIndex>();
        app.init_resource::<SceneRevision>();
        app.init_resource::<SimClock>();
        app.init_resource::<VegetationState>();

        app.add_systems(
            Update,
            (
                advance_clock,
                detect_scene_edits,
                rebuild_vegetation,
                place_instances,
            )
                .chain(),
        );

        app.finish();
        app.cleanup();
        Self { app }
    }

    /// Answer one request against the current scene
    pub fn handle(&mut self, target: Target, request: &Request) -> Result<Value, HostError> {
        scene::dispatch(self.app.world_mut(), target, request)
    }

    pub fn tick(&mut self) {
        self.app.update();
    }

    pub fn ticks(&self) -> u64 {
        self.app.world().resource::<SimClock>().tick
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    /// Serve requests between ticks until every sender is gone
    fn run(mut self, requests: Receiver<Envelope>, period: Duration) {
        let mut next_tick = Instant::now() + period;
        loop {
            let now = Instant::now();
            if now >= next_tick {
                self.tick();
                next_tick += period;
                // Don't try to catch up after a stall
                if next_tick < now {
                    next_tick = now + period;
                }
                continue;
            }

            match requests.recv_timeout(next_tick - now) {
                Ok(envelope) => {
                    let reply = self.handle(envelope.target, &envelope.request);
                    let _ = envelope.reply.send(reply);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("simulated editor stopped after {} ticks", self.ticks());
    }
}

struct Envelope {
    target: Target,
    request: Request,
    reply: Sender<Result<Value, HostError>>,
}

/// Handle to a simulated editor running on its own thread.
///
/// Each call blocks until the editor answers. Dropping the handle stops
/// the editor.
pub struct SimHost {
    requests: Option<Sender<Envelope>>,
    worker: Option<JoinHandle<()>>,
}

impl SimHost {
    pub fn spawn(config: SimConfig) -> HarnessResult<Self> {
        let period = config.tick_period().ok_or_else(|| {
            HarnessError::Fixture(format!("tick_hz must be positive, got {}", config.tick_hz))
        })?;

        let (requests, inbox) = mpsc::channel::<Envelope>();
        let (ready_tx, ready_rx) = mpsc::channel::<()>();
        let worker = thread::Builder::new()
            .name("sim-host".to_string())
            .spawn(move || {
                let editor = SimulatedEditor::new(&config);
                let _ = ready_tx.send(());
                editor.run(inbox, period);
            })?;

        ready_rx
            .recv()
            .map_err(|_| HarnessError::Host(HostError::Disconnected))?;
        info!("simulated editor started ({:.0} Hz)", 1.0 / period.as_secs_f32());

        Ok(Self {
            requests: Some(requests),
            worker: Some(worker),
        })
    }
}

impl HostClient for SimHost {
    fn send(&self, target: Target, request: Request) -> Result<Value, HostError> {
        let requests = self.requests.as_ref().ok_or(HostError::Disconnected)?;
        let (reply, answer) = mpsc::channel();
        requests
            .send(Envelope {
                target,
                request,
                reply,
            })
            .map_err(|_| HostError::Disconnected)?;
        answer.recv().map_err(|_| HostError::Disconnected)?
    }
}

impl Drop for SimHost {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("simulated editor thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::requests::*;

    fn create_level(editor: &mut SimulatedEditor, name: &str) -> Value {
        editor
            .handle(
                Target::Direct,
                &Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
                    .arg(name)
                    .arg(1024_i64)
                    .arg(1.0_f32)
                    .arg(4096_i64)
                    .arg(false),
            )
            .unwrap()
    }

    #[test]
    fn test_editor_ticks_on_update() {
        let mut editor = SimulatedEditor::new(&SimConfig::for_tests());
        assert_eq!(editor.ticks(), 0);
        editor.tick();
        editor.tick();
        assert_eq!(editor.ticks(), 2);
    }

    #[test]
    fn test_existing_levels_collide() {
        let mut config = SimConfig::for_tests();
        config.existing_levels.push("Taken".to_string());
        let mut editor = SimulatedEditor::new(&config);
        assert_eq!(create_level(&mut editor, "Taken"), Value::Int(1));
        assert_eq!(create_level(&mut editor, "Fresh"), Value::Int(0));
    }

    #[test]
    fn test_rebuild_waits_for_quiet_ticks() {
        let mut editor = SimulatedEditor::new(&SimConfig::for_tests());
        create_level(&mut editor, "quiet");

        editor.tick();
        assert!(editor.world().resource::<VegetationState>().dirty_since.is_some());
        for _ in 0..3 {
            editor.tick();
        }
        assert!(editor.world().resource::<VegetationState>().is_settled());
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let mut config = SimConfig::for_tests();
        config.tick_hz = 0.0;
        assert!(matches!(SimHost::spawn(config), Err(HarnessError::Fixture(_))));
    }

    #[test]
    fn test_host_answers_from_its_thread() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let reply = host
            .call(
                Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
                    .arg("threaded")
                    .arg(1024_i64)
                    .arg(1.0_f32)
                    .arg(4096_i64)
                    .arg(false),
            )
            .unwrap();
        assert_eq!(reply, Value::Int(0));
        let name = host.call(Request::new(GENERAL, GET_CURRENT_LEVEL_NAME)).unwrap();
        assert_eq!(name, Value::String("threaded".to_string()));
    }

    #[test]
    fn test_config_parses_with_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"tick_hz": 30.0, "seed": 7}"#).unwrap();
        assert_eq!(config.tick_hz, 30.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.settle_ticks, DEFAULT_SETTLE_TICKS);
        assert!(config.catalog.is_empty());
    }
}
