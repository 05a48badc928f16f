//! Scenecheck - acceptance-test harness for a simulated world editor
//!
//! Builds a level, composes entities out of components, perturbs the scene
//! and asserts with bounded polling that the self-ticking simulation
//! converges to the expected state.

// Harness
pub mod assets;
pub mod constants;
pub mod controller;
pub mod dynveg;
pub mod entity;
pub mod error;
pub mod host;
pub mod level;
pub mod poller;

// Scenarios and reporting
pub mod report;
pub mod scenarios;
pub mod settings;
pub mod testing;

// Simulated editor host
pub mod sim;

// Re-export commonly used types for convenience
pub use assets::{AssetReference, AssetResolver, normalize_asset_path};
pub use constants::*;
pub use controller::{
    FailureKind, Scenario, Stage, StepRecord, TestController, Verdict, run_scenario,
};
pub use entity::{EditorEntity, EntityBuilder};
pub use error::{CreationError, HarnessError, HarnessResult, PropertyError};
pub use host::{
    Aabb, AssetHandle, ComponentId, ComponentTypeId, EntityId, HostClient, HostError,
    PropertyPath, Request, Target, Value,
};
pub use level::{CameraPose, LevelCreateCode, LevelParams, SceneBootstrap};
pub use poller::{ConditionPoller, PollOutcome};
pub use report::{ResultsDb, RunReport};
pub use settings::HarnessSettings;
pub use sim::{SimConfig, SimHost, SimulatedEditor};
