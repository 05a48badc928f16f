//! Built-in scenarios

pub mod mesh_blocker;

pub use mesh_blocker::MeshBlockerScenario;

use crate::controller::Scenario;
use crate::settings::HarnessSettings;

/// Every built-in scenario, with the settings' level name applied
pub fn builtin(settings: &HarnessSettings) -> Vec<Box<dyn Scenario>> {
    let mut mesh_blocker = MeshBlockerScenario::default();
    if let Some(level) = &settings.level {
        mesh_blocker.level.name = level.clone();
    }
    vec![Box::new(mesh_blocker)]
}
