//! TOML scenario file parsing

use bevy::math::Vec3;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::level::{CameraPose, LevelParams};

/// Complete scenario definition from a TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub description: Option<String>,
    pub level: LevelParams,
    #[serde(default)]
    pub camera: CameraDef,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

impl ScenarioDefinition {
    /// Reject values that deserialize fine but can't be run
    pub fn validate(&self) -> Result<(), String> {
        for expectation in &self.expect {
            if let Expectation::InstanceCount {
                entity, timeout, ..
            } = expectation
            {
                if Duration::try_from_secs_f64(*timeout).is_err() {
                    return Err(format!(
                        "instance_count for '{}': timeout must be a finite, non-negative number of seconds (got {})",
                        entity, timeout
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraDef {
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler degrees
    #[serde(default)]
    pub rotation: [f32; 3],
}

impl CameraDef {
    pub fn pose(&self) -> CameraPose {
        CameraPose::new(Vec3::from_array(self.position), Vec3::from_array(self.rotation))
    }
}

/// Entity to create, in file order
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Attached while the entity is created
    #[serde(default)]
    pub components: Vec<String>,
    /// Attached one at a time afterwards
    #[serde(default)]
    pub add_components: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    pub uniform_scale: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDef {
    /// Component index in attachment order. Without it the first component
    /// that has the path is used.
    pub component: Option<usize>,
    pub path: String,
    pub value: PropertyValueDef,
    /// Read the value back and record whether it matches
    #[serde(default)]
    pub verify: bool,
    /// Don't record an unresolved asset path as a failure
    #[serde(default)]
    pub allow_unresolved: bool,
    /// For `asset` values. `false` lets the catalog accept a file-name match.
    #[serde(default = "default_true")]
    pub exact_match: bool,
}

/// Property value, tagged by type: `value = { vector = [1.0, 2.0, 3.0] }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValueDef {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector([f32; 3]),
    /// Logical asset path, resolved through the catalog
    Asset(String),
}

fn default_timeout() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Checks run after the scene is populated, in file order
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Poll until exactly `count` instances sit inside `entity`'s shape
    InstanceCount {
        entity: String,
        count: usize,
        /// Seconds
        #[serde(default = "default_timeout")]
        timeout: f64,
    },
    /// Whether a logical asset path resolves
    Asset {
        path: String,
        #[serde(default = "default_true")]
        resolved: bool,
        #[serde(default = "default_true")]
        exact_match: bool,
    },
    /// Creating this entity must fail with a creation error
    CreationFails {
        name: String,
        #[serde(default)]
        components: Vec<String>,
    },
}

/// Parse a scenario file from path
pub fn parse_test_file(path: &Path) -> Result<ScenarioDefinition, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let def: ScenarioDefinition = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    def.validate()
        .map_err(|e| format!("Invalid scenario {}: {}", path.display(), e))?;
    Ok(def)
}
