//! Harness and simulated host defaults

use std::time::Duration;

// =============================================================================
// HARNESS
// =============================================================================

/// Sleep between condition polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Shortest sleep between polls
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Budget for the instance-count assertion in the vegetation scenarios
pub const DEFAULT_CONDITION_TIMEOUT: Duration = Duration::from_secs(2);

/// Tolerance for set-then-read-back comparisons
pub const PROPERTY_EPSILON: f64 = 1e-4;

// =============================================================================
// SIMULATED HOST
// =============================================================================

/// Simulation tick rate
pub const DEFAULT_TICK_HZ: f32 = 60.0;

/// Quiet ticks after a scene edit before vegetation is rebuilt
pub const DEFAULT_SETTLE_TICKS: u64 = 4;

/// Instances placed per tick while a rebuild is filling in
pub const DEFAULT_INSTANCES_PER_TICK: usize = 48;

/// Entity allocation bound per host
pub const DEFAULT_MAX_ENTITIES: usize = 4096;

// =============================================================================
// COMPONENT KINDS
// =============================================================================

pub const BOX_SHAPE: &str = "Box Shape";
pub const VEGETATION_LAYER_SPAWNER: &str = "Vegetation Layer Spawner";
pub const VEGETATION_ASSET_LIST: &str = "Vegetation Asset List";
pub const VEGETATION_LAYER_BLOCKER_MESH: &str = "Vegetation Layer Blocker (Mesh)";
pub const SHAPE_SURFACE_TAG_EMITTER: &str = "Shape Surface Tag Emitter";
pub const MESH: &str = "Mesh";

// =============================================================================
// COMPONENT PROPERTY PATHS
// =============================================================================

pub const BOX_DIMENSIONS_PATH: &str = "Box Shape|Box Configuration|Dimensions";
pub const DESCRIPTOR_ASSET_PATH: &str = "Configuration|Embedded Assets|[0]|Instance|Slice Asset";
pub const MESH_ASSET_PATH: &str = "Controller|Configuration|Mesh Asset";
pub const ALLOW_EMPTY_ASSETS_PATH: &str = "Configuration|Allow Empty Assets";
pub const SURFACE_TAG_PATH: &str = "Configuration|Surface Tag";
pub const BLOCKER_HEIGHT_MIN_PATH: &str = "Configuration|Mesh Height Percent Min";
pub const BLOCKER_HEIGHT_MAX_PATH: &str = "Configuration|Mesh Height Percent Max";

// =============================================================================
// FILES
// =============================================================================

/// Template harness settings (checked into git)
pub const HARNESS_SETTINGS_TEMPLATE: &str = "config/harness_settings.template.json";
/// Local harness settings (gitignored)
pub const HARNESS_SETTINGS_FILE: &str = "config/harness_settings.json";
