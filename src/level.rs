//! Level bootstrap - create the scene and place the initial viewpoint

use bevy::log::{debug, info, warn};
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};
use crate::host::requests::*;
use crate::host::{HostClient, Request, Value};

/// Level creation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub name: String,
    #[serde(default = "default_heightmap_resolution")]
    pub heightmap_resolution: u32,
    #[serde(default = "default_meters_per_pixel")]
    pub meters_per_pixel: f32,
    #[serde(default = "default_terrain_texture_resolution")]
    pub terrain_texture_resolution: u32,
    #[serde(default)]
    pub use_terrain: bool,
}

fn default_heightmap_resolution() -> u32 {
    1024
}

fn default_meters_per_pixel() -> f32 {
    1.0
}

fn default_terrain_texture_resolution() -> u32 {
    4096
}

impl LevelParams {
    /// Defaults used by the vegetation tests: 1024 heightmap, 1 m/px,
    /// 4096 texture, no terrain
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heightmap_resolution: default_heightmap_resolution(),
            meters_per_pixel: default_meters_per_pixel(),
            terrain_texture_resolution: default_terrain_texture_resolution(),
            use_terrain: false,
        }
    }
}

/// Editor viewport pose. Rotation is Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl CameraPose {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }
}

/// Reply codes of `create_level_no_prompt`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelCreateCode {
    Created,
    AlreadyExists,
    InvalidParameters,
    Other(i64),
}

impl LevelCreateCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LevelCreateCode::Created,
            1 => LevelCreateCode::AlreadyExists,
            2 => LevelCreateCode::InvalidParameters,
            other => LevelCreateCode::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LevelCreateCode::Created => 0,
            LevelCreateCode::AlreadyExists => 1,
            LevelCreateCode::InvalidParameters => 2,
            LevelCreateCode::Other(code) => *code,
        }
    }
}

pub struct SceneBootstrap<'h> {
    host: &'h dyn HostClient,
    camera: Option<CameraPose>,
}

impl<'h> SceneBootstrap<'h> {
    pub fn new(host: &'h dyn HostClient) -> Self {
        Self { host, camera: None }
    }

    /// Camera pose applied after every `create_level` call
    pub fn with_camera(mut self, camera: CameraPose) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Create and open a level. `Ok(false)` means the host refused it.
    pub fn create_level(&self, params: &LevelParams) -> HarnessResult<bool> {
        let request = Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
            .arg(params.name.as_str())
            .arg(params.heightmap_resolution as i64)
            .arg(params.meters_per_pixel)
            .arg(params.terrain_texture_resolution as i64)
            .arg(params.use_terrain);

        let reply = self.host.call(request.clone())?;
        let code = reply
            .as_int()
            .map(LevelCreateCode::from_code)
            .ok_or_else(|| HarnessError::unexpected_reply(&request, &reply))?;

        let created = code == LevelCreateCode::Created;
        match code {
            LevelCreateCode::Created => info!("Level '{}' created", params.name),
            LevelCreateCode::AlreadyExists => {
                warn!("Level '{}' already exists", params.name)
            }
            LevelCreateCode::InvalidParameters => {
                warn!("Level '{}' rejected: invalid parameters {:?}", params.name, params)
            }
            LevelCreateCode::Other(c) => {
                warn!("Level '{}' creation failed with code {}", params.name, c)
            }
        }

        if let Some(camera) = self.camera {
            self.set_camera(camera);
        }

        Ok(created)
    }

    /// Fire-and-forget: failures are logged, never returned
    pub fn set_camera(&self, camera: CameraPose) {
        let position = Request::new(GENERAL, SET_CURRENT_VIEW_POSITION).with_args(vec![
            Value::from(camera.position.x),
            Value::from(camera.position.y),
            Value::from(camera.position.z),
        ]);
        let rotation = Request::new(GENERAL, SET_CURRENT_VIEW_ROTATION).with_args(vec![
            Value::from(camera.rotation.x),
            Value::from(camera.rotation.y),
            Value::from(camera.rotation.z),
        ]);

        for request in [position, rotation] {
            if let Err(e) = self.host.call(request.clone()) {
                debug!("{} ignored: {}", request, e);
            }
        }
    }
}
