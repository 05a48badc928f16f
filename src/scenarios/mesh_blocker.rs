//! Vegetation planted in a spawner area is blocked by a mesh blocker.
//!
//! Steps: create the level, a spawner, a surface to plant on and a blocker
//! entity with a cube mesh, then wait for the instance count inside the
//! spawner to settle at the expected value.

use bevy::math::Vec3;
use std::time::Duration;

use crate::constants::*;
use crate::controller::{FailureKind, Scenario, TestController};
use crate::dynveg;
use crate::error::HarnessResult;
use crate::host::Value;
use crate::level::{CameraPose, LevelParams};

pub struct MeshBlockerScenario {
    pub level: LevelParams,
    pub camera: CameraPose,
    pub position: Vec3,
    pub area_extents: Vec3,
    pub surface_extents: Vec3,
    pub descriptor_path: String,
    pub mesh_path: String,
    pub blocker_scale: f32,
    /// PurpleFlowers on a 10 x 10 surface minus the 2 m blocker cube
    pub expected_instances: usize,
    pub timeout: Duration,
}

impl Default for MeshBlockerScenario {
    fn default() -> Self {
        Self {
            level: LevelParams::new("mesh_blocker_level"),
            camera: CameraPose::new(
                Vec3::new(500.49, 498.69, 46.66),
                Vec3::new(-42.05, 0.0, -36.33),
            ),
            position: Vec3::new(512.0, 512.0, 32.0),
            area_extents: Vec3::splat(10.0),
            surface_extents: Vec3::new(10.0, 10.0, 1.0),
            descriptor_path: "Slices/PurpleFlower.dynamicslice".to_string(),
            mesh_path: "objects/_primitives/_box_1x1.azmodel".to_string(),
            blocker_scale: 2.0,
            expected_instances: 160,
            timeout: DEFAULT_CONDITION_TIMEOUT,
        }
    }
}

impl Scenario for MeshBlockerScenario {
    fn name(&self) -> &str {
        "MeshBlocker_InstancesBlockedByMesh"
    }

    fn level_name(&self) -> &str {
        &self.level.name
    }

    fn run(&self, controller: &mut TestController<'_>) -> HarnessResult<()> {
        controller.create_level(&self.level, &self.camera)?;

        let resolver = controller.resolver();
        let spawner = dynveg::create_vegetation_area(
            controller.builder(),
            &resolver,
            "Instance Spawner",
            self.position,
            self.area_extents,
            &self.descriptor_path,
        )?;
        dynveg::create_surface_entity(
            controller.builder(),
            "Surface Entity",
            self.position,
            self.surface_extents,
        )?;

        // The mesh component is added by type after creation
        let builder = controller.builder();
        let mut blocker =
            builder.create_entity("Blocker Entity", self.position, &[VEGETATION_LAYER_BLOCKER_MESH])?;
        builder.add_component_by_name(&mut blocker, MESH)?;

        let cube = resolver.resolve_with(&self.mesh_path, false);
        let bound = controller.builder().get_set_test(
            &blocker,
            1,
            MESH_ASSET_PATH,
            Value::Asset(cube.handle),
        )?;
        controller.expect_resolved(&cube);
        controller.check("blocker mesh asset set", bound);
        controller
            .builder()
            .set_local_uniform_scale(&blocker, self.blocker_scale)?;
        controller.scene_populated();

        let host = controller.host();
        let expected = self.expected_instances;
        let poller = *controller.poller();
        let counted = poller.wait_for_condition_guarded(
            || dynveg::validate_instance_count_in_entity_shape(host, &spawner, expected),
            self.timeout,
        );
        let found = dynveg::instance_count_in_entity_shape(host, &spawner).ok();
        controller.record(
            "instance count in spawner shape",
            counted,
            Some(FailureKind::Timeout),
            format!("found {:?}, expected {}", found, expected),
        );
        controller.verified();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Stage, run_scenario};
    use crate::settings::HarnessSettings;
    use crate::sim::{SimConfig, SimHost};

    fn settings() -> HarnessSettings {
        HarnessSettings {
            poll_interval_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_mesh_blocker_scenario_passes() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let report = run_scenario(&host, &MeshBlockerScenario::default(), &settings());
        assert!(report.passed, "{:#?}", report.steps);
        assert_eq!(report.stage, Stage::Passed);
        assert!(report.steps.iter().any(|s| s.name == "instance count in spawner shape"));
    }

    #[test]
    fn test_wrong_expectation_fails_after_timeout() {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        let scenario = MeshBlockerScenario {
            expected_instances: 150,
            timeout: Duration::from_millis(300),
            ..Default::default()
        };
        let report = run_scenario(&host, &scenario, &settings());
        assert!(!report.passed);
        assert!(report.aborted.is_none());
        let last = report.steps.last().unwrap();
        assert!(last.detail.contains("found Some(160)"), "{}", last.detail);
    }

    #[test]
    fn test_level_collision_fails_but_run_completes() {
        let mut config = SimConfig::for_tests();
        config.existing_levels.push("mesh_blocker_level".to_string());
        let host = SimHost::spawn(config).unwrap();
        let report = run_scenario(&host, &MeshBlockerScenario::default(), &settings());
        assert!(!report.passed);
        // No level is open, so entity creation aborts the run
        assert!(report.aborted.is_some());
    }
}
