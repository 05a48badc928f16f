//! Dynamic vegetation scene helpers
//!
//! Shorthands for the entity shapes the vegetation scenarios build: spawner
//! areas, planting surfaces and mesh blockers.

use bevy::log::{info, warn};
use bevy::math::Vec3;

use crate::assets::AssetResolver;
use crate::constants::*;
use crate::entity::{EditorEntity, EntityBuilder};
use crate::error::{HarnessError, HarnessResult};
use crate::host::requests::{DYNVEG, GET_INSTANCE_COUNT_IN_AABB};
use crate::host::{HostClient, Request, Value};

/// A spawner covering a box of `extents`, planting `descriptor_path`
pub fn create_vegetation_area(
    builder: &mut EntityBuilder<'_>,
    resolver: &AssetResolver<'_>,
    name: &str,
    position: Vec3,
    extents: Vec3,
    descriptor_path: &str,
) -> HarnessResult<EditorEntity> {
    let entity = builder.create_entity(
        name,
        position,
        &[VEGETATION_LAYER_SPAWNER, VEGETATION_ASSET_LIST, BOX_SHAPE],
    )?;
    builder.set_property(&entity, BOX_DIMENSIONS_PATH, Value::Vector3(extents))?;

    let descriptor = resolver.resolve_asset_id(descriptor_path);
    if descriptor.is_null() {
        warn!("'{}' has no descriptor: '{}' did not resolve", name, descriptor_path);
    }
    builder.set_property(&entity, DESCRIPTOR_ASSET_PATH, Value::Asset(descriptor))?;
    Ok(entity)
}

/// A box that emits a surface tag for spawners to plant on
pub fn create_surface_entity(
    builder: &mut EntityBuilder<'_>,
    name: &str,
    position: Vec3,
    extents: Vec3,
) -> HarnessResult<EditorEntity> {
    let entity = builder.create_entity(name, position, &[BOX_SHAPE, SHAPE_SURFACE_TAG_EMITTER])?;
    builder.set_property(&entity, BOX_DIMENSIONS_PATH, Value::Vector3(extents))?;
    Ok(entity)
}

/// A mesh that keeps vegetation out of its bounds.
///
/// `mesh_path` may be a bare file name. An unresolved mesh path leaves the
/// mesh slot empty, which blocks nothing.
pub fn create_mesh_blocker(
    builder: &mut EntityBuilder<'_>,
    resolver: &AssetResolver<'_>,
    name: &str,
    position: Vec3,
    mesh_path: &str,
    uniform_scale: f32,
) -> HarnessResult<EditorEntity> {
    let entity = builder.create_entity(name, position, &[VEGETATION_LAYER_BLOCKER_MESH, MESH])?;
    let mesh = resolver.resolve_asset_id_with(mesh_path, false);
    builder.get_set_test(&entity, 1, MESH_ASSET_PATH, Value::Asset(mesh))?;
    builder.set_local_uniform_scale(&entity, uniform_scale)?;
    Ok(entity)
}

/// Instances currently placed inside `entity`'s shape bounds
pub fn instance_count_in_entity_shape(
    host: &dyn HostClient,
    entity: &EditorEntity,
) -> HarnessResult<usize> {
    let aabb = EntityBuilder::new(host).encompassing_aabb(entity)?;
    let request = Request::new(DYNVEG, GET_INSTANCE_COUNT_IN_AABB).arg(Value::Aabb(aabb));
    let reply = host.call(request.clone())?;
    match reply.as_int() {
        Some(count) if count >= 0 => Ok(count as usize),
        _ => Err(HarnessError::unexpected_reply(&request, &reply)),
    }
}

/// True when exactly `expected` instances sit inside `entity`'s shape
pub fn validate_instance_count_in_entity_shape(
    host: &dyn HostClient,
    entity: &EditorEntity,
    expected: usize,
) -> HarnessResult<bool> {
    let found = instance_count_in_entity_shape(host, entity)?;
    info!(
        "Vegetation instances in '{}': found {}, expected {}",
        entity.name, found, expected
    );
    Ok(found == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelParams, SceneBootstrap};
    use crate::poller::ConditionPoller;
    use crate::sim::{SimConfig, SimHost};
    use std::time::Duration;

    const CENTER: Vec3 = Vec3::new(512.0, 512.0, 32.0);

    fn host_with_level(name: &str) -> SimHost {
        let host = SimHost::spawn(SimConfig::for_tests()).unwrap();
        assert!(SceneBootstrap::new(&host).create_level(&LevelParams::new(name)).unwrap());
        host
    }

    fn settles_at(host: &SimHost, area: &EditorEntity, expected: usize) -> bool {
        ConditionPoller::new(Duration::from_millis(10)).wait_for_condition_guarded(
            || validate_instance_count_in_entity_shape(host, area, expected),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_area_on_surface_fills() {
        let host = host_with_level("dynveg_fill");
        let mut builder = EntityBuilder::new(&host);
        let resolver = AssetResolver::new(&host);

        let area = create_vegetation_area(
            &mut builder,
            &resolver,
            "Spawner",
            CENTER,
            Vec3::splat(10.0),
            "Slices/PurpleFlower.dynamicslice",
        )
        .unwrap();
        create_surface_entity(&mut builder, "Surface", CENTER, Vec3::new(10.0, 10.0, 1.0)).unwrap();

        assert!(settles_at(&host, &area, 169));
    }

    #[test]
    fn test_mesh_blocker_carves_out_instances() {
        let host = host_with_level("dynveg_blocker");
        let mut builder = EntityBuilder::new(&host);
        let resolver = AssetResolver::new(&host);

        let area = create_vegetation_area(
            &mut builder,
            &resolver,
            "Spawner",
            CENTER,
            Vec3::splat(10.0),
            "Slices/PurpleFlower.dynamicslice",
        )
        .unwrap();
        create_surface_entity(&mut builder, "Surface", CENTER, Vec3::new(10.0, 10.0, 1.0)).unwrap();
        let blocker = create_mesh_blocker(
            &mut builder,
            &resolver,
            "Blocker",
            CENTER,
            "objects/_primitives/_box_1x1.azmodel",
            2.0,
        )
        .unwrap();

        assert!(blocker.is_valid());
        assert_eq!(blocker.components().len(), 2);
        assert!(settles_at(&host, &area, 160));
    }

    #[test]
    fn test_unresolved_blocker_mesh_blocks_nothing() {
        let host = host_with_level("dynveg_unresolved");
        let mut builder = EntityBuilder::new(&host);
        let resolver = AssetResolver::new(&host);

        let area = create_vegetation_area(
            &mut builder,
            &resolver,
            "Spawner",
            CENTER,
            Vec3::splat(10.0),
            "slices/pinkflower.dynamicslice",
        )
        .unwrap();
        create_surface_entity(&mut builder, "Surface", CENTER, Vec3::new(10.0, 10.0, 1.0)).unwrap();
        create_mesh_blocker(&mut builder, &resolver, "Blocker", CENTER, "objects/missing.azmodel", 2.0)
            .unwrap();

        // pinkflower is 1 per meter: 10 x 10
        assert!(settles_at(&host, &area, 100));
    }

    #[test]
    fn test_count_needs_a_shape() {
        let host = host_with_level("dynveg_no_shape");
        let mut builder = EntityBuilder::new(&host);
        let bare = builder.create_entity("Bare", CENTER, &[MESH]).unwrap();
        assert!(instance_count_in_entity_shape(&host, &bare).is_err());
    }
}
