//! Dynamic vegetation - spawner planning and incremental placement
//!
//! A rebuild starts once the scene has been quiet for `settle_ticks` ticks
//! after its last edit. The planned instances then fill in a few per tick,
//! so a count observed mid-fill is lower than the final one.

use bevy::log::debug;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::catalog::{AssetCatalog, AssetKind};
use super::components::{ComponentKind, EditorComponents, Placement, SceneEntity};
use super::scene::{SceneRevision, SimClock, SimSettings};
use crate::constants::*;
use crate::host::{Aabb, EntityId};

#[derive(Resource, Debug, Default)]
pub struct VegetationState {
    /// Last scene revision seen by `detect_scene_edits`
    pub seen_revision: u64,
    /// Revision the current instance set was planned from
    pub built_revision: u64,
    /// Tick of the most recent unbuilt edit
    pub dirty_since: Option<u64>,
    pub pending: Vec<Vec3>,
    pub instances: Vec<Vec3>,
}

impl VegetationState {
    pub fn is_settled(&self) -> bool {
        self.dirty_since.is_none() && self.pending.is_empty()
    }

    pub fn count_in(&self, aabb: &Aabb) -> usize {
        self.instances.iter().filter(|p| aabb.contains(**p)).count()
    }
}

/// Number of placed instances inside `aabb`
pub fn instance_count_in(world: &World, aabb: &Aabb) -> usize {
    world
        .get_resource::<VegetationState>()
        .map(|state| state.count_in(aabb))
        .unwrap_or(0)
}

pub fn detect_scene_edits(
    revision: Res<SceneRevision>,
    clock: Res<SimClock>,
    mut state: ResMut<VegetationState>,
) {
    if revision.0 != state.seen_revision {
        state.seen_revision = revision.0;
        state.dirty_since = Some(clock.tick);
    }
}

pub fn rebuild_vegetation(
    clock: Res<SimClock>,
    settings: Res<SimSettings>,
    catalog: Res<AssetCatalog>,
    scene: Query<(&SceneEntity, &Placement, &EditorComponents)>,
    mut state: ResMut<VegetationState>,
) {
    let Some(since) = state.dirty_since else {
        return;
    };
    if clock.tick.saturating_sub(since) < settings.settle_ticks {
        return;
    }

    let entities: Vec<_> = scene.iter().collect();
    let mut planned = plan_instances(&entities, &catalog, settings.seed);
    debug!(
        "vegetation rebuild at tick {}: {} instances planned (revision {})",
        clock.tick,
        planned.len(),
        state.seen_revision
    );

    // Placed from the back, so reverse to keep plan order
    planned.reverse();
    state.instances.clear();
    state.pending = planned;
    state.built_revision = state.seen_revision;
    state.dirty_since = None;
}

pub fn place_instances(settings: Res<SimSettings>, mut state: ResMut<VegetationState>) {
    for _ in 0..settings.instances_per_tick {
        let Some(point) = state.pending.pop() else {
            break;
        };
        state.instances.push(point);
    }
}

struct Spawner {
    id: EntityId,
    bounds: Aabb,
    density: f32,
    jitter: f32,
}

/// Plan instance positions for every spawner in the scene.
///
/// Spawners are visited in id order so the plan does not depend on ECS
/// iteration order.
pub fn plan_instances(
    entities: &[(&SceneEntity, &Placement, &EditorComponents)],
    catalog: &AssetCatalog,
    seed: u64,
) -> Vec<Vec3> {
    let mut spawners: Vec<Spawner> = entities
        .iter()
        .filter_map(|(entity, placement, components)| spawner(entity, placement, components, catalog))
        .collect();
    spawners.sort_by_key(|s| s.id);

    let surfaces: Vec<Aabb> = entities
        .iter()
        .filter(|(_, _, c)| c.has(ComponentKind::ShapeSurfaceTagEmitter))
        .filter_map(|(_, placement, c)| {
            c.box_extents(placement)
                .map(|extents| Aabb::from_center_extents(placement.translation, extents))
        })
        .collect();

    let blockers: Vec<Aabb> = entities
        .iter()
        .filter_map(|(_, placement, c)| blocker_bounds(placement, c, catalog))
        .collect();

    let mut instances = Vec::new();
    for spawner in &spawners {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(spawner.id.0));
        let extents = spawner.bounds.extents();
        let nx = (extents.x * spawner.density).round() as usize;
        let ny = (extents.y * spawner.density).round() as usize;
        if nx == 0 || ny == 0 {
            continue;
        }
        let cell = Vec2::new(extents.x / nx as f32, extents.y / ny as f32);

        for j in 0..ny {
            for i in 0..nx {
                let mut xy = Vec2::new(
                    spawner.bounds.min.x + (i as f32 + 0.5) * cell.x,
                    spawner.bounds.min.y + (j as f32 + 0.5) * cell.y,
                );
                if spawner.jitter > 0.0 {
                    xy.x += rng.gen_range(-0.5..0.5) * spawner.jitter * cell.x;
                    xy.y += rng.gen_range(-0.5..0.5) * spawner.jitter * cell.y;
                }

                let Some(z) = surface_height(&surfaces, xy) else {
                    continue;
                };
                let point = xy.extend(z);
                if !spawner.bounds.contains(point) {
                    continue;
                }
                if blockers.iter().any(|b| b.contains(point)) {
                    continue;
                }
                instances.push(point);
            }
        }
    }
    instances
}

fn spawner(
    entity: &SceneEntity,
    placement: &Placement,
    components: &EditorComponents,
    catalog: &AssetCatalog,
) -> Option<Spawner> {
    if !components.has(ComponentKind::VegetationLayerSpawner) {
        return None;
    }
    let extents = components.box_extents(placement)?;
    let descriptor = components
        .first(ComponentKind::VegetationAssetList)?
        .asset(DESCRIPTOR_ASSET_PATH)?;
    match catalog.get(descriptor)? {
        AssetKind::Descriptor { density, jitter } => Some(Spawner {
            id: entity.id,
            bounds: Aabb::from_center_extents(placement.translation, extents),
            density: *density,
            jitter: *jitter,
        }),
        AssetKind::Model { .. } => None,
    }
}

/// Highest surface top covering `xy`
fn surface_height(surfaces: &[Aabb], xy: Vec2) -> Option<f32> {
    surfaces
        .iter()
        .filter(|s| xy.x >= s.min.x && xy.x <= s.max.x && xy.y >= s.min.y && xy.y <= s.max.y)
        .map(|s| s.max.z)
        .reduce(f32::max)
}

/// Blocking volume of a mesh blocker. A null or non-model mesh asset
/// blocks nothing.
fn blocker_bounds(
    placement: &Placement,
    components: &EditorComponents,
    catalog: &AssetCatalog,
) -> Option<Aabb> {
    let blocker = components.first(ComponentKind::VegetationLayerBlockerMesh)?;
    let mesh = components
        .first(ComponentKind::Mesh)?
        .asset(MESH_ASSET_PATH)?;
    if mesh.is_null() {
        return None;
    }
    let AssetKind::Model { extents } = catalog.get(mesh)? else {
        return None;
    };

    let mut bounds = Aabb::from_center_extents(
        placement.translation,
        Vec3::from_array(*extents) * placement.uniform_scale,
    );
    let height = bounds.max.z - bounds.min.z;
    let low = blocker.float(BLOCKER_HEIGHT_MIN_PATH).unwrap_or(0.0) as f32;
    let high = blocker.float(BLOCKER_HEIGHT_MAX_PATH).unwrap_or(1.0) as f32;
    let base = bounds.min.z;
    bounds.min.z = base + height * low.min(high);
    bounds.max.z = base + height * high.max(low);
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AssetHandle, ComponentId, PropertyPath, Value};
    use crate::sim::catalog::default_entries;
    use crate::sim::components::EditorComponent;

    struct Fixture {
        catalog: AssetCatalog,
        entities: Vec<(SceneEntity, Placement, EditorComponents)>,
        next_component: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: AssetCatalog::from_entries(&default_entries()),
                entities: Vec::new(),
                next_component: 0,
            }
        }

        fn add(&mut self, position: Vec3, scale: f32, kinds: &[ComponentKind]) -> usize {
            let components = kinds
                .iter()
                .map(|kind| {
                    self.next_component += 1;
                    EditorComponent::new(ComponentId(self.next_component), *kind)
                })
                .collect();
            let id = EntityId(self.entities.len() as u64 + 1);
            let mut placement = Placement::at(position);
            placement.uniform_scale = scale;
            self.entities.push((
                SceneEntity {
                    id,
                    name: format!("entity{}", id.0),
                },
                placement,
                EditorComponents(components),
            ));
            self.entities.len() - 1
        }

        fn set(&mut self, index: usize, kind: ComponentKind, path: &str, value: Value) {
            let components = &mut self.entities[index].2;
            let component = components
                .0
                .iter_mut()
                .find(|c| c.kind == kind)
                .unwrap();
            component.set(&PropertyPath::parse(path), value).unwrap();
        }

        fn asset(&self, path: &str) -> AssetHandle {
            self.catalog.lookup(path, true)
        }

        fn plan(&self) -> Vec<Vec3> {
            let refs: Vec<_> = self.entities.iter().map(|(e, p, c)| (e, p, c)).collect();
            plan_instances(&refs, &self.catalog, 0)
        }
    }

    fn flower_field() -> Fixture {
        let mut fixture = Fixture::new();
        let center = Vec3::new(512.0, 512.0, 32.0);
        let spawner = fixture.add(
            center,
            1.0,
            &[
                ComponentKind::VegetationLayerSpawner,
                ComponentKind::VegetationAssetList,
                ComponentKind::BoxShape,
            ],
        );
        fixture.set(spawner, ComponentKind::BoxShape, BOX_DIMENSIONS_PATH, Value::Vector3(Vec3::splat(10.0)));
        let flower = fixture.asset("slices/purpleflower.dynamicslice");
        fixture.set(spawner, ComponentKind::VegetationAssetList, DESCRIPTOR_ASSET_PATH, Value::Asset(flower));

        let surface = fixture.add(center, 1.0, &[ComponentKind::BoxShape, ComponentKind::ShapeSurfaceTagEmitter]);
        fixture.set(surface, ComponentKind::BoxShape, BOX_DIMENSIONS_PATH, Value::Vector3(Vec3::new(10.0, 10.0, 1.0)));
        fixture
    }

    fn add_blocker(fixture: &mut Fixture, mesh: AssetHandle) {
        let blocker = fixture.add(
            Vec3::new(512.0, 512.0, 32.0),
            2.0,
            &[ComponentKind::VegetationLayerBlockerMesh, ComponentKind::Mesh],
        );
        fixture.set(blocker, ComponentKind::Mesh, MESH_ASSET_PATH, Value::Asset(mesh));
    }

    #[test]
    fn test_grid_fills_surface() {
        let fixture = flower_field();
        let instances = fixture.plan();
        assert_eq!(instances.len(), 169);
        assert!(instances.iter().all(|p| (p.z - 32.5).abs() < 1e-4));
    }

    #[test]
    fn test_mesh_blocker_removes_covered_points() {
        let mut fixture = flower_field();
        let cube = fixture.asset("objects/_primitives/_box_1x1.azmodel");
        add_blocker(&mut fixture, cube);
        assert_eq!(fixture.plan().len(), 160);
    }

    #[test]
    fn test_null_mesh_blocks_nothing() {
        let mut fixture = flower_field();
        add_blocker(&mut fixture, AssetHandle::NULL);
        assert_eq!(fixture.plan().len(), 169);
    }

    #[test]
    fn test_blocker_height_range_above_surface() {
        let mut fixture = flower_field();
        let cube = fixture.asset("objects/_primitives/_box_1x1.azmodel");
        add_blocker(&mut fixture, cube);
        let blocker = fixture.entities.len() - 1;
        // Cube spans z 31..33; only its top quarter blocks, which is above 32.5
        fixture.set(
            blocker,
            ComponentKind::VegetationLayerBlockerMesh,
            BLOCKER_HEIGHT_MIN_PATH,
            Value::Float(0.8),
        );
        assert_eq!(fixture.plan().len(), 169);
    }

    #[test]
    fn test_no_surface_no_instances() {
        let mut fixture = flower_field();
        fixture.entities.truncate(1);
        assert!(fixture.plan().is_empty());
    }

    #[test]
    fn test_missing_descriptor_plants_nothing() {
        let mut fixture = flower_field();
        fixture.set(0, ComponentKind::VegetationAssetList, DESCRIPTOR_ASSET_PATH, Value::Asset(AssetHandle::NULL));
        assert!(fixture.plan().is_empty());
    }

    #[test]
    fn test_count_in_aabb() {
        let state = VegetationState {
            instances: vec![Vec3::ZERO, Vec3::splat(1.0), Vec3::splat(5.0)],
            ..Default::default()
        };
        let aabb = Aabb::from_center_extents(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(state.count_in(&aabb), 2);
    }
}
