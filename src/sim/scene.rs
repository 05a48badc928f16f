//! Scene state of the simulated editor and the request handlers that
//! mutate it

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use super::catalog::AssetCatalog;
use super::components::{ComponentKind, EditorComponent, EditorComponents, Placement, SceneEntity};
use super::vegetation;
use crate::host::requests::*;
use crate::host::{Aabb, ComponentId, EntityId, HostError, PropertyPath, Request, Target, Value};

/// Host-side limits, copied from the sim config at startup
#[derive(Resource, Debug, Clone)]
pub struct SimSettings {
    pub settle_ticks: u64,
    pub instances_per_tick: usize,
    pub max_entities: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenLevel {
    pub name: String,
    pub heightmap_resolution: u32,
    pub meters_per_pixel: f32,
    pub terrain_texture_resolution: u32,
    pub use_terrain: bool,
}

/// Level names ever created on this host, and the one that is open
#[derive(Resource, Debug, Default)]
pub struct LevelRegistry {
    pub known: HashSet<String>,
    pub current: Option<OpenLevel>,
}

#[derive(Resource, Debug, Default)]
pub struct ViewCamera {
    pub position: Vec3,
    pub rotation: Vec3,
}

/// Maps opaque handles to ECS entities
#[derive(Resource, Debug, Default)]
pub struct SceneIndex {
    entities: HashMap<EntityId, Entity>,
    components: HashMap<ComponentId, EntityId>,
    next_entity: u64,
    next_component: u64,
}

impl SceneIndex {
    fn allocate_entity(&mut self) -> EntityId {
        self.next_entity += 1;
        EntityId(self.next_entity)
    }

    fn allocate_component(&mut self, owner: EntityId) -> ComponentId {
        self.next_component += 1;
        let id = ComponentId(self.next_component);
        self.components.insert(id, owner);
        id
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Bumped by every scene edit; vegetation rebuilds key off it
#[derive(Resource, Debug, Default)]
pub struct SceneRevision(pub u64);

#[derive(Resource, Debug, Default)]
pub struct SimClock {
    pub tick: u64,
}

pub fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.tick += 1;
}

fn touch(world: &mut World) {
    world.resource_mut::<SceneRevision>().0 += 1;
}

fn arg_str(request: &Request, index: usize) -> Result<String, HostError> {
    request
        .get(index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| bad_arg(request, index, "string"))
}

fn arg_float(request: &Request, index: usize) -> Result<f64, HostError> {
    request
        .get(index)?
        .as_float()
        .ok_or_else(|| bad_arg(request, index, "number"))
}

fn arg_int(request: &Request, index: usize) -> Result<i64, HostError> {
    request
        .get(index)?
        .as_int()
        .ok_or_else(|| bad_arg(request, index, "int"))
}

fn arg_bool(request: &Request, index: usize) -> Result<bool, HostError> {
    request
        .get(index)?
        .as_bool()
        .ok_or_else(|| bad_arg(request, index, "bool"))
}

fn arg_vec3(request: &Request, index: usize) -> Result<Vec3, HostError> {
    request
        .get(index)?
        .as_vector3()
        .ok_or_else(|| bad_arg(request, index, "vector3"))
}

fn arg_list(request: &Request, index: usize) -> Result<&[Value], HostError> {
    request
        .get(index)?
        .as_list()
        .ok_or_else(|| bad_arg(request, index, "list"))
}

fn bad_arg(request: &Request, index: usize, expected: &str) -> HostError {
    HostError::BadArguments(format!(
        "{} argument #{} must be {}",
        request, index, expected
    ))
}

/// Route one request to its handler
pub fn dispatch(world: &mut World, target: Target, request: &Request) -> Result<Value, HostError> {
    match (target, request.bus, request.method) {
        (Target::Direct, GENERAL, CREATE_LEVEL_NO_PROMPT) => create_level(world, request),
        (Target::Direct, GENERAL, SET_CURRENT_VIEW_POSITION) => {
            let position = floats3(request)?;
            world.resource_mut::<ViewCamera>().position = position;
            Ok(Value::None)
        }
        (Target::Direct, GENERAL, SET_CURRENT_VIEW_ROTATION) => {
            let rotation = floats3(request)?;
            world.resource_mut::<ViewCamera>().rotation = rotation;
            Ok(Value::None)
        }
        (Target::Direct, GENERAL, GET_CURRENT_VIEW_POSITION) => {
            Ok(Value::Vector3(world.resource::<ViewCamera>().position))
        }
        (Target::Direct, GENERAL, GET_CURRENT_VIEW_ROTATION) => {
            Ok(Value::Vector3(world.resource::<ViewCamera>().rotation))
        }
        (Target::Direct, GENERAL, GET_CURRENT_LEVEL_NAME) => Ok(Value::String(
            world
                .resource::<LevelRegistry>()
                .current
                .as_ref()
                .map(|l| l.name.clone())
                .unwrap_or_default(),
        )),
        (Target::Direct, DYNVEG, GET_INSTANCE_COUNT_IN_AABB) => {
            let aabb = request
                .get(0)?
                .as_aabb()
                .ok_or_else(|| bad_arg(request, 0, "aabb"))?;
            Ok(Value::Int(vegetation::instance_count_in(world, &aabb) as i64))
        }
        (Target::Broadcast, ASSET_CATALOG_BUS, GET_ASSET_ID_BY_PATH) => {
            let path = arg_str(request, 0)?;
            let exact_match = arg_bool(request, 2)?;
            Ok(Value::Asset(
                world.resource::<AssetCatalog>().lookup(&path, exact_match),
            ))
        }
        (Target::Broadcast, EDITOR_TOOLS_BUS, CREATE_NEW_ENTITY_AT_POSITION) => {
            create_entity(world, request)
        }
        (Target::Broadcast, EDITOR_COMPONENT_API_BUS, FIND_COMPONENT_TYPE_IDS) => {
            let names = arg_list(request, 0)?;
            Ok(Value::List(
                names
                    .iter()
                    .map(|n| {
                        n.as_str()
                            .and_then(ComponentKind::from_name)
                            .map(|k| Value::TypeId(k.type_id()))
                            .unwrap_or(Value::None)
                    })
                    .collect(),
            ))
        }
        (Target::Entity(id), EDITOR_COMPONENT_API_BUS, ADD_COMPONENTS_OF_TYPE) => {
            add_components(world, id, request)
        }
        (Target::Component(id), EDITOR_COMPONENT_API_BUS, SET_COMPONENT_PROPERTY) => {
            let path = PropertyPath::parse(&arg_str(request, 0)?);
            let value = request.get(1)?.clone();
            let mut component = component_mut(world, id)?;
            component.set(&path, value)?;
            touch(world);
            Ok(Value::None)
        }
        (Target::Component(id), EDITOR_COMPONENT_API_BUS, GET_COMPONENT_PROPERTY) => {
            let path = PropertyPath::parse(&arg_str(request, 0)?);
            let entity = component_owner(world, id)?;
            world
                .get::<EditorComponents>(entity)
                .and_then(|c| c.by_id(id))
                .ok_or(HostError::UnknownComponent(id))?
                .get(&path)
                .cloned()
        }
        (Target::Entity(id), EDITOR_ENTITY_API_BUS, SET_NAME) => {
            let name = arg_str(request, 0)?;
            let entity = lookup(world, id)?;
            if let Some(mut scene_entity) = world.get_mut::<SceneEntity>(entity) {
                scene_entity.name = name;
            }
            Ok(Value::None)
        }
        (Target::Entity(id), EDITOR_ENTITY_API_BUS, GET_NAME) => {
            let entity = lookup(world, id)?;
            Ok(Value::String(
                world
                    .get::<SceneEntity>(entity)
                    .map(|e| e.name.clone())
                    .unwrap_or_default(),
            ))
        }
        (Target::Entity(id), TRANSFORM_BUS, SET_LOCAL_UNIFORM_SCALE) => {
            let scale = arg_float(request, 0)? as f32;
            if !(scale.is_finite() && scale > 0.0) {
                return Err(HostError::BadArguments(format!(
                    "uniform scale must be positive, got {}",
                    scale
                )));
            }
            let entity = lookup(world, id)?;
            if let Some(mut placement) = world.get_mut::<Placement>(entity) {
                placement.uniform_scale = scale;
            }
            touch(world);
            Ok(Value::None)
        }
        (Target::Entity(id), TRANSFORM_BUS, GET_LOCAL_UNIFORM_SCALE) => {
            let placement = placement_of(world, id)?;
            Ok(Value::Float(placement.uniform_scale as f64))
        }
        (Target::Entity(id), TRANSFORM_BUS, GET_WORLD_TRANSLATION) => {
            let placement = placement_of(world, id)?;
            Ok(Value::Vector3(placement.translation))
        }
        (Target::Entity(id), SHAPE_BUS, GET_ENCOMPASSING_AABB) => {
            let entity = lookup(world, id)?;
            let placement = placement_of(world, id)?;
            let extents = world
                .get::<EditorComponents>(entity)
                .and_then(|c| c.box_extents(&placement))
                .ok_or_else(|| HostError::Rejected(format!("entity {} has no shape", id)))?;
            Ok(Value::Aabb(Aabb::from_center_extents(
                placement.translation,
                extents,
            )))
        }
        (_, bus, method) => Err(HostError::UnknownRequest {
            bus: bus.to_string(),
            method: method.to_string(),
        }),
    }
}

fn floats3(request: &Request) -> Result<Vec3, HostError> {
    Ok(Vec3::new(
        arg_float(request, 0)? as f32,
        arg_float(request, 1)? as f32,
        arg_float(request, 2)? as f32,
    ))
}

fn lookup(world: &World, id: EntityId) -> Result<Entity, HostError> {
    world
        .resource::<SceneIndex>()
        .entities
        .get(&id)
        .copied()
        .ok_or(HostError::UnknownEntity(id))
}

fn placement_of(world: &World, id: EntityId) -> Result<Placement, HostError> {
    let entity = lookup(world, id)?;
    world
        .get::<Placement>(entity)
        .copied()
        .ok_or(HostError::UnknownEntity(id))
}

fn component_owner(world: &World, id: ComponentId) -> Result<Entity, HostError> {
    let owner = world
        .resource::<SceneIndex>()
        .components
        .get(&id)
        .copied()
        .ok_or(HostError::UnknownComponent(id))?;
    lookup(world, owner)
}

fn component_mut(world: &mut World, id: ComponentId) -> Result<Mut<'_, EditorComponent>, HostError> {
    let entity = component_owner(world, id)?;
    let components = world
        .get_mut::<EditorComponents>(entity)
        .ok_or(HostError::UnknownComponent(id))?;
    components
        .filter_map_unchanged(|c| c.by_id_mut(id))
        .ok_or(HostError::UnknownComponent(id))
}

fn valid_level_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn create_level(world: &mut World, request: &Request) -> Result<Value, HostError> {
    let name = arg_str(request, 0)?;
    let heightmap_resolution = arg_int(request, 1)?;
    let meters_per_pixel = arg_float(request, 2)? as f32;
    let terrain_texture_resolution = arg_int(request, 3)?;
    let use_terrain = arg_bool(request, 4)?;

    let valid = valid_level_name(&name)
        && (128..=8192).contains(&heightmap_resolution)
        && (heightmap_resolution as u64).is_power_of_two()
        && meters_per_pixel > 0.0
        && meters_per_pixel <= 64.0
        && (1..=16384).contains(&terrain_texture_resolution)
        && (terrain_texture_resolution as u64).is_power_of_two();
    if !valid {
        return Ok(Value::Int(2));
    }

    if world.resource::<LevelRegistry>().known.contains(&name) {
        return Ok(Value::Int(1));
    }

    close_level(world);

    let mut registry = world.resource_mut::<LevelRegistry>();
    registry.known.insert(name.clone());
    registry.current = Some(OpenLevel {
        name,
        heightmap_resolution: heightmap_resolution as u32,
        meters_per_pixel,
        terrain_texture_resolution: terrain_texture_resolution as u32,
        use_terrain,
    });
    touch(world);
    Ok(Value::Int(0))
}

/// Despawn every scene entity of the open level
fn close_level(world: &mut World) {
    let entities: Vec<Entity> = world
        .resource_mut::<SceneIndex>()
        .entities
        .drain()
        .map(|(_, e)| e)
        .collect();
    world.resource_mut::<SceneIndex>().components.clear();
    for entity in entities {
        world.despawn(entity);
    }
    world.resource_mut::<LevelRegistry>().current = None;
}

fn create_entity(world: &mut World, request: &Request) -> Result<Value, HostError> {
    let position = arg_vec3(request, 0)?;

    if world.resource::<LevelRegistry>().current.is_none() {
        return Err(HostError::Rejected("no level is open".to_string()));
    }
    let max_entities = world.resource::<SimSettings>().max_entities;
    if world.resource::<SceneIndex>().entity_count() >= max_entities {
        return Err(HostError::Rejected(format!(
            "entity limit of {} reached",
            max_entities
        )));
    }

    let id = world.resource_mut::<SceneIndex>().allocate_entity();
    let entity = world
        .spawn((
            SceneEntity {
                id,
                name: format!("Entity{}", id.0),
            },
            Placement::at(position),
            EditorComponents::default(),
        ))
        .id();
    world.resource_mut::<SceneIndex>().entities.insert(id, entity);
    touch(world);
    Ok(Value::Entity(id))
}

fn add_components(world: &mut World, id: EntityId, request: &Request) -> Result<Value, HostError> {
    let entity = lookup(world, id)?;

    let mut kinds = Vec::new();
    for value in arg_list(request, 0)? {
        let kind = match value {
            Value::TypeId(type_id) => ComponentKind::from_type_id(*type_id).ok_or_else(|| {
                HostError::Rejected(format!("unknown component type {:?}", type_id))
            })?,
            other => {
                return Err(HostError::BadArguments(format!(
                    "expected type ids, got {}",
                    other.kind()
                )));
            }
        };
        kinds.push(kind);
    }

    let existing = world
        .get::<EditorComponents>(entity)
        .ok_or(HostError::UnknownEntity(id))?;
    for (i, kind) in kinds.iter().enumerate() {
        if existing.has(*kind) || kinds[..i].contains(kind) {
            return Err(HostError::Rejected(format!(
                "entity {} already has a {} component",
                id,
                kind.name()
            )));
        }
    }

    let mut added = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let component_id = world.resource_mut::<SceneIndex>().allocate_component(id);
        if let Some(mut components) = world.get_mut::<EditorComponents>(entity) {
            components.0.push(EditorComponent::new(component_id, kind));
        }
        added.push(Value::Component(component_id));
    }
    touch(world);
    Ok(Value::List(added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimulatedEditor};

    fn editor_with_level() -> SimulatedEditor {
        let mut editor = SimulatedEditor::new(&SimConfig::for_tests());
        let reply = editor
            .handle(
                Target::Direct,
                &Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
                    .arg("scene_tests")
                    .arg(1024_i64)
                    .arg(1.0_f32)
                    .arg(4096_i64)
                    .arg(false),
            )
            .unwrap();
        assert_eq!(reply, Value::Int(0));
        editor
    }

    fn spawn(editor: &mut SimulatedEditor) -> EntityId {
        editor
            .handle(
                Target::Broadcast,
                &Request::new(EDITOR_TOOLS_BUS, CREATE_NEW_ENTITY_AT_POSITION)
                    .arg(Vec3::new(1.0, 2.0, 3.0))
                    .arg(Value::Entity(EntityId::INVALID)),
            )
            .unwrap()
            .as_entity()
            .unwrap()
    }

    #[test]
    fn test_unknown_request() {
        let mut editor = SimulatedEditor::new(&SimConfig::for_tests());
        let result = editor.handle(Target::Broadcast, &Request::new("NoSuchBus", "Frobnicate"));
        assert!(matches!(result, Err(HostError::UnknownRequest { .. })));
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut editor = editor_with_level();
        let id = spawn(&mut editor);
        let add = Request::new(EDITOR_COMPONENT_API_BUS, ADD_COMPONENTS_OF_TYPE)
            .arg(Value::List(vec![Value::TypeId(ComponentKind::Mesh.type_id())]));

        assert!(editor.handle(Target::Entity(id), &add).is_ok());
        assert!(matches!(
            editor.handle(Target::Entity(id), &add),
            Err(HostError::Rejected(_))
        ));
    }

    #[test]
    fn test_entity_limit() {
        let mut config = SimConfig::for_tests();
        config.max_entities = 1;
        let mut editor = SimulatedEditor::new(&config);
        editor
            .handle(
                Target::Direct,
                &Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
                    .arg("limit")
                    .arg(1024_i64)
                    .arg(1.0_f32)
                    .arg(4096_i64)
                    .arg(false),
            )
            .unwrap();

        spawn(&mut editor);
        let second = editor.handle(
            Target::Broadcast,
            &Request::new(EDITOR_TOOLS_BUS, CREATE_NEW_ENTITY_AT_POSITION)
                .arg(Vec3::ZERO)
                .arg(Value::Entity(EntityId::INVALID)),
        );
        assert!(matches!(second, Err(HostError::Rejected(_))));
    }

    #[test]
    fn test_new_level_clears_scene() {
        let mut editor = editor_with_level();
        let id = spawn(&mut editor);
        editor
            .handle(
                Target::Direct,
                &Request::new(GENERAL, CREATE_LEVEL_NO_PROMPT)
                    .arg("second")
                    .arg(1024_i64)
                    .arg(1.0_f32)
                    .arg(4096_i64)
                    .arg(false),
            )
            .unwrap();

        let name = editor.handle(Target::Entity(id), &Request::new(EDITOR_ENTITY_API_BUS, GET_NAME));
        assert!(matches!(name, Err(HostError::UnknownEntity(_))));
        let level = editor
            .handle(Target::Direct, &Request::new(GENERAL, GET_CURRENT_LEVEL_NAME))
            .unwrap();
        assert_eq!(level, Value::String("second".to_string()));
    }

    #[test]
    fn test_shape_aabb_requires_box() {
        let mut editor = editor_with_level();
        let id = spawn(&mut editor);
        let aabb = editor.handle(Target::Entity(id), &Request::new(SHAPE_BUS, GET_ENCOMPASSING_AABB));
        assert!(matches!(aabb, Err(HostError::Rejected(_))));
    }

    #[test]
    fn test_nonpositive_scale_rejected() {
        let mut editor = editor_with_level();
        let id = spawn(&mut editor);
        let result = editor.handle(
            Target::Entity(id),
            &Request::new(TRANSFORM_BUS, SET_LOCAL_UNIFORM_SCALE).arg(0.0_f32),
        );
        assert!(matches!(result, Err(HostError::BadArguments(_))));
    }
}
