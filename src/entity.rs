//! Entity composition - create entities, attach components, set properties

use bevy::log::{debug, info};
use bevy::math::Vec3;
use std::collections::HashMap;

use crate::error::{CreationError, HarnessError, HarnessResult, PropertyError};
use crate::host::requests::*;
use crate::host::{
    Aabb, ComponentId, ComponentTypeId, EntityId, HostClient, HostError, PropertyPath, Request,
    Target, Value,
};

/// Harness-side view of one editor entity.
///
/// `id` stays [`EntityId::INVALID`] until creation succeeds. Components are
/// kept in attachment order.
#[derive(Debug, Clone)]
pub struct EditorEntity {
    pub name: String,
    id: EntityId,
    components: Vec<ComponentId>,
}

impl EditorEntity {
    /// A named handle that has not been created on the host yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: EntityId::INVALID,
            components: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    fn require_valid(&self) -> Result<EntityId, CreationError> {
        if self.is_valid() {
            Ok(self.id)
        } else {
            Err(CreationError::InvalidEntity {
                name: self.name.clone(),
            })
        }
    }

    fn component(&self, index: usize) -> Result<ComponentId, PropertyError> {
        self.components
            .get(index)
            .copied()
            .ok_or(PropertyError::NoSuchComponent {
                entity: self.id,
                index,
                count: self.components.len(),
            })
    }
}

fn property_error(entity: EntityId, path: &str, error: HostError) -> HarnessError {
    match error {
        HostError::UnknownPath(_) => PropertyError::UnresolvedPath {
            entity,
            path: PropertyPath::parse(path).to_string(),
        }
        .into(),
        HostError::TypeMismatch {
            path,
            expected,
            found,
        } => PropertyError::TypeMismatch {
            path,
            expected,
            found,
        }
        .into(),
        HostError::Rejected(reason) | HostError::BadArguments(reason) => PropertyError::Rejected {
            path: path.to_string(),
            reason,
        }
        .into(),
        other => HarnessError::Host(other),
    }
}

/// Builds entities through strict request/response calls.
///
/// Component kind names are resolved to type ids once per builder.
pub struct EntityBuilder<'h> {
    host: &'h dyn HostClient,
    type_ids: HashMap<String, ComponentTypeId>,
}

impl<'h> EntityBuilder<'h> {
    pub fn new(host: &'h dyn HostClient) -> Self {
        Self {
            host,
            type_ids: HashMap::new(),
        }
    }

    /// Create a new entity at `position` with components attached in order
    pub fn create_entity(
        &mut self,
        name: &str,
        position: Vec3,
        component_names: &[&str],
    ) -> HarnessResult<EditorEntity> {
        let mut entity = EditorEntity::new(name);
        self.spawn(&mut entity, position, component_names)?;
        Ok(entity)
    }

    /// Create `entity` on the host. On failure the handle stays invalid.
    pub fn spawn(
        &mut self,
        entity: &mut EditorEntity,
        position: Vec3,
        component_names: &[&str],
    ) -> HarnessResult<()> {
        let type_ids = self.component_type_ids(component_names)?;

        let request = Request::new(EDITOR_TOOLS_BUS, CREATE_NEW_ENTITY_AT_POSITION)
            .arg(position)
            .arg(Value::Entity(EntityId::INVALID));
        let id = match self.host.broadcast(request) {
            Ok(Value::Entity(id)) if id.is_valid() => id,
            Ok(other) => {
                return Err(CreationError::Rejected {
                    name: entity.name.clone(),
                    reason: format!("host returned {:?}", other),
                }
                .into());
            }
            Err(HostError::Rejected(reason)) => {
                return Err(CreationError::Rejected {
                    name: entity.name.clone(),
                    reason,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let mut created = EditorEntity {
            name: entity.name.clone(),
            id,
            components: Vec::new(),
        };
        self.host.event(
            Target::Entity(id),
            Request::new(EDITOR_ENTITY_API_BUS, SET_NAME).arg(created.name.as_str()),
        )?;

        for type_id in type_ids {
            self.add_component(&mut created, type_id)?;
        }

        // Only a fully built entity is handed back
        entity.id = created.id;
        entity.components = created.components;
        info!("'{}' created with id {}", entity.name, id);
        Ok(())
    }

    /// Resolve one component kind name to its type id
    pub fn component_type_id(&mut self, name: &str) -> HarnessResult<ComponentTypeId> {
        Ok(self.component_type_ids(&[name])?[0])
    }

    /// Resolve kind names, asking the host only for names not seen before
    pub fn component_type_ids(&mut self, names: &[&str]) -> HarnessResult<Vec<ComponentTypeId>> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !self.type_ids.contains_key(*n))
            .collect();

        if !missing.is_empty() {
            let request = Request::new(EDITOR_COMPONENT_API_BUS, FIND_COMPONENT_TYPE_IDS).arg(
                Value::List(missing.iter().map(|n| Value::from(*n)).collect()),
            );
            let reply = self.host.broadcast(request.clone())?;
            let ids = reply
                .as_list()
                .ok_or_else(|| HarnessError::unexpected_reply(&request, &reply))?;

            for (name, id) in missing.iter().zip(ids) {
                match id {
                    Value::TypeId(type_id) => {
                        self.type_ids.insert(name.to_string(), *type_id);
                    }
                    _ => return Err(CreationError::UnknownComponent(name.to_string()).into()),
                }
            }
        }

        names
            .iter()
            .map(|n| {
                self.type_ids
                    .get(*n)
                    .copied()
                    .ok_or_else(|| CreationError::UnknownComponent(n.to_string()).into())
            })
            .collect()
    }

    /// Attach one component of `type_id` to a valid entity
    pub fn add_component(
        &mut self,
        entity: &mut EditorEntity,
        type_id: ComponentTypeId,
    ) -> HarnessResult<ComponentId> {
        let id = entity.require_valid()?;
        let request = Request::new(EDITOR_COMPONENT_API_BUS, ADD_COMPONENTS_OF_TYPE)
            .arg(Value::List(vec![Value::TypeId(type_id)]));

        let reply = match self.host.event(Target::Entity(id), request) {
            Ok(reply) => reply,
            Err(HostError::Rejected(reason)) => {
                return Err(CreationError::Rejected {
                    name: entity.name.clone(),
                    reason,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let component = reply
            .as_list()
            .and_then(|ids| ids.first())
            .and_then(|v| match v {
                Value::Component(c) if c.is_valid() => Some(*c),
                _ => None,
            })
            .ok_or_else(|| CreationError::ComponentNotAdded {
                name: entity.name.clone(),
                type_id,
            })?;

        entity.components.push(component);
        debug!("'{}' attached component {:?}", entity.name, component);
        Ok(component)
    }

    pub fn add_component_by_name(
        &mut self,
        entity: &mut EditorEntity,
        name: &str,
    ) -> HarnessResult<ComponentId> {
        let type_id = self.component_type_id(name)?;
        self.add_component(entity, type_id)
    }

    /// Set `path` on the first attached component that has it
    pub fn set_property(
        &self,
        entity: &EditorEntity,
        path: &str,
        value: Value,
    ) -> HarnessResult<()> {
        let id = entity.require_valid()?;
        for &component in &entity.components {
            match self.send_set(component, path, value.clone()) {
                Ok(()) => return Ok(()),
                Err(HostError::UnknownPath(_)) => continue,
                Err(e) => return Err(property_error(id, path, e)),
            }
        }
        Err(PropertyError::UnresolvedPath {
            entity: id,
            path: PropertyPath::parse(path).to_string(),
        }
        .into())
    }

    /// Set `path` on the component at `index` (attachment order)
    pub fn set_component_property(
        &self,
        entity: &EditorEntity,
        index: usize,
        path: &str,
        value: Value,
    ) -> HarnessResult<()> {
        let id = entity.require_valid()?;
        let component = entity.component(index)?;
        self.send_set(component, path, value)
            .map_err(|e| property_error(id, path, e))
    }

    pub fn get_component_property(
        &self,
        entity: &EditorEntity,
        index: usize,
        path: &str,
    ) -> HarnessResult<Value> {
        let id = entity.require_valid()?;
        let component = entity.component(index)?;
        let request = Request::new(EDITOR_COMPONENT_API_BUS, GET_COMPONENT_PROPERTY).arg(path);
        self.host
            .event(Target::Component(component), request)
            .map_err(|e| property_error(id, path, e))
    }

    /// Set a property, read it back and compare
    pub fn get_set_test(
        &self,
        entity: &EditorEntity,
        index: usize,
        path: &str,
        value: Value,
    ) -> HarnessResult<bool> {
        self.set_component_property(entity, index, path, value.clone())?;
        let read_back = self.get_component_property(entity, index, path)?;
        let matches = read_back.approx_eq(&value);
        if matches {
            info!("'{}' {} set to {:?}", entity.name, path, value);
        } else {
            info!(
                "'{}' {} read back {:?}, expected {:?}",
                entity.name, path, read_back, value
            );
        }
        Ok(matches)
    }

    pub fn set_local_uniform_scale(&self, entity: &EditorEntity, scale: f32) -> HarnessResult<()> {
        let id = entity.require_valid()?;
        self.host.event(
            Target::Entity(id),
            Request::new(TRANSFORM_BUS, SET_LOCAL_UNIFORM_SCALE).arg(scale),
        )?;
        Ok(())
    }

    pub fn world_translation(&self, entity: &EditorEntity) -> HarnessResult<Vec3> {
        let id = entity.require_valid()?;
        let request = Request::new(TRANSFORM_BUS, GET_WORLD_TRANSLATION);
        let reply = self.host.event(Target::Entity(id), request.clone())?;
        reply
            .as_vector3()
            .ok_or_else(|| HarnessError::unexpected_reply(&request, &reply))
    }

    /// World-space bounds of the entity's shape component
    pub fn encompassing_aabb(&self, entity: &EditorEntity) -> HarnessResult<Aabb> {
        let id = entity.require_valid()?;
        let request = Request::new(SHAPE_BUS, GET_ENCOMPASSING_AABB);
        let reply = self.host.event(Target::Entity(id), request.clone())?;
        reply
            .as_aabb()
            .ok_or_else(|| HarnessError::unexpected_reply(&request, &reply))
    }

    fn send_set(&self, component: ComponentId, path: &str, value: Value) -> Result<(), HostError> {
        let request = Request::new(EDITOR_COMPONENT_API_BUS, SET_COMPONENT_PROPERTY)
            .arg(path)
            .arg(value);
        self.host.event(Target::Component(component), request)?;
        Ok(())
    }
}
