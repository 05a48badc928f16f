//! Editor component kinds, their property schemas, and the ECS components
//! that hold scene entities

use bevy::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::*;
use crate::host::{AssetHandle, ComponentId, ComponentTypeId, EntityId, HostError, PropertyPath, Value};

/// Component kinds the simulated editor knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    BoxShape,
    VegetationLayerSpawner,
    VegetationAssetList,
    VegetationLayerBlockerMesh,
    ShapeSurfaceTagEmitter,
    Mesh,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::BoxShape,
        ComponentKind::VegetationLayerSpawner,
        ComponentKind::VegetationAssetList,
        ComponentKind::VegetationLayerBlockerMesh,
        ComponentKind::ShapeSurfaceTagEmitter,
        ComponentKind::Mesh,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::BoxShape => BOX_SHAPE,
            ComponentKind::VegetationLayerSpawner => VEGETATION_LAYER_SPAWNER,
            ComponentKind::VegetationAssetList => VEGETATION_ASSET_LIST,
            ComponentKind::VegetationLayerBlockerMesh => VEGETATION_LAYER_BLOCKER_MESH,
            ComponentKind::ShapeSurfaceTagEmitter => SHAPE_SURFACE_TAG_EMITTER,
            ComponentKind::Mesh => MESH,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn type_id(&self) -> ComponentTypeId {
        let raw = match self {
            ComponentKind::BoxShape => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0001,
            ComponentKind::VegetationLayerSpawner => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0002,
            ComponentKind::VegetationAssetList => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0003,
            ComponentKind::VegetationLayerBlockerMesh => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0004,
            ComponentKind::ShapeSurfaceTagEmitter => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0005,
            ComponentKind::Mesh => 0x5edf_20d4_1b0c_4b3e_9a7e_0000_0000_0006,
        };
        ComponentTypeId(Uuid::from_u128(raw))
    }

    pub fn from_type_id(type_id: ComponentTypeId) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_id() == type_id)
    }

    /// Property paths with their default values. The default's variant is
    /// the property's type.
    pub fn schema(&self) -> Vec<(&'static str, Value)> {
        match self {
            ComponentKind::BoxShape => vec![(BOX_DIMENSIONS_PATH, Value::Vector3(Vec3::ONE))],
            ComponentKind::VegetationLayerSpawner => {
                vec![(ALLOW_EMPTY_ASSETS_PATH, Value::Bool(true))]
            }
            ComponentKind::VegetationAssetList => {
                vec![(DESCRIPTOR_ASSET_PATH, Value::Asset(AssetHandle::NULL))]
            }
            ComponentKind::VegetationLayerBlockerMesh => vec![
                (BLOCKER_HEIGHT_MIN_PATH, Value::Float(0.0)),
                (BLOCKER_HEIGHT_MAX_PATH, Value::Float(1.0)),
            ],
            ComponentKind::ShapeSurfaceTagEmitter => {
                vec![(SURFACE_TAG_PATH, Value::String("terrain".to_string()))]
            }
            ComponentKind::Mesh => vec![(MESH_ASSET_PATH, Value::Asset(AssetHandle::NULL))],
        }
    }
}

/// Coerce `value` to the type of `current`, or explain why it can't be
fn coerce(path: &PropertyPath, current: &Value, value: Value) -> Result<Value, HostError> {
    match (current, value) {
        (Value::Float(_), Value::Int(i)) => Ok(Value::Float(i as f64)),
        (current, value) if std::mem::discriminant(current) == std::mem::discriminant(&value) => {
            Ok(value)
        }
        (current, value) => Err(HostError::TypeMismatch {
            path: path.to_string(),
            expected: current.kind().to_string(),
            found: value.kind().to_string(),
        }),
    }
}

/// One component attached to a scene entity
#[derive(Debug, Clone)]
pub struct EditorComponent {
    pub id: ComponentId,
    pub kind: ComponentKind,
    properties: HashMap<PropertyPath, Value>,
}

impl EditorComponent {
    pub fn new(id: ComponentId, kind: ComponentKind) -> Self {
        let properties = kind
            .schema()
            .into_iter()
            .map(|(path, default)| (PropertyPath::parse(path), default))
            .collect();
        Self {
            id,
            kind,
            properties,
        }
    }

    pub fn get(&self, path: &PropertyPath) -> Result<&Value, HostError> {
        self.properties
            .get(path)
            .ok_or_else(|| HostError::UnknownPath(path.to_string()))
    }

    pub fn set(&mut self, path: &PropertyPath, value: Value) -> Result<(), HostError> {
        let current = self.get(path)?;
        let coerced = coerce(path, current, value)?;
        self.properties.insert(path.clone(), coerced);
        Ok(())
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        self.properties.get(&PropertyPath::parse(path))
    }

    pub fn vector3(&self, path: &str) -> Option<Vec3> {
        self.lookup(path).and_then(Value::as_vector3)
    }

    pub fn asset(&self, path: &str) -> Option<AssetHandle> {
        self.lookup(path).and_then(Value::as_asset)
    }

    pub fn float(&self, path: &str) -> Option<f64> {
        self.lookup(path).and_then(Value::as_float)
    }
}

/// Identity of a scene entity
#[derive(Component, Debug, Clone)]
pub struct SceneEntity {
    pub id: EntityId,
    pub name: String,
}

/// World placement. Only uniform scale is modeled.
#[derive(Component, Debug, Clone, Copy)]
pub struct Placement {
    pub translation: Vec3,
    pub uniform_scale: f32,
}

impl Placement {
    pub fn at(translation: Vec3) -> Self {
        Self {
            translation,
            uniform_scale: 1.0,
        }
    }
}

/// Components attached to a scene entity, in attachment order
#[derive(Component, Debug, Clone, Default)]
pub struct EditorComponents(pub Vec<EditorComponent>);

impl EditorComponents {
    pub fn has(&self, kind: ComponentKind) -> bool {
        self.0.iter().any(|c| c.kind == kind)
    }

    pub fn first(&self, kind: ComponentKind) -> Option<&EditorComponent> {
        self.0.iter().find(|c| c.kind == kind)
    }

    pub fn by_id(&self, id: ComponentId) -> Option<&EditorComponent> {
        self.0.iter().find(|c| c.id == id)
    }

    pub fn by_id_mut(&mut self, id: ComponentId) -> Option<&mut EditorComponent> {
        self.0.iter_mut().find(|c| c.id == id)
    }

    /// Box dimensions scaled by the entity's placement
    pub fn box_extents(&self, placement: &Placement) -> Option<Vec3> {
        self.first(ComponentKind::BoxShape)
            .and_then(|c| c.vector3(BOX_DIMENSIONS_PATH))
            .map(|dims| dims * placement.uniform_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_name(kind.name()), Some(kind));
            assert_eq!(ComponentKind::from_type_id(kind.type_id()), Some(kind));
        }
        assert_eq!(ComponentKind::from_name("Vegetation Layer Blocker"), None);
    }

    #[test]
    fn test_set_coerces_int_to_float() {
        let mut blocker = EditorComponent::new(ComponentId(1), ComponentKind::VegetationLayerBlockerMesh);
        let path = PropertyPath::parse(BLOCKER_HEIGHT_MAX_PATH);
        blocker.set(&path, Value::Int(1)).unwrap();
        assert_eq!(blocker.get(&path).unwrap(), &Value::Float(1.0));
    }

    #[test]
    fn test_set_rejects_wrong_type_and_unknown_path() {
        let mut mesh = EditorComponent::new(ComponentId(2), ComponentKind::Mesh);
        let path = PropertyPath::parse(MESH_ASSET_PATH);
        assert!(matches!(
            mesh.set(&path, Value::String("box".to_string())),
            Err(HostError::TypeMismatch { .. })
        ));
        assert!(matches!(
            mesh.set(&PropertyPath::parse("Controller|Nope"), Value::Bool(true)),
            Err(HostError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_box_extents_scale_uniformly() {
        let components = EditorComponents(vec![EditorComponent::new(ComponentId(3), ComponentKind::BoxShape)]);
        let mut placement = Placement::at(Vec3::ZERO);
        placement.uniform_scale = 2.0;
        assert_eq!(components.box_extents(&placement), Some(Vec3::splat(2.0)));
    }
}
