//! Bus and method names understood by the editor host.
//!
//! Argument lists are documented next to each method as
//! `(args) -> reply`.

// Buses
pub const GENERAL: &str = "general";
pub const DYNVEG: &str = "dynveg";
pub const ASSET_CATALOG_BUS: &str = "AssetCatalogRequestBus";
pub const EDITOR_TOOLS_BUS: &str = "EditorToolsApplicationRequestBus";
pub const EDITOR_COMPONENT_API_BUS: &str = "EditorComponentAPIBus";
pub const EDITOR_ENTITY_API_BUS: &str = "EditorEntityAPIBus";
pub const TRANSFORM_BUS: &str = "TransformBus";
pub const SHAPE_BUS: &str = "ShapeComponentRequestsBus";

// general (direct)

/// `(String name, Int heightmap_resolution, Float meters_per_pixel,
/// Int terrain_texture_resolution, Bool use_terrain) -> Int code`
pub const CREATE_LEVEL_NO_PROMPT: &str = "create_level_no_prompt";
/// `(Float x, Float y, Float z) -> None`
pub const SET_CURRENT_VIEW_POSITION: &str = "set_current_view_position";
/// `(Float x, Float y, Float z) -> None`, Euler degrees
pub const SET_CURRENT_VIEW_ROTATION: &str = "set_current_view_rotation";
/// `() -> Vector3`
pub const GET_CURRENT_VIEW_POSITION: &str = "get_current_view_position";
/// `() -> Vector3`
pub const GET_CURRENT_VIEW_ROTATION: &str = "get_current_view_rotation";
/// `() -> String` (empty when no level is open)
pub const GET_CURRENT_LEVEL_NAME: &str = "get_current_level_name";

// dynveg (direct)

/// `(Aabb) -> Int`
pub const GET_INSTANCE_COUNT_IN_AABB: &str = "get_instance_count_in_aabb";

// AssetCatalogRequestBus (broadcast)

/// `(String path, TypeId asset_type, Bool exact_match) -> Asset`
pub const GET_ASSET_ID_BY_PATH: &str = "GetAssetIdByPath";

// EditorToolsApplicationRequestBus (broadcast)

/// `(Vector3 position, Entity parent) -> Entity`
pub const CREATE_NEW_ENTITY_AT_POSITION: &str = "CreateNewEntityAtPosition";

// EditorComponentAPIBus

/// broadcast `(List[String] names) -> List[TypeId | None]`
pub const FIND_COMPONENT_TYPE_IDS: &str = "FindComponentTypeIdsByEntityType";
/// entity `(List[TypeId]) -> List[Component]`
pub const ADD_COMPONENTS_OF_TYPE: &str = "AddComponentsOfType";
/// component `(String path, value) -> None`
pub const SET_COMPONENT_PROPERTY: &str = "SetComponentProperty";
/// component `(String path) -> value`
pub const GET_COMPONENT_PROPERTY: &str = "GetComponentProperty";

// EditorEntityAPIBus (entity)

/// `(String name) -> None`
pub const SET_NAME: &str = "SetName";
/// `() -> String`
pub const GET_NAME: &str = "GetName";

// TransformBus (entity)

/// `(Float scale) -> None`
pub const SET_LOCAL_UNIFORM_SCALE: &str = "SetLocalUniformScale";
/// `() -> Float`
pub const GET_LOCAL_UNIFORM_SCALE: &str = "GetLocalUniformScale";
/// `() -> Vector3`
pub const GET_WORLD_TRANSLATION: &str = "GetWorldTranslation";

// ShapeComponentRequestsBus (entity)

/// `() -> Aabb`
pub const GET_ENCOMPASSING_AABB: &str = "GetEncompassingAabb";
