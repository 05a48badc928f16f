//! Host boundary - the single call surface between the harness and the
//! simulated editor.
//!
//! Every request is a bus/method pair with positional arguments, sent at a
//! [`Target`]. Broadcasts reach every listener of a bus and yield one value,
//! targeted events address one entity or component, and direct calls invoke a
//! host function. The harness never talks to the simulation any other way.

pub mod requests;

use bevy::math::Vec3;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::constants::PROPERTY_EPSILON;

/// Opaque runtime handle for an editor entity. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const INVALID: EntityId = EntityId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Opaque handle for one component attached to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    pub const INVALID: ComponentId = ComponentId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// Identifies a component kind. Resolved once per kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentTypeId(pub Uuid);

/// Opaque catalog handle for an asset.
///
/// [`AssetHandle::NULL`] is the "not found" sentinel. Binding it to a property
/// yields an empty asset slot on the host, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(pub Uuid);

impl AssetHandle {
    pub const NULL: AssetHandle = AssetHandle(Uuid::nil());

    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let half = extents * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Inclusive on every face
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Loosely-typed value carried across the host boundary.
///
/// The host validates values against its own component schemas; the harness
/// only picks the variant that states its intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector3(Vec3),
    Asset(AssetHandle),
    Entity(EntityId),
    Component(ComponentId),
    TypeId(ComponentTypeId),
    Aabb(Aabb),
    List(Vec<Value>),
}

impl Value {
    /// Short name used in diagnostics and type-mismatch reports
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Vector3(_) => "vector3",
            Value::Asset(_) => "asset",
            Value::Entity(_) => "entity",
            Value::Component(_) => "component",
            Value::TypeId(_) => "type_id",
            Value::Aabb(_) => "aabb",
            Value::List(_) => "list",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ints widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vec3> {
        match self {
            Value::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<AssetHandle> {
        match self {
            Value::Asset(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_aabb(&self) -> Option<Aabb> {
        match self {
            Value::Aabb(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Equality with a small tolerance for floats and vectors, used by
    /// set-then-read-back checks.
    pub fn approx_eq(&self, other: &Value) -> bool {
        const EPSILON: f64 = PROPERTY_EPSILON;
        match (self, other) {
            (Value::Float(_) | Value::Int(_), Value::Float(_) | Value::Int(_)) => {
                match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => (a - b).abs() < EPSILON,
                    _ => false,
                }
            }
            (Value::Vector3(a), Value::Vector3(b)) => (*a - *b).abs().max_element() < EPSILON as f32,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y))
            }
            _ => self == other,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vector3(v)
    }
}

impl From<AssetHandle> for Value {
    fn from(v: AssetHandle) -> Self {
        Value::Asset(v)
    }
}

/// Dot- or pipe-delimited property path, e.g.
/// `Box Shape|Box Configuration|Dimensions`.
///
/// Both delimiters are equivalent; segments are trimmed and empty segments
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split(['|', '.'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("|"))
    }
}

/// Where a request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// All listeners of the request's bus; one value comes back
    Broadcast,
    /// One entity's handler on the bus
    Entity(EntityId),
    /// One attached component's handler on the bus
    Component(ComponentId),
    /// A host-exposed function, not a bus at all
    Direct,
}

/// A named request with positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub bus: &'static str,
    pub method: &'static str,
    pub args: Vec<Value>,
}

impl Request {
    pub fn new(bus: &'static str, method: &'static str) -> Self {
        Self {
            bus,
            method,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Positional argument accessor for host-side handlers
    pub fn get(&self, index: usize) -> Result<&Value, HostError> {
        self.args.get(index).ok_or_else(|| {
            HostError::BadArguments(format!(
                "{}.{} expects argument #{}",
                self.bus, self.method, index
            ))
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.bus, self.method)
    }
}

/// Failures reported by the host or the channel to it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("host connection closed")]
    Disconnected,
    #[error("no handler for {bus}.{method}")]
    UnknownRequest { bus: String, method: String },
    #[error("bad arguments: {0}")]
    BadArguments(String),
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("component {0:?} does not exist")]
    UnknownComponent(ComponentId),
    #[error("property path '{0}' not found")]
    UnknownPath(String),
    #[error("property '{path}' expects {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[error("rejected: {0}")]
    Rejected(String),
}

/// The harness's only capability against the simulation.
///
/// Calls are synchronous: `send` blocks until the host replies. Implementors
/// must not reorder requests from one client.
pub trait HostClient {
    fn send(&self, target: Target, request: Request) -> Result<Value, HostError>;

    fn broadcast(&self, request: Request) -> Result<Value, HostError> {
        self.send(Target::Broadcast, request)
    }

    fn event(&self, target: Target, request: Request) -> Result<Value, HostError> {
        self.send(target, request)
    }

    fn call(&self, request: Request) -> Result<Value, HostError> {
        self.send(Target::Direct, request)
    }
}

impl<H: HostClient + ?Sized> HostClient for &H {
    fn send(&self, target: Target, request: Request) -> Result<Value, HostError> {
        (**self).send(target, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_path_delimiters_equivalent() {
        let piped = PropertyPath::parse("Controller|Configuration|Mesh Asset");
        let dotted = PropertyPath::parse("Controller.Configuration.Mesh Asset");
        assert_eq!(piped, dotted);
        assert_eq!(piped.segments().len(), 3);
        assert_eq!(piped.to_string(), "Controller|Configuration|Mesh Asset");
    }

    #[test]
    fn test_property_path_trims_segments() {
        let path = PropertyPath::parse(" Box Shape | Box Configuration || Dimensions ");
        assert_eq!(path.to_string(), "Box Shape|Box Configuration|Dimensions");
    }

    #[test]
    fn test_invalid_sentinels() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(EntityId(7).is_valid());
        assert!(AssetHandle::NULL.is_null());
        assert!(!AssetHandle(Uuid::new_v4()).is_null());
    }

    #[test]
    fn test_aabb_contains_is_inclusive() {
        let aabb = Aabb::from_center_extents(Vec3::new(512.0, 512.0, 32.0), Vec3::splat(2.0));
        assert!(aabb.contains(Vec3::new(511.0, 513.0, 32.0)));
        assert!(!aabb.contains(Vec3::new(510.9, 512.0, 32.0)));
        assert_eq!(aabb.center(), Vec3::new(512.0, 512.0, 32.0));
    }

    #[test]
    fn test_value_approx_eq() {
        assert!(Value::Float(2.0).approx_eq(&Value::Int(2)));
        assert!(Value::Vector3(Vec3::splat(1.0)).approx_eq(&Value::Vector3(Vec3::splat(1.00001))));
        assert!(!Value::Bool(true).approx_eq(&Value::Int(1)));
        assert!(Value::Asset(AssetHandle::NULL).approx_eq(&Value::Asset(AssetHandle::NULL)));
    }

    #[test]
    fn test_request_missing_argument() {
        let request = Request::new("TransformBus", "SetLocalUniformScale");
        assert!(matches!(request.get(0), Err(HostError::BadArguments(_))));
        let request = request.arg(2.0_f32);
        assert_eq!(request.get(0).unwrap().as_float(), Some(2.0));
    }
}
