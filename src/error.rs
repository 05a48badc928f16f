//! Harness error taxonomy

use thiserror::Error;

use crate::host::{ComponentTypeId, EntityId, HostError};

/// An entity, level or component could not be instantiated.
///
/// Not recovered locally: it aborts the scenario.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreationError {
    #[error("entity '{name}' has no valid handle")]
    InvalidEntity { name: String },
    #[error("unknown component kind '{0}'")]
    UnknownComponent(String),
    #[error("entity '{name}' could not add component {type_id:?}")]
    ComponentNotAdded {
        name: String,
        type_id: ComponentTypeId,
    },
    #[error("host rejected creation of '{name}': {reason}")]
    Rejected { name: String, reason: String },
}

/// A property path did not resolve or the value type was incompatible
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("'{path}' does not resolve on any component of entity {entity}")]
    UnresolvedPath { entity: EntityId, path: String },
    #[error("component index {index} out of range on entity {entity} ({count} attached)")]
    NoSuchComponent {
        entity: EntityId,
        index: usize,
        count: usize,
    },
    #[error("'{path}' expects {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[error("host rejected '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("creation failed: {0}")]
    Creation(#[from] CreationError),
    #[error("property failed: {0}")]
    Property(#[from] PropertyError),
    #[error("host fault: {0}")]
    Host(#[from] HostError),
    #[error("unexpected reply to {request}: {reply}")]
    UnexpectedReply { request: String, reply: String },
    #[error("fixture error: {0}")]
    Fixture(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl HarnessError {
    pub fn unexpected_reply(request: impl ToString, reply: &crate::host::Value) -> Self {
        HarnessError::UnexpectedReply {
            request: request.to_string(),
            reply: format!("{:?}", reply),
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
