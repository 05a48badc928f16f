//! Asset resolution - logical resource paths to catalog handles

use bevy::log::{debug, warn};
use uuid::Uuid;

use crate::host::requests::{ASSET_CATALOG_BUS, GET_ASSET_ID_BY_PATH};
use crate::host::{AssetHandle, ComponentTypeId, HostClient, Request, Value};

/// A logical path together with the handle the catalog issued for it
#[derive(Debug, Clone, PartialEq)]
pub struct AssetReference {
    pub path: String,
    pub handle: AssetHandle,
}

impl AssetReference {
    pub fn is_resolved(&self) -> bool {
        !self.handle.is_null()
    }
}

/// Normalize a logical path the way the catalog keys it:
/// lowercase, forward slashes, no leading `./` or `/`, no repeated slashes.
pub fn normalize_asset_path(path: &str) -> String {
    let lowered = path.trim().replace('\\', "/").to_lowercase();
    let mut normalized = String::with_capacity(lowered.len());
    for segment in lowered.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if !normalized.is_empty() {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    normalized
}

/// Resolves logical asset paths through the host catalog.
///
/// No caching: the catalog is the source of truth. Resolution never fails
/// loudly; anything that is not a hit comes back as [`AssetHandle::NULL`].
pub struct AssetResolver<'h> {
    host: &'h dyn HostClient,
}

impl<'h> AssetResolver<'h> {
    pub fn new(host: &'h dyn HostClient) -> Self {
        Self { host }
    }

    /// Exact-path lookup
    pub fn resolve_asset_id(&self, logical_path: &str) -> AssetHandle {
        self.resolve_asset_id_with(logical_path, true)
    }

    /// With `exact_match` off the catalog may also accept a file-name match
    pub fn resolve_asset_id_with(&self, logical_path: &str, exact_match: bool) -> AssetHandle {
        let normalized = normalize_asset_path(logical_path);
        let request = Request::new(ASSET_CATALOG_BUS, GET_ASSET_ID_BY_PATH)
            .arg(normalized.as_str())
            .arg(Value::TypeId(ComponentTypeId(Uuid::nil())))
            .arg(exact_match);

        match self.host.broadcast(request) {
            Ok(Value::Asset(handle)) => {
                if handle.is_null() {
                    warn!("Asset '{}' not found in catalog", logical_path);
                } else {
                    debug!("Resolved '{}' -> {}", normalized, handle);
                }
                handle
            }
            Ok(other) => {
                warn!(
                    "Catalog returned {} for '{}', treating as unresolved",
                    other.kind(),
                    logical_path
                );
                AssetHandle::NULL
            }
            Err(e) => {
                warn!("Catalog lookup for '{}' failed: {}", logical_path, e);
                AssetHandle::NULL
            }
        }
    }

    pub fn resolve(&self, logical_path: &str) -> AssetReference {
        self.resolve_with(logical_path, true)
    }

    pub fn resolve_with(&self, logical_path: &str, exact_match: bool) -> AssetReference {
        AssetReference {
            path: logical_path.to_string(),
            handle: self.resolve_asset_id_with(logical_path, exact_match),
        }
    }
}
