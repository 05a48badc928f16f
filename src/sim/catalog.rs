//! Simulated asset catalog

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::assets::normalize_asset_path;
use crate::host::AssetHandle;

/// What a catalog entry describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetKind {
    /// Something a spawner plants. `density` is instances per meter along
    /// each axis; `jitter` is a fraction of the cell size.
    Descriptor {
        density: f32,
        #[serde(default)]
        jitter: f32,
    },
    /// A mesh with unscaled extents in meters
    Model { extents: [f32; 3] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub path: String,
    #[serde(flatten)]
    pub kind: AssetKind,
}

impl CatalogEntry {
    pub fn descriptor(path: &str, density: f32) -> Self {
        Self {
            path: path.to_string(),
            kind: AssetKind::Descriptor {
                density,
                jitter: 0.0,
            },
        }
    }

    pub fn model(path: &str, extents: [f32; 3]) -> Self {
        Self {
            path: path.to_string(),
            kind: AssetKind::Model { extents },
        }
    }
}

/// Entries every simulated host starts with
pub fn default_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::descriptor("slices/purpleflower.dynamicslice", 1.3),
        CatalogEntry::descriptor("slices/pinkflower.dynamicslice", 1.0),
        CatalogEntry::model("objects/_primitives/_box_1x1.azmodel", [1.0, 1.0, 1.0]),
        CatalogEntry::model("objects/_primitives/_sphere_1x1.azmodel", [1.0, 1.0, 1.0]),
    ]
}

#[derive(Resource, Debug, Default)]
pub struct AssetCatalog {
    by_path: HashMap<String, AssetHandle>,
    assets: HashMap<AssetHandle, (String, AssetKind)>,
}

impl AssetCatalog {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.register(&entry.path, entry.kind.clone());
        }
        catalog
    }

    /// Register `path`, or return the handle it already has
    pub fn register(&mut self, path: &str, kind: AssetKind) -> AssetHandle {
        let key = normalize_asset_path(path);
        if let Some(handle) = self.by_path.get(&key) {
            return *handle;
        }
        let handle = AssetHandle(Uuid::new_v4());
        self.by_path.insert(key.clone(), handle);
        self.assets.insert(handle, (key, kind));
        handle
    }

    /// Exact lookups need the full normalized path. Otherwise a unique
    /// file-name match is accepted too.
    pub fn lookup(&self, path: &str, exact_match: bool) -> AssetHandle {
        let key = normalize_asset_path(path);
        if let Some(handle) = self.by_path.get(&key) {
            return *handle;
        }
        if exact_match {
            return AssetHandle::NULL;
        }

        let file_name = key.rsplit('/').next().unwrap_or(&key);
        let mut matches = self
            .by_path
            .iter()
            .filter(|(p, _)| p.rsplit('/').next() == Some(file_name));
        match (matches.next(), matches.next()) {
            (Some((_, handle)), None) => *handle,
            _ => AssetHandle::NULL,
        }
    }

    pub fn get(&self, handle: AssetHandle) -> Option<&AssetKind> {
        self.assets.get(&handle).map(|(_, kind)| kind)
    }

    pub fn path_of(&self, handle: AssetHandle) -> Option<&str> {
        self.assets.get(&handle).map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut catalog = AssetCatalog::default();
        let a = catalog.register("Slices/PurpleFlower.dynamicslice", AssetKind::Descriptor { density: 1.0, jitter: 0.0 });
        let b = catalog.register("slices/purpleflower.dynamicslice", AssetKind::Descriptor { density: 2.0, jitter: 0.0 });
        assert_eq!(a, b);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_lookup_exact_and_fuzzy() {
        let catalog = AssetCatalog::from_entries(&default_entries());
        let exact = catalog.lookup("objects/_primitives/_box_1x1.azmodel", true);
        assert!(!exact.is_null());
        assert!(catalog.lookup("_box_1x1.azmodel", true).is_null());
        assert_eq!(catalog.lookup("_box_1x1.azmodel", false), exact);
        assert_eq!(catalog.path_of(exact), Some("objects/_primitives/_box_1x1.azmodel"));
    }

    #[test]
    fn test_entries_parse_from_json() {
        let json = r#"[
            {"path": "slices/grass.dynamicslice", "kind": "descriptor", "density": 2.0},
            {"path": "objects/rock.azmodel", "kind": "model", "extents": [2.0, 2.0, 1.0]}
        ]"#;
        let entries: Vec<CatalogEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0], CatalogEntry::descriptor("slices/grass.dynamicslice", 2.0));
        assert_eq!(entries[1].kind, AssetKind::Model { extents: [2.0, 2.0, 1.0] });
    }
}
