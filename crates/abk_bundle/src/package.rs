//! In-memory model of an asset bundle package.
//!
//! A [`Package`] is materialized fresh from the template for every item,
//! mutated in place and serialized again; nothing in it is shared between items.

use abk_typetree::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix of the companion stream blob that holds streamed payloads.
pub const RESOURCE_SUFFIX: &str = ".resS";

/// Logical asset path to the object it names.
pub type ContainerIndex = BTreeMap<String, AssetRef>;

/// Content-hash key (`CAB-...`) to blob.
pub type BlobStore = BTreeMap<String, Blob>;

/// A binary package: a display name, a container index and a blob store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub name: String,
    pub container: ContainerIndex,
    pub files: BlobStore,
}

/// Pointer from a container entry to an object (`PPtr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetRef {
    pub file_id: i32,
    pub path_id: i64,
}

/// A named record inside the package.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    /// A serialized asset file: objects with type-tree metadata.
    Serialized(SerializedFile),
    /// An opaque companion stream (`.resS`) addressed by offset/size from objects.
    Resource(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SerializedFile {
    pub objects: Vec<AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetObject {
    pub path_id: i64,
    pub class: ObjectClass,
    pub tree: Node,
}

/// Object class, by the engine's persistent class id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ObjectClass {
    Texture2D,
    AssetBundle,
    Sprite,
    Other(u32),
}

impl From<u32> for ObjectClass {
    fn from(value: u32) -> Self {
        match value {
            28 => ObjectClass::Texture2D,
            142 => ObjectClass::AssetBundle,
            213 => ObjectClass::Sprite,
            other => ObjectClass::Other(other),
        }
    }
}

impl From<ObjectClass> for u32 {
    fn from(value: ObjectClass) -> Self {
        match value {
            ObjectClass::Texture2D => 28,
            ObjectClass::AssetBundle => 142,
            ObjectClass::Sprite => 213,
            ObjectClass::Other(id) => id,
        }
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectClass::Texture2D => write!(f, "Texture2D"),
            ObjectClass::AssetBundle => write!(f, "AssetBundle"),
            ObjectClass::Sprite => write!(f, "Sprite"),
            ObjectClass::Other(id) => write!(f, "Class({id})"),
        }
    }
}

impl Blob {
    pub fn as_serialized(&self) -> Option<&SerializedFile> {
        match self {
            Blob::Serialized(file) => Some(file),
            Blob::Resource(_) => None,
        }
    }

    pub fn as_serialized_mut(&mut self) -> Option<&mut SerializedFile> {
        match self {
            Blob::Serialized(file) => Some(file),
            Blob::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&[u8]> {
        match self {
            Blob::Resource(data) => Some(data),
            Blob::Serialized(_) => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Blob::Resource(data) => Some(data),
            Blob::Serialized(_) => None,
        }
    }
}

impl Package {
    /// All objects of all serialized blobs, with the key of the blob holding them.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &AssetObject)> {
        self.files.iter().flat_map(|(key, blob)| {
            blob.as_serialized()
                .into_iter()
                .flat_map(|file| file.objects.iter())
                .map(move |object| (key.as_str(), object))
        })
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut AssetObject> {
        self.files
            .values_mut()
            .filter_map(Blob::as_serialized_mut)
            .flat_map(|file| file.objects.iter_mut())
    }

    /// Whether any object tree in the package contains `needle`.
    pub fn trees_contain(&self, needle: &str) -> bool {
        self.objects().any(|(_, object)| object.tree.contains_str(needle))
    }
}

/// Key of the companion stream blob for a primary blob key.
pub fn resource_key(hash_key: &str) -> String {
    format!("{hash_key}{RESOURCE_SUFFIX}")
}

/// Archive path a streamed object uses to reference the companion of `hash_key`.
pub fn stream_archive_path(hash_key: &str) -> String {
    format!("archive:/{hash_key}/{hash_key}{RESOURCE_SUFFIX}")
}

/// Blob key referenced by an `archive:/...` stream path (its last component).
pub fn stream_path_key(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|key| !key.is_empty())
}
