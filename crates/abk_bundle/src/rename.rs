//! Re-identification of a cloned asset family.
//!
//! A template package holds exactly one *family* per variant: a single container
//! entry, the primary serialized blob and its `.resS` companion. Renaming moves the
//! whole family to a new hash key and rewrites every textual occurrence of the
//! template's identifier token.

use crate::error::{Error, Result};
use crate::package::{resource_key, stream_archive_path, Package};
use abk_typetree::Node;

/// Offset added to an item id to derive the shadow variant's hash id.
pub const SHADOW_ID_OFFSET: u32 = 10_000_000;

/// One of the per-item package variants built from its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyVariant {
    /// Appended to the package file stem (`ui_jacket_002001_s`).
    pub suffix: &'static str,
    /// Hash key of the family inside this variant's template.
    pub template_hash_key: &'static str,
    pub hash_id_offset: u32,
    /// Directory under the bundle root and prefix of the manifest name.
    pub dir: &'static str,
}

pub const PRIMARY: FamilyVariant = FamilyVariant {
    suffix: "",
    template_hash_key: "CAB-86ca849a3b53af73406c67412dda69d5",
    hash_id_offset: 0,
    dir: "jacket",
};

pub const SHADOW: FamilyVariant = FamilyVariant {
    suffix: "_s",
    template_hash_key: "CAB-72f38b5f3114e28901b11d48eb6d85e6",
    hash_id_offset: SHADOW_ID_OFFSET,
    dir: "jacket_s",
};

/// Both variants, in build order.
pub const JACKET_VARIANTS: [FamilyVariant; 2] = [PRIMARY, SHADOW];

/// Identifier token embedded in names and paths, e.g. `_002001`.
pub fn id_token(id: u32) -> String {
    format!("_{id:06}")
}

impl FamilyVariant {
    pub fn hash_key(&self, id: u32) -> String {
        format!("CAB-{}", u64::from(id) + u64::from(self.hash_id_offset))
    }

    /// Package file name for `id`, e.g. `ui_jacket_002001_s.ab`.
    pub fn file_name(&self, id: u32) -> String {
        format!("ui_jacket_{id:06}{}.ab", self.suffix)
    }

    /// Manifest name of the package, e.g. `jacket_s/ui_jacket_002001_s.ab`.
    pub fn bundle_name(&self, id: u32) -> String {
        format!("{}/{}", self.dir, self.file_name(id)).to_lowercase()
    }

    pub fn rename_for(&self, template_id: u32, id: u32) -> FamilyRename {
        FamilyRename {
            old_hash_key: self.template_hash_key.to_string(),
            new_hash_key: self.hash_key(id),
            old_token: id_token(template_id),
            new_token: id_token(id),
        }
    }
}

/// Parameters of a single [`rename_family`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRename {
    pub old_hash_key: String,
    pub new_hash_key: String,
    pub old_token: String,
    pub new_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameReport {
    /// Strings rewritten by the tree walk.
    pub replacements: usize,
    pub stream_paths_rewritten: usize,
    /// The container key after re-keying.
    pub container_key: String,
}

/// Move the template family to `new_hash_key` and rewrite its identifier token.
///
/// The package is validated before anything is touched: on error it is unchanged.
pub fn rename_family(package: &mut Package, rename: &FamilyRename) -> Result<RenameReport> {
    validate(package, rename)?;

    let old_resource = resource_key(&rename.old_hash_key);
    let new_resource = resource_key(&rename.new_hash_key);
    let stream_path = stream_archive_path(&rename.new_hash_key);

    let mut replacements = 0;
    let mut stream_paths_rewritten = 0;
    for object in package.objects_mut() {
        replacements += object
            .tree
            .substitute(&rename.old_token, &rename.new_token)
            .map_err(|collision| Error::malformed(collision.to_string()))?;

        // Stream paths are derived from the hash key, not the token.
        if let Some(Node::Str(path)) = object.tree.get_path_mut(&["m_StreamData", "path"]) {
            if !path.is_empty() {
                *path = stream_path.clone();
                stream_paths_rewritten += 1;
            }
        }
    }

    package.name = package.name.replace(&rename.old_token, &rename.new_token);

    let (old_path, asset) = package
        .container
        .pop_first()
        .ok_or_else(|| Error::malformed("container index is empty"))?;
    let container_key = old_path.replace(&rename.old_token, &rename.new_token);
    package.container.insert(container_key.clone(), asset);

    let primary = package
        .files
        .remove(&rename.old_hash_key)
        .ok_or_else(|| Error::malformed(format!("missing blob {}", rename.old_hash_key)))?;
    let companion = package
        .files
        .remove(&old_resource)
        .ok_or_else(|| Error::malformed(format!("missing blob {old_resource}")))?;
    package.files.insert(rename.new_hash_key.clone(), primary);
    package.files.insert(new_resource, companion);

    tracing::debug!(
        "Renamed family {} -> {} ({} replacements, container key {})",
        rename.old_hash_key,
        rename.new_hash_key,
        replacements,
        container_key
    );

    Ok(RenameReport {
        replacements,
        stream_paths_rewritten,
        container_key,
    })
}

fn validate(package: &Package, rename: &FamilyRename) -> Result<()> {
    if package.container.len() != 1 {
        return Err(Error::malformed(format!(
            "expected exactly one container entry, found {}",
            package.container.len()
        )));
    }
    if let Some(path) = package.container.keys().next() {
        if !path.contains(&rename.old_token) {
            return Err(Error::malformed(format!(
                "container entry '{path}' does not contain '{}'",
                rename.old_token
            )));
        }
    }

    match package.files.get(&rename.old_hash_key) {
        Some(blob) if blob.as_serialized().is_some() => {}
        Some(_) => {
            return Err(Error::malformed(format!(
                "blob {} is not a serialized file",
                rename.old_hash_key
            )))
        }
        None => {
            return Err(Error::malformed(format!(
                "missing blob {}",
                rename.old_hash_key
            )))
        }
    }

    let old_resource = resource_key(&rename.old_hash_key);
    if !package.files.contains_key(&old_resource) {
        return Err(Error::malformed(format!("missing blob {old_resource}")));
    }

    for (key, object) in package.objects() {
        if let Some(collision) = object
            .tree
            .find_collision(&rename.old_token, &rename.new_token)
        {
            return Err(Error::malformed(format!(
                "object {} in {key}: {collision}",
                object.path_id
            )));
        }
    }

    if rename.new_hash_key != rename.old_hash_key {
        for key in [
            rename.new_hash_key.clone(),
            resource_key(&rename.new_hash_key),
        ] {
            if package.files.contains_key(&key) {
                return Err(Error::malformed(format!("blob key {key} already exists")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::jacket_template;
    use crate::package::{AssetObject, AssetRef, Blob, ObjectClass, SerializedFile};

    fn small_family() -> Package {
        let texture: Node = [
            ("m_Name", Node::from("ui_xxx_001686")),
            (
                "m_StreamData",
                [
                    ("offset", Node::from(0)),
                    ("size", Node::from(4)),
                    ("path", Node::from("archive:/CAB-h1/CAB-h1.resS")),
                ]
                .into_iter()
                .collect(),
            ),
        ]
        .into_iter()
        .collect();

        let mut package = Package {
            name: "ui_xxx_001686".to_string(),
            ..Default::default()
        };
        package.container.insert(
            "path/ui_xxx_001686".to_string(),
            AssetRef {
                file_id: 0,
                path_id: 7,
            },
        );
        package.files.insert(
            "CAB-h1".to_string(),
            Blob::Serialized(SerializedFile {
                objects: vec![AssetObject {
                    path_id: 7,
                    class: ObjectClass::Texture2D,
                    tree: texture,
                }],
            }),
        );
        package
            .files
            .insert("CAB-h1.resS".to_string(), Blob::Resource(vec![0; 4]));
        package
    }

    fn scenario_rename() -> FamilyRename {
        FamilyRename {
            old_hash_key: "CAB-h1".to_string(),
            new_hash_key: "CAB-2001".to_string(),
            old_token: "001686".to_string(),
            new_token: "002001".to_string(),
        }
    }

    #[test]
    fn test_rekeys_container_and_blobs() {
        let mut package = small_family();
        let report = rename_family(&mut package, &scenario_rename()).unwrap();

        assert_eq!(report.container_key, "path/ui_xxx_002001");
        assert_eq!(
            package.container.keys().collect::<Vec<_>>(),
            vec!["path/ui_xxx_002001"]
        );
        assert_eq!(package.container["path/ui_xxx_002001"].path_id, 7);
        assert_eq!(
            package.files.keys().collect::<Vec<_>>(),
            vec!["CAB-2001", "CAB-2001.resS"]
        );
        assert_eq!(package.name, "ui_xxx_002001");
    }

    #[test]
    fn test_stream_path_is_regenerated() {
        let mut package = small_family();
        let report = rename_family(&mut package, &scenario_rename()).unwrap();
        assert_eq!(report.stream_paths_rewritten, 1);

        let (_, texture) = package.objects().next().unwrap();
        assert_eq!(
            texture
                .tree
                .get_path(&["m_StreamData", "path"])
                .and_then(Node::as_str),
            Some("archive:/CAB-2001/CAB-2001.resS")
        );
        assert!(!package.trees_contain("001686"));
    }

    #[test]
    fn test_empty_stream_path_is_kept() {
        let mut package = small_family();
        for object in package.objects_mut() {
            object.tree.get_path_mut(&["m_StreamData"]).unwrap().set("path", "");
        }
        let report = rename_family(&mut package, &scenario_rename()).unwrap();
        assert_eq!(report.stream_paths_rewritten, 0);
    }

    #[test]
    fn test_variant_rename_on_template() {
        for variant in JACKET_VARIANTS {
            let mut package = jacket_template(variant.template_hash_key, 1686, variant.suffix, 8, 8);
            let rename = variant.rename_for(1686, 2001);
            rename_family(&mut package, &rename).unwrap();

            let new_key = variant.hash_key(2001);
            assert!(package.files.contains_key(&new_key));
            assert!(package.files.contains_key(&resource_key(&new_key)));
            assert!(!package.files.contains_key(variant.template_hash_key));
            assert!(!package.files.contains_key(&resource_key(variant.template_hash_key)));
            assert!(!package.trees_contain("_001686"));
            assert!(!package.name.contains("_001686"));
            assert!(package
                .container
                .keys()
                .all(|key| key.contains(&format!("_002001{}", variant.suffix))));
        }
    }

    #[test]
    fn test_variant_naming() {
        assert_eq!(PRIMARY.hash_key(2001), "CAB-2001");
        assert_eq!(SHADOW.hash_key(2001), "CAB-10002001");
        assert_eq!(PRIMARY.file_name(2001), "ui_jacket_002001.ab");
        assert_eq!(SHADOW.bundle_name(2001), "jacket_s/ui_jacket_002001_s.ab");
        assert_eq!(id_token(42), "_000042");
    }

    #[test]
    fn test_missing_companion_is_malformed() {
        let mut package = small_family();
        package.files.remove("CAB-h1.resS");
        let before = package.clone();
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));
        assert_eq!(package, before);
    }

    #[test]
    fn test_missing_container_entry_is_malformed() {
        let mut package = small_family();
        package.container.clear();
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));

        let mut package = small_family();
        package.container.insert(
            "path/other".to_string(),
            AssetRef {
                file_id: 0,
                path_id: 8,
            },
        );
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_container_without_token_is_malformed() {
        let mut package = small_family();
        let asset = package.container.pop_first().unwrap().1;
        package.container.insert("path/ui_xxx_000001".to_string(), asset);
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_colliding_target_key_is_malformed() {
        let mut package = small_family();
        package
            .files
            .insert("CAB-2001".to_string(), Blob::Resource(Vec::new()));
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_key_collision_in_tree_is_malformed() {
        let mut package = small_family();
        for object in package.objects_mut() {
            object.tree.set("tag_001686", "old");
            object.tree.set("tag_002001", "kept");
        }
        let before = package.clone();

        let error = rename_family(&mut package, &scenario_rename()).unwrap_err();
        assert!(matches!(error, Error::MalformedTemplate(ref m) if m.contains("tag_002001")));
        assert_eq!(package, before);
    }

    #[test]
    fn test_primary_must_be_serialized() {
        let mut package = small_family();
        package
            .files
            .insert("CAB-h1".to_string(), Blob::Resource(Vec::new()));
        assert!(matches!(
            rename_family(&mut package, &scenario_rename()),
            Err(Error::MalformedTemplate(_))
        ));
    }
}
