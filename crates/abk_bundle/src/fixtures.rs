//! In-memory jacket templates for tests.
//!
//! Mirrors the shape of a real jacket bundle: an `AssetBundle` object carrying
//! the container table, one streamed `Texture2D` and a `Sprite` referencing it,
//! plus the `.resS` companion holding the pixel data.

use crate::package::{
    resource_key, stream_archive_path, AssetObject, AssetRef, Blob, ObjectClass, Package,
    SerializedFile,
};
use crate::rename::PRIMARY;
use abk_typetree::Node;

/// Hash key of the primary jacket template.
pub const TEMPLATE_HASH: &str = PRIMARY.template_hash_key;

pub const BUNDLE_PATH_ID: i64 = 1;
pub const TEXTURE_PATH_ID: i64 = -4_317_418_412_468_530_012;
pub const SPRITE_PATH_ID: i64 = 6_913_472_221_010_357_418;

/// Fill byte of the template's placeholder pixels.
pub const PLACEHOLDER_BYTE: u8 = 0x80;

/// A `Texture2D` tree. `stream` is `(offset, size, path)`; `None` stores the
/// pixels inline in `image data`.
pub fn texture_tree(
    name: &str,
    width: u32,
    height: u32,
    format: i64,
    stream: Option<(u64, u64, &str)>,
    inline: Vec<u8>,
) -> Node {
    let (offset, size, path) = stream.unwrap_or((0, 0, ""));
    [
        ("m_Name", Node::from(name)),
        ("m_Width", Node::from(width)),
        ("m_Height", Node::from(height)),
        ("m_TextureFormat", Node::from(format)),
        ("m_MipCount", Node::from(1)),
        ("m_IsReadable", Node::from(0)),
        ("m_CompleteImageSize", Node::Int(size.max(inline.len() as u64) as i64)),
        ("image data", Node::Bytes(inline)),
        (
            "m_StreamData",
            [
                ("offset", Node::Int(offset as i64)),
                ("size", Node::Int(size as i64)),
                ("path", Node::from(path)),
            ]
            .into_iter()
            .collect(),
        ),
    ]
    .into_iter()
    .collect()
}

fn pptr(file_id: i32, path_id: i64) -> Node {
    [
        ("m_FileID", Node::from(file_id)),
        ("m_PathID", Node::Int(path_id)),
    ]
    .into_iter()
    .collect()
}

/// A complete one-family jacket template with a `width`×`height` RGBA32 texture.
pub fn jacket_template(
    hash_key: &str,
    template_id: u32,
    suffix: &str,
    width: u32,
    height: u32,
) -> Package {
    let stem = format!("ui_jacket_{template_id:06}{suffix}");
    let asset_path = format!("assets/jacket/{stem}.png");
    let pixel_len = width as u64 * height as u64 * 4;

    let bundle: Node = [
        ("m_Name", Node::from(format!("{stem}.ab"))),
        ("m_AssetBundleName", Node::from(format!("{stem}.ab"))),
        (
            "m_PreloadTable",
            Node::Seq(vec![
                pptr(0, TEXTURE_PATH_ID),
                pptr(0, SPRITE_PATH_ID),
            ]),
        ),
        (
            "m_Container",
            Node::Seq(vec![Node::Tuple(
                vec![
                    Node::from(asset_path.as_str()),
                    [
                        ("preloadIndex", Node::from(0)),
                        ("preloadSize", Node::from(2)),
                        ("asset", pptr(0, SPRITE_PATH_ID)),
                    ]
                    .into_iter()
                    .collect(),
                ]
                .into_boxed_slice(),
            )]),
        ),
        ("m_Dependencies", Node::Seq(Vec::new())),
        ("m_RuntimeCompatibility", Node::from(1)),
    ]
    .into_iter()
    .collect();

    let texture = texture_tree(
        &stem,
        width,
        height,
        4,
        Some((0, pixel_len, &stream_archive_path(hash_key))),
        Vec::new(),
    );

    let sprite: Node = [
        ("m_Name", Node::from(stem.as_str())),
        (
            "m_Rect",
            [
                ("width", Node::from(width)),
                ("height", Node::from(height)),
            ]
            .into_iter()
            .collect(),
        ),
        (
            "m_RD",
            [("texture", pptr(0, TEXTURE_PATH_ID))].into_iter().collect(),
        ),
        (
            "m_AtlasTags",
            Node::Set([Node::from(stem.as_str())].into_iter().collect()),
        ),
    ]
    .into_iter()
    .collect();

    let mut package = Package {
        name: stem,
        ..Default::default()
    };
    package.container.insert(
        asset_path,
        AssetRef {
            file_id: 0,
            path_id: SPRITE_PATH_ID,
        },
    );
    package.files.insert(
        hash_key.to_string(),
        Blob::Serialized(SerializedFile {
            objects: vec![
                AssetObject {
                    path_id: BUNDLE_PATH_ID,
                    class: ObjectClass::AssetBundle,
                    tree: bundle,
                },
                AssetObject {
                    path_id: TEXTURE_PATH_ID,
                    class: ObjectClass::Texture2D,
                    tree: texture,
                },
                AssetObject {
                    path_id: SPRITE_PATH_ID,
                    class: ObjectClass::Sprite,
                    tree: sprite,
                },
            ],
        }),
    );
    package.files.insert(
        resource_key(hash_key),
        Blob::Resource(vec![PLACEHOLDER_BYTE; pixel_len as usize]),
    );
    package
}
