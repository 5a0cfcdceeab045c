//! Texture payload replacement.
//!
//! Every `Texture2D` in a package gets its pixels replaced by the item artwork,
//! resampled to the texture's original canvas and stored as opaque RGBA32.

use crate::error::{Error, Result};
use crate::package::{stream_path_key, ObjectClass, Package};
use abk_typetree::Node;
use camino::{Utf8Path, Utf8PathBuf};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use walkdir::WalkDir;

/// `TextureFormat.RGBA32`.
pub const RGBA32: i64 = 4;

/// Artwork extensions recognized in an item directory, lower case.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg"];

/// Slice of a companion stream holding a texture's pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRef {
    pub offset: u64,
    pub size: u64,
    pub path: String,
}

/// The fields of a `Texture2D` tree the overlay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: i64,
    /// `None` when the pixels are stored inline.
    pub stream: Option<StreamRef>,
}

impl TextureInfo {
    pub fn from_tree(tree: &Node) -> Result<Self> {
        let name = tree
            .get("m_Name")
            .and_then(Node::as_str)
            .unwrap_or_default()
            .to_string();
        let dimension = |field: &str| {
            tree.get(field)
                .and_then(Node::as_int)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(|| Error::malformed(format!("texture '{name}' has no valid {field}")))
        };
        let width = dimension("m_Width")?;
        let height = dimension("m_Height")?;
        let format = tree
            .get("m_TextureFormat")
            .and_then(Node::as_int)
            .unwrap_or_default();

        let stream = match tree.get_path(&["m_StreamData", "path"]).and_then(Node::as_str) {
            Some(path) if !path.is_empty() => {
                let field = |key: &str| {
                    tree.get_path(&["m_StreamData", key])
                        .and_then(Node::as_int)
                        .and_then(|v| u64::try_from(v).ok())
                        .ok_or_else(|| {
                            Error::malformed(format!("texture '{name}' has an invalid stream {key}"))
                        })
                };
                Some(StreamRef {
                    offset: field("offset")?,
                    size: field("size")?,
                    path: path.to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            name,
            width,
            height,
            format,
            stream,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    pub textures: usize,
    pub streamed: usize,
    pub inline: usize,
}

/// Resample `image` to exactly `width`×`height` and normalize it to opaque RGBA8.
///
/// Aspect ratio is not preserved.
pub fn fit_to_canvas(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let rgb = image
        .resize_exact(width, height, FilterType::CatmullRom)
        .to_rgb8();
    DynamicImage::ImageRgb8(rgb).to_rgba8()
}

/// Replace the pixels of every texture in `package` with `image`.
///
/// A package without any texture, or a texture whose current payload cannot be
/// located, is a malformed template.
pub fn overlay_image(package: &mut Package, image: &DynamicImage) -> Result<OverlayReport> {
    let locations: Vec<(String, usize)> = package
        .files
        .iter()
        .filter_map(|(key, blob)| blob.as_serialized().map(|file| (key, file)))
        .flat_map(|(key, file)| {
            file.objects
                .iter()
                .enumerate()
                .filter(|(_, object)| object.class == ObjectClass::Texture2D)
                .map(move |(index, _)| (key.clone(), index))
        })
        .collect();

    if locations.is_empty() {
        return Err(Error::malformed("package contains no texture"));
    }

    let mut report = OverlayReport::default();
    for (key, index) in locations {
        // Re-read each time: splicing an earlier texture may have moved this one.
        let info = TextureInfo::from_tree(texture_tree(package, &key, index)?)?;
        let pixels = fit_to_canvas(image, info.width, info.height).into_raw();
        let new_size = pixels.len() as i64;

        match &info.stream {
            Some(stream) => {
                splice_stream(package, stream, pixels)?;
                report.streamed += 1;
            }
            None => {
                let tree = texture_tree_mut(package, &key, index)?;
                if tree.get("image data").and_then(Node::as_bytes).is_none() {
                    return Err(Error::malformed(format!(
                        "texture '{}' has neither stream data nor inline image data",
                        info.name
                    )));
                }
                tree.set("image data", pixels);
                report.inline += 1;
            }
        }

        let tree = texture_tree_mut(package, &key, index)?;
        if info.stream.is_some() {
            if let Some(stream_data) = tree.get_mut("m_StreamData") {
                stream_data.set("size", new_size);
            }
        }
        tree.set("m_CompleteImageSize", new_size);
        tree.set("m_TextureFormat", RGBA32);
        tree.set("m_MipCount", 1);

        tracing::debug!(
            "Overlaid texture '{}' ({}x{}, format {} -> {})",
            info.name,
            info.width,
            info.height,
            info.format,
            RGBA32
        );
        report.textures += 1;
    }

    Ok(report)
}

fn texture_tree<'a>(package: &'a Package, key: &str, index: usize) -> Result<&'a Node> {
    package
        .files
        .get(key)
        .and_then(|blob| blob.as_serialized())
        .and_then(|file| file.objects.get(index))
        .map(|object| &object.tree)
        .ok_or_else(|| Error::malformed(format!("texture object {index} of {key} vanished")))
}

fn texture_tree_mut<'a>(package: &'a mut Package, key: &str, index: usize) -> Result<&'a mut Node> {
    package
        .files
        .get_mut(key)
        .and_then(|blob| blob.as_serialized_mut())
        .and_then(|file| file.objects.get_mut(index))
        .map(|object| &mut object.tree)
        .ok_or_else(|| Error::malformed(format!("texture object {index} of {key} vanished")))
}

/// Replace `stream`'s slice of its companion blob with `pixels` and shift every
/// later slice of the same stream by the size difference.
fn splice_stream(package: &mut Package, stream: &StreamRef, pixels: Vec<u8>) -> Result<()> {
    let resource_name = stream_path_key(&stream.path)
        .ok_or_else(|| Error::malformed(format!("invalid stream path '{}'", stream.path)))?;
    let data = package
        .files
        .get_mut(resource_name)
        .and_then(|blob| blob.as_resource_mut())
        .ok_or_else(|| Error::malformed(format!("missing stream blob {resource_name}")))?;

    let start = usize::try_from(stream.offset)
        .map_err(|_| Error::malformed("stream offset out of range"))?;
    let end = stream
        .offset
        .checked_add(stream.size)
        .and_then(|end| usize::try_from(end).ok())
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            Error::malformed(format!(
                "stream slice {}+{} exceeds {resource_name} ({} bytes)",
                stream.offset,
                stream.size,
                data.len()
            ))
        })?;

    let delta = pixels.len() as i64 - (end - start) as i64;
    data.splice(start..end, pixels);

    if delta != 0 {
        for object in package.objects_mut() {
            let same_stream = object
                .tree
                .get_path(&["m_StreamData", "path"])
                .and_then(Node::as_str)
                == Some(stream.path.as_str());
            if !same_stream {
                continue;
            }
            if let Some(Node::Int(offset)) = object.tree.get_path_mut(&["m_StreamData", "offset"]) {
                if *offset > stream.offset as i64 {
                    *offset += delta;
                }
            }
        }
    }

    Ok(())
}

/// First artwork file below `dir`, depth first with entries sorted by name.
/// Symbolic links are followed; broken ones are skipped.
pub fn find_source_image(dir: &Utf8Path) -> Result<Utf8PathBuf> {
    if !dir.is_dir() {
        return Err(Error::MissingSourceAsset(dir.to_path_buf()));
    }

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() > 0 => {
                tracing::warn!("Skipping unreadable entry under {}: {}", dir, error);
                continue;
            }
            Err(error) => return Err(std::io::Error::from(error).into()),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        let recognized = path
            .extension()
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if recognized {
            return Ok(path);
        }
    }

    Err(Error::MissingSourceAsset(dir.to_path_buf()))
}

/// Decode an artwork file. Vector images are recognized but cannot be rasterized.
pub fn load_source_image(path: &Utf8Path) -> Result<DynamicImage> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
    {
        return Err(Error::UnsupportedImage(path.to_path_buf()));
    }
    Ok(image::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{jacket_template, texture_tree as make_texture, TEMPLATE_HASH};
    use crate::package::{resource_key, AssetObject, Blob, SerializedFile};
    use image::{Rgba, RgbaImage};

    fn artwork(width: u32, height: u32) -> DynamicImage {
        // Semi-transparent so the alpha normalization is observable.
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 10, 30, 40])))
    }

    fn texture_info(package: &Package) -> TextureInfo {
        let (_, object) = package
            .objects()
            .find(|(_, object)| object.class == ObjectClass::Texture2D)
            .unwrap();
        TextureInfo::from_tree(&object.tree).unwrap()
    }

    #[test]
    fn test_overlay_keeps_canvas_dimensions() {
        let mut package = jacket_template(TEMPLATE_HASH, 1686, "", 512, 512);
        let report = overlay_image(&mut package, &artwork(1024, 768)).unwrap();
        assert_eq!(report.textures, 1);
        assert_eq!(report.streamed, 1);

        let info = texture_info(&package);
        assert_eq!((info.width, info.height), (512, 512));
        assert_eq!(info.format, RGBA32);
        assert_eq!(info.stream.as_ref().unwrap().size, 512 * 512 * 4);

        let data = package.files[&resource_key(TEMPLATE_HASH)]
            .as_resource()
            .unwrap();
        assert_eq!(data.len(), 512 * 512 * 4);
        assert!(data.chunks_exact(4).all(|px| px[3] == 255));
        assert_eq!(&data[..3], &[200, 10, 30]);
    }

    #[test]
    fn test_overlay_shifts_following_stream_slices() {
        let path = "archive:/CAB-t/CAB-t.resS";
        // 16x16 DXT1 (128 bytes) followed by an unrelated 64-byte slice.
        let first = make_texture("a", 16, 16, 10, Some((0, 128, path)), Vec::new());
        let mut package = Package::default();
        package.files.insert(
            "CAB-t".to_string(),
            Blob::Serialized(SerializedFile {
                objects: vec![AssetObject {
                    path_id: 1,
                    class: ObjectClass::Texture2D,
                    tree: first,
                }],
            }),
        );
        let second = make_texture("b", 4, 4, 4, Some((128, 64, path)), Vec::new());
        package.files.insert(
            "CAB-u".to_string(),
            Blob::Serialized(SerializedFile {
                objects: vec![AssetObject {
                    path_id: 2,
                    class: ObjectClass::Texture2D,
                    tree: second,
                }],
            }),
        );
        package
            .files
            .insert("CAB-t.resS".to_string(), Blob::Resource(vec![0; 192]));

        let report = overlay_image(&mut package, &artwork(8, 8)).unwrap();
        assert_eq!(report.textures, 2);

        let infos: Vec<_> = package
            .objects()
            .map(|(_, object)| TextureInfo::from_tree(&object.tree).unwrap())
            .collect();
        let a = infos[0].stream.as_ref().unwrap();
        let b = infos[1].stream.as_ref().unwrap();
        assert_eq!((a.offset, a.size), (0, 1024));
        assert_eq!((b.offset, b.size), (1024, 64));

        let data = package.files["CAB-t.resS"].as_resource().unwrap();
        assert_eq!(data.len(), 1024 + 64);
    }

    #[test]
    fn test_overlay_inline_texture() {
        let mut package = Package::default();
        package.files.insert(
            "CAB-i".to_string(),
            Blob::Serialized(SerializedFile {
                objects: vec![AssetObject {
                    path_id: 1,
                    class: ObjectClass::Texture2D,
                    tree: make_texture("i", 2, 3, 4, None, vec![0; 24]),
                }],
            }),
        );

        let report = overlay_image(&mut package, &artwork(10, 10)).unwrap();
        assert_eq!(report.inline, 1);

        let (_, object) = package.objects().next().unwrap();
        let data = object.tree.get("image data").and_then(Node::as_bytes).unwrap();
        assert_eq!(data.len(), 2 * 3 * 4);
        assert_eq!(
            object.tree.get("m_CompleteImageSize").and_then(Node::as_int),
            Some(24)
        );
    }

    #[test]
    fn test_overlay_without_texture_is_malformed() {
        let mut package = jacket_template(TEMPLATE_HASH, 1686, "", 4, 4);
        for blob in package.files.values_mut() {
            if let Some(file) = blob.as_serialized_mut() {
                file.objects.retain(|o| o.class != ObjectClass::Texture2D);
            }
        }
        assert!(matches!(
            overlay_image(&mut package, &artwork(4, 4)),
            Err(Error::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_overlay_missing_stream_blob_is_malformed() {
        let mut package = jacket_template(TEMPLATE_HASH, 1686, "", 4, 4);
        package.files.remove(&resource_key(TEMPLATE_HASH));
        assert!(matches!(
            overlay_image(&mut package, &artwork(4, 4)),
            Err(Error::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_fit_to_canvas_is_opaque() {
        let fitted = fit_to_canvas(&artwork(7, 3), 5, 9);
        assert_eq!(fitted.dimensions(), (5, 9));
        assert!(fitted.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn test_find_source_image_first_match() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();
        std::fs::create_dir(root.join("a_nested")).unwrap();
        std::fs::write(root.join("a_nested/cover.PNG"), "x").unwrap();
        std::fs::write(root.join("b.jpg"), "x").unwrap();

        let found = find_source_image(root).unwrap();
        assert_eq!(found, root.join("a_nested/cover.PNG"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_source_image_follows_links() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let shared = root.join("shared");
        let item = root.join("songA");
        std::fs::create_dir(&shared).unwrap();
        std::fs::create_dir(&item).unwrap();
        std::fs::write(shared.join("cover.png"), "x").unwrap();

        std::os::unix::fs::symlink(root.join("gone.png"), item.join("a_broken.png")).unwrap();
        std::os::unix::fs::symlink(shared.join("cover.png"), item.join("b_cover.png")).unwrap();

        let found = find_source_image(&item).unwrap();
        assert_eq!(found, item.join("b_cover.png"));
    }

    #[test]
    fn test_find_source_image_none() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("readme.md"), "x").unwrap();
        assert!(matches!(
            find_source_image(root),
            Err(Error::MissingSourceAsset(_))
        ));
        assert!(matches!(
            find_source_image(&root.join("missing")),
            Err(Error::MissingSourceAsset(_))
        ));
    }

    #[test]
    fn test_load_source_image() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        let png = root.join("cover.png");
        artwork(3, 2).save(&png).unwrap();
        let loaded = load_source_image(&png).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 2));

        let svg = root.join("cover.svg");
        std::fs::write(&svg, "<svg/>").unwrap();
        assert!(matches!(
            load_source_image(&svg),
            Err(Error::UnsupportedImage(_))
        ));
    }
}
