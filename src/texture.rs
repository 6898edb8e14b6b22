use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An image file that was found and probed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Candidate locations for a texture reference, in lookup order: the name as
/// stored, then the name joined onto the imported document's folder.
pub fn texture_candidates(file_name: &str, folder: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(file_name)];
    if let Some(folder) = folder {
        let joined = folder.join(file_name);
        if !candidates.contains(&joined) {
            candidates.push(joined);
        }
        // Absolute names from another machine still resolve by file name.
        if let Some(name) = Path::new(file_name).file_name() {
            let local = folder.join(name);
            if !candidates.contains(&local) {
                candidates.push(local);
            }
        }
    }
    candidates
}

/// Reads image dimensions without decoding pixel data.
pub fn probe_texture(path: &Path) -> Option<TextureRef> {
    match image::image_dimensions(path) {
        Ok((width, height)) => Some(TextureRef {
            path: path.to_path_buf(),
            width,
            height,
        }),
        Err(e) => {
            log::debug!("texture probe failed for {}: {e}", path.display());
            None
        }
    }
}

/// Resolves a texture reference to the first candidate that loads as an image.
/// A missing or unreadable file yields `None`.
pub fn resolve_texture(file_name: &str, folder: Option<&Path>) -> Option<TextureRef> {
    if file_name.is_empty() {
        return None;
    }

    let found = texture_candidates(file_name, folder)
        .into_iter()
        .find_map(|candidate| probe_texture(&candidate));

    if found.is_none() {
        log::warn!("texture not found: {file_name}");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn temp_folder(tag: &str) -> PathBuf {
        let folder = std::env::temp_dir().join(format!(
            "fbximport-texture-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&folder).expect("create temp folder");
        folder
    }

    #[test]
    fn given_relative_name_when_listing_candidates_then_folder_variant_follows_raw_name() {
        let candidates = texture_candidates("skin.png", Some(Path::new("/models")));
        assert_eq!(
            candidates,
            vec![PathBuf::from("skin.png"), PathBuf::from("/models/skin.png")]
        );
    }

    #[test]
    fn given_texture_next_to_document_when_resolving_then_dimensions_are_reported() {
        let folder = temp_folder("found");
        RgbaImage::new(8, 4)
            .save(folder.join("diffuse.png"))
            .expect("write png");

        let texture = resolve_texture("textures_elsewhere/diffuse.png", Some(&folder))
            .expect("texture resolves by file name");
        let _ = std::fs::remove_dir_all(&folder);

        assert_eq!((texture.width, texture.height), (8, 4));
        assert!(texture.path.ends_with("diffuse.png"));
    }

    #[test]
    fn given_missing_texture_when_resolving_then_none_is_returned() {
        let folder = temp_folder("missing");
        let texture = resolve_texture("nothing_here.png", Some(&folder));
        let _ = std::fs::remove_dir_all(&folder);

        assert!(texture.is_none());
        assert!(resolve_texture("", None).is_none());
    }
}
