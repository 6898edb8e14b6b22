//! Services the importing application provides to the engine.

use std::path::PathBuf;

use crate::texture::{TextureRef, resolve_texture};

/// Application context handed to the importer.
pub trait HostEnvironment {
    /// Looks up an image referenced by a material. `None` means no texture.
    fn resolve_texture(&self, file_name: &str) -> Option<TextureRef>;

    /// Whether the target application offers a physically based material.
    fn supports_pbr_materials(&self) -> bool;

    /// Vendor name of the importing application, if known.
    fn vendor(&self) -> Option<&str>;
}

/// Host backed by the local file system.
#[derive(Debug, Clone, Default)]
pub struct FileSystemHost {
    /// Folder of the document being imported; used as texture fallback root.
    pub document_folder: Option<PathBuf>,
    pub pbr_materials: bool,
    pub vendor: Option<String>,
}

impl FileSystemHost {
    pub fn new(document_folder: Option<PathBuf>) -> Self {
        Self {
            document_folder,
            ..Self::default()
        }
    }

    pub fn with_pbr_materials(mut self, enabled: bool) -> Self {
        self.pbr_materials = enabled;
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

impl HostEnvironment for FileSystemHost {
    fn resolve_texture(&self, file_name: &str) -> Option<TextureRef> {
        resolve_texture(file_name, self.document_folder.as_deref())
    }

    fn supports_pbr_materials(&self) -> bool {
        self.pbr_materials
    }

    fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_builder_options_when_querying_host_then_values_are_reported() {
        let host = FileSystemHost::new(None)
            .with_pbr_materials(true)
            .with_vendor("Acme");

        assert!(host.supports_pbr_materials());
        assert_eq!(host.vendor(), Some("Acme"));
        assert!(host.resolve_texture("absent.png").is_none());
    }
}
