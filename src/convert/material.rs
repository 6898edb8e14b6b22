use crate::host::HostEnvironment;
use crate::source::{
    ColorProperty, LambertSurface, PhongSurface, ScalarProperty, ShadingModel, SourceMaterial,
    SourceMaterialId,
};
use crate::target::{BasicSurface, MaterialId, MaterialRecord, PbrSurface, Shading};
use crate::texture::TextureRef;

use super::Importer;
use super::units::{opacity_from_transparency, phong_roughness, specular_metallicity};

const DEFAULT_MATERIAL_NAME: &str = "Default";

/// Opacity below which a material counts as fully transparent.
const TRANSPARENT_OPACITY: f64 = 0.1;

fn first_texture(host: &dyn HostEnvironment, property: &ColorProperty) -> Option<TextureRef> {
    property
        .textures
        .first()
        .and_then(|slot| host.resolve_texture(&slot.file_name))
}

fn first_scalar_texture(
    host: &dyn HostEnvironment,
    property: &ScalarProperty,
) -> Option<TextureRef> {
    property
        .textures
        .first()
        .and_then(|slot| host.resolve_texture(&slot.file_name))
}

fn clamp_color(color: &ColorProperty) -> nalgebra::Vector3<f64> {
    color.value.map(|channel| channel.clamp(0.0, 1.0))
}

fn apply_lambert(record: &mut MaterialRecord, surface: &LambertSurface, host: &dyn HostEnvironment) {
    record.diffuse_color = clamp_color(&surface.diffuse);
    record.diffuse_map = first_texture(host, &surface.diffuse);
    record.base_opacity = opacity_from_transparency(&surface.transparent_color.value);
    record.opacity_map = first_texture(host, &surface.transparent_color);
}

fn basic_lambert(surface: &LambertSurface, host: &dyn HostEnvironment) -> BasicSurface {
    BasicSurface {
        diffuse_strength: surface.diffuse_factor.value,
        ambient_color: clamp_color(&surface.ambient),
        ambient_map: first_texture(host, &surface.ambient),
        ambient_strength: surface.ambient_factor.value,
        ..BasicSurface::default()
    }
}

fn basic_phong(surface: &PhongSurface, host: &dyn HostEnvironment) -> BasicSurface {
    BasicSurface {
        specular_color: clamp_color(&surface.specular),
        specular_map: first_texture(host, &surface.specular),
        specular_strength: surface.specular_factor.value,
        glossiness: surface.shininess.value,
        glossiness_map: first_scalar_texture(host, &surface.shininess),
        reflection_strength: surface.reflection_factor.value,
        reflection_map: first_scalar_texture(host, &surface.reflection_factor),
        ..basic_lambert(&surface.lambert, host)
    }
}

/// Maps a source material onto the target's basic or physically based
/// material.
pub(super) fn map_material(material: &SourceMaterial, host: &dyn HostEnvironment) -> MaterialRecord {
    let pbr = host.supports_pbr_materials();

    match &material.model {
        ShadingModel::Phong(surface) => {
            let shading = if pbr {
                Shading::Pbr(PbrSurface {
                    roughness: phong_roughness(surface.shininess.value),
                    metallicity: specular_metallicity(&surface.specular.value),
                })
            } else {
                Shading::Basic(basic_phong(surface, host))
            };
            let mut record = MaterialRecord::new(&material.name, shading);
            apply_lambert(&mut record, &surface.lambert, host);
            record
        }
        ShadingModel::Lambert(surface) => {
            let shading = if pbr {
                Shading::Pbr(PbrSurface::default())
            } else {
                Shading::Basic(basic_lambert(surface, host))
            };
            let mut record = MaterialRecord::new(&material.name, shading);
            apply_lambert(&mut record, surface, host);
            record
        }
        ShadingModel::Other { class_name } => {
            log::warn!(
                "material '{}' uses unsupported shading '{class_name}', defaults applied",
                material.name
            );
            default_record(&material.name, pbr)
        }
    }
}

fn default_record(name: &str, pbr: bool) -> MaterialRecord {
    let shading = if pbr {
        Shading::Pbr(PbrSurface::default())
    } else {
        Shading::Basic(BasicSurface::default())
    };
    MaterialRecord::new(name, shading)
}

/// Whether every opacity is at or below the transparency threshold.
pub(super) fn all_transparent(opacities: &[f64]) -> bool {
    !opacities.is_empty() && opacities.iter().all(|&opacity| opacity <= TRANSPARENT_OPACITY)
}

impl Importer<'_> {
    /// Target material for a source material, created on first use.
    pub(super) fn material_for(&mut self, id: SourceMaterialId) -> Option<(String, MaterialId)> {
        let source = self.source.material(id)?;
        if let Some(&existing) = self.materials.get(&id) {
            return Some((source.name.clone(), existing));
        }

        let record = map_material(source, self.host);
        log::debug!("created material '{}'", record.name);
        let created = self.target.add_material(record);
        self.materials.insert(id, created);
        self.created_materials.push(created);
        Some((source.name.clone(), created))
    }

    /// Shared material for meshes without one.
    pub(super) fn default_material(&mut self) -> (String, MaterialId) {
        let id = match self.default_material {
            Some(id) => id,
            None => {
                let record = default_record(DEFAULT_MATERIAL_NAME, self.host.supports_pbr_materials());
                let id = self.target.add_material(record);
                self.default_material = Some(id);
                self.created_materials.push(id);
                id
            }
        };
        (DEFAULT_MATERIAL_NAME.to_string(), id)
    }

    /// A scene where every imported material is see-through was almost
    /// certainly authored with inverted transparency; make them opaque.
    pub(super) fn fix_all_transparent_materials(&mut self) {
        let opacities: Vec<f64> = self
            .created_materials
            .iter()
            .map(|&id| self.target.material_mut(id).base_opacity)
            .collect();
        if !all_transparent(&opacities) {
            return;
        }

        log::warn!(
            "all {} material(s) are transparent, forcing them opaque",
            opacities.len()
        );
        for &id in &self.created_materials {
            self.target.material_mut(id).base_opacity = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::host::FileSystemHost;
    use crate::source::TextureSlot;

    fn red_phong() -> SourceMaterial {
        let mut surface = PhongSurface::default();
        surface.lambert.diffuse = ColorProperty::new(1.5, 0.0, 0.0);
        surface.lambert.transparent_color = ColorProperty::gray(0.25);
        surface.specular = ColorProperty::new(1.0, 0.0, 0.0);
        surface.shininess = ScalarProperty::new(64.0);
        SourceMaterial::phong("Skin", surface)
    }

    #[test]
    fn given_phong_material_when_mapping_to_basic_then_slots_are_copied() {
        let record = map_material(&red_phong(), &FileSystemHost::new(None));

        assert_eq!(record.name, "Skin");
        assert_eq!(record.diffuse_color, Vector3::new(1.0, 0.0, 0.0));
        assert!((record.base_opacity - 0.75).abs() < 1e-12);
        let basic = record.basic().expect("basic shading");
        assert_eq!(basic.glossiness, 64.0);
        assert_eq!(basic.specular_color, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(basic.ambient_color, Vector3::new(0.2, 0.2, 0.2));
    }

    #[test]
    fn given_pbr_host_when_mapping_phong_then_roughness_and_metallicity_are_derived() {
        let host = FileSystemHost::new(None).with_pbr_materials(true);
        let record = map_material(&red_phong(), &host);

        let pbr = record.pbr().expect("pbr shading");
        assert!((pbr.roughness - 0.6).abs() < 1e-12);
        assert_eq!(pbr.metallicity, 1.0);
    }

    #[test]
    fn given_pbr_host_and_zero_shininess_when_mapping_phong_then_roughness_stays_finite() {
        let mut material = red_phong();
        if let ShadingModel::Phong(surface) = &mut material.model {
            surface.shininess.value = 0.0;
        }
        let host = FileSystemHost::new(None).with_pbr_materials(true);
        let record = map_material(&material, &host);

        let pbr = record.pbr().expect("pbr shading");
        assert_eq!(pbr.roughness, 1.0);
    }

    #[test]
    fn given_missing_texture_when_mapping_then_map_stays_empty() {
        let mut surface = LambertSurface::default();
        surface.diffuse.textures.push(TextureSlot {
            file_name: "does-not-exist.png".to_string(),
        });
        let record = map_material(
            &SourceMaterial::lambert("Cloth", surface),
            &FileSystemHost::new(None),
        );

        assert!(record.diffuse_map.is_none());
        assert!((record.diffuse_color - Vector3::new(0.8, 0.8, 0.8)).norm() < 1e-12);
        assert_eq!(record.base_opacity, 1.0);
    }

    #[test]
    fn given_unknown_shading_when_mapping_then_defaults_are_used() {
        let material = SourceMaterial {
            name: "Toon".to_string(),
            model: ShadingModel::Other {
                class_name: "CelShader".to_string(),
            },
        };
        let record = map_material(&material, &FileSystemHost::new(None));
        assert_eq!(record.basic(), Some(&BasicSurface::default()));
    }

    #[test]
    fn given_opacities_when_checking_transparency_then_all_must_be_low() {
        assert!(all_transparent(&[0.0, 0.1]));
        assert!(!all_transparent(&[0.0, 0.5]));
        assert!(!all_transparent(&[]));
    }
}
