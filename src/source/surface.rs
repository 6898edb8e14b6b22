use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A file texture connected to a material property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorProperty {
    pub value: Vector3<f64>,
    pub textures: Vec<TextureSlot>,
}

impl Default for ColorProperty {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl ColorProperty {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            value: Vector3::new(r, g, b),
            textures: Vec::new(),
        }
    }

    pub fn gray(level: f64) -> Self {
        Self::new(level, level, level)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarProperty {
    pub value: f64,
    pub textures: Vec<TextureSlot>,
}

impl ScalarProperty {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            textures: Vec::new(),
        }
    }
}

/// Diffuse-only surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambertSurface {
    pub diffuse: ColorProperty,
    pub diffuse_factor: ScalarProperty,
    pub ambient: ColorProperty,
    pub ambient_factor: ScalarProperty,
    /// Transparency encoded as a color, black meaning opaque.
    pub transparent_color: ColorProperty,
}

impl Default for LambertSurface {
    fn default() -> Self {
        Self {
            diffuse: ColorProperty::gray(0.8),
            diffuse_factor: ScalarProperty::new(1.0),
            ambient: ColorProperty::gray(0.2),
            ambient_factor: ScalarProperty::new(1.0),
            transparent_color: ColorProperty::gray(0.0),
        }
    }
}

/// Lambert plus a specular highlight and reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhongSurface {
    #[serde(flatten)]
    pub lambert: LambertSurface,
    pub specular: ColorProperty,
    pub specular_factor: ScalarProperty,
    pub shininess: ScalarProperty,
    pub reflection_factor: ScalarProperty,
}

impl Default for PhongSurface {
    fn default() -> Self {
        Self {
            lambert: LambertSurface::default(),
            specular: ColorProperty::gray(0.2),
            specular_factor: ScalarProperty::new(1.0),
            shininess: ScalarProperty::new(20.0),
            reflection_factor: ScalarProperty::new(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ShadingModel {
    Phong(PhongSurface),
    Lambert(LambertSurface),
    Other { class_name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMaterial {
    pub name: String,
    pub model: ShadingModel,
}

impl SourceMaterial {
    pub fn phong(name: impl Into<String>, surface: PhongSurface) -> Self {
        Self {
            name: name.into(),
            model: ShadingModel::Phong(surface),
        }
    }

    pub fn lambert(name: impl Into<String>, surface: LambertSurface) -> Self {
        Self {
            name: name.into(),
            model: ShadingModel::Lambert(surface),
        }
    }
}
