use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::texture::TextureRef;

/// Slots of the fixed-function material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicSurface {
    pub diffuse_strength: f64,
    pub ambient_color: Vector3<f64>,
    pub ambient_map: Option<TextureRef>,
    pub ambient_strength: f64,
    pub specular_color: Vector3<f64>,
    pub specular_map: Option<TextureRef>,
    pub specular_strength: f64,
    pub glossiness: f64,
    pub glossiness_map: Option<TextureRef>,
    pub reflection_strength: f64,
    pub reflection_map: Option<TextureRef>,
}

impl Default for BasicSurface {
    fn default() -> Self {
        Self {
            diffuse_strength: 1.0,
            ambient_color: Vector3::zeros(),
            ambient_map: None,
            ambient_strength: 1.0,
            specular_color: Vector3::new(1.0, 1.0, 1.0),
            specular_map: None,
            specular_strength: 1.0,
            glossiness: 1.0,
            glossiness_map: None,
            reflection_strength: 1.0,
            reflection_map: None,
        }
    }
}

/// Slots of the physically based material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PbrSurface {
    pub roughness: f64,
    pub metallicity: f64,
}

impl Default for PbrSurface {
    fn default() -> Self {
        Self {
            roughness: 0.1,
            metallicity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shading {
    Basic(BasicSurface),
    Pbr(PbrSurface),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    /// Linear RGB in `[0, 1]`.
    pub diffuse_color: Vector3<f64>,
    pub diffuse_map: Option<TextureRef>,
    pub base_opacity: f64,
    pub opacity_map: Option<TextureRef>,
    pub shading: Shading,
}

impl MaterialRecord {
    pub fn new(name: impl Into<String>, shading: Shading) -> Self {
        Self {
            name: name.into(),
            diffuse_color: Vector3::new(1.0, 1.0, 1.0),
            diffuse_map: None,
            base_opacity: 1.0,
            opacity_map: None,
            shading,
        }
    }

    pub fn basic(&self) -> Option<&BasicSurface> {
        match &self.shading {
            Shading::Basic(surface) => Some(surface),
            Shading::Pbr(_) => None,
        }
    }

    pub fn pbr(&self) -> Option<&PbrSurface> {
        match &self.shading {
            Shading::Pbr(surface) => Some(surface),
            Shading::Basic(_) => None,
        }
    }
}
