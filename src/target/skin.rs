use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Fixed-point value of a full weight.
pub const WEIGHT_MAX: u16 = u16::MAX;

/// Dense per-vertex weights in fixed point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightMap {
    pub weights: Vec<u16>,
}

impl WeightMap {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            weights: vec![0; vertex_count],
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn get(&self, vertex: usize) -> u16 {
        self.weights.get(vertex).copied().unwrap_or(0)
    }
}

/// Bone-space bind transform: rotation rows plus a translation row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindingMatrix {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for BindingMatrix {
    fn default() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneBinding {
    pub bone: NodeId,
    pub weights: WeightMap,
    pub matrix: BindingMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingMode {
    #[default]
    Legacy,
    /// Weights come from per-bone binding maps.
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    #[default]
    Legacy,
    BindingMaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralMapMode {
    #[default]
    Linear,
    DualQuaternion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Per-vertex blend; 0 is linear, [`WEIGHT_MAX`] is dual quaternion.
    BlendLinearDualQuaternion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinBlend {
    pub mode: BlendMode,
    pub weights: WeightMap,
}

/// Skin binding owned by a figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinBinding {
    /// Zero until the first mesh binds to the figure.
    pub target_vertex_count: usize,
    pub bone_bindings: Vec<BoneBinding>,
    pub binding_mode: BindingMode,
    pub scale_mode: ScaleMode,
    pub general_map_mode: GeneralMapMode,
    pub blend: Option<SkinBlend>,
}

impl SkinBinding {
    /// Sum of all bone weights at `vertex`, widened to avoid overflow.
    pub fn total_weight(&self, vertex: usize) -> u32 {
        self.bone_bindings
            .iter()
            .map(|binding| u32::from(binding.weights.get(vertex)))
            .sum()
    }
}
