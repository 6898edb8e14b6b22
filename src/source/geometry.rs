use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{SourceMatrix, SourceNodeId};
use crate::error::ImportError;

// ─── Layer elements ───────────────────────────────────────────────────────────

/// How a layer element's values are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    #[default]
    ByControlPoint,
    ByPolygonVertex,
    ByPolygon,
    ByEdge,
    AllSame,
}

/// Whether values are read directly or through an index array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    #[default]
    Direct,
    IndexToDirect,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UvElement {
    pub name: String,
    pub mapping: MappingMode,
    pub reference: ReferenceMode,
    pub direct: Vec<[f64; 2]>,
    pub index: Vec<usize>,
}

impl UvElement {
    /// UV index for the `corner`-th polygon-vertex of the mesh when the
    /// element is addressed by polygon vertex.
    pub fn polygon_vertex_index(&self, corner: usize) -> Option<usize> {
        match self.reference {
            ReferenceMode::Direct => Some(corner),
            ReferenceMode::IndexToDirect => self.index.get(corner).copied(),
        }
    }

    /// UV index for a control point when the element is addressed by
    /// control point.
    pub fn control_point_index(&self, vertex: usize) -> Option<usize> {
        match self.reference {
            ReferenceMode::Direct => Some(vertex),
            ReferenceMode::IndexToDirect => self.index.get(vertex).copied(),
        }
    }
}

/// Subdivision crease weights, per control point or per edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreaseElement {
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialElement {
    pub mapping: MappingMode,
    pub indices: Vec<i32>,
}

/// Polygon-group ids, one per polygon when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonGroupElement {
    pub indices: Vec<i32>,
}

// ─── Deformers ────────────────────────────────────────────────────────────────

/// Skinning evaluation strategy declared by a skin deformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinningType {
    Rigid,
    #[default]
    Linear,
    DualQuaternion,
    /// Per-vertex blend between linear and dual-quaternion skinning.
    Blend,
}

/// One bone link with the sparse list of control points it influences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCluster {
    pub link: SourceNodeId,
    pub indices: Vec<usize>,
    pub weights: Vec<f64>,
    /// Global matrix of the link at bind time.
    pub transform_link: SourceMatrix,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSkin {
    pub skinning_type: SkinningType,
    pub clusters: Vec<SourceCluster>,
    /// Control points carrying a linear/dual-quaternion blend weight.
    pub blend_indices: Vec<usize>,
    pub blend_weights: Vec<f64>,
}

/// A target shape. When `indices` is present, `control_points[k]` is the
/// shaped position of control point `indices[k]`; otherwise the array is dense.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceShape {
    pub control_points: Vec<Vector3<f64>>,
    pub indices: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceBlendShapeChannel {
    pub name: String,
    /// Static deform value in percent.
    pub deform_percent: f64,
    pub target_shapes: Vec<SourceShape>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceBlendShape {
    pub name: String,
    pub channels: Vec<SourceBlendShapeChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDeformer {
    Skin(SourceSkin),
    BlendShape(SourceBlendShape),
}

// ─── Mesh ─────────────────────────────────────────────────────────────────────

/// Polygonal geometry. Each polygon lists control-point indices in winding
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMesh {
    pub control_points: Vec<Vector3<f64>>,
    pub polygons: Vec<Vec<usize>>,
    pub uv_elements: Vec<UvElement>,
    pub vertex_creases: Vec<CreaseElement>,
    pub edge_creases: Vec<CreaseElement>,
    pub material_elements: Vec<MaterialElement>,
    pub polygon_groups: Vec<PolygonGroupElement>,
    pub deformers: Vec<SourceDeformer>,
}

impl SourceMesh {
    pub fn new(control_points: Vec<Vector3<f64>>, polygons: Vec<Vec<usize>>) -> Self {
        Self {
            control_points,
            polygons,
            ..Self::default()
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn skins(&self) -> impl Iterator<Item = &SourceSkin> {
        self.deformers.iter().filter_map(|deformer| match deformer {
            SourceDeformer::Skin(skin) => Some(skin),
            SourceDeformer::BlendShape(_) => None,
        })
    }

    pub fn blend_shapes(&self) -> impl Iterator<Item = &SourceBlendShape> {
        self.deformers.iter().filter_map(|deformer| match deformer {
            SourceDeformer::BlendShape(shape) => Some(shape),
            SourceDeformer::Skin(_) => None,
        })
    }

    pub fn has_skin(&self) -> bool {
        self.skins().next().is_some()
    }

    pub(super) fn validate(&self, node_name: &str, node_count: usize) -> Result<(), ImportError> {
        let vertex_count = self.control_points.len();

        if let Some(polygon) = self
            .polygons
            .iter()
            .position(|polygon| polygon.iter().any(|&v| v >= vertex_count))
        {
            return Err(ImportError::invalid_source(format!(
                "mesh '{node_name}' polygon {polygon} references a missing control point"
            )));
        }

        for skin in self.skins() {
            for cluster in &skin.clusters {
                if cluster.link.0 >= node_count {
                    return Err(ImportError::invalid_source(format!(
                        "mesh '{node_name}' has a cluster linked to missing node {}",
                        cluster.link.0
                    )));
                }
                if cluster.indices.len() != cluster.weights.len() {
                    return Err(ImportError::invalid_source(format!(
                        "mesh '{node_name}' has a cluster with {} indices but {} weights",
                        cluster.indices.len(),
                        cluster.weights.len()
                    )));
                }
            }
        }

        Ok(())
    }
}
