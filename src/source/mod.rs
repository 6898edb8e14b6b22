//! Parsed interchange document model.
//!
//! The parser is an external collaborator: it hands over a fully parsed
//! node tree with attributes, deformers, materials, poses and animation
//! already resolved. Nodes live in an arena addressed by [`SourceNodeId`];
//! node 0 is the document root.

mod animation;
mod geometry;
mod surface;

use nalgebra::{Matrix4, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

pub use animation::{AnimCurve, AnimKey, AnimLayer, AnimStack, DeformCurve, NodeCurves};
pub use geometry::{
    CreaseElement, MappingMode, MaterialElement, PolygonGroupElement, ReferenceMode,
    SkinningType, SourceBlendShape, SourceBlendShapeChannel, SourceCluster, SourceDeformer,
    SourceMesh, SourceShape, SourceSkin, UvElement,
};
pub use surface::{
    ColorProperty, LambertSurface, PhongSurface, ScalarProperty, ShadingModel, SourceMaterial,
    TextureSlot,
};

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Index of a node in [`SourceScene::nodes`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SourceNodeId(pub usize);

impl SourceNodeId {
    pub const ROOT: Self = Self(0);
}

/// Index of a material in [`SourceScene::materials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceMaterialId(pub usize);

// ─── Node attributes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonType {
    Root,
    Limb,
    LimbNode,
    Effector,
}

/// Typed payload attached to a node. A node without an attribute is a plain
/// transform group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeAttribute {
    Null,
    Skeleton(SkeletonType),
    Mesh(Box<SourceMesh>),
    Marker,
    Nurbs,
    Patch,
    Camera,
    Light,
    LodGroup,
    Other(String),
}

/// Euler evaluation order; the first axis named is applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yzx,
    Yxz,
    Zxy,
    Zyx,
    SphericXyz,
}

impl EulerOrder {
    /// Builds the rotation described by per-axis angles in degrees.
    pub fn to_quaternion(self, degrees: &Vector3<f64>) -> UnitQuaternion<f64> {
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), degrees.x.to_radians());
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), degrees.y.to_radians());
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), degrees.z.to_radians());

        match self {
            EulerOrder::Xyz | EulerOrder::SphericXyz => rz * ry * rx,
            EulerOrder::Xzy => ry * rz * rx,
            EulerOrder::Yzx => rx * rz * ry,
            EulerOrder::Yxz => rz * rx * ry,
            EulerOrder::Zxy => ry * rx * rz,
            EulerOrder::Zyx => rx * ry * rz,
        }
    }
}

/// Transformation inheritance mode of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritType {
    RrSs,
    #[default]
    RSrs,
    /// Parent scale is not propagated.
    Rrs,
}

/// Per-axis rotation limits in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationLimits {
    pub active: bool,
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
    pub min_active: [bool; 3],
    pub max_active: [bool; 3],
}

impl Default for RotationLimits {
    fn default() -> Self {
        Self {
            active: false,
            min: Vector3::zeros(),
            max: Vector3::zeros(),
            min_active: [false; 3],
            max_active: [false; 3],
        }
    }
}

/// Value of a user-defined node property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Int(i32),
    Bool(bool),
    Float(f32),
    Double(f64),
    String(String),
    Vector([f64; 3]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProperty {
    pub name: String,
    pub value: PropertyValue,
}

// ─── Nodes ────────────────────────────────────────────────────────────────────

/// A transform-bearing element of the source hierarchy. Angles are degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceNode {
    pub name: String,
    pub attribute: Option<NodeAttribute>,
    pub translation: Vector3<f64>,
    pub rotation: Vector3<f64>,
    pub scaling: Vector3<f64>,
    pub pre_rotation: Vector3<f64>,
    pub post_rotation: Vector3<f64>,
    pub rotation_offset: Vector3<f64>,
    pub rotation_pivot: Vector3<f64>,
    pub scaling_offset: Vector3<f64>,
    pub scaling_pivot: Vector3<f64>,
    pub rotation_order: EulerOrder,
    pub rotation_limits: RotationLimits,
    pub inherit_type: InheritType,
    pub materials: Vec<SourceMaterialId>,
    pub user_properties: Vec<UserProperty>,
    pub parent: Option<SourceNodeId>,
    pub children: Vec<SourceNodeId>,
}

impl Default for SourceNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            attribute: None,
            translation: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scaling: Vector3::new(1.0, 1.0, 1.0),
            pre_rotation: Vector3::zeros(),
            post_rotation: Vector3::zeros(),
            rotation_offset: Vector3::zeros(),
            rotation_pivot: Vector3::zeros(),
            scaling_offset: Vector3::zeros(),
            scaling_pivot: Vector3::zeros(),
            rotation_order: EulerOrder::Xyz,
            rotation_limits: RotationLimits::default(),
            inherit_type: InheritType::RSrs,
            materials: Vec::new(),
            user_properties: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl SourceNode {
    pub fn new(name: impl Into<String>, attribute: Option<NodeAttribute>) -> Self {
        Self {
            name: name.into(),
            attribute,
            ..Self::default()
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn skeleton(name: impl Into<String>, skeleton_type: SkeletonType) -> Self {
        Self::new(name, Some(NodeAttribute::Skeleton(skeleton_type)))
    }

    pub fn mesh(name: impl Into<String>, mesh: SourceMesh) -> Self {
        Self::new(name, Some(NodeAttribute::Mesh(Box::new(mesh))))
    }

    pub fn with_translation(mut self, translation: Vector3<f64>) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_materials(mut self, materials: Vec<SourceMaterialId>) -> Self {
        self.materials = materials;
        self
    }

    pub fn skeleton_type(&self) -> Option<SkeletonType> {
        match self.attribute {
            Some(NodeAttribute::Skeleton(skeleton_type)) => Some(skeleton_type),
            _ => None,
        }
    }

    pub fn mesh_data(&self) -> Option<&SourceMesh> {
        match &self.attribute {
            Some(NodeAttribute::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    pub fn is_mesh(&self) -> bool {
        self.mesh_data().is_some()
    }

    pub fn is_skeleton(&self) -> bool {
        self.skeleton_type().is_some()
    }

    /// Local transform as `T * Roff * Rp * Rpre * R * Rpost⁻¹ * Rp⁻¹ * Soff * Sp * S * Sp⁻¹`.
    pub fn local_transform(&self) -> Matrix4<f64> {
        let translate = |v: Vector3<f64>| Translation3::from(v).to_homogeneous();

        let pre = EulerOrder::Xyz.to_quaternion(&self.pre_rotation);
        let rotation = self.rotation_order.to_quaternion(&self.rotation);
        let post = EulerOrder::Xyz.to_quaternion(&self.post_rotation);

        translate(self.translation)
            * translate(self.rotation_offset)
            * translate(self.rotation_pivot)
            * pre.to_homogeneous()
            * rotation.to_homogeneous()
            * post.inverse().to_homogeneous()
            * translate(-self.rotation_pivot)
            * translate(self.scaling_offset)
            * translate(self.scaling_pivot)
            * Matrix4::new_nonuniform_scaling(&self.scaling)
            * translate(-self.scaling_pivot)
    }
}

// ─── Matrices and poses ───────────────────────────────────────────────────────

/// A 4x4 matrix in the interchange format's row-vector convention: the
/// translation lives in row 3.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceMatrix(pub [[f64; 4]; 4]);

impl Default for SourceMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl SourceMatrix {
    pub fn identity() -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (index, row) in rows.iter_mut().enumerate() {
            row[index] = 1.0;
        }
        Self(rows)
    }

    /// Converts from nalgebra's column-vector convention.
    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = matrix[(c, r)];
            }
        }
        Self(rows)
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_matrix4(&Translation3::from(translation).to_homogeneous())
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.0[3][0], self.0[3][1], self.0[3][2])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseEntry {
    pub node: SourceNodeId,
    pub matrix: SourceMatrix,
}

/// A stored pose; bind poses record the matrices skin weights were authored at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePose {
    pub name: String,
    pub is_bind_pose: bool,
    pub entries: Vec<PoseEntry>,
}

/// Named set of polygons on one mesh node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSet {
    pub name: String,
    pub mesh: SourceNodeId,
    pub polygons: Vec<usize>,
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub revision: Option<String>,
    pub comment: Option<String>,
    pub application_vendor: Option<String>,
    pub application_name: Option<String>,
    pub application_version: Option<String>,
    pub file_version: Option<i32>,
    pub is_binary: bool,
}

// ─── Scene ────────────────────────────────────────────────────────────────────

/// A parsed interchange document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceScene {
    pub nodes: Vec<SourceNode>,
    pub materials: Vec<SourceMaterial>,
    pub poses: Vec<SourcePose>,
    pub anim_stacks: Vec<AnimStack>,
    pub selection_sets: Vec<SelectionSet>,
    pub metadata: DocumentInfo,
}

impl Default for SourceScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceScene {
    /// Creates a document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![SourceNode::group("RootNode")],
            materials: Vec::new(),
            poses: Vec::new(),
            anim_stacks: Vec::new(),
            selection_sets: Vec::new(),
            metadata: DocumentInfo::default(),
        }
    }

    pub fn root(&self) -> SourceNodeId {
        SourceNodeId::ROOT
    }

    pub fn node(&self, id: SourceNodeId) -> &SourceNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: SourceNodeId) -> Option<&SourceNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: SourceNodeId) -> &mut SourceNode {
        &mut self.nodes[id.0]
    }

    /// Appends `node` under `parent` and returns its id.
    pub fn add_node(&mut self, parent: SourceNodeId, mut node: SourceNode) -> SourceNodeId {
        let id = SourceNodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_material(&mut self, material: SourceMaterial) -> SourceMaterialId {
        self.materials.push(material);
        SourceMaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: SourceMaterialId) -> Option<&SourceMaterial> {
        self.materials.get(id.0)
    }

    pub fn parent(&self, id: SourceNodeId) -> Option<SourceNodeId> {
        self.node(id).parent
    }

    /// Global transform obtained by chaining local transforms up to the root.
    pub fn evaluate_global_transform(&self, id: SourceNodeId) -> Matrix4<f64> {
        let mut world = self.node(id).local_transform();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            world = self.node(parent).local_transform() * world;
            current = self.parent(parent);
        }
        world
    }

    /// Matrix recorded for `id` in any bind pose. Later entries win.
    pub fn bind_pose_matrix(&self, id: SourceNodeId) -> Option<SourceMatrix> {
        self.poses
            .iter()
            .filter(|pose| pose.is_bind_pose)
            .flat_map(|pose| pose.entries.iter())
            .filter(|entry| entry.node == id)
            .map(|entry| entry.matrix)
            .last()
    }

    /// Checks that every id stored in the document resolves.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.nodes.is_empty() {
            return Err(ImportError::invalid_source("document has no root node"));
        }

        let node_count = self.nodes.len();
        let material_count = self.materials.len();

        for (index, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                let Some(child_node) = self.nodes.get(child.0) else {
                    return Err(ImportError::invalid_source(format!(
                        "node '{}' lists missing child {}",
                        node.name, child.0
                    )));
                };
                if child_node.parent != Some(SourceNodeId(index)) {
                    return Err(ImportError::invalid_source(format!(
                        "node '{}' does not point back to parent '{}'",
                        child_node.name, node.name
                    )));
                }
            }

            if let Some(material) = node.materials.iter().find(|m| m.0 >= material_count) {
                return Err(ImportError::invalid_source(format!(
                    "node '{}' references missing material {}",
                    node.name, material.0
                )));
            }

            if let Some(mesh) = node.mesh_data() {
                mesh.validate(&node.name, node_count)?;
            }
        }

        self.validate_hierarchy()?;

        for pose in &self.poses {
            if let Some(entry) = pose.entries.iter().find(|e| e.node.0 >= node_count) {
                return Err(ImportError::invalid_source(format!(
                    "pose '{}' references missing node {}",
                    pose.name, entry.node.0
                )));
            }
        }

        for set in &self.selection_sets {
            if set.mesh.0 >= node_count {
                return Err(ImportError::invalid_source(format!(
                    "selection set '{}' references missing node {}",
                    set.name, set.mesh.0
                )));
            }
        }

        Ok(())
    }

    /// Every node must be reached exactly once walking down from the root.
    /// Child ids are known to resolve when this runs.
    fn validate_hierarchy(&self) -> Result<(), ImportError> {
        let root = self.node(self.root());
        if root.parent.is_some() {
            return Err(ImportError::invalid_source(format!(
                "root node '{}' has a parent",
                root.name
            )));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.0], true) {
                return Err(ImportError::invalid_source(format!(
                    "node '{}' is reached twice, the hierarchy has a cycle or a repeated child",
                    self.node(id).name
                )));
            }
            stack.extend(self.node(id).children.iter().copied());
        }

        if let Some(index) = visited.iter().position(|&seen| !seen) {
            return Err(ImportError::invalid_source(format!(
                "node '{}' is not connected to the root",
                self.nodes[index].name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_translations_when_evaluating_global_transform_then_offsets_accumulate() {
        let mut scene = SourceScene::new();
        let a = scene.add_node(
            scene.root(),
            SourceNode::group("A").with_translation(Vector3::new(1.0, 0.0, 0.0)),
        );
        let b = scene.add_node(
            a,
            SourceNode::group("B").with_translation(Vector3::new(0.0, 2.0, 0.0)),
        );

        let world = scene.evaluate_global_transform(b);
        assert!((world[(0, 3)] - 1.0).abs() < 1e-9);
        assert!((world[(1, 3)] - 2.0).abs() < 1e-9);
        assert!(world[(2, 3)].abs() < 1e-9);
    }

    #[test]
    fn given_rotated_parent_when_evaluating_global_transform_then_child_offset_rotates() {
        let mut scene = SourceScene::new();
        let mut parent = SourceNode::group("Parent");
        parent.rotation = Vector3::new(0.0, 0.0, 90.0);
        let parent = scene.add_node(scene.root(), parent);
        let child = scene.add_node(
            parent,
            SourceNode::group("Child").with_translation(Vector3::new(1.0, 0.0, 0.0)),
        );

        let world = scene.evaluate_global_transform(child);
        assert!(world[(0, 3)].abs() < 1e-9);
        assert!((world[(1, 3)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn given_two_bind_poses_when_looking_up_node_then_last_entry_wins() {
        let mut scene = SourceScene::new();
        let node = scene.add_node(scene.root(), SourceNode::group("Joint"));
        for y in [1.0, 5.0] {
            scene.poses.push(SourcePose {
                name: format!("pose{y}"),
                is_bind_pose: true,
                entries: vec![PoseEntry {
                    node,
                    matrix: SourceMatrix::from_translation(Vector3::new(0.0, y, 0.0)),
                }],
            });
        }
        scene.poses.push(SourcePose {
            name: "rest".to_string(),
            is_bind_pose: false,
            entries: vec![PoseEntry {
                node,
                matrix: SourceMatrix::from_translation(Vector3::new(0.0, 9.0, 0.0)),
            }],
        });

        let matrix = scene.bind_pose_matrix(node).expect("bind pose entry");
        assert_eq!(matrix.translation(), Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn given_euler_orders_when_building_quaternions_then_first_axis_is_applied_first() {
        let degrees = Vector3::new(90.0, 90.0, 0.0);
        let xyz = EulerOrder::Xyz.to_quaternion(&degrees);
        let yxz = EulerOrder::Yxz.to_quaternion(&degrees);

        let v = Vector3::new(0.0, 0.0, 1.0);
        // X first sends +Z to -Y, the Y turn leaves it there.
        assert!((xyz * v - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-9);
        // Y first sends +Z to +X, the X turn leaves it there.
        assert!((yxz * v - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn given_dangling_material_when_validating_then_invalid_source_is_reported() {
        let mut scene = SourceScene::new();
        scene.add_node(
            scene.root(),
            SourceNode::group("Broken").with_materials(vec![SourceMaterialId(3)]),
        );

        let error = scene.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("missing material"));
    }

    #[test]
    fn given_parent_cycle_when_validating_then_invalid_source_is_reported() {
        let mut scene = SourceScene::new();
        let a = scene.add_node(scene.root(), SourceNode::group("A"));
        let b = scene.add_node(a, SourceNode::group("B"));
        // A and B point at each other and are cut off from the root.
        scene.node_mut(scene.root()).children.clear();
        scene.node_mut(a).parent = Some(b);
        scene.node_mut(b).children.push(a);

        let error = scene.validate().expect_err("validation should fail");
        assert!(matches!(error, ImportError::InvalidSource { .. }));
        assert!(error.to_string().contains("not connected to the root"));
    }

    #[test]
    fn given_root_listed_as_child_when_validating_then_invalid_source_is_reported() {
        let mut scene = SourceScene::new();
        let a = scene.add_node(scene.root(), SourceNode::group("A"));
        scene.node_mut(scene.root()).parent = Some(a);
        let root = scene.root();
        scene.node_mut(a).children.push(root);

        let error = scene.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("has a parent"));
    }

    #[test]
    fn given_repeated_child_entry_when_validating_then_invalid_source_is_reported() {
        let mut scene = SourceScene::new();
        let a = scene.add_node(scene.root(), SourceNode::group("A"));
        scene.node_mut(scene.root()).children.push(a);

        let error = scene.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("reached twice"));
    }

    #[test]
    fn given_scene_json_when_round_tripping_then_hierarchy_is_kept() {
        let mut scene = SourceScene::new();
        let root = scene.add_node(scene.root(), SourceNode::skeleton("Hips", SkeletonType::Root));
        scene.add_node(root, SourceNode::skeleton("Spine", SkeletonType::LimbNode));

        let json = serde_json::to_string(&scene).expect("serialize scene");
        let parsed: SourceScene = serde_json::from_str(&json).expect("parse scene");

        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.node(root).children.len(), 1);
        assert_eq!(
            parsed.node(parsed.node(root).children[0]).skeleton_type(),
            Some(SkeletonType::LimbNode)
        );
    }
}
