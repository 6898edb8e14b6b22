use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::source::{DocumentInfo, SourceNodeId, SourceSkin};
use crate::target::{NodeId, Tick, WeightMap};

// ─── Report ───────────────────────────────────────────────────────────────────

/// Validation severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic produced before or during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Summary returned by a successful import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub document: DocumentInfo,
    /// Name of the animation stack that was applied.
    pub take: Option<String>,
    /// Every created target node, in creation order.
    pub imported_nodes: Vec<NodeId>,
    pub figure_count: usize,
    pub bone_count: usize,
    pub mesh_count: usize,
    pub material_count: usize,
    pub morph_count: usize,
    pub skin_binding_count: usize,
    pub replicated_skeleton_count: usize,
    /// Latest animation key written.
    pub end_tick: Tick,
    pub issues: Vec<ValidationIssue>,
}

// ─── Work tree ────────────────────────────────────────────────────────────────

/// Index of a node in [`WorkTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct WorkNodeId(pub usize);

/// Engine bookkeeping for one visit of a source node. Replication visits the
/// same source node again, so several work nodes may share a source.
#[derive(Debug, Clone)]
pub(super) struct WorkNode {
    pub parent: Option<WorkNodeId>,
    pub source: SourceNodeId,
    pub target: Option<NodeId>,
    /// Nearest created target ancestor.
    pub target_parent: Option<NodeId>,
    pub bind_translation: Vector3<f64>,
    /// Bind translation lives in the mesh vertices instead of the origin.
    pub collapse_translation: bool,
}

#[derive(Debug, Clone)]
pub(super) struct WorkTree {
    nodes: Vec<WorkNode>,
}

impl WorkTree {
    pub const ROOT: WorkNodeId = WorkNodeId(0);

    /// Creates the tree with a sentinel wrapping the document root.
    pub fn new(root: SourceNodeId) -> Self {
        Self {
            nodes: vec![WorkNode {
                parent: None,
                source: root,
                target: None,
                target_parent: None,
                bind_translation: Vector3::zeros(),
                collapse_translation: false,
            }],
        }
    }

    pub fn get(&self, id: WorkNodeId) -> &WorkNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: WorkNodeId) -> &mut WorkNode {
        &mut self.nodes[id.0]
    }

    pub fn add_child(
        &mut self,
        parent: WorkNodeId,
        source: SourceNodeId,
        target_parent: Option<NodeId>,
    ) -> WorkNodeId {
        let id = WorkNodeId(self.nodes.len());
        self.nodes.push(WorkNode {
            parent: Some(parent),
            source,
            target: None,
            target_parent,
            bind_translation: Vector3::zeros(),
            collapse_translation: false,
        });
        id
    }

    /// Every work node except the sentinel, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = WorkNodeId> + use<> {
        (1..self.nodes.len()).map(WorkNodeId)
    }

    /// First work node that created `target`.
    pub fn find_by_target(&self, target: NodeId) -> Option<WorkNodeId> {
        self.nodes
            .iter()
            .position(|node| node.target == Some(target))
            .map(WorkNodeId)
    }

    /// Closest proper ancestor that created a target node.
    pub fn created_ancestor(&self, id: WorkNodeId) -> Option<WorkNodeId> {
        let mut current = self.get(id).parent;
        while let Some(ancestor) = current {
            if self.get(ancestor).target.is_some() {
                return Some(ancestor);
            }
            current = self.get(ancestor).parent;
        }
        None
    }
}

// ─── Deferred skin bindings ───────────────────────────────────────────────────

/// A skin deformer seen in the graph pass, resolved once every node exists.
#[derive(Debug, Clone)]
pub(super) struct PendingSkinBinding<'a> {
    /// Work node owning `figure`; replicated bones attach below it.
    pub owner: WorkNodeId,
    pub skin: &'a SourceSkin,
    pub figure: NodeId,
    pub vertex_count: usize,
    pub blend_weights: Option<WeightMap>,
}
