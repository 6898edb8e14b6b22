use nalgebra::Vector3;

use crate::source::{InheritType, NodeAttribute, SkeletonType, SourceMesh, SourceNode, SourceNodeId};
use crate::target::{NodeId, NodeKind, TransformChannel, TransformKind};

use super::Importer;
use super::transform::{
    ParentFrame, end_point, orientation, resolve_origin, rotation_clamps, rotation_order,
};
use super::types::{WorkNodeId, WorkTree};

/// What a source node becomes in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum NodeRole {
    Node,
    Figure,
    Bone,
    Mesh,
    /// Not created; children are still visited.
    Skip,
}

pub(super) fn classify(node: &SourceNode) -> NodeRole {
    match &node.attribute {
        None | Some(NodeAttribute::Null) => NodeRole::Node,
        Some(NodeAttribute::Skeleton(SkeletonType::Root)) => NodeRole::Figure,
        Some(NodeAttribute::Skeleton(SkeletonType::Limb | SkeletonType::LimbNode)) => {
            NodeRole::Bone
        }
        Some(NodeAttribute::Mesh(_)) => NodeRole::Mesh,
        Some(
            NodeAttribute::Skeleton(SkeletonType::Effector)
            | NodeAttribute::Marker
            | NodeAttribute::Nurbs
            | NodeAttribute::Patch
            | NodeAttribute::Camera
            | NodeAttribute::Light
            | NodeAttribute::LodGroup
            | NodeAttribute::Other(_),
        ) => NodeRole::Skip,
    }
}

/// A mesh named after its transform parent, as `<parent>.Shape` or
/// `<parent>_Shape`, is that parent's geometry.
pub(super) fn is_shape_of(mesh_name: &str, parent_name: &str) -> bool {
    mesh_name
        .strip_prefix(parent_name)
        .is_some_and(|suffix| suffix == ".Shape" || suffix == "_Shape")
}

impl<'a> Importer<'a> {
    // ─── Pass 1: node graph ──────────────────────────────────────────────────

    /// Creates the target node of `work`, then visits its children.
    pub(super) fn walk_graph(&mut self, work: WorkNodeId) {
        let source_id = self.tree.get(work).source;
        let source = self.source;
        let node = source.node(source_id);

        let created = if work == WorkTree::ROOT {
            None
        } else {
            self.import_node(work, node)
        };

        let target_parent = created.or(self.tree.get(work).target_parent);
        let mut children = Vec::with_capacity(node.children.len());
        for &child in &node.children {
            if self.replicating.is_some() && source.node(child).is_mesh() {
                continue;
            }
            children.push(self.tree.add_child(work, child, target_parent));
        }
        for child in children {
            self.walk_graph(child);
        }

        if let Some(target) = created {
            self.finish_node(work, target, node);
        }
    }

    /// Creates, registers and places the target node for `work`. Returns
    /// `None` when the node is skipped or merged into its parent.
    fn import_node(&mut self, work: WorkNodeId, node: &'a SourceNode) -> Option<NodeId> {
        let source_id = self.tree.get(work).source;
        let target_parent = self.tree.get(work).target_parent;

        let (target, collapse) = match classify(node) {
            NodeRole::Skip => {
                log::debug!("skipping '{}' and keeping its children", node.name);
                return None;
            }
            NodeRole::Node => (self.create(NodeKind::Node, &node.name), false),
            NodeRole::Figure => (self.create(NodeKind::Figure, &node.name), false),
            NodeRole::Bone => (self.create(NodeKind::Bone, &node.name), false),
            NodeRole::Mesh => {
                let mesh = node.mesh_data()?;
                if let Some(parent) = target_parent
                    && self.target.object(parent).is_none()
                    && is_shape_of(&node.name, self.target.node_name(parent))
                {
                    let offset = if self.target.node_kind(parent) == NodeKind::Figure {
                        self.target.origin(parent)
                    } else {
                        Vector3::zeros()
                    };
                    let owner = self.tree.created_ancestor(work);
                    self.import_mesh(owner, parent, source_id, node, mesh, &offset);
                    return None;
                }
                self.create_mesh_node(work, source_id, node, mesh)
            }
        };

        self.register(work, source_id, target, target_parent);
        self.place(work, node, target, collapse);
        Some(target)
    }

    fn create_mesh_node(
        &mut self,
        work: WorkNodeId,
        source_id: SourceNodeId,
        node: &'a SourceNode,
        mesh: &'a SourceMesh,
    ) -> (NodeId, bool) {
        let skinned = mesh.has_skin();
        let kind = if skinned {
            NodeKind::Figure
        } else {
            NodeKind::Node
        };
        let target = self.create(kind, &node.name);
        // A fresh figure sits at the world origin.
        self.import_mesh(Some(work), target, source_id, node, mesh, &Vector3::zeros());
        (target, skinned)
    }

    fn create(&mut self, kind: NodeKind, name: &str) -> NodeId {
        let target = self.target.create_node(kind, name);
        match kind {
            NodeKind::Figure => self.report.figure_count += 1,
            NodeKind::Bone => self.report.bone_count += 1,
            NodeKind::Node => {}
        }
        log::debug!("created {kind:?} '{name}'");
        target
    }

    fn register(
        &mut self,
        work: WorkNodeId,
        source_id: SourceNodeId,
        target: NodeId,
        target_parent: Option<NodeId>,
    ) {
        self.tree.get_mut(work).target = Some(target);
        match self.replicating {
            Some(figure) => {
                self.replicas.insert((figure, source_id), target);
            }
            None => {
                self.node_map.insert(source_id, target);
            }
        }
        self.report.imported_nodes.push(target);
        if let Some(parent) = target_parent {
            self.target.attach_child(parent, target);
        }
    }

    /// Sets the rest placement of a freshly created node.
    fn place(&mut self, work: WorkNodeId, node: &SourceNode, target: NodeId, collapse: bool) {
        let source_id = self.tree.get(work).source;

        self.target
            .set_inherit_scale(target, node.inherit_type != InheritType::Rrs);
        self.target.set_orientation(target, orientation(node));
        self.target
            .set_rotation_order(target, rotation_order(node.rotation_order));

        let (origin, bind) = resolve_origin(self.source, source_id);
        match bind {
            Some(bind) => {
                let entry = self.tree.get_mut(work);
                entry.bind_translation = bind;
                entry.collapse_translation = collapse;
                if collapse {
                    self.target.set_origin(target, Vector3::zeros());
                    if let Some(object) = self.target.object_mut(target) {
                        object.shape.mesh.translate(&bind);
                    }
                } else {
                    self.target.set_origin(target, origin);
                }
            }
            None => {
                self.tree.get_mut(work).collapse_translation = collapse;
                self.target.set_origin(target, origin);
            }
        }
    }

    /// End point, channel visibility and limits; these need the children.
    fn finish_node(&mut self, work: WorkNodeId, target: NodeId, node: &SourceNode) {
        let children = self.target.node_children(target);
        let child_origins: Vec<_> = children
            .iter()
            .map(|&child| self.target.origin(child))
            .collect();

        let target_parent = self.tree.get(work).target_parent;
        let parent_frame = target_parent.map(|parent| ParentFrame {
            origin: self.target.origin(parent),
            orientation: self.target.orientation(parent),
        });
        let end = end_point(
            &self.target.origin(target),
            &self.target.orientation(target),
            &child_origins,
            parent_frame.as_ref(),
        );
        self.target.set_end_point(target, end);

        let is_bone = self.target.node_kind(target) == NodeKind::Bone;
        let parent_is_bone =
            target_parent.is_some_and(|parent| self.target.node_kind(parent) == NodeKind::Bone);
        if is_bone && parent_is_bone && !children.is_empty() {
            for axis in 0..3 {
                let channel = TransformChannel::new(TransformKind::Translation, axis);
                self.target.channel_mut(target, channel).hidden = true;
            }
        }

        for (axis, clamp) in rotation_clamps(&node.rotation_limits).into_iter().enumerate() {
            if let Some((min, max)) = clamp {
                let channel = TransformChannel::new(TransformKind::Rotation, axis);
                self.target.channel_mut(target, channel).set_clamped(min, max);
            }
        }
    }

    /// Copies the skeleton below `skeleton` under the figure of `owner`, so
    /// the owner's skin can bind to bones of its own.
    pub(super) fn replicate_skeleton(&mut self, owner: WorkNodeId, skeleton: NodeId) -> bool {
        let Some(owner_target) = self.tree.get(owner).target else {
            return false;
        };
        if self.target.node_kind(owner_target) != NodeKind::Figure {
            return false;
        }
        let Some(cross) = self.tree.find_by_target(skeleton) else {
            return false;
        };

        let source = self.source;
        let cross_source = self.tree.get(cross).source;
        log::info!(
            "replicating skeleton '{}' under '{}'",
            self.target.node_name(skeleton),
            self.target.node_name(owner_target)
        );

        self.replicating = Some(owner_target);
        let mut copies = Vec::new();
        for &child in &source.node(cross_source).children {
            if source.node(child).is_mesh() {
                continue;
            }
            copies.push(self.tree.add_child(owner, child, Some(owner_target)));
        }
        for copy in copies {
            self.walk_graph(copy);
        }
        self.replicating = None;

        if let Some(figure) = self.target.figure_mut(owner_target) {
            figure.follow_target = Some(skeleton);
        }
        self.report.replicated_skeleton_count += 1;
        true
    }
}
