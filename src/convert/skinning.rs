use crate::source::{SkinningType, SourceNodeId, SourceSkin};
use crate::target::{
    BindingMode, BlendMode, BoneBinding, GeneralMapMode, NodeId, NodeKind, ScaleMode, SkinBlend,
};

use super::Importer;
use super::types::PendingSkinBinding;
use super::units::{binding_matrix, normalize_weights};

// ─── Pass 2: skin bindings ────────────────────────────────────────────────────

impl Importer<'_> {
    /// Resolves every skin queued during the graph pass. Skins referencing
    /// bones of another figure get a copy of that skeleton first.
    pub(super) fn bind_skins(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for binding in pending {
            self.bind_skin(binding);
        }
    }

    fn bind_skin(&mut self, pending: PendingSkinBinding<'_>) {
        let figure = pending.figure;
        let has_binding = self
            .target
            .figure_mut(figure)
            .is_some_and(|state| state.skin.is_some());
        if !has_binding {
            let name = self.target.node_name(figure).to_string();
            self.error(
                "SKIN_BINDING_MISSING",
                format!("Figure '{name}' has no skin binding, its skin is ignored"),
            );
            return;
        }

        for skeleton in self.foreign_skeletons(pending.skin, figure) {
            if !self.replicate_skeleton(pending.owner, skeleton) {
                let name = self.target.node_name(skeleton).to_string();
                self.warn(
                    "SKELETON_NOT_REPLICATED",
                    format!("Skeleton '{name}' could not be copied for skinning"),
                );
            }
        }

        let vertex_count = pending.vertex_count;
        let figure_origin = self.target.origin(figure);
        let mut bones = Vec::new();
        let mut raw = Vec::new();
        for cluster in &pending.skin.clusters {
            let Some(bone) = self.bone_for(cluster.link, figure) else {
                log::debug!("cluster linked to non-bone node {} skipped", cluster.link.0);
                continue;
            };
            let mut weights = vec![0.0; vertex_count];
            for (&vertex, &weight) in cluster.indices.iter().zip(&cluster.weights) {
                if let Some(slot) = weights.get_mut(vertex) {
                    *slot = weight;
                }
            }
            let matrix = binding_matrix(
                &cluster.transform_link,
                &self.target.origin(bone),
                &figure_origin,
            );
            bones.push((bone, matrix));
            raw.push(weights);
        }

        let maps = normalize_weights(&raw, vertex_count);
        self.report.skin_binding_count += maps.len();
        let general_map_mode = match pending.skin.skinning_type {
            SkinningType::DualQuaternion => GeneralMapMode::DualQuaternion,
            SkinningType::Rigid | SkinningType::Linear | SkinningType::Blend => {
                GeneralMapMode::Linear
            }
        };
        let blend = pending
            .blend_weights
            .filter(|_| pending.skin.skinning_type == SkinningType::Blend)
            .map(|weights| SkinBlend {
                mode: BlendMode::BlendLinearDualQuaternion,
                weights,
            });

        let Some(state) = self.target.figure_mut(figure) else {
            return;
        };
        state.draw_bones = true;
        let Some(skin) = state.skin.as_mut() else {
            return;
        };
        if skin.target_vertex_count < 1 {
            skin.target_vertex_count = vertex_count;
        }
        skin.bone_bindings.extend(
            bones
                .into_iter()
                .zip(maps)
                .map(|((bone, matrix), weights)| BoneBinding {
                    bone,
                    weights,
                    matrix,
                }),
        );
        skin.binding_mode = BindingMode::General;
        skin.scale_mode = ScaleMode::BindingMaps;
        skin.general_map_mode = general_map_mode;
        if blend.is_some() {
            skin.blend = blend;
        }
    }

    /// Target bone of `link` as seen from `figure`: the figure's own copy
    /// when its skeleton was replicated, else the bone made by the graph pass.
    fn bone_for(&self, link: SourceNodeId, figure: NodeId) -> Option<NodeId> {
        self.replicas
            .get(&(figure, link))
            .or_else(|| self.node_map.get(&link))
            .copied()
            .filter(|&node| self.target.node_kind(node) == NodeKind::Bone)
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.target.node_parent(node);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.target.node_parent(parent);
        }
        false
    }

    fn nearest_figure(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.target.node_parent(node);
        while let Some(parent) = current {
            if self.target.node_kind(parent) == NodeKind::Figure {
                return Some(parent);
            }
            current = self.target.node_parent(parent);
        }
        None
    }

    /// Figures owning bones of `skin` outside `figure`, in cluster order.
    fn foreign_skeletons(&self, skin: &SourceSkin, figure: NodeId) -> Vec<NodeId> {
        let mut skeletons = Vec::new();
        for cluster in &skin.clusters {
            let Some(bone) = self.bone_for(cluster.link, figure) else {
                continue;
            };
            if self.is_descendant(bone, figure) {
                continue;
            }
            if let Some(skeleton) = self.nearest_figure(bone)
                && skeleton != figure
                && !skeletons.contains(&skeleton)
            {
                skeletons.push(skeleton);
            }
        }
        skeletons
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use crate::convert::{AcceptDefaults, import_scene};
    use crate::host::FileSystemHost;
    use crate::settings::ImportSettings;
    use crate::source::{
        SkeletonType, SkinningType, SourceCluster, SourceDeformer, SourceMatrix, SourceMesh,
        SourceNode, SourceNodeId, SourceScene, SourceSkin,
    };
    use crate::target::{BlendMode, GeneralMapMode, NodeKind, SceneDocument, WEIGHT_MAX};

    fn strip() -> SourceMesh {
        SourceMesh::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ],
            vec![vec![0, 1, 2]],
        )
    }

    fn cluster(link: SourceNodeId, indices: Vec<usize>, weights: Vec<f64>) -> SourceCluster {
        SourceCluster {
            link,
            indices,
            weights,
            transform_link: SourceMatrix::identity(),
        }
    }

    fn import(scene: &SourceScene) -> SceneDocument {
        let mut document = SceneDocument::new();
        import_scene(
            scene,
            &mut document,
            &FileSystemHost::new(None),
            &ImportSettings::default(),
            &mut AcceptDefaults,
        )
        .expect("import succeeds");
        document
    }

    #[test]
    fn given_shape_inside_skeleton_when_binding_then_no_copy_is_made_and_weights_normalize() {
        let mut scene = SourceScene::new();
        let hips = scene.add_node(scene.root(), SourceNode::skeleton("Hips", SkeletonType::Root));
        let left = scene.add_node(hips, SourceNode::skeleton("Left", SkeletonType::LimbNode));
        let right = scene.add_node(hips, SourceNode::skeleton("Right", SkeletonType::LimbNode));
        let mut mesh = strip();
        mesh.deformers.push(SourceDeformer::Skin(SourceSkin {
            skinning_type: SkinningType::DualQuaternion,
            clusters: vec![
                cluster(left, vec![0, 1, 9], vec![0.3, 0.2, 1.0]),
                cluster(right, vec![1], vec![0.6]),
            ],
            ..SourceSkin::default()
        }));
        scene.add_node(hips, SourceNode::mesh("Hips.Shape", mesh));

        let document = import(&scene);

        assert_eq!(document.find_nodes("Left").len(), 1);
        let hips = document.find_node("Hips").expect("hips");
        let skin = document.skin_binding(hips).expect("skin");
        assert_eq!(skin.bone_bindings.len(), 2);
        assert_eq!(skin.general_map_mode, GeneralMapMode::DualQuaternion);
        assert_eq!(skin.target_vertex_count, 3);
        assert_eq!(skin.bone_bindings[0].weights.get(0), WEIGHT_MAX);
        assert_eq!(skin.total_weight(1), u32::from(WEIGHT_MAX));
        assert_eq!(skin.total_weight(2), 0);
        assert!(skin.bone_bindings[1].weights.get(1) > skin.bone_bindings[0].weights.get(1));
    }

    #[test]
    fn given_blend_skinning_when_binding_then_blend_map_is_attached() {
        let mut scene = SourceScene::new();
        let hips = scene.add_node(scene.root(), SourceNode::skeleton("Hips", SkeletonType::Root));
        let spine = scene.add_node(hips, SourceNode::skeleton("Spine", SkeletonType::LimbNode));
        let mut mesh = strip();
        mesh.deformers.push(SourceDeformer::Skin(SourceSkin {
            skinning_type: SkinningType::Blend,
            clusters: vec![cluster(spine, vec![0, 1, 2], vec![1.0, 1.0, 1.0])],
            blend_indices: vec![2],
            blend_weights: vec![1.0],
        }));
        scene.add_node(scene.root(), SourceNode::mesh("Body", mesh));

        let document = import(&scene);

        let body = document.find_node("Body").expect("body");
        assert_eq!(document.node(body).kind, NodeKind::Figure);
        let skin = document.skin_binding(body).expect("skin");
        assert_eq!(skin.general_map_mode, GeneralMapMode::Linear);
        let blend = skin.blend.as_ref().expect("blend map");
        assert_eq!(blend.mode, BlendMode::BlendLinearDualQuaternion);
        assert_eq!(blend.weights.weights, vec![0, 0, WEIGHT_MAX]);
    }

    #[test]
    fn given_two_meshes_on_one_skeleton_when_binding_then_each_figure_gets_its_own_copy() {
        let mut scene = SourceScene::new();
        let root = scene.add_node(scene.root(), SourceNode::skeleton("Root", SkeletonType::Root));
        let upper = scene.add_node(
            root,
            SourceNode::skeleton("Upper", SkeletonType::LimbNode)
                .with_translation(Vector3::new(0.0, 10.0, 0.0)),
        );
        for name in ["Body", "Shirt"] {
            let mut mesh = strip();
            mesh.deformers.push(SourceDeformer::Skin(SourceSkin {
                clusters: vec![cluster(upper, vec![0, 1, 2], vec![1.0, 1.0, 1.0])],
                ..SourceSkin::default()
            }));
            scene.add_node(scene.root(), SourceNode::mesh(name, mesh));
        }

        let document = import(&scene);

        let root = document.find_node("Root");
        assert!(root.is_some());
        assert_eq!(document.find_nodes("Upper").len(), 3);
        for name in ["Body", "Shirt"] {
            let owner = document.find_node(name).expect("skinned figure");
            let figure = document.node(owner).figure.as_ref().expect("figure");
            assert_eq!(figure.follow_target, root);

            let skin = document.skin_binding(owner).expect("skin");
            assert_eq!(skin.bone_bindings.len(), 1);
            let bone = skin.bone_bindings[0].bone;
            assert_eq!(document.node(bone).name, "Upper");
            assert_eq!(document.node(bone).parent, Some(owner));
            assert_eq!(skin.bone_bindings[0].weights.get(1), WEIGHT_MAX);
        }
    }

    #[test]
    fn given_two_foreign_skeletons_when_binding_then_both_are_copied_in_cluster_order() {
        let mut scene = SourceScene::new();
        let mut bones = Vec::new();
        for name in ["Body", "Cape"] {
            let root = scene.add_node(
                scene.root(),
                SourceNode::skeleton(format!("{name}Root"), SkeletonType::Root),
            );
            bones.push(scene.add_node(
                root,
                SourceNode::skeleton(format!("{name}Bone"), SkeletonType::LimbNode),
            ));
        }
        let mut mesh = strip();
        mesh.deformers.push(SourceDeformer::Skin(SourceSkin {
            clusters: vec![
                cluster(bones[1], vec![0], vec![1.0]),
                cluster(bones[0], vec![1, 2], vec![1.0, 1.0]),
            ],
            ..SourceSkin::default()
        }));
        scene.add_node(scene.root(), SourceNode::mesh("Outfit", mesh));

        let document = import(&scene);

        let outfit = document.find_node("Outfit").expect("outfit");
        let children: Vec<_> = document
            .node(outfit)
            .children
            .iter()
            .map(|&child| document.node(child).name.as_str())
            .collect();
        assert_eq!(children, vec!["CapeBone", "BodyBone"]);

        let figure = document.node(outfit).figure.as_ref().expect("figure");
        assert_eq!(figure.follow_target, document.find_node("BodyRoot"));
        let skin = document.skin_binding(outfit).expect("skin");
        for binding in &skin.bone_bindings {
            assert_eq!(document.node(binding.bone).parent, Some(outfit));
        }
    }
}
