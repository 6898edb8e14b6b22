use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::source::{SourceBlendShapeChannel, SourceMesh, SourceNodeId};
use crate::target::{Morph, MorphDelta};

use super::Importer;
use super::animation::write_curve;
use super::units::percent_to_fraction;

/// Sparse offsets of a blend-shape channel against the base mesh. Later
/// target shapes overwrite earlier ones; zero offsets are dropped.
pub(super) fn morph_deltas(mesh: &SourceMesh, channel: &SourceBlendShapeChannel) -> Vec<MorphDelta> {
    let base = &mesh.control_points;
    let mut deltas: BTreeMap<usize, Vector3<f64>> = BTreeMap::new();

    for shape in &channel.target_shapes {
        let points: Box<dyn Iterator<Item = (usize, &Vector3<f64>)> + '_> = match &shape.indices {
            Some(indices) => Box::new(indices.iter().copied().zip(&shape.control_points)),
            None => Box::new(shape.control_points.iter().enumerate()),
        };
        for (vertex, position) in points {
            if let Some(rest) = base.get(vertex) {
                deltas.insert(vertex, position - rest);
            }
        }
    }

    deltas
        .into_iter()
        .filter(|(_, delta)| *delta != Vector3::zeros())
        .map(|(vertex, delta)| MorphDelta { vertex, delta })
        .collect()
}

impl Importer<'_> {
    /// One morph per blend-shape channel of `mesh`, with the channel's
    /// deform curve from the selected take.
    pub(super) fn build_morphs(&mut self, source_id: SourceNodeId, mesh: &SourceMesh) -> Vec<Morph> {
        let mut morphs = Vec::new();
        for channel in mesh.blend_shapes().flat_map(|shape| shape.channels.iter()) {
            let mut morph = Morph::new(&channel.name);
            morph.value.set_default(percent_to_fraction(channel.deform_percent));
            morph.deltas = morph_deltas(mesh, channel);

            if let Some(curve) = self
                .layer
                .and_then(|layer| layer.deform_curve(source_id, &channel.name))
            {
                let end = write_curve(&mut morph.value, curve, 0.01, 0.0);
                self.end_tick = self.end_tick.max(end);
            }
            morphs.push(morph);
        }
        morphs
    }
}


#[cfg(test)]
mod import_tests {
    use nalgebra::Vector3;

    use crate::convert::{AcceptDefaults, import_scene};
    use crate::host::FileSystemHost;
    use crate::settings::ImportSettings;
    use crate::source::{
        AnimCurve, AnimLayer, AnimStack, DeformCurve, SourceBlendShape, SourceBlendShapeChannel,
        SourceDeformer, SourceMesh, SourceNode, SourceScene, SourceShape,
    };
    use crate::target::SceneDocument;

    #[test]
    fn given_animated_blend_shape_when_importing_then_morph_value_and_keys_are_fractions() {
        let mut scene = SourceScene::new();
        let mut mesh = SourceMesh::new(
            vec![Vector3::zeros(), Vector3::x(), Vector3::y()],
            vec![vec![0, 1, 2]],
        );
        mesh.deformers.push(SourceDeformer::BlendShape(SourceBlendShape {
            name: "Face".to_string(),
            channels: vec![SourceBlendShapeChannel {
                name: "Smile".to_string(),
                deform_percent: 25.0,
                target_shapes: vec![SourceShape {
                    control_points: vec![Vector3::new(0.0, 0.0, 1.0)],
                    indices: Some(vec![0]),
                }],
            }],
        }));
        let head = scene.add_node(scene.root(), SourceNode::mesh("Head", mesh));
        scene.anim_stacks = vec![AnimStack {
            name: "Talk".to_string(),
            layers: vec![AnimLayer {
                name: "Base".to_string(),
                deform_curves: vec![DeformCurve {
                    node: head,
                    channel: "Smile".to_string(),
                    curve: AnimCurve::new([(0.0, 0.0), (0.5, 100.0)]),
                }],
                ..AnimLayer::default()
            }],
        }];

        let mut document = SceneDocument::new();
        let report = import_scene(
            &scene,
            &mut document,
            &FileSystemHost::new(None),
            &ImportSettings::default(),
            &mut AcceptDefaults,
        )
        .expect("import succeeds");

        let head = document.find_node("Head").expect("head");
        let morph = &document.node(head).object.as_ref().expect("object").morphs[0];
        assert_eq!(morph.name, "Smile");
        assert!((morph.value.default_value - 0.25).abs() < 1e-12);
        assert_eq!(morph.value.keys.len(), 2);
        assert_eq!(morph.value.keys[1].tick, 2400);
        assert!((morph.value.keys[1].value - 1.0).abs() < 1e-12);
        assert_eq!(morph.deltas[0].delta, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(report.morph_count, 1);
        assert_eq!(report.end_tick, 2400);
    }
}
