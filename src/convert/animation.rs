use nalgebra::Vector3;

use crate::source::{AnimCurve, PropertyValue, UserProperty};
use crate::target::{ChannelProperty, DataValue, NodeId, Tick, TransformChannel, TransformKind};

use super::Importer;
use super::types::WorkNodeId;
use super::units::seconds_to_ticks;

/// Data item receiving a node's user-defined properties.
pub(super) const USER_PROPERTIES_ITEM: &str = "fbx_user_properties";

/// Replaces the keys of `property` with `curve`, each value mapped to
/// `value * scale - offset`. Returns the latest tick written.
pub(super) fn write_curve(
    property: &mut ChannelProperty,
    curve: &AnimCurve,
    scale: f64,
    offset: f64,
) -> Tick {
    property.clear_keys();
    let mut end = 0;
    for key in &curve.keys {
        let tick = seconds_to_ticks(key.time);
        end = end.max(tick);
        property.set_key(tick, key.value * scale - offset);
    }
    end
}

/// Converts a user property; vectors have no target representation.
pub(super) fn data_value(property: &UserProperty) -> Option<DataValue> {
    match &property.value {
        PropertyValue::Int(value) => Some(DataValue::Int(*value)),
        PropertyValue::Bool(value) => Some(DataValue::Bool(*value)),
        PropertyValue::Float(value) => Some(DataValue::Float(f64::from(*value))),
        PropertyValue::Double(value) => Some(DataValue::Float(*value)),
        PropertyValue::String(value) => Some(DataValue::String(value.clone())),
        PropertyValue::Vector(_) => None,
    }
}

impl Importer<'_> {
    // ─── Pass 3: rest transforms and animation ───────────────────────────────

    pub(super) fn apply_rest_and_animation(&mut self) {
        for work in self.tree.ids() {
            if let Some(target) = self.tree.get(work).target {
                self.animate_node(work, target);
            }
        }
    }

    fn animate_node(&mut self, work: WorkNodeId, target: NodeId) {
        let entry = self.tree.get(work);
        let source_id = entry.source;
        let collapse = entry.collapse_translation;
        let source = self.source;
        let node = source.node(source_id);

        let parent_bind = match self.tree.created_ancestor(work).map(|id| self.tree.get(id)) {
            Some(parent) if !parent.collapse_translation => parent.bind_translation,
            _ => Vector3::zeros(),
        };
        let offset = entry.bind_translation - parent_bind;

        if !collapse {
            for axis in 0..3 {
                self.channel(target, TransformKind::Translation, axis)
                    .set_default(node.translation[axis] - offset[axis]);
                self.channel(target, TransformKind::Rotation, axis)
                    .set_default(node.rotation[axis]);
                self.channel(target, TransformKind::Scale, axis)
                    .set_default(node.scaling[axis]);
            }

            if let Some(curves) = self.layer.and_then(|layer| layer.node_curves(source_id)) {
                let groups = [
                    (TransformKind::Translation, &curves.translation),
                    (TransformKind::Rotation, &curves.rotation),
                    (TransformKind::Scale, &curves.scaling),
                ];
                for (kind, axes) in groups {
                    for (axis, curve) in axes.iter().enumerate() {
                        let Some(curve) = curve else { continue };
                        let shift = match kind {
                            TransformKind::Translation => offset[axis],
                            TransformKind::Rotation | TransformKind::Scale => 0.0,
                        };
                        let end = write_curve(self.channel(target, kind, axis), curve, 1.0, shift);
                        self.end_tick = self.end_tick.max(end);
                    }
                }
            }
        }

        for property in &node.user_properties {
            match data_value(property) {
                Some(value) => {
                    self.target
                        .set_data_value(target, USER_PROPERTIES_ITEM, &property.name, value)
                }
                None => log::debug!(
                    "user property '{}' on '{}' has no target type",
                    property.name,
                    node.name
                ),
            }
        }
    }

    fn channel(&mut self, target: NodeId, kind: TransformKind, axis: usize) -> &mut ChannelProperty {
        self.target.channel_mut(target, TransformChannel::new(kind, axis))
    }
}
