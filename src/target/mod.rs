//! Target document model.
//!
//! The engine writes through [`TargetDocument`] only. Nodes, meshes and
//! skin bindings are plain data so implementations can store them however
//! they like; [`SceneDocument`] keeps everything in memory and serializes to
//! JSON.
//!
//! Node origins and end points are world-space positions at rest.

mod geometry;
mod material;
mod scene;
mod skin;

use std::collections::BTreeMap;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

pub use geometry::{
    EdgeWeight, FaceGroup, Facet, FacetMesh, FanMarker, LodControl, Morph, MorphDelta, Object,
    PolygonSelection, Shape,
};
pub use material::{BasicSurface, MaterialRecord, PbrSurface, Shading};
pub use scene::{SceneDocument, TargetNode};
pub use skin::{
    BindingMatrix, BindingMode, BlendMode, BoneBinding, GeneralMapMode, ScaleMode, SkinBinding,
    SkinBlend, WEIGHT_MAX, WeightMap,
};

/// Time resolution of target animation keys.
pub const TICKS_PER_SECOND: i64 = 4800;

/// Integer animation time.
pub type Tick = i64;

/// Index of a node in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a material in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Node,
    /// Posable character root owning a skin binding.
    Figure,
    Bone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Translation,
    Rotation,
    Scale,
}

/// One of the nine animatable transform channels of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformChannel {
    pub kind: TransformKind,
    pub axis: usize,
}

impl TransformChannel {
    pub fn new(kind: TransformKind, axis: usize) -> Self {
        Self { kind, axis }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationKey {
    pub tick: Tick,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelLimits {
    pub min: f64,
    pub max: f64,
}

/// An animatable scalar property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelProperty {
    pub default_value: f64,
    pub value: f64,
    pub keys: Vec<AnimationKey>,
    pub hidden: bool,
    pub limits: Option<ChannelLimits>,
}

impl ChannelProperty {
    pub fn new(value: f64) -> Self {
        Self {
            default_value: value,
            value,
            keys: Vec::new(),
            hidden: false,
            limits: None,
        }
    }

    pub fn set_default(&mut self, value: f64) {
        self.default_value = value;
        self.value = value;
    }

    /// Inserts a key, replacing any key at the same tick. Keys stay sorted.
    pub fn set_key(&mut self, tick: Tick, value: f64) {
        match self.keys.binary_search_by_key(&tick, |key| key.tick) {
            Ok(index) => self.keys[index].value = value,
            Err(index) => self.keys.insert(index, AnimationKey { tick, value }),
        }
    }

    pub fn clear_keys(&mut self) {
        self.keys.clear();
    }

    pub fn set_clamped(&mut self, min: f64, max: f64) {
        self.limits = Some(ChannelLimits { min, max });
    }

    pub fn is_clamped(&self) -> bool {
        self.limits.is_some()
    }
}

/// Translation, rotation (degrees) and scale channels of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChannels {
    pub translation: [ChannelProperty; 3],
    pub rotation: [ChannelProperty; 3],
    pub scale: [ChannelProperty; 3],
}

impl Default for TransformChannels {
    fn default() -> Self {
        let zero = || [0.0; 3].map(ChannelProperty::new);
        Self {
            translation: zero(),
            rotation: zero(),
            scale: [1.0; 3].map(ChannelProperty::new),
        }
    }
}

impl TransformChannels {
    pub fn get(&self, channel: TransformChannel) -> &ChannelProperty {
        match channel.kind {
            TransformKind::Translation => &self.translation[channel.axis],
            TransformKind::Rotation => &self.rotation[channel.axis],
            TransformKind::Scale => &self.scale[channel.axis],
        }
    }

    pub fn get_mut(&mut self, channel: TransformChannel) -> &mut ChannelProperty {
        match channel.kind {
            TransformKind::Translation => &mut self.translation[channel.axis],
            TransformKind::Rotation => &mut self.rotation[channel.axis],
            TransformKind::Scale => &mut self.scale[channel.axis],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowMode {
    Off,
    #[default]
    AutoFollow,
}

/// Figure-only state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FigureState {
    pub follow_mode: FollowMode,
    /// Figure whose pose this one mirrors.
    pub follow_target: Option<NodeId>,
    pub draw_bones: bool,
    pub skin: Option<SkinBinding>,
}

/// Value stored in a node's user data block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DataValue {
    Int(i32),
    Bool(bool),
    Float(f64),
    String(String),
}

/// Named key/value block attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub name: String,
    pub values: BTreeMap<String, DataValue>,
}

/// Scene-level document information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub author: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub revision: Option<String>,
    pub comment: Option<String>,
    pub source_application: Option<String>,
    pub source_file_version: Option<i32>,
    pub source_is_binary: bool,
}

/// Inclusive tick range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Tick,
    pub end: Tick,
}

/// Write interface of a target scene.
///
/// Methods taking a [`NodeId`] may panic on ids the document never issued.
pub trait TargetDocument {
    /// Creates a detached node. Figures start with an empty skin binding
    /// and auto-follow enabled.
    fn create_node(&mut self, kind: NodeKind, name: &str) -> NodeId;

    fn attach_child(&mut self, parent: NodeId, child: NodeId);

    fn node_kind(&self, node: NodeId) -> NodeKind;

    fn node_name(&self, node: NodeId) -> &str;

    fn node_parent(&self, node: NodeId) -> Option<NodeId>;

    fn node_children(&self, node: NodeId) -> Vec<NodeId>;

    fn set_inherit_scale(&mut self, node: NodeId, inherit: bool);

    fn origin(&self, node: NodeId) -> Vector3<f64>;

    fn set_origin(&mut self, node: NodeId, origin: Vector3<f64>);

    fn orientation(&self, node: NodeId) -> UnitQuaternion<f64>;

    fn set_orientation(&mut self, node: NodeId, orientation: UnitQuaternion<f64>);

    fn set_end_point(&mut self, node: NodeId, end_point: Vector3<f64>);

    fn set_rotation_order(&mut self, node: NodeId, order: RotationOrder);

    fn channel_mut(&mut self, node: NodeId, channel: TransformChannel) -> &mut ChannelProperty;

    fn object(&self, node: NodeId) -> Option<&Object>;

    fn object_mut(&mut self, node: NodeId) -> Option<&mut Object>;

    fn set_object(&mut self, node: NodeId, object: Object);

    /// `None` for nodes that are not figures.
    fn figure_mut(&mut self, node: NodeId) -> Option<&mut FigureState>;

    fn add_material(&mut self, material: MaterialRecord) -> MaterialId;

    fn material_mut(&mut self, material: MaterialId) -> &mut MaterialRecord;

    /// Stores `value` under `key` in the data item `item` of `node`,
    /// creating the item on first use.
    fn set_data_value(&mut self, node: NodeId, item: &str, key: &str, value: DataValue);

    fn anim_range(&self) -> TimeRange;

    fn set_anim_range(&mut self, range: TimeRange);

    fn set_play_range(&mut self, range: TimeRange);

    fn set_scene_info(&mut self, info: SceneInfo);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_keys_out_of_order_when_setting_then_keys_are_sorted_and_replaced() {
        let mut channel = ChannelProperty::new(0.0);
        channel.set_key(4800, 2.0);
        channel.set_key(0, 1.0);
        channel.set_key(4800, 3.0);

        assert_eq!(
            channel.keys,
            vec![
                AnimationKey { tick: 0, value: 1.0 },
                AnimationKey {
                    tick: 4800,
                    value: 3.0
                }
            ]
        );
    }

    #[test]
    fn given_default_channels_when_reading_then_scale_is_one_and_others_are_zero() {
        let defaults = TransformChannels::default();
        let scale = TransformChannel::new(TransformKind::Scale, 2);
        let rotation = TransformChannel::new(TransformKind::Rotation, 0);

        assert_eq!(defaults.get(scale).value, 1.0);
        assert_eq!(defaults.get(rotation).value, 0.0);
    }
}
