use std::{fs, path::Path};

use anyhow::{Context, Result};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::{
    ChannelProperty, DataItem, DataValue, FigureState, MaterialId, MaterialRecord, NodeId,
    NodeKind, Object, RotationOrder, SceneInfo, SkinBinding, TargetDocument, TimeRange,
    TransformChannel, TransformChannels,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub inherit_scale: bool,
    pub origin: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub end_point: Vector3<f64>,
    pub rotation_order: RotationOrder,
    pub channels: TransformChannels,
    pub object: Option<Object>,
    pub figure: Option<FigureState>,
    pub data_items: Vec<DataItem>,
}

impl TargetNode {
    fn new(kind: NodeKind, name: &str) -> Self {
        let figure = (kind == NodeKind::Figure).then(|| FigureState {
            skin: Some(SkinBinding::default()),
            ..FigureState::default()
        });

        Self {
            name: name.to_string(),
            kind,
            parent: None,
            children: Vec::new(),
            inherit_scale: kind == NodeKind::Bone,
            origin: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            end_point: Vector3::zeros(),
            rotation_order: RotationOrder::default(),
            channels: TransformChannels::default(),
            object: None,
            figure,
            data_items: Vec::new(),
        }
    }

    pub fn data_value(&self, item: &str, key: &str) -> Option<&DataValue> {
        self.data_items
            .iter()
            .find(|data| data.name == item)
            .and_then(|data| data.values.get(key))
    }
}

/// In-memory target scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub nodes: Vec<TargetNode>,
    pub materials: Vec<MaterialRecord>,
    pub anim_range: TimeRange,
    pub play_range: TimeRange,
    pub info: SceneInfo,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &TargetNode {
        &self.nodes[id.0]
    }

    /// First node called `name`, in creation order.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    pub fn find_nodes(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.name == name)
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    pub fn material(&self, id: MaterialId) -> &MaterialRecord {
        &self.materials[id.0]
    }

    pub fn skin_binding(&self, figure: NodeId) -> Option<&SkinBinding> {
        self.node(figure)
            .figure
            .as_ref()
            .and_then(|state| state.skin.as_ref())
    }

    /// Write the document as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("failed to serialize target document as JSON")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write target document: {}", path.display()))?;
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TargetNode {
        &mut self.nodes[id.0]
    }
}

impl TargetDocument for SceneDocument {
    fn create_node(&mut self, kind: NodeKind, name: &str) -> NodeId {
        self.nodes.push(TargetNode::new(kind, name));
        NodeId(self.nodes.len() - 1)
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(previous) = self.node(child).parent {
            self.node_mut(previous).children.retain(|&c| c != child);
        }
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.node(node).kind
    }

    fn node_name(&self, node: NodeId) -> &str {
        &self.node(node).name
    }

    fn node_parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn node_children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn set_inherit_scale(&mut self, node: NodeId, inherit: bool) {
        self.node_mut(node).inherit_scale = inherit;
    }

    fn origin(&self, node: NodeId) -> Vector3<f64> {
        self.node(node).origin
    }

    fn set_origin(&mut self, node: NodeId, origin: Vector3<f64>) {
        self.node_mut(node).origin = origin;
    }

    fn orientation(&self, node: NodeId) -> UnitQuaternion<f64> {
        self.node(node).orientation
    }

    fn set_orientation(&mut self, node: NodeId, orientation: UnitQuaternion<f64>) {
        self.node_mut(node).orientation = orientation;
    }

    fn set_end_point(&mut self, node: NodeId, end_point: Vector3<f64>) {
        self.node_mut(node).end_point = end_point;
    }

    fn set_rotation_order(&mut self, node: NodeId, order: RotationOrder) {
        self.node_mut(node).rotation_order = order;
    }

    fn channel_mut(&mut self, node: NodeId, channel: TransformChannel) -> &mut ChannelProperty {
        self.node_mut(node).channels.get_mut(channel)
    }

    fn object(&self, node: NodeId) -> Option<&Object> {
        self.node(node).object.as_ref()
    }

    fn object_mut(&mut self, node: NodeId) -> Option<&mut Object> {
        self.node_mut(node).object.as_mut()
    }

    fn set_object(&mut self, node: NodeId, object: Object) {
        self.node_mut(node).object = Some(object);
    }

    fn figure_mut(&mut self, node: NodeId) -> Option<&mut FigureState> {
        self.node_mut(node).figure.as_mut()
    }

    fn add_material(&mut self, material: MaterialRecord) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    fn material_mut(&mut self, material: MaterialId) -> &mut MaterialRecord {
        &mut self.materials[material.0]
    }

    fn set_data_value(&mut self, node: NodeId, item: &str, key: &str, value: DataValue) {
        let items = &mut self.node_mut(node).data_items;
        let index = match items.iter().position(|data| data.name == item) {
            Some(index) => index,
            None => {
                items.push(DataItem {
                    name: item.to_string(),
                    ..DataItem::default()
                });
                items.len() - 1
            }
        };
        items[index].values.insert(key.to_string(), value);
    }

    fn anim_range(&self) -> TimeRange {
        self.anim_range
    }

    fn set_anim_range(&mut self, range: TimeRange) {
        self.anim_range = range;
    }

    fn set_play_range(&mut self, range: TimeRange) {
        self.play_range = range;
    }

    fn set_scene_info(&mut self, info: SceneInfo) {
        self.info = info;
    }
}
