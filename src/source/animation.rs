use serde::{Deserialize, Serialize};

use super::SourceNodeId;

/// A key at `time` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimKey {
    pub time: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimCurve {
    pub keys: Vec<AnimKey>,
}

impl AnimCurve {
    pub fn new(keys: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(time, value)| AnimKey { time, value })
                .collect(),
        }
    }
}

/// Local transform curves of one node, indexed by axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeCurves {
    pub node: SourceNodeId,
    pub translation: [Option<AnimCurve>; 3],
    pub rotation: [Option<AnimCurve>; 3],
    pub scaling: [Option<AnimCurve>; 3],
}

/// Deform-percent curve of a blend-shape channel on a mesh node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeformCurve {
    pub node: SourceNodeId,
    pub channel: String,
    pub curve: AnimCurve,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimLayer {
    pub name: String,
    pub node_curves: Vec<NodeCurves>,
    pub deform_curves: Vec<DeformCurve>,
}

impl AnimLayer {
    pub fn node_curves(&self, node: SourceNodeId) -> Option<&NodeCurves> {
        self.node_curves.iter().find(|curves| curves.node == node)
    }

    pub fn deform_curve(&self, node: SourceNodeId, channel: &str) -> Option<&AnimCurve> {
        self.deform_curves
            .iter()
            .find(|curve| curve.node == node && curve.channel == channel)
            .map(|curve| &curve.curve)
    }
}

/// An animation take; only its first layer is imported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimStack {
    pub name: String,
    pub layers: Vec<AnimLayer>,
}
