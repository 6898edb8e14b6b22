use nalgebra::{UnitQuaternion, Vector3};

use crate::source::{EulerOrder, RotationLimits, SourceNode, SourceNodeId, SourceScene};
use crate::target::RotationOrder;

/// Sums the rotation offsets of `node` and all its ancestors, skipping
/// mesh-bearing nodes.
pub(super) fn accumulated_rotation_offset(scene: &SourceScene, node: SourceNodeId) -> Vector3<f64> {
    let mut offset = Vector3::zeros();
    let mut current = Some(node);
    while let Some(id) = current {
        let source = scene.node(id);
        if !source.is_mesh() {
            offset += source.rotation_offset;
        }
        current = source.parent;
    }
    offset
}

/// Rest translation of `node`: the last bind-pose entry naming it, else its
/// evaluated global transform.
pub(super) fn bind_translation(scene: &SourceScene, node: SourceNodeId) -> Vector3<f64> {
    match scene.bind_pose_matrix(node) {
        Some(matrix) => matrix.translation(),
        None => {
            let world = scene.evaluate_global_transform(node);
            Vector3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)])
        }
    }
}

/// Resolves the rest origin. A non-zero accumulated offset wins; a zero
/// offset defers to the bind translation.
///
/// Returns `(origin, bind_translation)`; the second is `None` when the offset
/// was used.
pub(super) fn resolve_origin(
    scene: &SourceScene,
    node: SourceNodeId,
) -> (Vector3<f64>, Option<Vector3<f64>>) {
    let offset = accumulated_rotation_offset(scene, node);
    if offset.norm_squared() != 0.0 {
        return (offset, None);
    }
    let bind = bind_translation(scene, node);
    (bind, Some(bind))
}

/// Fixed orientation from the node's pre-rotation.
pub(super) fn orientation(node: &SourceNode) -> UnitQuaternion<f64> {
    EulerOrder::Xyz.to_quaternion(&node.pre_rotation)
}

pub(super) fn rotation_order(order: EulerOrder) -> RotationOrder {
    match order {
        EulerOrder::Xyz => RotationOrder::Xyz,
        EulerOrder::Xzy => RotationOrder::Xzy,
        EulerOrder::Yxz => RotationOrder::Yxz,
        EulerOrder::Yzx => RotationOrder::Yzx,
        EulerOrder::Zxy => RotationOrder::Zxy,
        EulerOrder::Zyx => RotationOrder::Zyx,
        EulerOrder::SphericXyz => RotationOrder::default(),
    }
}

/// Per-axis `(min, max)` clamps. An axis is clamped only when limits are
/// active and both its bounds are flagged.
pub(super) fn rotation_clamps(limits: &RotationLimits) -> [Option<(f64, f64)>; 3] {
    std::array::from_fn(|axis| {
        (limits.active && limits.min_active[axis] && limits.max_active[axis])
            .then(|| (limits.min[axis], limits.max[axis]))
    })
}

/// The placement of a node's parent, used to extrapolate leaf end points.
pub(super) struct ParentFrame {
    pub origin: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// Estimates where a bone ends.
///
/// With children, the end point is the mean of their origins. A leaf
/// continues in the direction it points away from its parent, at most one
/// unit long; a leaf without parent ends at its own origin.
pub(super) fn end_point(
    origin: &Vector3<f64>,
    orientation: &UnitQuaternion<f64>,
    child_origins: &[Vector3<f64>],
    parent: Option<&ParentFrame>,
) -> Vector3<f64> {
    if !child_origins.is_empty() {
        let sum: Vector3<f64> = child_origins.iter().sum();
        return sum / child_origins.len() as f64;
    }

    let Some(parent) = parent else {
        return *origin;
    };

    let relative = parent.orientation.inverse() * *orientation;
    let mut direction = relative * (origin - parent.origin);
    let length = direction.norm();
    if length > 1.0 {
        direction /= length;
    }
    origin + direction
}
