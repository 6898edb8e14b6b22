use std::collections::HashMap;
use std::ops::Range;

use nalgebra::Vector3;

use crate::settings::SelectionSetMode;
use crate::source::{MappingMode, SourceMesh, SourceNode, SourceNodeId, UvElement};
use crate::target::{
    FacetMesh, FanMarker, LodControl, MaterialId, NodeId, NodeKind, Object, Shape,
};

use super::Importer;
use super::types::{PendingSkinBinding, WorkNodeId};
use super::units::blend_weight_map;

// ─── Topology ─────────────────────────────────────────────────────────────────

/// A converted polygon mesh.
#[derive(Debug, Clone)]
pub(super) struct Topology {
    pub mesh: FacetMesh,
    /// Set when any vertex or edge carries a crease weight.
    pub needs_subdivision: bool,
    /// Facets produced by each source polygon.
    pub polygon_facets: Vec<Range<usize>>,
}

/// Polygon-group ids are used only when there is exactly one per polygon.
pub(super) fn polygon_groups_match_polygon_count(indices: &[i32], polygon_count: usize) -> bool {
    indices.len() == polygon_count
}

/// Converts source polygons into facets. Polygons with up to four corners
/// map to one facet; larger ones become a triangle fan around corner 0.
///
/// # Arguments
///
/// * `mesh` - Source geometry.
/// * `slot_names` - Material group names, in slot order.
/// * `offset` - Added to every control point.
pub(super) fn build_topology(
    mesh: &SourceMesh,
    slot_names: &[String],
    offset: &Vector3<f64>,
) -> Topology {
    let mut target = FacetMesh::new();
    let mut needs_subdivision = false;

    target.vertices = mesh.control_points.iter().map(|p| p + offset).collect();

    let uv_element = mesh.uv_elements.first();
    if let Some(element) = uv_element {
        target.uvs = element.direct.clone();
    }

    if let Some(creases) = mesh.vertex_creases.first() {
        for (vertex, &value) in creases.values.iter().enumerate() {
            if value > 0.0 && vertex < target.vertices.len() {
                target.set_vertex_weight(vertex, value);
                needs_subdivision = true;
            }
        }
    }

    for name in slot_names {
        target.add_material_group(name.clone());
    }

    let by_polygon: Vec<&[i32]> = mesh
        .material_elements
        .iter()
        .filter(|element| element.mapping == MappingMode::ByPolygon)
        .map(|element| element.indices.as_slice())
        .collect();
    if by_polygon.is_empty()
        && let Some(&slot) = mesh
            .material_elements
            .iter()
            .filter(|element| element.mapping == MappingMode::AllSame)
            .filter_map(|element| element.indices.first())
            .find(|&&slot| slot >= 0)
    {
        target.activate_material(slot as usize);
    }

    let polygon_count = mesh.polygon_count();
    let groups = mesh
        .polygon_groups
        .iter()
        .map(|element| element.indices.as_slice())
        .find(|indices| polygon_groups_match_polygon_count(indices, polygon_count));

    let mut polygon_facets = Vec::with_capacity(polygon_count);
    let mut current_group = None;
    let mut corner_base = 0;

    for (polygon_index, polygon) in mesh.polygons.iter().enumerate() {
        if let Some(&slot) = by_polygon
            .iter()
            .filter_map(|indices| indices.get(polygon_index))
            .find(|&&slot| slot >= 0)
        {
            target.activate_material(slot as usize);
        }

        if let Some(groups) = groups {
            let group = groups[polygon_index];
            if current_group != Some(group) {
                target.activate_face_group(&format!("fbx_group_{group}"));
                current_group = Some(group);
            }
        }

        let uvs = polygon_uvs(uv_element, polygon, corner_base);
        let first = target.facets.len();
        let count = polygon.len();

        if count <= 4 {
            target.add_facet(polygon.clone(), uvs, FanMarker::Standalone);
        } else {
            let corner_uv = |corner: usize| uvs.get(corner).copied();
            let mut root = None;
            for j in 2..count {
                let vertices = vec![polygon[0], polygon[j - 1], polygon[j]];
                let triangle_uvs: Vec<usize> = [0, j - 1, j]
                    .into_iter()
                    .map(corner_uv)
                    .collect::<Option<_>>()
                    .unwrap_or_default();
                let fan = match root {
                    None => FanMarker::Root { count: count - 2 },
                    Some(root) => FanMarker::Member { root },
                };
                let facet = target.add_facet(vertices, triangle_uvs, fan);
                if root.is_none() {
                    root = Some(facet);
                    target.increment_ngons();
                }
            }
        }

        polygon_facets.push(first..target.facets.len());
        corner_base += count;
    }

    if let Some(creases) = mesh.edge_creases.first() {
        let creased: Vec<_> = edge_list(&mesh.polygons)
            .into_iter()
            .zip(&creases.values)
            .filter(|&(_, &value)| value > 0.0)
            .map(|((from, to), &value)| (from, to, value))
            .collect();
        needs_subdivision |= !creased.is_empty();
        target.set_edge_weights(creased);
    }

    if needs_subdivision {
        target.subdivision = true;
    }

    Topology {
        mesh: target,
        needs_subdivision,
        polygon_facets,
    }
}

/// UV index of every corner, or nothing when any corner lacks one.
fn polygon_uvs(element: Option<&UvElement>, polygon: &[usize], corner_base: usize) -> Vec<usize> {
    let Some(element) = element else {
        return Vec::new();
    };
    polygon
        .iter()
        .enumerate()
        .map(|(corner, &vertex)| match element.mapping {
            MappingMode::ByControlPoint => element.control_point_index(vertex),
            MappingMode::ByPolygonVertex => element.polygon_vertex_index(corner_base + corner),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Undirected edges in first-seen order, as `(min, max)` pairs.
fn edge_list(polygons: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut ids: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edges = Vec::new();
    for polygon in polygons {
        let count = polygon.len();
        if count < 2 {
            continue;
        }
        for corner in 0..count {
            let a = polygon[corner];
            let b = polygon[(corner + 1) % count];
            let key = (a.min(b), a.max(b));
            if !ids.contains_key(&key) {
                ids.insert(key, edges.len());
                edges.push(key);
            }
        }
    }
    edges
}

// ─── Mesh import ──────────────────────────────────────────────────────────────

impl<'a> Importer<'a> {
    /// Builds the object of `target` from `mesh` and queues its skins.
    ///
    /// `owner` is the work node that created `target`; skins queue only when
    /// `target` is a figure.
    pub(super) fn import_mesh(
        &mut self,
        owner: Option<WorkNodeId>,
        target: NodeId,
        source_id: SourceNodeId,
        node: &SourceNode,
        mesh: &'a SourceMesh,
        offset: &Vector3<f64>,
    ) {
        let (slot_names, materials) = self.material_slots(node);

        let Topology {
            mesh: mut facet_mesh,
            needs_subdivision,
            polygon_facets,
        } = build_topology(mesh, &slot_names, offset);

        let mut lod = LodControl::default();
        if needs_subdivision {
            lod.select_highest();
        }

        self.apply_selection_sets(source_id, &mut facet_mesh, &polygon_facets);
        let removed = facet_mesh.remove_empty_face_groups();
        if removed > 0 {
            log::debug!("removed {removed} empty face group(s) from '{}'", node.name);
        }

        let morphs = self.build_morphs(source_id, mesh);
        self.report.mesh_count += 1;
        self.report.morph_count += morphs.len();
        log::debug!(
            "mesh '{}': {} vertices, {} facets, {} morph(s)",
            node.name,
            facet_mesh.vertex_count(),
            facet_mesh.facets.len(),
            morphs.len()
        );

        self.target.set_object(
            target,
            Object {
                shape: Shape {
                    materials,
                    mesh: facet_mesh,
                    lod,
                },
                morphs,
            },
        );

        self.queue_skins(owner, target, node, mesh);
    }

    /// Material group names and materials of `node`, one per slot. A slot
    /// whose material cannot be resolved keeps its position and uses the
    /// default material, so polygon slot indices stay valid.
    fn material_slots(&mut self, node: &SourceNode) -> (Vec<String>, Vec<MaterialId>) {
        let mut slot_names = Vec::with_capacity(node.materials.len().max(1));
        let mut materials = Vec::with_capacity(node.materials.len().max(1));
        for &material in &node.materials {
            let (name, id) = match self.material_for(material) {
                Some(slot) => slot,
                None => {
                    log::warn!(
                        "'{}' references missing material {}, default used",
                        node.name,
                        material.0
                    );
                    self.default_material()
                }
            };
            slot_names.push(name);
            materials.push(id);
        }
        if materials.is_empty() {
            let (name, id) = self.default_material();
            slot_names.push(name);
            materials.push(id);
        }
        (slot_names, materials)
    }

    fn apply_selection_sets(
        &self,
        source_id: SourceNodeId,
        mesh: &mut FacetMesh,
        polygon_facets: &[Range<usize>],
    ) {
        let mode = self.settings.selection_sets;
        if mode == SelectionSetMode::Ignore {
            return;
        }

        for set in self.source.selection_sets.iter().filter(|set| set.mesh == source_id) {
            let facets: Vec<usize> = set
                .polygons
                .iter()
                .filter_map(|&polygon| polygon_facets.get(polygon).cloned())
                .flatten()
                .collect();
            match mode {
                SelectionSetMode::FaceGroups => mesh.assign_face_group(&set.name, &facets),
                SelectionSetMode::PolygonSelections => {
                    mesh.add_polygon_selection(set.name.clone(), facets)
                }
                SelectionSetMode::Ignore => {}
            }
        }
    }

    fn queue_skins(
        &mut self,
        owner: Option<WorkNodeId>,
        target: NodeId,
        node: &SourceNode,
        mesh: &'a SourceMesh,
    ) {
        if !mesh.has_skin() {
            return;
        }
        let Some(owner) = owner.filter(|_| self.target.node_kind(target) == NodeKind::Figure)
        else {
            self.warn(
                "SKIN_OWNER_NOT_FIGURE",
                format!("Skin of '{}' has no figure to bind to and is ignored", node.name),
            );
            return;
        };

        let vertex_count = mesh.control_points.len();
        for skin in mesh.skins() {
            let blend_weights = (!skin.blend_weights.is_empty()).then(|| {
                blend_weight_map(&skin.blend_indices, &skin.blend_weights, vertex_count)
            });
            self.pending.push(PendingSkinBinding {
                owner,
                skin,
                figure: target,
                vertex_count,
                blend_weights,
            });
        }
    }
}
