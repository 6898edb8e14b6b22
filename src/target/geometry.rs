use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::{ChannelProperty, MaterialId};

const DEFAULT_FACE_GROUP: &str = "default";

// ─── Facets ───────────────────────────────────────────────────────────────────

/// Position of a facet within a triangulated n-gon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "fan", rename_all = "snake_case")]
pub enum FanMarker {
    /// Not part of a fan.
    #[default]
    Standalone,
    /// First triangle of a fan of `count` triangles.
    Root { count: usize },
    /// Later triangle of the fan whose root facet is `root`.
    Member { root: usize },
}

/// A line, triangle or quad. `uvs` is parallel to `vertices` when the mesh
/// has UVs and empty otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub vertices: Vec<usize>,
    pub uvs: Vec<usize>,
    pub material: usize,
    pub face_group: usize,
    pub fan: FanMarker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceGroup {
    pub name: String,
}

/// Named, possibly overlapping set of facets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonSelection {
    pub name: String,
    pub facets: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

// ─── Facet mesh ───────────────────────────────────────────────────────────────

/// Polygon mesh with material groups, face groups and subdivision weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetMesh {
    pub vertices: Vec<Vector3<f64>>,
    pub uvs: Vec<[f64; 2]>,
    pub facets: Vec<Facet>,
    pub material_groups: Vec<String>,
    pub face_groups: Vec<FaceGroup>,
    pub polygon_selections: Vec<PolygonSelection>,
    pub vertex_weights: BTreeMap<usize, f64>,
    pub edge_weights: Vec<EdgeWeight>,
    pub subdivision: bool,
    pub ngon_count: usize,
    #[serde(skip)]
    active_material: usize,
    #[serde(skip)]
    active_face_group: usize,
}

impl Default for FacetMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetMesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            uvs: Vec::new(),
            facets: Vec::new(),
            material_groups: Vec::new(),
            face_groups: vec![FaceGroup {
                name: DEFAULT_FACE_GROUP.to_string(),
            }],
            polygon_selections: Vec::new(),
            vertex_weights: BTreeMap::new(),
            edge_weights: Vec::new(),
            subdivision: false,
            ngon_count: 0,
            active_material: 0,
            active_face_group: 0,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    /// Adds a material group and makes it active. Returns its slot.
    pub fn add_material_group(&mut self, name: impl Into<String>) -> usize {
        self.material_groups.push(name.into());
        self.active_material = self.material_groups.len() - 1;
        self.active_material
    }

    /// Makes `slot` the material of subsequently added facets. Returns false
    /// for a slot that does not exist.
    pub fn activate_material(&mut self, slot: usize) -> bool {
        if slot < self.material_groups.len() {
            self.active_material = slot;
            true
        } else {
            false
        }
    }

    pub fn active_material(&self) -> usize {
        self.active_material
    }

    /// Makes the face group called `name` active, creating it if needed.
    pub fn activate_face_group(&mut self, name: &str) -> usize {
        self.active_face_group = self.face_group_index(name);
        self.active_face_group
    }

    fn face_group_index(&mut self, name: &str) -> usize {
        match self.face_groups.iter().position(|group| group.name == name) {
            Some(index) => index,
            None => {
                self.face_groups.push(FaceGroup {
                    name: name.to_string(),
                });
                self.face_groups.len() - 1
            }
        }
    }

    /// Appends a facet in the active material and face group.
    pub fn add_facet(&mut self, vertices: Vec<usize>, uvs: Vec<usize>, fan: FanMarker) -> usize {
        self.facets.push(Facet {
            vertices,
            uvs,
            material: self.active_material,
            face_group: self.active_face_group,
            fan,
        });
        self.facets.len() - 1
    }

    pub fn increment_ngons(&mut self) {
        self.ngon_count += 1;
    }

    pub fn set_vertex_weight(&mut self, vertex: usize, weight: f64) {
        self.vertex_weights.insert(vertex, weight);
    }

    /// Stores crease weights on undirected edges. An edge given again keeps
    /// its last weight.
    pub fn set_edge_weights(&mut self, weights: impl IntoIterator<Item = (usize, usize, f64)>) {
        let mut index: HashMap<(usize, usize), usize> = self
            .edge_weights
            .iter()
            .enumerate()
            .map(|(position, edge)| ((edge.from, edge.to), position))
            .collect();
        for (a, b, weight) in weights {
            let (from, to) = (a.min(b), a.max(b));
            match index.entry((from, to)) {
                Entry::Occupied(entry) => self.edge_weights[*entry.get()].weight = weight,
                Entry::Vacant(entry) => {
                    entry.insert(self.edge_weights.len());
                    self.edge_weights.push(EdgeWeight { from, to, weight });
                }
            }
        }
    }

    pub fn edge_weight(&self, a: usize, b: usize) -> Option<f64> {
        let (from, to) = (a.min(b), a.max(b));
        self.edge_weights
            .iter()
            .find(|edge| edge.from == from && edge.to == to)
            .map(|edge| edge.weight)
    }

    /// Moves `facets` into the face group `name`.
    pub fn assign_face_group(&mut self, name: &str, facets: &[usize]) {
        let group = self.face_group_index(name);
        for &facet in facets {
            if let Some(facet) = self.facets.get_mut(facet) {
                facet.face_group = group;
            }
        }
    }

    pub fn add_polygon_selection(&mut self, name: impl Into<String>, facets: Vec<usize>) {
        self.polygon_selections.push(PolygonSelection {
            name: name.into(),
            facets,
        });
    }

    /// Drops face groups no facet uses and renumbers the rest.
    pub fn remove_empty_face_groups(&mut self) -> usize {
        let mut used = vec![false; self.face_groups.len()];
        for facet in &self.facets {
            used[facet.face_group] = true;
        }

        let mut remap = vec![0; self.face_groups.len()];
        let mut next = 0;
        for (index, in_use) in used.iter().enumerate() {
            if *in_use {
                remap[index] = next;
                next += 1;
            }
        }

        let removed = self.face_groups.len() - next;
        if removed == 0 {
            return 0;
        }

        let mut index = 0;
        self.face_groups.retain(|_| {
            let keep = used[index];
            index += 1;
            keep
        });
        for facet in &mut self.facets {
            facet.face_group = remap[facet.face_group];
        }
        self.active_face_group = 0;
        removed
    }

    /// Rebuilds the n-gon whose fan starts at facet `root`.
    pub fn fan_polygon(&self, root: usize) -> Option<Vec<usize>> {
        let facet = self.facets.get(root)?;
        let FanMarker::Root { count } = facet.fan else {
            return None;
        };

        let mut polygon = facet.vertices.clone();
        for member in self.facets.iter().skip(root + 1).take(count.saturating_sub(1)) {
            if member.fan != (FanMarker::Member { root }) {
                return None;
            }
            polygon.push(*member.vertices.last()?);
        }
        Some(polygon)
    }
}

// ─── Shapes, morphs and objects ───────────────────────────────────────────────

/// Enumerated resolution selector of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LodControl {
    pub items: Vec<String>,
    pub value: usize,
    pub default_value: usize,
}

impl Default for LodControl {
    fn default() -> Self {
        Self {
            items: vec!["Base".to_string(), "High Resolution".to_string()],
            value: 0,
            default_value: 0,
        }
    }
}

impl LodControl {
    pub fn select_highest(&mut self) {
        let highest = self.items.len().saturating_sub(1);
        self.value = highest;
        self.default_value = highest;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Material of each material group, by slot.
    pub materials: Vec<MaterialId>,
    pub mesh: FacetMesh,
    pub lod: LodControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorphDelta {
    pub vertex: usize,
    pub delta: Vector3<f64>,
}

/// Scalar-controlled sparse vertex offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Morph {
    pub name: String,
    pub value: ChannelProperty,
    pub deltas: Vec<MorphDelta>,
}

impl Morph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ChannelProperty::new(0.0),
            deltas: Vec::new(),
        }
    }
}

/// Geometry attached to a node: one shape plus its modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub shape: Shape,
    pub morphs: Vec<Morph>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_unused_groups_when_cleaning_up_then_only_used_groups_remain() {
        let mut mesh = FacetMesh::new();
        mesh.activate_face_group("fbx_group_1");
        mesh.add_facet(vec![0, 1, 2], Vec::new(), FanMarker::Standalone);
        mesh.activate_face_group("fbx_group_2");

        let removed = mesh.remove_empty_face_groups();

        assert_eq!(removed, 2);
        assert_eq!(mesh.face_groups.len(), 1);
        assert_eq!(mesh.face_groups[0].name, "fbx_group_1");
        assert_eq!(mesh.facets[0].face_group, 0);
    }

    #[test]
    fn given_reversed_edge_when_setting_weight_then_edge_is_stored_once() {
        let mut mesh = FacetMesh::new();
        mesh.set_edge_weights([(3, 1, 0.5), (0, 2, 0.25), (1, 3, 0.75)]);
        mesh.set_edge_weights([(2, 0, 1.0)]);

        assert_eq!(mesh.edge_weights.len(), 2);
        assert_eq!(mesh.edge_weight(3, 1), Some(0.75));
        assert_eq!(mesh.edge_weight(0, 2), Some(1.0));
    }

    #[test]
    fn given_material_groups_when_adding_facets_then_active_slot_is_recorded() {
        let mut mesh = FacetMesh::new();
        mesh.add_material_group("A");
        mesh.add_material_group("B");
        assert_eq!(mesh.active_material(), 1);
        assert!(mesh.activate_material(0));
        assert!(!mesh.activate_material(5));

        let facet = mesh.add_facet(vec![0, 1, 2], Vec::new(), FanMarker::Standalone);
        assert_eq!(mesh.facets[facet].material, 0);
    }

    #[test]
    fn given_lod_control_when_selecting_highest_then_value_and_default_move() {
        let mut lod = LodControl::default();
        lod.select_highest();
        assert_eq!((lod.value, lod.default_value), (1, 1));
    }
}
