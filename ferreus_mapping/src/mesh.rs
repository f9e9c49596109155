/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the coupling mesh: vertices, connectivity, data fields, and the vertex distribution.
//
// Created on: 21 May 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # mesh
//!
//! A mesh holds the local view of one coupling surface: vertices with global
//! indices and ownership bits, edges and triangles for surface integrals,
//! per-vertex data fields, and the per-rank vertex distribution consumed by
//! the gather-scatter distributor.
//!
//! Meshes are shared between the coupling adapter and the mappings bound to
//! them. Mappings never mutate geometry; they only set the tagged bit on
//! vertices and overwrite output data values.

use faer::Mat;
use ferreus_mapping_utils::get_pointarray_extents;
use std::cell::RefCell;
use std::rc::Rc;

/// Stable local identifier of a vertex within its mesh.
pub type VertexId = usize;

/// Stable identifier of a data field within its mesh.
pub type DataId = usize;

/// Shared handle to a mesh, shared between the coupling adapter and mappings.
pub type PtrMesh = Rc<RefCell<Mesh>>;

/// A single mesh vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    global_index: usize,
    coords: [f64; 3],
    owner: bool,
    tagged: bool,
}

impl Vertex {
    /// The local, stable id of this vertex.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// The cluster-wide index of this vertex within its logical mesh.
    pub fn global_index(&self) -> usize {
        self.global_index
    }

    /// Raw coordinates, zero-padded beyond the mesh dimension.
    pub fn coords(&self) -> &[f64; 3] {
        &self.coords
    }

    /// Whether the current rank owns this vertex.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn set_owner(&mut self, owner: bool) {
        self.owner = owner;
    }

    /// Whether this vertex participates in the mapping after tagging.
    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    pub fn tag(&mut self) {
        self.tagged = true;
    }
}

/// An edge between two vertices with its cached length.
#[derive(Debug, Clone)]
pub struct Edge {
    vertices: [VertexId; 2],
    length: f64,
}

impl Edge {
    /// The id of the `i`-th endpoint (`i` in 0..2).
    pub fn vertex(&self, i: usize) -> VertexId {
        self.vertices[i]
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

/// A triangle over three vertices with its cached area.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [VertexId; 3],
    area: f64,
}

impl Triangle {
    /// The id of the `i`-th corner (`i` in 0..3).
    pub fn vertex(&self, i: usize) -> VertexId {
        self.vertices[i]
    }

    pub fn area(&self) -> f64 {
        self.area
    }
}

/// A named per-vertex data field.
///
/// Values are stored flat with contiguous per-vertex interleaving
/// `[v0_d0, v0_d1, .., v1_d0, ..]`; after allocation
/// `values.len() == |vertices| * dimensions`.
#[derive(Debug, Clone)]
pub struct DataField {
    id: DataId,
    name: String,
    dimensions: usize,
    values: Vec<f64>,
}

impl DataField {
    pub fn id(&self) -> DataId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of components stored per vertex.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Overwrites the stored values. The slice length must match the
    /// allocated size.
    pub fn set_values(&mut self, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.values.len(),
            "value count must match the allocated field size"
        );
        self.values.copy_from_slice(values);
    }
}

/// Axis-aligned bounding box of a mesh.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: usize,
    empty: bool,
}

impl BoundingBox {
    /// Euclidean distance from `point` to the box; zero inside the box,
    /// infinity for the box of an empty mesh.
    pub fn distance(&self, point: &[f64; 3]) -> f64 {
        if self.empty {
            return f64::INFINITY;
        }
        let mut dist = 0.0;
        for d in 0..self.dimensions {
            let gap = (self.min[d] - point[d]).max(point[d] - self.max[d]).max(0.0);
            dist += gap * gap;
        }
        dist.sqrt()
    }

    /// Returns a copy of the box inflated by `radius` along every axis.
    pub fn expanded_by(&self, radius: f64) -> BoundingBox {
        let mut expanded = self.clone();
        if !expanded.empty {
            for d in 0..self.dimensions {
                expanded.min[d] -= radius;
                expanded.max[d] += radius;
            }
        }
        expanded
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

/// The local view of one coupling mesh.
#[derive(Debug)]
pub struct Mesh {
    name: String,
    dimensions: usize,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    triangles: Vec<Triangle>,
    data: Vec<DataField>,
    vertex_distribution: Vec<Vec<usize>>,
    global_vertex_count: Option<usize>,
}

impl Mesh {
    /// Creates an empty mesh of the given spatial dimension (2 or 3).
    pub fn new(name: &str, dimensions: usize) -> Self {
        assert!(
            (2..=3).contains(&dimensions),
            "Unsupported number of dimensions: {}",
            dimensions
        );
        Self {
            name: name.to_string(),
            dimensions,
            vertices: Vec::new(),
            edges: Vec::new(),
            triangles: Vec::new(),
            data: Vec::new(),
            vertex_distribution: Vec::new(),
            global_vertex_count: None,
        }
    }

    /// Creates a shared mesh handle.
    pub fn shared(name: &str, dimensions: usize) -> PtrMesh {
        Rc::new(RefCell::new(Mesh::new(name, dimensions)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Adds a vertex and returns its local id. `coords` must have exactly
    /// `dimensions` entries; the third component is zero-padded in 2D.
    pub fn create_vertex(&mut self, coords: &[f64]) -> VertexId {
        assert_eq!(
            coords.len(),
            self.dimensions,
            "coordinate count must match the mesh dimension"
        );
        let id = self.vertices.len();
        let mut padded = [0.0; 3];
        padded[..coords.len()].copy_from_slice(coords);
        self.vertices.push(Vertex {
            id,
            global_index: id,
            coords: padded,
            owner: true,
            tagged: false,
        });
        id
    }

    /// Adds an edge between two existing vertices, caching its length.
    pub fn create_edge(&mut self, a: VertexId, b: VertexId) -> usize {
        let length = distance(self.vertices[a].coords(), self.vertices[b].coords());
        self.edges.push(Edge { vertices: [a, b], length });
        self.edges.len() - 1
    }

    /// Adds a triangle over three existing vertices, caching its area.
    pub fn create_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId) -> usize {
        let pa = self.vertices[a].coords();
        let pb = self.vertices[b].coords();
        let pc = self.vertices[c].coords();
        let u = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let v = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        let cross = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        let area = 0.5 * (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
        self.triangles.push(Triangle { vertices: [a, b, c], area });
        self.triangles.len() - 1
    }

    /// Adds a data field of the given per-vertex value dimension.
    ///
    /// Values are sized by [`Mesh::allocate_data_values`] once the vertex set
    /// is complete.
    pub fn create_data(&mut self, name: &str, dimensions: usize) -> DataId {
        assert!(dimensions > 0, "value dimension must be positive");
        let id = self.data.len();
        self.data.push(DataField {
            id,
            name: name.to_string(),
            dimensions,
            values: Vec::new(),
        });
        id
    }

    /// Resizes every data field to `|vertices| * dimensions`, preserving
    /// existing values.
    pub fn allocate_data_values(&mut self) {
        let n = self.vertices.len();
        for field in &mut self.data {
            field.values.resize(n * field.dimensions, 0.0);
        }
    }

    pub fn data(&self, id: DataId) -> Option<&DataField> {
        self.data.get(id)
    }

    pub fn data_mut(&mut self, id: DataId) -> Option<&mut DataField> {
        self.data.get_mut(id)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Assigns `global_index = id + offset` to every vertex.
    pub fn assign_global_indices(&mut self, offset: usize) {
        for v in &mut self.vertices {
            v.global_index = v.id + offset;
        }
    }

    pub fn set_global_index(&mut self, vertex: VertexId, global_index: usize) {
        self.vertices[vertex].global_index = global_index;
    }

    /// The per-rank ordered lists of global indices contributed by each rank.
    pub fn vertex_distribution(&self) -> &[Vec<usize>] {
        &self.vertex_distribution
    }

    pub fn set_vertex_distribution(&mut self, distribution: Vec<Vec<usize>>) {
        self.vertex_distribution = distribution;
    }

    /// Total number of vertices of the logical mesh across the cluster.
    /// Defaults to the local vertex count when never set.
    pub fn global_vertex_count(&self) -> usize {
        self.global_vertex_count.unwrap_or(self.vertices.len())
    }

    pub fn set_global_vertex_count(&mut self, count: usize) {
        self.global_vertex_count = Some(count);
    }

    /// Returns the vertex coordinates as an `n x dimensions` matrix for the
    /// solvers.
    pub fn coordinate_matrix(&self) -> Mat<f64> {
        Mat::from_fn(self.vertices.len(), self.dimensions, |i, j| {
            self.vertices[i].coords[j]
        })
    }

    /// Computes the axis-aligned bounding box over the local vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        if self.vertices.is_empty() {
            return BoundingBox {
                min: [0.0; 3],
                max: [0.0; 3],
                dimensions: self.dimensions,
                empty: true,
            };
        }
        let extents = get_pointarray_extents(&self.coordinate_matrix());
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for d in 0..self.dimensions {
            min[d] = extents[d];
            max[d] = extents[d + self.dimensions];
        }
        BoundingBox {
            min,
            max,
            dimensions: self.dimensions,
            empty: false,
        }
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let mut dist = 0.0;
    for d in 0..3 {
        let diff = a[d] - b[d];
        dist += diff * diff;
    }
    dist.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_length_and_triangle_area_are_cached() {
        let mut mesh = Mesh::new("Surface", 3);
        let a = mesh.create_vertex(&[0.0, 0.0, 0.0]);
        let b = mesh.create_vertex(&[3.0, 0.0, 0.0]);
        let c = mesh.create_vertex(&[0.0, 4.0, 0.0]);

        let e = mesh.create_edge(a, b);
        assert_eq!(mesh.edges()[e].length(), 3.0);

        let t = mesh.create_triangle(a, b, c);
        assert_eq!(mesh.triangles()[t].area(), 6.0);
    }

    #[test]
    fn data_allocation_matches_vertex_count() {
        let mut mesh = Mesh::new("Surface", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        let scalar = mesh.create_data("Pressure", 1);
        let vector = mesh.create_data("Velocity", 2);
        mesh.allocate_data_values();

        assert_eq!(mesh.data(scalar).unwrap().values().len(), 2);
        assert_eq!(mesh.data(vector).unwrap().values().len(), 4);
    }

    #[test]
    fn bounding_box_distance() {
        let mut mesh = Mesh::new("Surface", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[2.0, 1.0]);
        let bb = mesh.bounding_box();

        // Inside and on the boundary.
        assert_eq!(bb.distance(&[1.0, 0.5, 0.0]), 0.0);
        assert_eq!(bb.distance(&[2.0, 1.0, 0.0]), 0.0);

        // Axis-aligned outside.
        assert_eq!(bb.distance(&[4.0, 0.5, 0.0]), 2.0);

        // Diagonal outside.
        assert_eq!(bb.distance(&[5.0, 5.0, 0.0]), 5.0);

        // Expansion brings the point onto the boundary.
        assert_eq!(bb.expanded_by(2.0).distance(&[4.0, 0.5, 0.0]), 0.0);
    }

    #[test]
    fn empty_mesh_bounding_box_is_infinitely_far() {
        let mesh = Mesh::new("Surface", 2);
        let bb = mesh.bounding_box();
        assert!(bb.is_empty());
        assert_eq!(bb.distance(&[0.0, 0.0, 0.0]), f64::INFINITY);
    }

    #[test]
    fn global_indices_with_offset() {
        let mut mesh = Mesh::new("Surface", 2);
        mesh.create_vertex(&[0.0, 0.0]);
        mesh.create_vertex(&[1.0, 0.0]);
        mesh.assign_global_indices(4);
        assert_eq!(mesh.vertices()[0].global_index(), 4);
        assert_eq!(mesh.vertices()[1].global_index(), 5);
    }
}
