//! Index-based mesh data structures for the host and embedded domains.
use nalgebra::Point2;

use crate::connectivity::{Quad4Connectivity, SegmentConnectivity};

pub mod procedural;
pub mod refinement;

/// Index-based storage for a quadrilateral mesh in two dimensions.
///
/// Cells produced by the procedural generators and the refinement routines
/// are axis-aligned squares with dyadic corner coordinates, so midpoint and
/// extent arithmetic on vertex coordinates is exact in `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadMesh2d {
    vertices: Vec<Point2<f64>>,
    connectivity: Vec<Quad4Connectivity>,
}

impl QuadMesh2d {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// The connectivity is expected to reference in-bounds vertex indices;
    /// users of the mesh are permitted to panic if they encounter invalid
    /// indices.
    pub fn from_vertices_and_connectivity(
        vertices: Vec<Point2<f64>>,
        connectivity: Vec<Quad4Connectivity>,
    ) -> Self {
        Self { vertices, connectivity }
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Quad4Connectivity] {
        &self.connectivity
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    pub fn cell_vertices(&self, cell_index: usize) -> [Point2<f64>; 4] {
        let conn = &self.connectivity[cell_index];
        [
            self.vertices[conn[0]],
            self.vertices[conn[1]],
            self.vertices[conn[2]],
            self.vertices[conn[3]],
        ]
    }

    /// Lower-left corner and extents of a cell's bounding box.
    pub fn cell_bounds(&self, cell_index: usize) -> (Point2<f64>, Point2<f64>) {
        let vertices = self.cell_vertices(cell_index);
        let mut min = vertices[0];
        let mut max = vertices[0];
        for v in &vertices[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    pub fn cell_diameter(&self, cell_index: usize) -> f64 {
        let (min, max) = self.cell_bounds(cell_index);
        (max - min).norm()
    }

    /// The smallest cell diameter in the mesh.
    ///
    /// # Panics
    ///
    /// Panics if the mesh has no cells.
    pub fn min_cell_diameter(&self) -> f64 {
        assert!(!self.connectivity.is_empty(), "mesh has no cells");
        (0..self.num_cells())
            .map(|i| self.cell_diameter(i))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Index-based storage for the one-dimensional embedded parameter mesh.
///
/// Vertices are parameter values; the physical placement of the mesh is
/// defined exclusively by a [`DeformationMap`](crate::deformation::DeformationMap).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamMesh {
    vertices: Vec<f64>,
    connectivity: Vec<SegmentConnectivity>,
}

impl ParamMesh {
    pub fn from_vertices_and_connectivity(
        vertices: Vec<f64>,
        connectivity: Vec<SegmentConnectivity>,
    ) -> Self {
        Self { vertices, connectivity }
    }

    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[SegmentConnectivity] {
        &self.connectivity
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    pub fn cell_vertices(&self, cell_index: usize) -> [f64; 2] {
        let conn = &self.connectivity[cell_index];
        [self.vertices[conn[0]], self.vertices[conn[1]]]
    }
}
