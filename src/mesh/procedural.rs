//! Procedural generators for the host and embedded meshes.
use nalgebra::Point2;

use crate::connectivity::{Quad4Connectivity, SegmentConnectivity};
use crate::mesh::{ParamMesh, QuadMesh2d};

/// Generates a uniform quadrilateral mesh of the unit square [0, 1]².
///
/// `num_refinements` counts uniform refinements of the single-cell square,
/// producing `2^num_refinements` cells per dimension. Vertex coordinates are
/// dyadic and therefore exact in `f64`.
pub fn create_unit_square_quad_mesh(num_refinements: usize) -> QuadMesh2d {
    let cells_per_dim = 1usize << num_refinements;
    let vertices_per_dim = cells_per_dim + 1;

    let mut vertices = Vec::with_capacity(vertices_per_dim * vertices_per_dim);
    for j in 0..vertices_per_dim {
        for i in 0..vertices_per_dim {
            vertices.push(Point2::new(
                i as f64 / cells_per_dim as f64,
                j as f64 / cells_per_dim as f64,
            ));
        }
    }

    let vertex_index = |i: usize, j: usize| j * vertices_per_dim + i;
    let mut connectivity = Vec::with_capacity(cells_per_dim * cells_per_dim);
    for j in 0..cells_per_dim {
        for i in 0..cells_per_dim {
            connectivity.push(Quad4Connectivity([
                vertex_index(i, j),
                vertex_index(i + 1, j),
                vertex_index(i + 1, j + 1),
                vertex_index(i, j + 1),
            ]));
        }
    }

    QuadMesh2d::from_vertices_and_connectivity(vertices, connectivity)
}

/// Generates a uniform segment mesh of the unit parameter interval [0, 1].
///
/// `num_refinements` counts uniform refinements of the single-segment
/// interval, producing `2^num_refinements` segments.
pub fn create_unit_interval_mesh(num_refinements: usize) -> ParamMesh {
    let num_cells = 1usize << num_refinements;

    let vertices = (0..=num_cells).map(|i| i as f64 / num_cells as f64).collect();
    let connectivity = (0..num_cells).map(|i| SegmentConnectivity([i, i + 1])).collect();

    ParamMesh::from_vertices_and_connectivity(vertices, connectivity)
}
