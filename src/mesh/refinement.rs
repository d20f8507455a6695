//! Mesh refinement.
//!
//! Refinement is a pure operation: callers pass an explicit set of
//! refinement-requested cell indices and receive a new mesh; the input mesh
//! is never mutated in place. Selective refinement enforces a 2:1 balance
//! (no cell is more than one level finer than an edge-neighbor), which keeps
//! every nonconforming edge a single-hanging-midpoint configuration.
use std::collections::BTreeSet;

use nalgebra::Point2;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::connectivity::{Quad4Connectivity, SegmentConnectivity};
use crate::mesh::{ParamMesh, QuadMesh2d};

type VertexKey = (OrderedFloat<f64>, OrderedFloat<f64>);

fn vertex_key(point: &Point2<f64>) -> VertexKey {
    (OrderedFloat(point.x), OrderedFloat(point.y))
}

/// True if the bounding boxes of two cells touch along an edge segment of
/// positive length.
fn cells_share_edge(mesh: &QuadMesh2d, cell_a: usize, cell_b: usize) -> bool {
    const TOL: f64 = 1e-12;
    let (a_min, a_max) = mesh.cell_bounds(cell_a);
    let (b_min, b_max) = mesh.cell_bounds(cell_b);

    let x_touch = (a_max.x - b_min.x).abs() <= TOL || (b_max.x - a_min.x).abs() <= TOL;
    let y_overlap = a_max.y.min(b_max.y) - a_min.y.max(b_min.y) > TOL;
    if x_touch && y_overlap {
        return true;
    }

    let y_touch = (a_max.y - b_min.y).abs() <= TOL || (b_max.y - a_min.y).abs() <= TOL;
    let x_overlap = a_max.x.min(b_max.x) - a_min.x.max(b_min.x) > TOL;
    y_touch && x_overlap
}

/// Completes a refinement request so that the refined mesh stays 2:1
/// balanced: a coarser edge-neighbor of any requested cell is requested as
/// well, transitively.
fn close_refinement_request(mesh: &QuadMesh2d, requested: &BTreeSet<usize>) -> BTreeSet<usize> {
    // Vertex incidence suffices to enumerate edge-neighbor candidates: under
    // 2:1 balance an edge-overlapping neighbor always shares a vertex.
    let mut incident_cells: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertices().len()];
    for (cell_index, cell) in mesh.connectivity().iter().enumerate() {
        for &v in cell.vertex_indices() {
            incident_cells[v].push(cell_index);
        }
    }

    let cell_side = |cell: usize| {
        let (min, max) = mesh.cell_bounds(cell);
        max.x - min.x
    };

    let mut flagged = requested.clone();
    let mut worklist: Vec<usize> = flagged.iter().copied().collect();
    while let Some(cell) = worklist.pop() {
        let side = cell_side(cell);
        for &v in mesh.connectivity()[cell].vertex_indices() {
            for &neighbor in &incident_cells[v] {
                if neighbor == cell || flagged.contains(&neighbor) {
                    continue;
                }
                let is_coarser = cell_side(neighbor) > 1.5 * side;
                if is_coarser && cells_share_edge(mesh, cell, neighbor) {
                    flagged.insert(neighbor);
                    worklist.push(neighbor);
                }
            }
        }
    }
    flagged
}

/// Refines the requested cells of a quadrilateral mesh, splitting each into
/// four children, and returns the new mesh.
///
/// The request is first closed under the 2:1 balance rule, so the returned
/// mesh may contain more splits than requested. Vertices shared between
/// children and pre-existing cells are deduplicated by exact coordinate.
///
/// # Panics
///
/// Panics if a requested cell index is out of bounds.
pub fn refine_cells(mesh: &QuadMesh2d, requested: &BTreeSet<usize>) -> QuadMesh2d {
    for &cell in requested {
        assert!(cell < mesh.num_cells(), "refinement request out of bounds");
    }
    let flagged = close_refinement_request(mesh, requested);

    let mut vertices = mesh.vertices().to_vec();
    let mut vertex_lookup: FxHashMap<VertexKey, usize> = vertices
        .iter()
        .enumerate()
        .map(|(index, point)| (vertex_key(point), index))
        .collect();
    let mut lookup_or_insert = |point: Point2<f64>, vertices: &mut Vec<Point2<f64>>| {
        *vertex_lookup.entry(vertex_key(&point)).or_insert_with(|| {
            vertices.push(point);
            vertices.len() - 1
        })
    };

    let mut connectivity = Vec::with_capacity(mesh.num_cells() + 3 * flagged.len());
    for (cell_index, cell) in mesh.connectivity().iter().enumerate() {
        if !flagged.contains(&cell_index) {
            connectivity.push(*cell);
            continue;
        }

        let [p0, p1, p2, p3] = mesh.cell_vertices(cell_index);
        let [v0, v1, v2, v3] = *cell.vertex_indices();
        let bottom = lookup_or_insert(nalgebra::center(&p0, &p1), &mut vertices);
        let right = lookup_or_insert(nalgebra::center(&p1, &p2), &mut vertices);
        let top = lookup_or_insert(nalgebra::center(&p2, &p3), &mut vertices);
        let left = lookup_or_insert(nalgebra::center(&p3, &p0), &mut vertices);
        let center = lookup_or_insert(nalgebra::center(&nalgebra::center(&p0, &p1), &nalgebra::center(&p2, &p3)), &mut vertices);

        connectivity.push(Quad4Connectivity([v0, bottom, center, left]));
        connectivity.push(Quad4Connectivity([bottom, v1, right, center]));
        connectivity.push(Quad4Connectivity([center, right, v2, top]));
        connectivity.push(Quad4Connectivity([left, center, top, v3]));
    }

    QuadMesh2d::from_vertices_and_connectivity(vertices, connectivity)
}

/// Applies one round of uniform refinement to every cell.
pub fn refine_uniformly(mesh: &QuadMesh2d) -> QuadMesh2d {
    let all_cells = (0..mesh.num_cells()).collect();
    refine_cells(mesh, &all_cells)
}

/// Applies one round of uniform refinement to a parameter mesh, splitting
/// every segment at its midpoint.
pub fn refine_param_mesh_uniformly(mesh: &ParamMesh) -> ParamMesh {
    let mut vertices = mesh.vertices().to_vec();
    let mut connectivity = Vec::with_capacity(2 * mesh.num_cells());
    for cell in mesh.connectivity() {
        let [a, b] = *cell.vertex_indices();
        let midpoint_value = (mesh.vertices()[a] + mesh.vertices()[b]) / 2.0;
        vertices.push(midpoint_value);
        let midpoint = vertices.len() - 1;
        connectivity.push(SegmentConnectivity([a, midpoint]));
        connectivity.push(SegmentConnectivity([midpoint, b]));
    }
    ParamMesh::from_vertices_and_connectivity(vertices, connectivity)
}
