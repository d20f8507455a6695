use std::collections::BTreeSet;

use fictus::mesh::procedural::{create_unit_interval_mesh, create_unit_square_quad_mesh};
use fictus::mesh::refinement::{refine_cells, refine_param_mesh_uniformly, refine_uniformly};
use fictus::mesh::QuadMesh2d;

fn cell_side(mesh: &QuadMesh2d, cell: usize) -> f64 {
    let (min, max) = mesh.cell_bounds(cell);
    max.x - min.x
}

/// Asserts that no two edge-adjacent cells differ by more than one
/// refinement level.
fn assert_two_to_one_balanced(mesh: &QuadMesh2d) {
    for a in 0..mesh.num_cells() {
        for b in (a + 1)..mesh.num_cells() {
            let (a_min, a_max) = mesh.cell_bounds(a);
            let (b_min, b_max) = mesh.cell_bounds(b);
            let x_touch = (a_max.x - b_min.x).abs() < 1e-12 || (b_max.x - a_min.x).abs() < 1e-12;
            let y_touch = (a_max.y - b_min.y).abs() < 1e-12 || (b_max.y - a_min.y).abs() < 1e-12;
            let x_overlap = a_max.x.min(b_max.x) - a_min.x.max(b_min.x) > 1e-12;
            let y_overlap = a_max.y.min(b_max.y) - a_min.y.max(b_min.y) > 1e-12;
            let edge_adjacent = (x_touch && y_overlap) || (y_touch && x_overlap);
            if edge_adjacent {
                let ratio = cell_side(mesh, a) / cell_side(mesh, b);
                assert!(
                    (0.5 - 1e-12..=2.0 + 1e-12).contains(&ratio),
                    "cells {} and {} violate the 2:1 balance (ratio {})",
                    a,
                    b,
                    ratio
                );
            }
        }
    }
}

#[test]
fn uniform_refinement_quadruples_the_cell_count() {
    let mesh = create_unit_square_quad_mesh(0);
    let refined = refine_uniformly(&mesh);
    assert_eq!(refined.num_cells(), 4);
    assert_eq!(refined.vertices().len(), 9);

    let refined_again = refine_uniformly(&refined);
    assert_eq!(refined_again.num_cells(), 16);
    assert_eq!(refined_again.vertices().len(), 25);
}

#[test]
fn empty_request_returns_an_identical_mesh() {
    let mesh = create_unit_square_quad_mesh(2);
    let refined = refine_cells(&mesh, &BTreeSet::new());
    assert_eq!(refined, mesh);
}

#[test]
fn single_cell_refinement_adds_three_cells_and_five_vertices() {
    let mesh = create_unit_square_quad_mesh(1);
    let refined = refine_cells(&mesh, &BTreeSet::from([0usize]));
    assert_eq!(refined.num_cells(), 7);
    assert_eq!(refined.vertices().len(), 14);
    assert_two_to_one_balanced(&refined);
}

#[test]
fn refinement_request_is_closed_under_two_to_one_balance() {
    let mesh = create_unit_square_quad_mesh(1);
    let once = refine_cells(&mesh, &BTreeSet::from([0usize]));

    // The second child of the split cell touches the coarse right neighbor;
    // splitting it must drag that neighbor along.
    let fine_cell = (0..once.num_cells())
        .find(|&cell| {
            let (min, max) = once.cell_bounds(cell);
            cell_side(&once, cell) < 0.3 && (max.x - 0.5).abs() < 1e-12 && min.y == 0.0
        })
        .unwrap();
    let twice = refine_cells(&once, &BTreeSet::from([fine_cell]));

    // Splitting the requested fine cell and the dragged coarse neighbor
    // turns 7 cells into 13.
    assert_eq!(twice.num_cells(), 13);
    assert_two_to_one_balanced(&twice);
}

#[test]
fn refined_vertices_are_deduplicated() {
    let mesh = create_unit_square_quad_mesh(1);
    let all_cells = (0..mesh.num_cells()).collect();
    let refined = refine_cells(&mesh, &all_cells);
    assert_eq!(refined.num_cells(), 16);
    // Shared edge midpoints must be stored once: a 4x4 grid has 25 vertices.
    assert_eq!(refined.vertices().len(), 25);
}

#[test]
fn param_mesh_refinement_splits_every_segment() {
    let mesh = create_unit_interval_mesh(2);
    let refined = refine_param_mesh_uniformly(&mesh);
    assert_eq!(refined.num_cells(), 8);
    assert_eq!(refined.vertices().len(), 9);
    let total_length: f64 = (0..refined.num_cells())
        .map(|cell| {
            let [a, b] = refined.cell_vertices(cell);
            b - a
        })
        .sum();
    assert!((total_length - 1.0).abs() < 1e-14);
}
