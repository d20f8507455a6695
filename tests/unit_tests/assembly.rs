use std::f64::consts::PI;

use fictus::assembly::coupling::CouplingAssembler;
use fictus::assembly::stiffness::assemble_stiffness;
use fictus::assembly::target::{assemble_target_rhs, interpolate_target};
use fictus::constraints::{make_zero_dirichlet_constraints, ConstraintSet};
use fictus::deformation::{DeformationKind, DeformationMap};
use fictus::function::{ParsedCurveFunction, ParsedScalarFunction};
use fictus::geometry::CellLocator;
use fictus::mesh::procedural::{create_unit_interval_mesh, create_unit_square_quad_mesh};
use fictus::space::{EmbeddedSpace, HostSpace};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DMatrix;

fn empty_closed_constraints() -> ConstraintSet {
    let mut constraints = ConstraintSet::new();
    constraints.close();
    constraints
}

fn circle_mapper(refinements: usize) -> DeformationMap {
    let configuration = ParsedCurveFunction::parse(
        "embedded_configuration_expression",
        "0.3*cos(2*pi*t)+0.4; 0.3*sin(2*pi*t)+0.4",
    )
    .unwrap();
    let space = EmbeddedSpace::from_mesh(create_unit_interval_mesh(refinements), 1).unwrap();
    DeformationMap::interpolate(space, &configuration, DeformationKind::AbsolutePosition).unwrap()
}

#[test]
fn single_cell_stiffness_matches_the_known_element_matrix() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(0), 1).unwrap();
    space.distribute();
    let stiffness = assemble_stiffness(&space, &empty_closed_constraints()).unwrap();
    assert_eq!(stiffness.nrows(), 4);

    // The bilinear Laplace element matrix on a square, for counterclockwise
    // vertex ordering.
    let expected = DMatrix::from_row_slice(
        4,
        4,
        &[
            4.0, -1.0, -2.0, -1.0, //
            -1.0, 4.0, -1.0, -2.0, //
            -2.0, -1.0, 4.0, -1.0, //
            -1.0, -2.0, -1.0, 4.0,
        ],
    ) / 6.0;
    let dense = DMatrix::from(&stiffness);
    assert_matrix_eq!(dense, expected, comp = abs, tol = 1e-13);
}

#[test]
fn stiffness_is_symmetric_with_zero_row_sums_before_constraints() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(2), 2).unwrap();
    space.distribute();
    let stiffness = assemble_stiffness(&space, &empty_closed_constraints()).unwrap();
    let dense = DMatrix::from(&stiffness);

    assert_matrix_eq!(dense, dense.transpose(), comp = abs, tol = 1e-12);
    // Without boundary conditions the operator annihilates constants.
    for row in 0..dense.nrows() {
        let row_sum: f64 = dense.row(row).iter().sum();
        assert_scalar_eq!(row_sum, 0.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn constrained_dofs_reduce_to_unit_diagonal_rows() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(1), 1).unwrap();
    space.distribute();

    let mut constraints = ConstraintSet::new();
    make_zero_dirichlet_constraints(&space, &[0, 1, 2, 3], &mut constraints).unwrap();
    constraints.close();
    let stiffness = assemble_stiffness(&space, &constraints).unwrap();
    let dense = DMatrix::from(&stiffness);

    for dof in constraints.constrained_dofs() {
        for col in 0..dense.ncols() {
            let expected = if col == dof { 1.0 } else { 0.0 };
            assert_scalar_eq!(dense[(dof, col)], expected, comp = abs, tol = 1e-14);
            assert_scalar_eq!(dense[(col, dof)], expected, comp = abs, tol = 1e-14);
        }
    }

    // The only interior dof of the 3x3 lattice keeps the assembled Laplace
    // diagonal.
    let interior = (0..9).find(|dof| !constraints.is_constrained(*dof)).unwrap();
    assert_scalar_eq!(dense[(interior, interior)], 8.0 / 3.0, comp = abs, tol = 1e-13);
}

#[test]
fn coupling_operator_has_host_by_embedded_shape() {
    let mut host = HostSpace::from_mesh(create_unit_square_quad_mesh(2), 1).unwrap();
    host.distribute();
    let mut embedded = EmbeddedSpace::from_mesh(create_unit_interval_mesh(3), 1).unwrap();
    embedded.distribute();
    let mapper = circle_mapper(3);
    let locator = CellLocator::from_mesh(host.mesh());

    let assembler = CouplingAssembler::new(3);
    let pattern = assembler.build_sparsity(&host, &embedded, &mapper, &locator).unwrap();
    let coupling = assembler.assemble(pattern, &host, &embedded, &mapper, &locator).unwrap();

    assert_eq!(coupling.nrows(), host.num_dofs().unwrap());
    assert_eq!(coupling.ncols(), embedded.num_dofs().unwrap());
}

#[test]
fn coupling_entries_sum_to_the_mapped_curve_length() {
    // Partition of unity on both sides collapses the total entry sum to
    // ∫ 1 dΓ over the mapped polyline.
    let mut host = HostSpace::from_mesh(create_unit_square_quad_mesh(2), 1).unwrap();
    host.distribute();
    let mut embedded = EmbeddedSpace::from_mesh(create_unit_interval_mesh(3), 1).unwrap();
    embedded.distribute();
    let mapper = circle_mapper(3);
    let locator = CellLocator::from_mesh(host.mesh());

    let assembler = CouplingAssembler::new(3);
    let pattern = assembler.build_sparsity(&host, &embedded, &mapper, &locator).unwrap();
    let coupling = assembler.assemble(pattern, &host, &embedded, &mapper, &locator).unwrap();

    let entry_sum: f64 = coupling.triplet_iter().map(|(_, _, value)| value).sum();
    let polyline_length: f64 = (0..8)
        .map(|cell| (mapper.map(cell, 1.0) - mapper.map(cell, -1.0)).norm())
        .sum();
    assert_scalar_eq!(entry_sum, polyline_length, comp = abs, tol = 1e-12);
}

#[test]
fn coupling_entries_require_geometrically_intersecting_supports() {
    let mut host = HostSpace::from_mesh(create_unit_square_quad_mesh(3), 1).unwrap();
    host.distribute();
    let mut embedded = EmbeddedSpace::from_mesh(create_unit_interval_mesh(4), 1).unwrap();
    embedded.distribute();
    let mapper = circle_mapper(4);
    let locator = CellLocator::from_mesh(host.mesh());

    let assembler = CouplingAssembler::new(3);
    let pattern = assembler.build_sparsity(&host, &embedded, &mapper, &locator).unwrap();
    let coupling = assembler.assemble(pattern, &host, &embedded, &mapper, &locator).unwrap();

    // Support of a host dof: union of the bounding boxes of its cells.
    let host_numbering = host.numbering().unwrap();
    let mut host_dof_cells = vec![Vec::new(); coupling.nrows()];
    for cell in 0..host.mesh().num_cells() {
        for &dof in host_numbering.cell_dofs(cell) {
            host_dof_cells[dof].push(cell);
        }
    }
    // Support of an embedded dof: its segments, sampled densely through the
    // mapping.
    let embedded_numbering = embedded.numbering().unwrap();
    let (_, quadrature_points) = fictus::quadrature::gauss(3);
    let mut embedded_dof_samples = vec![Vec::new(); coupling.ncols()];
    for cell in 0..embedded.mesh().num_cells() {
        let mut samples: Vec<f64> = (0..=50).map(|k| -1.0 + 2.0 * k as f64 / 50.0).collect();
        samples.extend_from_slice(&quadrature_points);
        for &dof in embedded_numbering.cell_dofs(cell) {
            for &xi in &samples {
                embedded_dof_samples[dof].push(mapper.map(cell, xi));
            }
        }
    }

    for (i, j, &value) in coupling.triplet_iter() {
        if value.abs() <= 1e-14 {
            continue;
        }
        let intersects = host_dof_cells[i].iter().any(|&cell| {
            let (min, max) = host.mesh().cell_bounds(cell);
            embedded_dof_samples[j].iter().any(|sample| {
                sample.x >= min.x - 1e-9
                    && sample.x <= max.x + 1e-9
                    && sample.y >= min.y - 1e-9
                    && sample.y <= max.y + 1e-9
            })
        });
        assert!(
            intersects,
            "nonzero coupling entry ({}, {}) without geometric support overlap",
            i, j
        );
    }
}

#[test]
fn target_rhs_sums_to_the_curve_length_for_unit_target() {
    let mut embedded = EmbeddedSpace::from_mesh(create_unit_interval_mesh(3), 1).unwrap();
    embedded.distribute();
    let mapper = circle_mapper(3);
    let target = ParsedScalarFunction::parse("embedded_value_expression", "1").unwrap();

    let rhs = assemble_target_rhs(&embedded, &mapper, &target).unwrap();
    assert_eq!(rhs.len(), embedded.num_dofs().unwrap());

    let polyline_length: f64 = (0..8)
        .map(|cell| (mapper.map(cell, 1.0) - mapper.map(cell, -1.0)).norm())
        .sum();
    assert_scalar_eq!(rhs.sum(), polyline_length, comp = abs, tol = 1e-12);
    assert_scalar_eq!(
        polyline_length,
        16.0 * 0.3 * (PI / 8.0).sin(),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
fn target_interpolation_samples_the_function_at_mapped_support_points() {
    let mut embedded = EmbeddedSpace::from_mesh(create_unit_interval_mesh(3), 1).unwrap();
    embedded.distribute();
    let mapper = circle_mapper(3);

    let ones = ParsedScalarFunction::parse("embedded_value_expression", "1").unwrap();
    let values = interpolate_target(&embedded, &mapper, &ones).unwrap();
    assert_eq!(values.len(), 9);
    assert!(values.iter().all(|&v| (v - 1.0).abs() < 1e-15));

    let coordinate = ParsedScalarFunction::parse("embedded_value_expression", "x").unwrap();
    let values = interpolate_target(&embedded, &mapper, &coordinate).unwrap();
    let positions = mapper.map_support_points(&embedded).unwrap();
    for (value, position) in values.iter().zip(&positions) {
        assert_scalar_eq!(*value, position.x, comp = abs, tol = 1e-14);
    }
}
