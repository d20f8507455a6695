use fictus::error::ConfigurationError;
use fictus::mesh::procedural::{create_unit_interval_mesh, create_unit_square_quad_mesh};
use fictus::space::{EmbeddedSpace, HostSpace};
use matrixcompare::assert_scalar_eq;

#[test]
fn degree_zero_is_rejected() {
    let mesh = create_unit_square_quad_mesh(1);
    assert!(matches!(
        HostSpace::from_mesh(mesh, 0),
        Err(ConfigurationError::InvalidParameter { .. })
    ));

    let interval = create_unit_interval_mesh(1);
    assert!(matches!(
        EmbeddedSpace::from_mesh(interval, 0),
        Err(ConfigurationError::InvalidParameter { .. })
    ));
}

#[test]
fn linear_host_space_has_one_dof_per_vertex() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(2), 1).unwrap();
    let num_dofs = space.distribute();
    assert_eq!(num_dofs, space.mesh().vertices().len());

    let support_points = space.support_points().unwrap();
    for (dof, point) in support_points.iter().enumerate() {
        assert_eq!(point, &space.mesh().vertices()[dof]);
    }
}

#[test]
fn quadratic_host_space_counts_vertex_edge_and_cell_dofs() {
    // A 2x2 grid of quadratic cells is equivalent to a 5x5 lattice.
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(1), 2).unwrap();
    let num_dofs = space.distribute();
    assert_eq!(num_dofs, 25);

    // 9 vertices, 12 edges with one interior dof each, 4 cell interiors.
    let numbering = space.numbering().unwrap();
    assert_eq!(numbering.edges().len(), 12);
    for cell in 0..space.mesh().num_cells() {
        assert_eq!(numbering.cell_dofs(cell).len(), 9);
    }
}

#[test]
fn adjacent_cells_agree_on_shared_edge_dofs() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(1), 3).unwrap();
    space.distribute();
    let numbering = space.numbering().unwrap();
    let support_points = numbering.support_points();

    // Cells 0 and 1 share the edge x = 0.5; collect each cell's dofs whose
    // support point lies on that edge. Both must see the same dof set.
    let edge_dofs = |cell: usize| {
        let mut dofs: Vec<usize> = numbering
            .cell_dofs(cell)
            .iter()
            .copied()
            .filter(|&dof| (support_points[dof].x - 0.5).abs() < 1e-12 && support_points[dof].y <= 0.5 + 1e-12)
            .collect();
        dofs.sort_unstable();
        dofs
    };
    let from_left = edge_dofs(0);
    let from_right = edge_dofs(1);
    assert_eq!(from_left.len(), 4);
    assert_eq!(from_left, from_right);
}

#[test]
fn stale_numbering_is_an_error_after_mesh_replacement() {
    let mut space = HostSpace::from_mesh(create_unit_square_quad_mesh(1), 1).unwrap();
    space.distribute();
    assert!(space.numbering().is_ok());

    space.replace_mesh(create_unit_square_quad_mesh(2));
    assert!(matches!(
        space.numbering(),
        Err(ConfigurationError::StaleDofNumbering("host"))
    ));

    space.distribute();
    assert_eq!(space.num_dofs().unwrap(), 25);
}

#[test]
fn embedded_space_numbers_vertices_then_cell_interiors() {
    let mut space = EmbeddedSpace::from_mesh(create_unit_interval_mesh(3), 2).unwrap();
    let num_dofs = space.distribute();
    assert_eq!(num_dofs, 9 + 8);

    let numbering = space.numbering().unwrap();
    for cell in 0..space.mesh().num_cells() {
        let dofs = numbering.cell_dofs(cell);
        assert_eq!(dofs.len(), 3);
        assert_eq!(dofs[0], cell);
        assert_eq!(dofs[2], cell + 1);
        assert_eq!(dofs[1], 9 + cell);
    }

    let support_params = numbering.support_params();
    assert_scalar_eq!(support_params[0], 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(support_params[8], 1.0, comp = abs, tol = 1e-15);
    // Interior dof of the first segment sits at its midpoint.
    assert_scalar_eq!(support_params[9], 0.0625, comp = abs, tol = 1e-15);
}
