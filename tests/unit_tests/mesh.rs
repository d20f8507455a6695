use fictus::mesh::procedural::{create_unit_interval_mesh, create_unit_square_quad_mesh};
use matrixcompare::assert_scalar_eq;
use nalgebra::Point2;

#[test]
fn unit_square_mesh_has_expected_counts() {
    let mesh = create_unit_square_quad_mesh(0);
    assert_eq!(mesh.num_cells(), 1);
    assert_eq!(mesh.vertices().len(), 4);

    let mesh = create_unit_square_quad_mesh(2);
    assert_eq!(mesh.num_cells(), 16);
    assert_eq!(mesh.vertices().len(), 25);
}

#[test]
fn unit_square_mesh_covers_the_unit_square() {
    let mesh = create_unit_square_quad_mesh(2);
    let area: f64 = (0..mesh.num_cells())
        .map(|cell| {
            let (min, max) = mesh.cell_bounds(cell);
            (max.x - min.x) * (max.y - min.y)
        })
        .sum();
    assert_scalar_eq!(area, 1.0, comp = abs, tol = 1e-14);

    for vertex in mesh.vertices() {
        assert!((0.0..=1.0).contains(&vertex.x));
        assert!((0.0..=1.0).contains(&vertex.y));
    }
}

#[test]
fn unit_square_cells_are_counterclockwise_squares() {
    let mesh = create_unit_square_quad_mesh(1);
    let [p0, p1, p2, p3] = mesh.cell_vertices(0);
    assert_eq!(p0, Point2::new(0.0, 0.0));
    assert_eq!(p1, Point2::new(0.5, 0.0));
    assert_eq!(p2, Point2::new(0.5, 0.5));
    assert_eq!(p3, Point2::new(0.0, 0.5));
}

#[test]
fn min_cell_diameter_is_the_cell_diagonal() {
    let mesh = create_unit_square_quad_mesh(2);
    assert_scalar_eq!(
        mesh.min_cell_diameter(),
        2.0_f64.sqrt() / 4.0,
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn unit_interval_mesh_has_expected_counts() {
    let mesh = create_unit_interval_mesh(3);
    assert_eq!(mesh.num_cells(), 8);
    assert_eq!(mesh.vertices().len(), 9);
    assert_eq!(mesh.cell_vertices(0), [0.0, 0.125]);
    assert_eq!(mesh.cell_vertices(7), [0.875, 1.0]);
}
