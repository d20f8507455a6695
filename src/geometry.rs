//! Accelerated geometric queries against the host mesh.
use nalgebra::Point2;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::mesh::QuadMesh2d;

/// Absolute slack for point-in-cell tests; the meshes live in the unit
/// square, so an absolute tolerance is adequate.
const CONTAINMENT_TOL: f64 = 1e-12;

/// Point-location and adjacency queries for a quadrilateral mesh, backed by
/// an R-tree over the cell bounding boxes.
///
/// A locator is a snapshot of one mesh: it must be rebuilt after any mesh
/// mutation and never reused across refinement passes.
pub struct CellLocator {
    tree: RTree<GeomWithData<Rectangle<[f64; 2]>, usize>>,
    bounds: Vec<(Point2<f64>, Point2<f64>)>,
}

impl CellLocator {
    pub fn from_mesh(mesh: &QuadMesh2d) -> Self {
        let bounds: Vec<_> = (0..mesh.num_cells()).map(|i| mesh.cell_bounds(i)).collect();
        let rectangles = bounds
            .iter()
            .enumerate()
            .map(|(cell_index, (min, max))| {
                // Inflate the box slightly so that points on cell boundaries
                // are found despite floating-point error; candidates are
                // filtered against the exact extents afterwards.
                let inflation = CONTAINMENT_TOL.max((max.x - min.x) * 1e-9);
                GeomWithData::new(
                    Rectangle::from_corners(
                        [min.x - inflation, min.y - inflation],
                        [max.x + inflation, max.y + inflation],
                    ),
                    cell_index,
                )
            })
            .collect();
        Self {
            tree: RTree::bulk_load(rectangles),
            bounds,
        }
    }

    fn cell_contains(&self, cell_index: usize, point: &Point2<f64>) -> bool {
        let (min, max) = &self.bounds[cell_index];
        point.x >= min.x - CONTAINMENT_TOL
            && point.x <= max.x + CONTAINMENT_TOL
            && point.y >= min.y - CONTAINMENT_TOL
            && point.y <= max.y + CONTAINMENT_TOL
    }

    /// Locates the cell containing the given physical point and returns its
    /// index together with the reference coordinates of the point in that
    /// cell.
    ///
    /// Points on cell boundaries belong to several cells; the lowest cell
    /// index wins, so repeated queries are deterministic. Returns `None` for
    /// points outside the mesh.
    pub fn locate(&self, point: &Point2<f64>) -> Option<(usize, Point2<f64>)> {
        let cell_index = self
            .tree
            .locate_all_at_point(&[point.x, point.y])
            .map(|geometry| geometry.data)
            .filter(|&cell| self.cell_contains(cell, point))
            .min()?;

        let (min, max) = &self.bounds[cell_index];
        let reference = Point2::new(
            (2.0 * (point.x - min.x) / (max.x - min.x) - 1.0).clamp(-1.0, 1.0),
            (2.0 * (point.y - min.y) / (max.y - min.y) - 1.0).clamp(-1.0, 1.0),
        );
        Some((cell_index, reference))
    }

    /// Collects into `neighbors` the indices of all cells sharing an edge
    /// segment of positive length with the given cell.
    pub fn edge_neighbors(&self, cell_index: usize, neighbors: &mut Vec<usize>) {
        neighbors.clear();
        let (min, max) = &self.bounds[cell_index];
        let envelope = AABB::from_corners(
            [min.x - CONTAINMENT_TOL, min.y - CONTAINMENT_TOL],
            [max.x + CONTAINMENT_TOL, max.y + CONTAINMENT_TOL],
        );
        for candidate in self.tree.locate_in_envelope_intersecting(&envelope) {
            let other = candidate.data;
            if other != cell_index && self.boxes_share_edge(cell_index, other) {
                neighbors.push(other);
            }
        }
        neighbors.sort_unstable();
    }

    fn boxes_share_edge(&self, cell_a: usize, cell_b: usize) -> bool {
        let (a_min, a_max) = &self.bounds[cell_a];
        let (b_min, b_max) = &self.bounds[cell_b];

        let x_touch = (a_max.x - b_min.x).abs() <= CONTAINMENT_TOL
            || (b_max.x - a_min.x).abs() <= CONTAINMENT_TOL;
        let y_overlap = a_max.y.min(b_max.y) - a_min.y.max(b_min.y) > CONTAINMENT_TOL;
        if x_touch && y_overlap {
            return true;
        }

        let y_touch = (a_max.y - b_min.y).abs() <= CONTAINMENT_TOL
            || (b_max.y - a_min.y).abs() <= CONTAINMENT_TOL;
        let x_overlap = a_max.x.min(b_max.x) - a_min.x.max(b_min.x) > CONTAINMENT_TOL;
        y_touch && x_overlap
    }
}
