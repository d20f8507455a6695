//! Geometry-driven adaptive refinement of the host mesh.
use std::collections::BTreeSet;

use log::{debug, info};

use crate::deformation::DeformationMap;
use crate::error::{GeometryValidationError, RunError};
use crate::geometry::CellLocator;
use crate::mesh::refinement::refine_cells;
use crate::space::{EmbeddedSpace, HostSpace};

/// Repeatedly refines the host mesh around the physical image of the
/// embedded degrees of freedom.
///
/// Per iteration: the cell containing each mapped embedded support point is
/// flagged together with its edge-neighbors, and the flagged set is refined.
/// The locator is rebuilt from scratch against the current mesh on every
/// iteration. With `delta_refinement == 0` the loop is skipped entirely and
/// the host mesh is left untouched.
///
/// The host numbering is redistributed after the final refinement pass.
pub fn refine_around_embedded(
    host: &mut HostSpace,
    embedded: &EmbeddedSpace,
    mapper: &DeformationMap,
    delta_refinement: usize,
) -> Result<(), RunError> {
    if delta_refinement == 0 {
        return Ok(());
    }

    // The embedded mesh never changes, so the physical dof positions are
    // computed once up front.
    let positions = mapper.map_support_points(embedded)?;

    let mut neighbors = Vec::new();
    for iteration in 0..delta_refinement {
        let locator = CellLocator::from_mesh(host.mesh());
        let mut flagged = BTreeSet::new();
        for position in &positions {
            let (cell, _) = locator
                .locate(position)
                .ok_or(GeometryValidationError::PointOutsideHost(*position))?;
            flagged.insert(cell);
            locator.edge_neighbors(cell, &mut neighbors);
            flagged.extend(neighbors.iter().copied());
        }

        let refined = refine_cells(host.mesh(), &flagged);
        debug!(
            "delta refinement iteration {}: {} flagged cells, {} -> {} cells",
            iteration,
            flagged.len(),
            host.mesh().num_cells(),
            refined.num_cells()
        );
        host.replace_mesh(refined);
    }
    host.distribute();
    Ok(())
}

/// Validates the relative resolution of the two grids.
///
/// The coupling integrals assume that each embedded cell's quadrature image
/// lies well inside a few host cells; the embedded maximal physical cell
/// diameter must therefore be strictly smaller than the host minimal cell
/// diameter.
pub fn validate_geometry(host: &HostSpace, mapper: &DeformationMap) -> Result<(), GeometryValidationError> {
    let host_min_diameter = host.mesh().min_cell_diameter();
    let embedded_max_diameter = mapper.max_mapped_cell_diameter();
    info!(
        "embedding minimal diameter: {}, embedded maximal diameter: {}, ratio: {}",
        host_min_diameter,
        embedded_max_diameter,
        embedded_max_diameter / host_min_diameter
    );
    if embedded_max_diameter >= host_min_diameter {
        return Err(GeometryValidationError::EmbeddedTooCoarse {
            embedded_max_diameter,
            host_min_diameter,
        });
    }
    Ok(())
}
