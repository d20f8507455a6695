//! Assembly of the non-matching coupling operator.
//!
//! The coupling operator C links host and embedded degrees of freedom
//! through the integral over the mapped embedded geometry
//!
//! ```text
//! C[i, j] = ∫_Γ  v_i(x(ξ)) ψ_j(ξ) dΓ,
//! ```
//!
//! evaluated with Gauss quadrature on the embedded mesh. Host basis values
//! at a quadrature point are obtained by locating the containing host cell
//! and evaluating on its reference domain.
use std::collections::BTreeSet;

use itertools::izip;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

use crate::assembly::{add_to_entry, pattern_from_entries, zeros_from_pattern};
use crate::deformation::DeformationMap;
use crate::error::{GeometryValidationError, RunError};
use crate::geometry::CellLocator;
use crate::quadrature::gauss;
use crate::space::{EmbeddedSpace, HostSpace};

/// Two-phase assembler for the coupling operator.
///
/// The quadrature order (number of Gauss points per embedded cell) trades
/// cost for geometric integration accuracy; the predicted sparsity is a
/// superset of the nonzero entries for any order.
pub struct CouplingAssembler {
    quadrature_order: usize,
}

impl CouplingAssembler {
    pub fn new(quadrature_order: usize) -> Self {
        assert!(quadrature_order >= 1, "quadrature order must be positive");
        Self { quadrature_order }
    }

    /// Predicts the sparsity pattern of the coupling operator: for every
    /// embedded cell, every quadrature point is mapped to physical space and
    /// located in the host mesh; all (host dof, embedded dof) pairs of the
    /// two cells are recorded.
    pub fn build_sparsity(
        &self,
        host: &HostSpace,
        embedded: &EmbeddedSpace,
        mapper: &DeformationMap,
        locator: &CellLocator,
    ) -> Result<SparsityPattern, RunError> {
        let host_numbering = host.numbering()?;
        let embedded_numbering = embedded.numbering()?;
        let (_, points) = gauss(self.quadrature_order);

        let mut entries = BTreeSet::new();
        for cell in 0..embedded.mesh().num_cells() {
            let embedded_dofs = embedded_numbering.cell_dofs(cell);
            for &xi in &points {
                let physical = mapper.map(cell, xi);
                let (host_cell, _) = locator
                    .locate(&physical)
                    .ok_or(GeometryValidationError::PointOutsideHost(physical))?;
                for &i in host_numbering.cell_dofs(host_cell) {
                    for &j in embedded_dofs {
                        entries.insert((i, j));
                    }
                }
            }
        }
        Ok(pattern_from_entries(
            host_numbering.num_dofs(),
            embedded_numbering.num_dofs(),
            &entries,
        ))
    }

    /// Fills the numeric entries of the coupling operator over a pattern
    /// previously predicted by [`build_sparsity`](Self::build_sparsity).
    pub fn assemble(
        &self,
        pattern: SparsityPattern,
        host: &HostSpace,
        embedded: &EmbeddedSpace,
        mapper: &DeformationMap,
        locator: &CellLocator,
    ) -> Result<CsrMatrix<f64>, RunError> {
        let host_numbering = host.numbering()?;
        let embedded_numbering = embedded.numbering()?;
        let host_basis = host.basis();
        let embedded_basis = embedded.basis();
        let (weights, points) = gauss(self.quadrature_order);

        let mut coupling = zeros_from_pattern(pattern);
        let mut host_values = vec![0.0; host_basis.num_nodes()];
        let mut embedded_values = vec![0.0; embedded_basis.num_nodes()];
        for cell in 0..embedded.mesh().num_cells() {
            let embedded_dofs = embedded_numbering.cell_dofs(cell);
            for (weight, &xi) in izip!(&weights, &points) {
                let physical = mapper.map(cell, xi);
                let (host_cell, reference) = locator
                    .locate(&physical)
                    .ok_or(GeometryValidationError::PointOutsideHost(physical))?;

                let arc_length = mapper.tangent(cell, xi).norm();
                host_basis.populate_basis(&mut host_values, &reference);
                embedded_basis.populate_basis(&mut embedded_values, xi);

                let host_dofs = host_numbering.cell_dofs(host_cell);
                for (&i, &v_i) in host_dofs.iter().zip(&host_values) {
                    for (&j, &psi_j) in embedded_dofs.iter().zip(&embedded_values) {
                        add_to_entry(&mut coupling, i, j, weight * arc_length * v_i * psi_j);
                    }
                }
            }
        }
        Ok(coupling)
    }
}
