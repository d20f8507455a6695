//! Assembly of the host stiffness operator.
use std::collections::BTreeSet;

use itertools::izip;
use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;

use crate::assembly::{add_to_entry, pattern_from_entries, zeros_from_pattern};
use crate::constraints::ConstraintSet;
use crate::error::ConfigurationError;
use crate::quadrature::tensor_quad;
use crate::space::HostSpace;

/// Assembles the Laplace bilinear form over the host space with constrained
/// rows and columns eliminated.
///
/// Local contributions of constrained dofs are redistributed to their
/// masters during accumulation; each constrained dof afterwards carries a
/// unit diagonal entry, keeping the operator symmetric positive definite.
///
/// # Panics
///
/// Panics if the constraint set is not closed.
pub fn assemble_stiffness(
    space: &HostSpace,
    constraints: &ConstraintSet,
) -> Result<CsrMatrix<f64>, ConfigurationError> {
    assert!(constraints.is_closed(), "constraint set must be closed before assembly");
    let numbering = space.numbering()?;
    let num_dofs = numbering.num_dofs();
    let basis = space.basis();
    let local_size = basis.num_nodes();

    // Same rule as the reference implementation: 2 * degree + 1 Gauss points
    // per direction.
    let (weights, points) = tensor_quad(2 * space.degree() + 1);

    // Phase one: predict the pattern from constraint-resolved index pairs.
    let mut entries = BTreeSet::new();
    let mut resolved_row = Vec::new();
    let mut resolved_col = Vec::new();
    for cell in 0..space.mesh().num_cells() {
        let dofs = numbering.cell_dofs(cell);
        for &dof_i in dofs {
            resolved_row.clear();
            constraints.resolve_into(dof_i, &mut resolved_row);
            for &dof_j in dofs {
                resolved_col.clear();
                constraints.resolve_into(dof_j, &mut resolved_col);
                for &(i, _) in &resolved_row {
                    for &(j, _) in &resolved_col {
                        entries.insert((i, j));
                    }
                }
            }
        }
    }
    for dof in constraints.constrained_dofs() {
        entries.insert((dof, dof));
    }
    let pattern = pattern_from_entries(num_dofs, num_dofs, &entries);
    let mut stiffness = zeros_from_pattern(pattern);

    // Phase two: accumulate condensed local matrices.
    let mut gradients = vec![nalgebra::Vector2::zeros(); local_size];
    let mut local = DMatrix::zeros(local_size, local_size);
    for cell in 0..space.mesh().num_cells() {
        let element = space.element(cell);
        let dofs = numbering.cell_dofs(cell);

        local.fill(0.0);
        for (weight, point) in izip!(&weights, &points) {
            let jacobian = element.reference_jacobian(point);
            let jacobian_det = jacobian.determinant();
            let jacobian_inv_t = jacobian
                .try_inverse()
                .expect("cells are non-degenerate axis-aligned quads")
                .transpose();
            basis.populate_basis_gradients(&mut gradients, point);

            for a in 0..local_size {
                let grad_a = jacobian_inv_t * gradients[a];
                for b in 0..local_size {
                    let grad_b = jacobian_inv_t * gradients[b];
                    local[(a, b)] += weight * grad_a.dot(&grad_b) * jacobian_det.abs();
                }
            }
        }

        for (a, &dof_i) in dofs.iter().enumerate() {
            resolved_row.clear();
            constraints.resolve_into(dof_i, &mut resolved_row);
            for (b, &dof_j) in dofs.iter().enumerate() {
                resolved_col.clear();
                constraints.resolve_into(dof_j, &mut resolved_col);
                for &(i, weight_i) in &resolved_row {
                    for &(j, weight_j) in &resolved_col {
                        add_to_entry(&mut stiffness, i, j, weight_i * weight_j * local[(a, b)]);
                    }
                }
            }
        }
    }

    for dof in constraints.constrained_dofs() {
        add_to_entry(&mut stiffness, dof, dof, 1.0);
    }
    Ok(stiffness)
}
