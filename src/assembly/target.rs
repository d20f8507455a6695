//! Target-value vectors over the embedded discretization.
use itertools::izip;
use nalgebra::DVector;

use crate::deformation::DeformationMap;
use crate::error::ConfigurationError;
use crate::function::ParsedScalarFunction;
use crate::quadrature::gauss;
use crate::space::EmbeddedSpace;

/// Assembles the weak right-hand side of the constraint equation,
/// `g_j = ∫_Γ g(x(ξ)) ψ_j(ξ) dΓ`.
pub fn assemble_target_rhs(
    embedded: &EmbeddedSpace,
    mapper: &DeformationMap,
    target: &ParsedScalarFunction,
) -> Result<DVector<f64>, ConfigurationError> {
    let numbering = embedded.numbering()?;
    let basis = embedded.basis();
    let (weights, points) = gauss(2 * embedded.degree() + 1);

    let mut rhs = DVector::zeros(numbering.num_dofs());
    let mut basis_values = vec![0.0; basis.num_nodes()];
    for cell in 0..embedded.mesh().num_cells() {
        let dofs = numbering.cell_dofs(cell);
        for (weight, &xi) in izip!(&weights, &points) {
            let physical = mapper.map(cell, xi);
            let arc_length = mapper.tangent(cell, xi).norm();
            let value = target.evaluate(&physical);
            basis.populate_basis(&mut basis_values, xi);
            for (&dof, &psi) in dofs.iter().zip(&basis_values) {
                rhs[dof] += weight * arc_length * value * psi;
            }
        }
    }
    Ok(rhs)
}

/// Interpolates the target-value function at the physical images of the
/// embedded dof support points. Used for export, not for the solve.
pub fn interpolate_target(
    embedded: &EmbeddedSpace,
    mapper: &DeformationMap,
    target: &ParsedScalarFunction,
) -> Result<DVector<f64>, ConfigurationError> {
    let positions = mapper.map_support_points(embedded)?;
    Ok(DVector::from_iterator(
        positions.len(),
        positions.iter().map(|position| target.evaluate(position)),
    ))
}
