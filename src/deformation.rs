//! Physical placement of the embedded domain.
//!
//! A [`DeformationMap`] owns a vector-valued Lagrange field on the embedded
//! parameter mesh and is the single source of truth for the physical image
//! of the embedded geometry: refinement, coupling assembly, diameter
//! validation and export all evaluate positions through the same map.
use nalgebra::{Point2, Vector2};

use crate::error::ConfigurationError;
use crate::function::ParsedCurveFunction;
use crate::space::EmbeddedSpace;

/// Interpretation of the deformation field. The two interpretations are
/// mutually exclusive and fixed at configuration time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeformationKind {
    /// The field is a displacement added to the reference embedding
    /// `t ↦ (t, 0)`.
    Displacement,
    /// The field is the absolute physical position.
    AbsolutePosition,
}

/// A finite element mapping from embedded reference coordinates to physical
/// host-space coordinates.
pub struct DeformationMap {
    space: EmbeddedSpace,
    /// One field value per scalar dof of the deformation space.
    coefficients: Vec<Vector2<f64>>,
    kind: DeformationKind,
}

impl DeformationMap {
    /// Interpolates the configuration function at the support points of the
    /// deformation space.
    ///
    /// The space must be distributed; it is consumed, since the physical
    /// placement must never be recomputed against a different field.
    pub fn interpolate(
        mut space: EmbeddedSpace,
        configuration: &ParsedCurveFunction,
        kind: DeformationKind,
    ) -> Result<Self, ConfigurationError> {
        space.distribute();
        let coefficients = space
            .numbering()?
            .support_params()
            .iter()
            .map(|&t| configuration.evaluate(t))
            .collect();
        Ok(Self {
            space,
            coefficients,
            kind,
        })
    }

    pub fn kind(&self) -> DeformationKind {
        self.kind
    }

    pub fn space(&self) -> &EmbeddedSpace {
        &self.space
    }

    /// Physical image of reference coordinate `xi` on segment `cell`.
    pub fn map(&self, cell: usize, xi: f64) -> Point2<f64> {
        let numbering = self.space.numbering().expect("deformation space is always distributed");
        let basis = self.space.basis();
        let mut values = vec![0.0; basis.num_nodes()];
        basis.populate_basis(&mut values, xi);

        let mut field = Vector2::zeros();
        for (&dof, &phi) in numbering.cell_dofs(cell).iter().zip(&values) {
            field += self.coefficients[dof] * phi;
        }
        match self.kind {
            DeformationKind::AbsolutePosition => Point2::from(field),
            DeformationKind::Displacement => {
                let t = self.space.element(cell).map_reference_coords(xi);
                Point2::new(t, 0.0) + field
            }
        }
    }

    /// Derivative of the physical image with respect to the reference
    /// coordinate, `∂x/∂ξ`. Its norm is the arc-length quadrature weight.
    pub fn tangent(&self, cell: usize, xi: f64) -> Vector2<f64> {
        let numbering = self.space.numbering().expect("deformation space is always distributed");
        let basis = self.space.basis();
        let mut derivatives = vec![0.0; basis.num_nodes()];
        basis.populate_basis_derivatives(&mut derivatives, xi);

        let mut tangent = Vector2::zeros();
        for (&dof, &dphi) in numbering.cell_dofs(cell).iter().zip(&derivatives) {
            tangent += self.coefficients[dof] * dphi;
        }
        if self.kind == DeformationKind::Displacement {
            tangent.x += self.space.element(cell).reference_jacobian();
        }
        tangent
    }

    /// Physical images of another embedded space's dof support points.
    ///
    /// The other space must be discretized over the same parameter mesh as
    /// the deformation space.
    pub fn map_support_points(&self, space: &EmbeddedSpace) -> Result<Vec<Point2<f64>>, ConfigurationError> {
        debug_assert_eq!(space.mesh().num_cells(), self.space.mesh().num_cells());
        Ok(space
            .numbering()?
            .support_owners()
            .iter()
            .map(|&(cell, xi)| self.map(cell, xi))
            .collect())
    }

    /// Maximal physical diameter over the mapped segments, each sampled at
    /// its endpoints and midpoint.
    pub fn max_mapped_cell_diameter(&self) -> f64 {
        let mut max_diameter: f64 = 0.0;
        for cell in 0..self.space.mesh().num_cells() {
            let samples = [self.map(cell, -1.0), self.map(cell, 0.0), self.map(cell, 1.0)];
            for i in 0..samples.len() {
                for j in (i + 1)..samples.len() {
                    max_diameter = max_diameter.max((samples[i] - samples[j]).norm());
                }
            }
        }
        max_diameter
    }
}
