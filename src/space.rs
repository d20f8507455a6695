//! Discretization contexts: a mesh bundled with a finite element space and
//! its degree-of-freedom numbering.
//!
//! A context owns its mesh exclusively. Replacing the mesh invalidates the
//! numbering; any dof-indexed read before the next [`distribute`] is a
//! [`ConfigurationError`], never a silent stale access.
//!
//! [`distribute`]: HostSpace::distribute
use std::collections::BTreeMap;

use nalgebra::Point2;

use crate::element::{Lagrange1d, QuadElement, QuadLagrangeBasis, SegmentElement};
use crate::error::ConfigurationError;
use crate::mesh::{ParamMesh, QuadMesh2d};

fn validate_degree(name: &'static str, degree: usize) -> Result<(), ConfigurationError> {
    if degree < 1 {
        return Err(ConfigurationError::InvalidParameter {
            name,
            reason: format!("finite element degree must be at least 1, got {}", degree),
        });
    }
    Ok(())
}

/// An edge of the host mesh, as seen by the dof numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeData {
    /// Dofs interior to the edge (empty for degree 1), ordered from the
    /// lower-index vertex to the higher-index vertex.
    pub interior_dofs: Vec<usize>,
    /// Number of cells the edge belongs to. Interior conforming edges have
    /// two; boundary edges and the coarse side of hanging edges have one.
    pub cell_count: usize,
}

/// Degree-of-freedom numbering of a [`HostSpace`].
///
/// Vertex dofs come first and coincide with vertex indices, then edge
/// interior dofs in sorted edge order, then cell interior dofs in cell
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct HostNumbering {
    num_dofs: usize,
    cell_dofs: Vec<Vec<usize>>,
    support_points: Vec<Point2<f64>>,
    edges: BTreeMap<(usize, usize), EdgeData>,
}

impl HostNumbering {
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Global dofs of a cell in lattice order (row-major over the reference
    /// lattice, matching [`QuadLagrangeBasis`]).
    pub fn cell_dofs(&self, cell_index: usize) -> &[usize] {
        &self.cell_dofs[cell_index]
    }

    pub fn support_points(&self) -> &[Point2<f64>] {
        &self.support_points
    }

    pub fn edges(&self) -> &BTreeMap<(usize, usize), EdgeData> {
        &self.edges
    }

    /// All dofs along an edge, ordered from the lower-index vertex to the
    /// higher-index vertex: `[vertex_lo, interior..., vertex_hi]`.
    pub fn dofs_along_edge(&self, edge: (usize, usize)) -> Vec<usize> {
        let data = &self.edges[&edge];
        let mut dofs = Vec::with_capacity(data.interior_dofs.len() + 2);
        dofs.push(edge.0);
        dofs.extend_from_slice(&data.interior_dofs);
        dofs.push(edge.1);
        dofs
    }
}

/// Discretization context of the host (embedding) domain.
pub struct HostSpace {
    mesh: QuadMesh2d,
    basis: QuadLagrangeBasis,
    numbering: Option<HostNumbering>,
}

impl HostSpace {
    pub fn from_mesh(mesh: QuadMesh2d, degree: usize) -> Result<Self, ConfigurationError> {
        validate_degree("host finite element degree", degree)?;
        Ok(Self {
            mesh,
            basis: QuadLagrangeBasis::new(degree),
            numbering: None,
        })
    }

    pub fn mesh(&self) -> &QuadMesh2d {
        &self.mesh
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn basis(&self) -> &QuadLagrangeBasis {
        &self.basis
    }

    pub fn element(&self, cell_index: usize) -> QuadElement {
        QuadElement::from_vertices(self.mesh.cell_vertices(cell_index))
    }

    /// Replaces the mesh, invalidating the dof numbering.
    pub fn replace_mesh(&mut self, mesh: QuadMesh2d) {
        self.mesh = mesh;
        self.numbering = None;
    }

    /// (Re)builds the dof numbering and returns the number of dofs.
    pub fn distribute(&mut self) -> usize {
        let degree = self.basis.degree();
        let num_1d = degree + 1;
        let num_vertices = self.mesh.vertices().len();

        // Collect all edges first and hand out edge dofs in sorted edge
        // order, so the numbering is independent of cell ordering.
        let mut edges: BTreeMap<(usize, usize), EdgeData> = BTreeMap::new();
        for cell in self.mesh.connectivity() {
            for (a, b) in cell.edges() {
                let key = (a.min(b), a.max(b));
                edges.entry(key).or_default().cell_count += 1;
            }
        }
        let mut next_dof = num_vertices;
        for data in edges.values_mut() {
            data.interior_dofs = (next_dof..next_dof + degree - 1).collect();
            next_dof += degree - 1;
        }
        let cell_interior_base = next_dof;
        let interior_per_cell = (degree - 1) * (degree - 1);
        let num_dofs = cell_interior_base + interior_per_cell * self.mesh.num_cells();

        let mut cell_dofs = Vec::with_capacity(self.mesh.num_cells());
        let mut support_points = vec![Point2::origin(); num_dofs];
        for (cell_index, cell) in self.mesh.connectivity().iter().enumerate() {
            let [v0, v1, v2, v3] = *cell.vertex_indices();
            let element = self.element(cell_index);
            let mut dofs = vec![usize::MAX; num_1d * num_1d];

            for j in 0..num_1d {
                for i in 0..num_1d {
                    let lattice_index = j * num_1d + i;
                    let dof = match (i, j) {
                        (0, 0) => v0,
                        (i, 0) if i == degree => v1,
                        (i, j) if i == degree && j == degree => v2,
                        (0, j) if j == degree => v3,
                        // Edge lattice nodes; the slot along the edge depends
                        // on whether the traversal direction agrees with the
                        // canonical lower-to-higher vertex orientation.
                        (i, 0) => edge_slot_dof(&edges, (v0, v1), i, degree),
                        (i, j) if j == degree => edge_slot_dof(&edges, (v3, v2), i, degree),
                        (i, j) if i == degree => edge_slot_dof(&edges, (v1, v2), j, degree),
                        (0, j) => edge_slot_dof(&edges, (v0, v3), j, degree),
                        (i, j) => {
                            cell_interior_base
                                + cell_index * interior_per_cell
                                + (j - 1) * (degree - 1)
                                + (i - 1)
                        }
                    };
                    dofs[lattice_index] = dof;
                    support_points[dof] = element.map_reference_coords(&self.basis.lattice_node(lattice_index));
                }
            }
            cell_dofs.push(dofs);
        }

        self.numbering = Some(HostNumbering {
            num_dofs,
            cell_dofs,
            support_points,
            edges,
        });
        num_dofs
    }

    pub fn numbering(&self) -> Result<&HostNumbering, ConfigurationError> {
        self.numbering
            .as_ref()
            .ok_or(ConfigurationError::StaleDofNumbering("host"))
    }

    pub fn num_dofs(&self) -> Result<usize, ConfigurationError> {
        Ok(self.numbering()?.num_dofs())
    }

    /// Physical support points indexed by dof.
    pub fn support_points(&self) -> Result<&[Point2<f64>], ConfigurationError> {
        Ok(self.numbering()?.support_points())
    }
}

/// Dof for an edge lattice node, given the edge in traversal direction and
/// the lattice index along the traversal (1..degree).
fn edge_slot_dof(
    edges: &BTreeMap<(usize, usize), EdgeData>,
    traversal: (usize, usize),
    lattice_index: usize,
    degree: usize,
) -> usize {
    let (from, to) = traversal;
    let key = (from.min(to), from.max(to));
    let slot = if from < to {
        lattice_index - 1
    } else {
        degree - lattice_index - 1
    };
    edges[&key].interior_dofs[slot]
}

/// Degree-of-freedom numbering of an [`EmbeddedSpace`].
///
/// Vertex dofs come first and coincide with vertex indices, then segment
/// interior dofs in cell order.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedNumbering {
    num_dofs: usize,
    cell_dofs: Vec<Vec<usize>>,
    support_params: Vec<f64>,
    support_owners: Vec<(usize, f64)>,
}

impl EmbeddedNumbering {
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Global dofs of a segment in lattice order along the reference
    /// coordinate: `[vertex_a, interior..., vertex_b]`.
    pub fn cell_dofs(&self, cell_index: usize) -> &[usize] {
        &self.cell_dofs[cell_index]
    }

    /// Parameter-space support points indexed by dof.
    pub fn support_params(&self) -> &[f64] {
        &self.support_params
    }

    /// For each dof, a `(cell, reference coordinate)` pair at which the dof's
    /// support point can be evaluated through a mapping.
    pub fn support_owners(&self) -> &[(usize, f64)] {
        &self.support_owners
    }
}

/// Discretization context of the embedded (lower-dimensional) domain.
pub struct EmbeddedSpace {
    mesh: ParamMesh,
    basis: Lagrange1d,
    numbering: Option<EmbeddedNumbering>,
}

impl EmbeddedSpace {
    pub fn from_mesh(mesh: ParamMesh, degree: usize) -> Result<Self, ConfigurationError> {
        validate_degree("embedded finite element degree", degree)?;
        Ok(Self {
            mesh,
            basis: Lagrange1d::new(degree),
            numbering: None,
        })
    }

    pub fn mesh(&self) -> &ParamMesh {
        &self.mesh
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn basis(&self) -> &Lagrange1d {
        &self.basis
    }

    pub fn element(&self, cell_index: usize) -> SegmentElement {
        SegmentElement::from_vertices(self.mesh.cell_vertices(cell_index))
    }

    /// (Re)builds the dof numbering and returns the number of dofs.
    pub fn distribute(&mut self) -> usize {
        let degree = self.basis.degree();
        let num_vertices = self.mesh.vertices().len();
        let interior_per_cell = degree - 1;
        let num_dofs = num_vertices + interior_per_cell * self.mesh.num_cells();

        let mut cell_dofs = Vec::with_capacity(self.mesh.num_cells());
        let mut support_params = vec![0.0; num_dofs];
        let mut support_owners = vec![(usize::MAX, 0.0); num_dofs];
        for (cell_index, cell) in self.mesh.connectivity().iter().enumerate() {
            let [a, b] = *cell.vertex_indices();
            let element = self.element(cell_index);
            let mut dofs = Vec::with_capacity(degree + 1);
            dofs.push(a);
            dofs.extend((0..interior_per_cell).map(|k| num_vertices + cell_index * interior_per_cell + k));
            dofs.push(b);

            for (node, &dof) in dofs.iter().enumerate() {
                let xi = self.basis.nodes()[node];
                // First-seen owner wins for shared vertex dofs, keeping
                // evaluation deterministic.
                if support_owners[dof].0 == usize::MAX {
                    support_params[dof] = element.map_reference_coords(xi);
                    support_owners[dof] = (cell_index, xi);
                }
            }
            cell_dofs.push(dofs);
        }

        self.numbering = Some(EmbeddedNumbering {
            num_dofs,
            cell_dofs,
            support_params,
            support_owners,
        });
        num_dofs
    }

    pub fn numbering(&self) -> Result<&EmbeddedNumbering, ConfigurationError> {
        self.numbering
            .as_ref()
            .ok_or(ConfigurationError::StaleDofNumbering("embedded"))
    }

    pub fn num_dofs(&self) -> Result<usize, ConfigurationError> {
        Ok(self.numbering()?.num_dofs())
    }
}
