//! Affine constraints over host degrees of freedom.
//!
//! Constraints arise from two sources: hanging entities on nonconforming
//! refinement interfaces, and homogeneous Dirichlet boundary values. Both are
//! homogeneous linear relations `u_i = sum_j w_ij u_j` (with an empty master
//! set for Dirichlet dofs). The set must be closed before use; closing
//! resolves constraint chains so that every master is unconstrained.
use std::collections::BTreeMap;

use nalgebra::DVector;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use crate::error::ConfigurationError;
use crate::space::HostSpace;

const WEIGHT_DROP_TOL: f64 = 1e-14;

/// Homogeneous affine constraints over a set of degrees of freedom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    constraints: BTreeMap<usize, Vec<(usize, f64)>>,
    closed: bool,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the constraint `u_dof = sum_i w_i u_master_i`.
    ///
    /// An empty master list pins the dof to zero.
    ///
    /// # Panics
    ///
    /// Panics if the set is already closed, or if the dof references itself.
    pub fn add_constraint(&mut self, dof: usize, masters: Vec<(usize, f64)>) {
        assert!(!self.closed, "cannot add constraints to a closed set");
        assert!(
            masters.iter().all(|&(master, _)| master != dof),
            "constraint must not reference its own dof"
        );
        self.constraints.insert(dof, masters);
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constraints.contains_key(&dof)
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Masters of a constrained dof. Only meaningful after [`close`].
    ///
    /// [`close`]: ConstraintSet::close
    pub fn masters(&self, dof: usize) -> Option<&[(usize, f64)]> {
        self.constraints.get(&dof).map(|masters| masters.as_slice())
    }

    /// Appends the resolution of a dof to `out`: either the dof itself with
    /// unit weight, or its (closed) master entries.
    pub fn resolve_into(&self, dof: usize, out: &mut Vec<(usize, f64)>) {
        match self.constraints.get(&dof) {
            Some(masters) => out.extend_from_slice(masters),
            None => out.push((dof, 1.0)),
        }
    }

    /// Closes the set: resolves constraint chains until every master is
    /// unconstrained, merges duplicate masters and drops negligible weights.
    ///
    /// # Panics
    ///
    /// Panics if the constraints are cyclic.
    pub fn close(&mut self) {
        let mut pass = 0;
        loop {
            let chained: Vec<usize> = self
                .constraints
                .iter()
                .filter(|(_, masters)| {
                    masters
                        .iter()
                        .any(|(master, _)| self.constraints.contains_key(master))
                })
                .map(|(&dof, _)| dof)
                .collect();
            if chained.is_empty() {
                break;
            }
            assert!(pass < 64, "cyclic constraints");
            pass += 1;

            for dof in chained {
                let masters = self.constraints[&dof].clone();
                let mut resolved = Vec::with_capacity(masters.len());
                for (master, weight) in masters {
                    match self.constraints.get(&master) {
                        Some(grand_masters) => {
                            resolved.extend(
                                grand_masters
                                    .iter()
                                    .map(|&(grand, grand_weight)| (grand, weight * grand_weight)),
                            );
                        }
                        None => resolved.push((master, weight)),
                    }
                }
                self.constraints.insert(dof, resolved);
            }
        }

        for masters in self.constraints.values_mut() {
            masters.sort_by_key(|&(master, _)| master);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(masters.len());
            for &(master, weight) in masters.iter() {
                match merged.last_mut() {
                    Some((last, last_weight)) if *last == master => *last_weight += weight,
                    _ => merged.push((master, weight)),
                }
            }
            merged.retain(|&(_, weight)| weight.abs() > WEIGHT_DROP_TOL);
            *masters = merged;
        }
        self.closed = true;
    }

    /// Overwrites the entries of constrained dofs with the values implied by
    /// their masters.
    ///
    /// # Panics
    ///
    /// Panics if the set is not closed.
    pub fn distribute(&self, u: &mut DVector<f64>) {
        assert!(self.closed, "constraint set must be closed before distribute()");
        for (&dof, masters) in &self.constraints {
            u[dof] = masters.iter().map(|&(master, weight)| weight * u[master]).sum();
        }
    }

    /// Iterator over constrained dof indices.
    pub fn constrained_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.constraints.keys().copied()
    }
}

/// Builds hanging-node constraints for the (possibly nonconforming) host
/// space into `constraints`.
///
/// A coarse edge is hanging when it belongs to a single cell while its two
/// halves belong to finer neighbors. All dofs living on the fine halves
/// (the midpoint vertex and the fine edges' interior dofs) are constrained
/// to the coarse edge's dofs; the weights are the coarse edge's univariate
/// Lagrange basis evaluated at the fine dof's position along the edge.
pub fn make_hanging_node_constraints(
    space: &HostSpace,
    constraints: &mut ConstraintSet,
) -> Result<(), ConfigurationError> {
    let numbering = space.numbering()?;
    let vertices = space.mesh().vertices();
    let basis_1d = space.basis().basis_1d();

    // Vertex lookup by exact coordinates; all coordinates are dyadic.
    let vertex_lookup: FxHashMap<(OrderedFloat<f64>, OrderedFloat<f64>), usize> = vertices
        .iter()
        .enumerate()
        .map(|(index, v)| ((OrderedFloat(v.x), OrderedFloat(v.y)), index))
        .collect();
    let vertex_at =
        |x: f64, y: f64| vertex_lookup.get(&(OrderedFloat(x), OrderedFloat(y))).copied();

    let mut basis_values = vec![0.0; basis_1d.num_nodes()];
    let mut new_constraints: Vec<(usize, Vec<(usize, f64)>)> = Vec::new();

    for (&(a, b), data) in numbering.edges() {
        if data.cell_count != 1 {
            continue;
        }
        let (pa, pb) = (vertices[a], vertices[b]);
        let midpoint = nalgebra::center(&pa, &pb);
        let Some(m) = vertex_at(midpoint.x, midpoint.y) else {
            // Boundary edge; nothing hangs here.
            continue;
        };
        let half_a = (a.min(m), a.max(m));
        let half_b = (m.min(b), m.max(b));
        if !numbering.edges().contains_key(&half_a) || !numbering.edges().contains_key(&half_b) {
            continue;
        }

        let coarse_dofs = numbering.dofs_along_edge((a, b));
        let edge_length = (pb - pa).norm();
        let support_points = numbering.support_points();

        // The midpoint vertex dof plus every interior dof of the two fine
        // halves hangs on the coarse edge.
        let mut slaves = vec![m];
        slaves.extend_from_slice(&numbering.edges()[&half_a].interior_dofs);
        slaves.extend_from_slice(&numbering.edges()[&half_b].interior_dofs);

        for slave in slaves {
            let s = (support_points[slave] - pa).norm() / edge_length;
            basis_1d.populate_basis(&mut basis_values, 2.0 * s - 1.0);
            let masters = coarse_dofs
                .iter()
                .zip(&basis_values)
                .filter(|&(_, &weight)| weight.abs() > WEIGHT_DROP_TOL)
                .map(|(&master, &weight)| (master, weight))
                .collect();
            new_constraints.push((slave, masters));
        }
    }

    for (slave, masters) in new_constraints {
        constraints.add_constraint(slave, masters);
    }
    Ok(())
}

/// Builds homogeneous Dirichlet constraints for the given boundary ids into
/// `constraints`.
///
/// Boundary ids follow the colorized unit-square convention: 0 is x = 0,
/// 1 is x = 1, 2 is y = 0 and 3 is y = 1.
pub fn make_zero_dirichlet_constraints(
    space: &HostSpace,
    boundary_ids: &[u8],
    constraints: &mut ConstraintSet,
) -> Result<(), ConfigurationError> {
    let numbering = space.numbering()?;
    let support_points = numbering.support_points();

    let on_boundary = |point: &nalgebra::Point2<f64>, id: u8| -> bool {
        const TOL: f64 = 1e-12;
        match id {
            0 => point.x.abs() <= TOL,
            1 => (point.x - 1.0).abs() <= TOL,
            2 => point.y.abs() <= TOL,
            3 => (point.y - 1.0).abs() <= TOL,
            _ => false,
        }
    };

    for (dof, point) in support_points.iter().enumerate() {
        if boundary_ids.iter().any(|&id| on_boundary(point, id)) && !constraints.is_constrained(dof) {
            constraints.add_constraint(dof, Vec::new());
        }
    }
    Ok(())
}
