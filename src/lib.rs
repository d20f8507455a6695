//! A fictitious-domain solver for a constrained elliptic problem.
//!
//! A "host" domain (the unit square) carries the primary unknown field; a
//! lower-dimensional "embedded" curve, immersed non-matching into the host
//! mesh, carries a target-value constraint enforced weakly through a
//! distributed Lagrange multiplier. The coupling between the two
//! independently discretized meshes is a sparse operator assembled across
//! the non-matching discretizations, and the resulting saddle-point system
//! is solved through a matrix-free Schur complement composed from a direct
//! factorization of the stiffness operator.
pub mod adapt;
pub mod assembly;
pub mod config;
pub mod connectivity;
pub mod constraints;
pub mod deformation;
pub mod element;
pub mod error;
pub mod function;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod problem;
pub mod quadrature;
pub mod solver;
pub mod space;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
