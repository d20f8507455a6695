//! Two-phase sparse assembly.
//!
//! Assembly follows the same two-phase shape everywhere: a sparsity pattern
//! is predicted first (collecting index pairs into a `BTreeSet`, so entries
//! are stored exactly once and in order), then a CSR matrix over that
//! pattern is filled with numeric values. Patterns are superset-safe
//! predictions; filling never creates entries.
use std::collections::BTreeSet;

use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::{CsrMatrix, SparseEntryMut};

pub mod coupling;
pub mod stiffness;
pub mod target;

/// Builds a CSR sparsity pattern from a sorted set of (row, column) pairs.
pub(crate) fn pattern_from_entries(
    num_rows: usize,
    num_cols: usize,
    entries: &BTreeSet<(usize, usize)>,
) -> SparsityPattern {
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(entries.len());

    offsets.push(0);
    for &(i, j) in entries {
        // Runs in a while loop to correctly handle consecutive empty rows.
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }
    while offsets.len() < num_rows + 1 {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_cols, offsets, column_indices)
        .expect("entries from an ordered set always form a valid pattern")
}

/// Allocates a zero CSR matrix over the given pattern.
pub(crate) fn zeros_from_pattern(pattern: SparsityPattern) -> CsrMatrix<f64> {
    let nnz = pattern.nnz();
    CsrMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
        .expect("value count matches pattern by construction")
}

/// Adds `value` to the entry (i, j), which must be present in the pattern.
pub(crate) fn add_to_entry(matrix: &mut CsrMatrix<f64>, i: usize, j: usize, value: f64) {
    match matrix.get_entry_mut(i, j) {
        Some(SparseEntryMut::NonZero(entry)) => *entry += value,
        _ => panic!("entry ({}, {}) missing from predicted sparsity pattern", i, j),
    }
}
