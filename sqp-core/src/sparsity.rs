//! Sparsity descriptors in CSC (Compressed Sparse Column) format.
//!
//! A [`Sparsity`] is a pure pattern: column pointers and row indices, no
//! values. Value arrays (Jacobian entries, Hessian entries) are stored
//! separately, one `f64` per structural slot, in the order the pattern
//! enumerates them. Several value arrays can share one pattern.

use sprs::{CsMat, TriMat};

/// Sparse matrix in CSC format with values, used to assemble patterns.
pub type SparseCsc = CsMat<f64>;

/// Build a sparse CSC matrix from triplets (row, col, value).
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Read-only CSC sparsity pattern.
///
/// Symmetric matrices store both triangles; every kernel walks the stored
/// slots literally and never mirrors entries on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sparsity {
    nrow: usize,
    ncol: usize,
    colptr: Vec<usize>,
    row: Vec<usize>,
}

impl Sparsity {
    /// Create a pattern from raw CSC arrays.
    ///
    /// Rejects malformed input: `colptr` must have `ncol + 1` monotonically
    /// non-decreasing entries starting at 0 and ending at `row.len()`, and
    /// every row index must be in range.
    pub fn new(
        nrow: usize,
        ncol: usize,
        colptr: Vec<usize>,
        row: Vec<usize>,
    ) -> Result<Self, String> {
        if colptr.len() != ncol + 1 {
            return Err(format!(
                "colptr has length {}, expected {}",
                colptr.len(),
                ncol + 1
            ));
        }
        if colptr[0] != 0 || colptr[ncol] != row.len() {
            return Err(format!(
                "colptr must span [0, {}], got [{}, {}]",
                row.len(),
                colptr[0],
                colptr[ncol]
            ));
        }
        for j in 0..ncol {
            if colptr[j] > colptr[j + 1] {
                return Err(format!("colptr decreases at column {}", j));
            }
        }
        if let Some(&r) = row.iter().find(|&&r| r >= nrow) {
            return Err(format!("row index {} out of range (nrow={})", r, nrow));
        }
        Ok(Self { nrow, ncol, colptr, row })
    }

    /// Fully dense pattern, columns stored top to bottom.
    pub fn dense(nrow: usize, ncol: usize) -> Self {
        let colptr = (0..=ncol).map(|j| j * nrow).collect();
        let row = (0..ncol).flat_map(|_| 0..nrow).collect();
        Self { nrow, ncol, colptr, row }
    }

    /// Pattern with no structural nonzeros.
    pub fn empty(nrow: usize, ncol: usize) -> Self {
        Self { nrow, ncol, colptr: vec![0; ncol + 1], row: Vec::new() }
    }

    /// Extract the pattern of a CSC matrix, discarding its values.
    pub fn from_pattern(mat: &SparseCsc) -> Self {
        assert!(mat.is_csc(), "pattern extraction requires CSC storage");
        let mut colptr = Vec::with_capacity(mat.cols() + 1);
        let mut row = Vec::with_capacity(mat.nnz());
        colptr.push(0);
        for col in mat.outer_iterator() {
            for (r, _) in col.iter() {
                row.push(r);
            }
            colptr.push(row.len());
        }
        Self { nrow: mat.rows(), ncol: mat.cols(), colptr, row }
    }

    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Number of columns.
    pub fn ncol(&self) -> usize {
        self.ncol
    }

    /// Number of structural nonzeros.
    pub fn nnz(&self) -> usize {
        self.row.len()
    }

    /// Column pointer array (length `ncol + 1`).
    pub fn colptr(&self) -> &[usize] {
        &self.colptr
    }

    /// Row index array (length `nnz`).
    pub fn row(&self) -> &[usize] {
        &self.row
    }

    pub fn is_square(&self) -> bool {
        self.nrow == self.ncol
    }

    /// Whether the pattern equals its transpose.
    pub fn is_symmetric_pattern(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let mut slots: Vec<(usize, usize)> = Vec::with_capacity(self.nnz());
        for j in 0..self.ncol {
            for k in self.colptr[j]..self.colptr[j + 1] {
                slots.push((self.row[k], j));
            }
        }
        let mut mirrored: Vec<(usize, usize)> = slots.iter().map(|&(r, c)| (c, r)).collect();
        slots.sort_unstable();
        mirrored.sort_unstable();
        slots == mirrored
    }
}
