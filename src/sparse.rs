/// ==============================================================================================
/// ================================== Sparse Matrix View =========================================
/// ==============================================================================================
//
// Read-only compressed-column storage for `G`, `S`, `E`, `N`. The SSA hot path only ever needs a
// column at a time (the set of rates a firing invalidates, the stoichiometry delta it applies),
// so CSC with a fast column slice is the right layout — the same one `spec.md` §9 calls for.

use crate::error::SimError;

/// A read-only sparse matrix in compressed-column form.
///
/// `colptr` has length `ncols + 1`; column `j`'s entries live in
/// `rowind[colptr[j]..colptr[j+1]]` / `values[colptr[j]..colptr[j+1]]`, sorted by row index.
#[derive(Debug, Clone)]
pub struct CscMatrix {
    nrows: usize,
    ncols: usize,
    colptr: Vec<usize>,
    rowind: Vec<usize>,
    values: Vec<f64>,
    row_names: Vec<String>,
}

impl CscMatrix {
    /// Build from coordinate (row, col, value) triples. Triples need not be sorted; zero values
    /// are dropped. `row_names` must have length `nrows` (may be empty if unnamed).
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, f64)],
        row_names: Vec<String>,
    ) -> Result<Self, SimError> {
        if !row_names.is_empty() && row_names.len() != nrows {
            return Err(SimError::invalid_input(format!(
                "row_names length {} does not match nrows {nrows}",
                row_names.len()
            )));
        }

        let mut per_col: Vec<Vec<(usize, f64)>> = vec![Vec::new(); ncols];
        for &(r, c, v) in triplets {
            if r >= nrows || c >= ncols {
                return Err(SimError::invalid_input(format!(
                    "sparse triplet ({r}, {c}) out of bounds for {nrows}x{ncols} matrix"
                )));
            }
            if v != 0.0 {
                per_col[c].push((r, v));
            }
        }

        let mut colptr = Vec::with_capacity(ncols + 1);
        let mut rowind = Vec::new();
        let mut values = Vec::new();
        colptr.push(0);
        for col in per_col.iter_mut() {
            col.sort_by_key(|&(r, _)| r);
            for &(r, v) in col.iter() {
                rowind.push(r);
                values.push(v);
            }
            colptr.push(rowind.len());
        }

        Ok(Self {
            nrows,
            ncols,
            colptr,
            rowind,
            values,
            row_names,
        })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Row names, if the matrix was constructed with them (empty slice otherwise).
    #[inline]
    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    /// The `(row, value)` pairs stored in column `j`, in ascending row order.
    #[inline]
    pub fn column(&self, j: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.colptr[j];
        let end = self.colptr[j + 1];
        self.rowind[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Number of nonzero entries in column `j`.
    #[inline]
    pub fn column_len(&self, j: usize) -> usize {
        self.colptr[j + 1] - self.colptr[j]
    }

    /// Whether `G[row, col] != 0` (linear scan within the column; columns are short in practice).
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.column(col).any(|(r, _)| r == row)
    }
}
