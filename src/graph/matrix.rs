/// Sparse N×N 0/1 citation matrix in compressed sparse row layout.
///
/// Row `i` holds the sorted, deduplicated column indices of the papers that
/// paper `i` cites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationMatrix {
    size: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
}

impl CitationMatrix {
    /// Build from (row, col) pairs. Duplicate pairs collapse to one entry.
    /// Returns the matrix and the number of duplicates removed.
    pub fn from_pairs(size: usize, pairs: &[(usize, usize)]) -> (Self, usize) {
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); size];
        for &(i, j) in pairs {
            debug_assert!(i < size && j < size);
            rows[i].push(j);
        }

        let mut row_offsets = Vec::with_capacity(size + 1);
        let mut col_indices = Vec::with_capacity(pairs.len());
        let mut duplicates = 0;

        row_offsets.push(0);
        for mut row in rows {
            row.sort_unstable();
            let before = row.len();
            row.dedup();
            duplicates += before - row.len();
            col_indices.extend(row);
            row_offsets.push(col_indices.len());
        }

        (
            Self {
                size,
                row_offsets,
                col_indices,
            },
            duplicates,
        )
    }

    /// Number of rows (and columns)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of stored citations
    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }

    /// Columns cited by row `i`
    pub fn row(&self, i: usize) -> &[usize] {
        &self.col_indices[self.row_offsets[i]..self.row_offsets[i + 1]]
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.size && self.row(i).binary_search(&j).is_ok()
    }

    pub fn get(&self, i: usize, j: usize) -> u8 {
        u8::from(self.contains(i, j))
    }

    /// Iterate over all stored (row, col) entries in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.size).flat_map(move |i| self.row(i).iter().map(move |&j| (i, j)))
    }

    pub fn out_degree(&self, i: usize) -> usize {
        self.row_offsets[i + 1] - self.row_offsets[i]
    }
}
