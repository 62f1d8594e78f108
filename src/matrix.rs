/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Resident matrix blocks
//!
//! The uncompressed input of the column group compressor. A block is either
//! dense (row-major, stored in one or more chunks of whole rows) or sparse
//! (compressed sparse rows). When compression runs on a transposed block the
//! block rows are the logical columns, so every accessor here is physical and
//! callers decide how to interpret it.

use anyhow::Result;

/// Row-major dense storage split into chunks of whole rows
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    num_rows: usize,
    num_columns: usize,
    rows_per_chunk: usize,
    chunks: Vec<Vec<f64>>,
}

impl DenseBlock {
    /// Number of chunks backing this block. A single chunk means the whole
    /// block is one contiguous buffer with a uniform stride.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// The contiguous buffer, if the block is stored in one chunk
    pub fn values(&self) -> Option<&[f64]> {
        match self.chunks.as_slice() {
            [single] => Some(single.as_slice()),
            _ => None,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let chunk = row / self.rows_per_chunk;
        let local = row % self.rows_per_chunk;
        self.chunks[chunk][local * self.num_columns + col]
    }
}

/// Compressed sparse row storage. Column indexes within a row are sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseBlock {
    num_rows: usize,
    num_columns: usize,
    row_ptr: Vec<usize>,
    indexes: Vec<usize>,
    values: Vec<f64>,
}

impl SparseBlock {
    /// Column indexes and values of one row
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        (&self.indexes[start..end], &self.values[start..end])
    }

    pub fn is_empty(&self, row: usize) -> bool {
        self.row_ptr[row] == self.row_ptr[row + 1]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (indexes, values) = self.row(row);
        match indexes.binary_search(&col) {
            Ok(pos) => values[pos],
            Err(_) => 0.0,
        }
    }

    /// Number of stored entries, explicit zeros included
    pub fn non_zeros(&self) -> usize {
        self.values.len()
    }
}

/// An uncompressed matrix block, dense or sparse
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixBlock {
    Dense(DenseBlock),
    Sparse(SparseBlock),
}

impl MatrixBlock {
    /// Build a dense block stored in a single contiguous chunk
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Self::from_rows_chunked(rows, rows.len().max(1))
    }

    /// Build a dense block whose rows are spread over chunks of `rows_per_chunk` rows
    pub fn from_rows_chunked(rows: &[Vec<f64>], rows_per_chunk: usize) -> Result<Self> {
        if rows_per_chunk == 0 {
            anyhow::bail!("Rows per chunk must be positive");
        }
        let num_columns = check_row_widths(rows)?;

        let chunks = rows
            .chunks(rows_per_chunk)
            .map(|chunk| chunk.iter().flatten().copied().collect())
            .collect();

        Ok(MatrixBlock::Dense(DenseBlock {
            num_rows: rows.len(),
            num_columns,
            rows_per_chunk,
            chunks,
        }))
    }

    /// Build a dense block from a row-major buffer
    pub fn dense(num_rows: usize, num_columns: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != num_rows * num_columns {
            anyhow::bail!(
                "Dense buffer length mismatch: expected {}, got {}",
                num_rows * num_columns,
                values.len()
            );
        }
        Ok(MatrixBlock::Dense(DenseBlock {
            num_rows,
            num_columns,
            rows_per_chunk: num_rows.max(1),
            chunks: vec![values],
        }))
    }

    /// Build a sparse block, dropping zero cells
    pub fn sparse_from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let num_columns = check_row_widths(rows)?;

        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut indexes = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);

        for row in rows {
            for (col, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indexes.push(col);
                    values.push(value);
                }
            }
            row_ptr.push(indexes.len());
        }

        Ok(MatrixBlock::Sparse(SparseBlock {
            num_rows: rows.len(),
            num_columns,
            row_ptr,
            indexes,
            values,
        }))
    }

    /// Convert to sparse storage
    pub fn to_sparse(&self) -> Self {
        match self {
            MatrixBlock::Sparse(_) => self.clone(),
            MatrixBlock::Dense(_) => {
                let mut row_ptr = Vec::with_capacity(self.num_rows() + 1);
                let mut indexes = Vec::new();
                let mut values = Vec::new();
                row_ptr.push(0);

                for row in 0..self.num_rows() {
                    for col in 0..self.num_columns() {
                        let value = self.get(row, col);
                        if value != 0.0 {
                            indexes.push(col);
                            values.push(value);
                        }
                    }
                    row_ptr.push(indexes.len());
                }

                MatrixBlock::Sparse(SparseBlock {
                    num_rows: self.num_rows(),
                    num_columns: self.num_columns(),
                    row_ptr,
                    indexes,
                    values,
                })
            }
        }
    }

    /// Transposed dense copy of this block
    pub fn transpose(&self) -> Self {
        let rows = self.num_rows();
        let cols = self.num_columns();
        let mut values = Vec::with_capacity(rows * cols);
        for col in 0..cols {
            for row in 0..rows {
                values.push(self.get(row, col));
            }
        }
        MatrixBlock::Dense(DenseBlock {
            num_rows: cols,
            num_columns: rows,
            rows_per_chunk: cols.max(1),
            chunks: vec![values],
        })
    }

    pub fn num_rows(&self) -> usize {
        match self {
            MatrixBlock::Dense(block) => block.num_rows,
            MatrixBlock::Sparse(block) => block.num_rows,
        }
    }

    pub fn num_columns(&self) -> usize {
        match self {
            MatrixBlock::Dense(block) => block.num_columns,
            MatrixBlock::Sparse(block) => block.num_columns,
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, MatrixBlock::Sparse(_))
    }

    /// Random access to a single cell
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            MatrixBlock::Dense(block) => block.get(row, col),
            MatrixBlock::Sparse(block) => block.get(row, col),
        }
    }

    /// The contiguous dense buffer, if there is exactly one
    pub fn dense_values(&self) -> Option<&[f64]> {
        match self {
            MatrixBlock::Dense(block) => block.values(),
            MatrixBlock::Sparse(_) => None,
        }
    }

    pub fn sparse(&self) -> Option<&SparseBlock> {
        match self {
            MatrixBlock::Sparse(block) => Some(block),
            MatrixBlock::Dense(_) => None,
        }
    }

    /// Fraction of non-zero cells
    pub fn density(&self) -> f64 {
        let cells = self.num_rows() * self.num_columns();
        if cells == 0 {
            return 0.0;
        }
        let non_zeros = match self {
            MatrixBlock::Sparse(block) => block.values.iter().filter(|v| **v != 0.0).count(),
            MatrixBlock::Dense(block) => block
                .chunks
                .iter()
                .flatten()
                .filter(|v| **v != 0.0)
                .count(),
        };
        non_zeros as f64 / cells as f64
    }
}

fn check_row_widths(rows: &[Vec<f64>]) -> Result<usize> {
    let num_columns = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some((idx, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != num_columns)
    {
        anyhow::bail!(
            "Row length mismatch at row {}: expected {}, got {}",
            idx,
            num_columns,
            row.len()
        );
    }
    Ok(num_columns)
}
