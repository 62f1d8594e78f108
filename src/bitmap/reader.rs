/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Row readers over a selection of logical columns.

use crate::error::CompressionError;
use crate::error::Result;
use crate::matrix::MatrixBlock;
use crate::matrix::SparseBlock;

/// Reads the selected columns of a block one logical row at a time
pub trait ColumnSelectionReader {
    /// Advance to the next logical row.
    ///
    /// Returns `None` once every row was read. A row that is zero in all
    /// selected columns comes back as `Some((row, None))`.
    fn next_row(&mut self) -> Option<(usize, Option<&[f64]>)>;
}

/// Create a reader for `col_indexes` of `block`.
///
/// Fails if the selection is empty or names a column outside the block.
pub fn create_reader<'a>(
    block: &'a MatrixBlock,
    col_indexes: &'a [usize],
    transposed: bool,
) -> Result<Box<dyn ColumnSelectionReader + 'a>> {
    if col_indexes.is_empty() {
        return Err(CompressionError::ExtractionFailure(
            "empty column selection".to_string(),
        ));
    }

    let (num_rows, num_columns) = if transposed {
        (block.num_columns(), block.num_rows())
    } else {
        (block.num_rows(), block.num_columns())
    };

    if let Some(&col) = col_indexes.iter().find(|&&col| col >= num_columns) {
        return Err(CompressionError::ExtractionFailure(format!(
            "column index {} out of bounds for {} columns",
            col, num_columns
        )));
    }

    let reader: Box<dyn ColumnSelectionReader + 'a> = match (block, transposed) {
        (MatrixBlock::Sparse(sparse), true) => Box::new(TransposedSparseReader {
            sparse,
            col_indexes,
            cursors: vec![0; col_indexes.len()],
            row: 0,
            num_rows,
            buffer: vec![0.0; col_indexes.len()],
        }),
        _ => Box::new(CellReader {
            block,
            col_indexes,
            transposed,
            row: 0,
            num_rows,
            buffer: vec![0.0; col_indexes.len()],
        }),
    };
    Ok(reader)
}

/// Random access reader, used for dense blocks and row-major sparse blocks
struct CellReader<'a> {
    block: &'a MatrixBlock,
    col_indexes: &'a [usize],
    transposed: bool,
    row: usize,
    num_rows: usize,
    buffer: Vec<f64>,
}

impl ColumnSelectionReader for CellReader<'_> {
    fn next_row(&mut self) -> Option<(usize, Option<&[f64]>)> {
        if self.row >= self.num_rows {
            return None;
        }
        let row = self.row;
        self.row += 1;

        if !self.transposed
            && let Some(sparse) = self.block.sparse()
            && sparse.is_empty(row)
        {
            return Some((row, None));
        }

        let mut all_zero = true;
        for (slot, &col) in self.buffer.iter_mut().zip(self.col_indexes) {
            *slot = if self.transposed {
                self.block.get(col, row)
            } else {
                self.block.get(row, col)
            };
            all_zero &= *slot == 0.0;
        }

        if all_zero {
            Some((row, None))
        } else {
            Some((row, Some(self.buffer.as_slice())))
        }
    }
}

/// Reader over a transposed sparse block: each selected column is a sparse
/// block row, walked with its own cursor.
struct TransposedSparseReader<'a> {
    sparse: &'a SparseBlock,
    col_indexes: &'a [usize],
    cursors: Vec<usize>,
    row: usize,
    num_rows: usize,
    buffer: Vec<f64>,
}

impl ColumnSelectionReader for TransposedSparseReader<'_> {
    fn next_row(&mut self) -> Option<(usize, Option<&[f64]>)> {
        if self.row >= self.num_rows {
            return None;
        }
        let row = self.row;
        self.row += 1;

        let sparse = self.sparse;
        let mut all_zero = true;
        for (i, &col) in self.col_indexes.iter().enumerate() {
            let (indexes, values) = sparse.row(col);
            let cursor = self.cursors[i];
            self.buffer[i] = if cursor < indexes.len() && indexes[cursor] == row {
                self.cursors[i] += 1;
                values[cursor]
            } else {
                0.0
            };
            all_zero &= self.buffer[i] == 0.0;
        }

        if all_zero {
            Some((row, None))
        } else {
            Some((row, Some(self.buffer.as_slice())))
        }
    }
}
