/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Uncompressed fallback column groups.

use super::header_size;
use crate::error::CompressionError;
use crate::error::Result;
use crate::matrix::MatrixBlock;
use serde::Deserialize;
use serde::Serialize;

/// A row-major copy of the group's logical columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColGroupUncompressed {
    col_indexes: Vec<usize>,
    num_rows: usize,
    values: Vec<f64>,
}

impl ColGroupUncompressed {
    /// Copy `col_indexes` out of `block`, reading block rows as columns when `transposed`
    pub fn new(col_indexes: Vec<usize>, block: &MatrixBlock, transposed: bool) -> Result<Self> {
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

        let mut values = Vec::with_capacity(num_rows * col_indexes.len());
        for row in 0..num_rows {
            for &col in &col_indexes {
                values.push(if transposed {
                    block.get(col, row)
                } else {
                    block.get(row, col)
                });
            }
        }

        Ok(Self {
            col_indexes,
            num_rows,
            values,
        })
    }

    pub fn col_indexes(&self) -> &[usize] {
        &self.col_indexes
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.col_indexes.len() + col]
    }

    pub fn size_in_bytes(&self) -> usize {
        Self::estimate_size(self.num_rows, self.col_indexes.len())
    }

    pub(crate) fn estimate_size(num_rows: usize, num_columns: usize) -> usize {
        header_size(num_columns) + num_rows * num_columns * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_selected_columns() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let block = MatrixBlock::from_rows(&rows).unwrap();
        let group = ColGroupUncompressed::new(vec![2, 0], &block, false).unwrap();

        assert_eq!(group.num_rows(), 2);
        assert_eq!(group.get(0, 0), 3.0);
        assert_eq!(group.get(1, 1), 4.0);

        let transposed = ColGroupUncompressed::new(vec![2, 0], &block.transpose(), true).unwrap();
        assert_eq!(transposed, group);
    }

    #[test]
    fn test_out_of_bounds() {
        let block = MatrixBlock::from_rows(&[vec![1.0]]).unwrap();
        assert!(ColGroupUncompressed::new(vec![1], &block, false).is_err());
    }
}
