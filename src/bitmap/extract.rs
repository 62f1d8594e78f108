/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Distinct value extraction
//!
//! Builds a [`Bitmap`] for a column group by hashing row contents. Single
//! columns are scanned directly with one of three strategies picked by the
//! physical layout of the block:
//!
//! - **Linear**: the logical column is the whole contiguous dense buffer
//! - **Strided**: the block is one dense buffer with a uniform row stride
//! - **Random access**: chunked dense or sparse storage, cell by cell
//!
//! All strategies produce the same bitmap. Column groups wider than one column
//! go through a [`ColumnSelectionReader`] and are keyed on the whole tuple.
//!
//! Entries appear in order of first occurrence, which keeps encodings built
//! from the same input reproducible.

use super::Bitmap;
use super::OffsetList;
use super::reader::ColumnSelectionReader;
use super::reader::create_reader;
use crate::error::CompressionError;
use crate::error::Result;
use crate::matrix::MatrixBlock;
use indexmap::IndexMap;

/// Groups wider than this start with a larger hash table
const WIDE_GROUP_COLUMNS: usize = 10;

/// Initial capacity of the tuple map for wide groups
const WIDE_GROUP_CAPACITY: usize = 2048;

/// Extract the bitmap of the columns `col_indexes` of `block`.
///
/// With `transposed` set, block rows are read as logical columns.
pub fn extract_bitmap(
    col_indexes: &[usize],
    block: &MatrixBlock,
    transposed: bool,
) -> Result<Bitmap> {
    let num_rows = logical_rows(block, transposed);
    if num_rows > u32::MAX as usize {
        return Err(CompressionError::ExtractionFailure(format!(
            "{} rows exceed the addressable offset range",
            num_rows
        )));
    }

    match col_indexes {
        [col] => {
            let num_columns = logical_columns(block, transposed);
            if *col >= num_columns {
                return Err(CompressionError::ExtractionFailure(format!(
                    "column index {} out of bounds for {} columns",
                    col, num_columns
                )));
            }
            let distinct = if transposed {
                extract_hash_map_transposed(*col, block)
            } else {
                extract_hash_map(*col, block)
            };
            Ok(distinct.into_bitmap(num_rows))
        }
        _ => {
            let mut reader = create_reader(block, col_indexes, transposed)?;
            Ok(extract_tuples(col_indexes.len(), reader.as_mut()))
        }
    }
}

fn logical_rows(block: &MatrixBlock, transposed: bool) -> usize {
    if transposed {
        block.num_columns()
    } else {
        block.num_rows()
    }
}

fn logical_columns(block: &MatrixBlock, transposed: bool) -> usize {
    if transposed {
        block.num_rows()
    } else {
        block.num_columns()
    }
}

/// Hash key of a cell value. Both zeros share one key.
fn value_key(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

/// Distinct non-zero values of one column with their rows
#[derive(Default)]
struct DistinctValues {
    map: IndexMap<u64, OffsetList>,
}

impl DistinctValues {
    fn append(&mut self, value: f64, row: usize) {
        if value != 0.0 {
            self.map.entry(value_key(value)).or_default().push(row as u32);
        }
    }

    /// Scan `len` cells of `values` starting at `start`, `stride` apart
    fn scan_strided(&mut self, values: &[f64], start: usize, stride: usize, len: usize) {
        if len == 0 {
            return;
        }
        for (row, &value) in values[start..]
            .iter()
            .step_by(stride)
            .take(len)
            .enumerate()
        {
            self.append(value, row);
        }
    }

    fn into_bitmap(self, num_rows: usize) -> Bitmap {
        let mut values = Vec::with_capacity(self.map.len());
        let mut offset_lists = Vec::with_capacity(self.map.len());
        for (key, offsets) in self.map {
            values.push(f64::from_bits(key));
            offset_lists.push(offsets);
        }
        let non_zeros: usize = offset_lists.iter().map(|list| list.len()).sum();
        Bitmap::new(1, values, offset_lists, num_rows - non_zeros)
    }
}

fn extract_hash_map(col: usize, block: &MatrixBlock) -> DistinctValues {
    let mut distinct = DistinctValues::default();
    let num_rows = block.num_rows();
    let num_columns = block.num_columns();

    match block.dense_values() {
        Some(values) if num_columns == 1 => distinct.scan_strided(values, 0, 1, num_rows),
        Some(values) => distinct.scan_strided(values, col, num_columns, num_rows),
        None => {
            for row in 0..num_rows {
                distinct.append(block.get(row, col), row);
            }
        }
    }
    distinct
}

fn extract_hash_map_transposed(col: usize, block: &MatrixBlock) -> DistinctValues {
    let mut distinct = DistinctValues::default();
    let num_rows = block.num_columns();

    if let Some(sparse) = block.sparse() {
        let (indexes, values) = sparse.row(col);
        for (&row, &value) in indexes.iter().zip(values) {
            distinct.append(value, row);
        }
        return distinct;
    }

    match block.dense_values() {
        Some(values) if block.num_rows() == 1 => distinct.scan_strided(values, 0, 1, num_rows),
        // a block row is contiguous, so the stride is one
        Some(values) => distinct.scan_strided(values, col * num_rows, 1, num_rows),
        None => {
            for row in 0..num_rows {
                distinct.append(block.get(col, row), row);
            }
        }
    }
    distinct
}

/// Extract a multi column bitmap. Rows that are zero in every column are only counted.
fn extract_tuples(num_columns: usize, reader: &mut dyn ColumnSelectionReader) -> Bitmap {
    let mut distinct: IndexMap<Box<[u64]>, OffsetList> = if num_columns > WIDE_GROUP_COLUMNS {
        IndexMap::with_capacity(WIDE_GROUP_CAPACITY)
    } else {
        IndexMap::new()
    };

    let mut key = Vec::with_capacity(num_columns);
    let mut zeros = 0;

    while let Some((row, cells)) = reader.next_row() {
        let Some(cells) = cells else {
            zeros += 1;
            continue;
        };

        key.clear();
        key.extend(cells.iter().map(|&value| value_key(value)));

        match distinct.get_mut(key.as_slice()) {
            Some(offsets) => offsets.push(row as u32),
            // allocate the key only on first occurrence
            None => {
                distinct.insert(key.clone().into_boxed_slice(), vec![row as u32]);
            }
        }
    }

    let mut values = Vec::with_capacity(distinct.len() * num_columns);
    let mut offset_lists = Vec::with_capacity(distinct.len());
    for (tuple, offsets) in distinct {
        values.extend(tuple.iter().map(|&bits| f64::from_bits(bits)));
        offset_lists.push(offsets);
    }

    Bitmap::new(num_columns, values, offset_lists, zeros)
}
