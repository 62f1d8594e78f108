/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Distinct value bitmaps
//!
//! A bitmap records the distinct (non-zero) value tuples of a column group and,
//! for each tuple, the ascending list of rows holding it. Rows that are zero in
//! every selected column are only counted, never listed, since zero is the
//! assumed fill value of every encoding.
//!
//! Bitmaps are transient: one is built per extraction attempt and dropped once
//! the compressed column group exists.

mod extract;
mod lossy;
mod reader;

pub use extract::extract_bitmap;
pub use lossy::make_bitmap_lossy;
pub use reader::ColumnSelectionReader;
pub use reader::create_reader;

/// Sorted row indexes sharing one value tuple
pub type OffsetList = Vec<u32>;

/// Lossless bitmap over `f64` values
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    num_columns: usize,
    values: Vec<f64>,
    offset_lists: Vec<OffsetList>,
    zero_count: usize,
}

impl Bitmap {
    pub fn new(
        num_columns: usize,
        values: Vec<f64>,
        offset_lists: Vec<OffsetList>,
        zero_count: usize,
    ) -> Self {
        debug_assert_eq!(values.len(), offset_lists.len() * num_columns);
        Self {
            num_columns,
            values,
            offset_lists,
            zero_count,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn num_values(&self) -> usize {
        self.offset_lists.len()
    }

    /// Flat distinct tuples, `num_columns` values each
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value_tuple(&self, idx: usize) -> &[f64] {
        &self.values[idx * self.num_columns..(idx + 1) * self.num_columns]
    }

    pub fn offset_lists(&self) -> &[OffsetList] {
        &self.offset_lists
    }

    pub fn zero_count(&self) -> usize {
        self.zero_count
    }

    pub(crate) fn into_parts(self) -> (usize, Vec<f64>, Vec<OffsetList>, usize) {
        (
            self.num_columns,
            self.values,
            self.offset_lists,
            self.zero_count,
        )
    }
}

/// Bitmap whose tuples are quantized to signed 8 bit codes.
///
/// A code `q` stands for the value `q * scale`. No two entries share the same
/// code tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapLossy {
    num_columns: usize,
    scale: f64,
    quantized_values: Vec<i8>,
    offset_lists: Vec<OffsetList>,
    zero_count: usize,
}

impl BitmapLossy {
    pub fn new(
        num_columns: usize,
        scale: f64,
        quantized_values: Vec<i8>,
        offset_lists: Vec<OffsetList>,
        zero_count: usize,
    ) -> Self {
        debug_assert_eq!(quantized_values.len(), offset_lists.len() * num_columns);
        Self {
            num_columns,
            scale,
            quantized_values,
            offset_lists,
            zero_count,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn num_values(&self) -> usize {
        self.offset_lists.len()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn quantized_values(&self) -> &[i8] {
        &self.quantized_values
    }

    pub fn value_tuple(&self, idx: usize) -> &[i8] {
        &self.quantized_values[idx * self.num_columns..(idx + 1) * self.num_columns]
    }

    pub fn offset_lists(&self) -> &[OffsetList] {
        &self.offset_lists
    }

    pub fn zero_count(&self) -> usize {
        self.zero_count
    }
}

/// Either kind of bitmap, as consumed by the estimator and the encoders
#[derive(Debug, Clone, PartialEq)]
pub enum AnyBitmap {
    Lossless(Bitmap),
    Lossy(BitmapLossy),
}

impl AnyBitmap {
    pub fn num_columns(&self) -> usize {
        match self {
            AnyBitmap::Lossless(bitmap) => bitmap.num_columns(),
            AnyBitmap::Lossy(bitmap) => bitmap.num_columns(),
        }
    }

    pub fn num_values(&self) -> usize {
        self.offset_lists().len()
    }

    pub fn offset_lists(&self) -> &[OffsetList] {
        match self {
            AnyBitmap::Lossless(bitmap) => bitmap.offset_lists(),
            AnyBitmap::Lossy(bitmap) => bitmap.offset_lists(),
        }
    }

    pub fn zero_count(&self) -> usize {
        match self {
            AnyBitmap::Lossless(bitmap) => bitmap.zero_count(),
            AnyBitmap::Lossy(bitmap) => bitmap.zero_count(),
        }
    }

    /// Total number of listed rows
    pub fn num_offsets(&self) -> usize {
        self.offset_lists().iter().map(|list| list.len()).sum()
    }

    /// Decoded value of column `col` in tuple `idx`
    pub fn value(&self, idx: usize, col: usize) -> f64 {
        match self {
            AnyBitmap::Lossless(bitmap) => bitmap.value_tuple(idx)[col],
            AnyBitmap::Lossy(bitmap) => bitmap.value_tuple(idx)[col] as f64 * bitmap.scale(),
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, AnyBitmap::Lossy(_))
    }
}

impl From<Bitmap> for AnyBitmap {
    fn from(bitmap: Bitmap) -> Self {
        AnyBitmap::Lossless(bitmap)
    }
}

impl From<BitmapLossy> for AnyBitmap {
    fn from(bitmap: BitmapLossy) -> Self {
        AnyBitmap::Lossy(bitmap)
    }
}
