/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Compressed column groups
//!
//! A column group covers one or more matrix columns compressed together. The
//! four encodings share one surface (cell lookup, size, covered columns):
//!
//! - **DDC**: dense dictionary coding, one code per row
//! - **RLE**: run-length encoding of the rows holding each distinct tuple
//! - **OLE**: offset-list encoding, the raw row lists delta/VLE coded
//! - **Uncompressed**: a dense copy of the group's columns
//!
//! Groups own their payload and are immutable once built.

mod ddc;
mod dictionary;
pub mod factory;
mod ole;
mod rle;
mod uncompressed;

pub use ddc::ColGroupDdc;
pub use ddc::DdcCodes;
pub use dictionary::Dictionary;
pub use ole::ColGroupOle;
pub use rle::ColGroupRle;
pub use rle::Run;
pub use uncompressed::ColGroupUncompressed;

pub(crate) use ole::encoded_len;
pub(crate) use rle::count_runs;

use serde::Deserialize;
use serde::Serialize;

/// Fixed bytes of every column group besides its column indexes
pub(crate) const HEADER_BYTES: usize = 16;

/// Bytes of the header and column index list
pub(crate) fn header_size(num_columns: usize) -> usize {
    HEADER_BYTES + num_columns * 4
}

/// Column group encodings known to the size model
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    Ddc,
    Ole,
    Rle,
    Uncompressed,
    /// A single tuple repeated on every row. Size models may report it, but
    /// the factory does not build it.
    Const,
}

/// A compressed column group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColGroup {
    Ddc(ColGroupDdc),
    Rle(ColGroupRle),
    Ole(ColGroupOle),
    Uncompressed(ColGroupUncompressed),
}

impl ColGroup {
    /// Matrix columns covered by this group, in group order
    pub fn col_indexes(&self) -> &[usize] {
        match self {
            ColGroup::Ddc(group) => group.col_indexes(),
            ColGroup::Rle(group) => group.col_indexes(),
            ColGroup::Ole(group) => group.col_indexes(),
            ColGroup::Uncompressed(group) => group.col_indexes(),
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            ColGroup::Ddc(group) => group.num_rows(),
            ColGroup::Rle(group) => group.num_rows(),
            ColGroup::Ole(group) => group.num_rows(),
            ColGroup::Uncompressed(group) => group.num_rows(),
        }
    }

    pub fn compression_type(&self) -> CompressionType {
        match self {
            ColGroup::Ddc(_) => CompressionType::Ddc,
            ColGroup::Rle(_) => CompressionType::Rle,
            ColGroup::Ole(_) => CompressionType::Ole,
            ColGroup::Uncompressed(_) => CompressionType::Uncompressed,
        }
    }

    /// Decode one cell. `col` is a position within [`Self::col_indexes`].
    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            ColGroup::Ddc(group) => group.get(row, col),
            ColGroup::Rle(group) => group.get(row, col),
            ColGroup::Ole(group) => group.get(row, col),
            ColGroup::Uncompressed(group) => group.get(row, col),
        }
    }

    /// In-memory size of the encoded group
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ColGroup::Ddc(group) => group.size_in_bytes(),
            ColGroup::Rle(group) => group.size_in_bytes(),
            ColGroup::Ole(group) => group.size_in_bytes(),
            ColGroup::Uncompressed(group) => group.size_in_bytes(),
        }
    }

    /// Number of distinct tuples stored, zero for uncompressed groups
    pub fn num_values(&self) -> usize {
        match self {
            ColGroup::Ddc(group) => group.num_values(),
            ColGroup::Rle(group) => group.num_values(),
            ColGroup::Ole(group) => group.num_values(),
            ColGroup::Uncompressed(_) => 0,
        }
    }
}
