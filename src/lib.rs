/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # colcompress - Compressed Column Groups for Numeric Matrices
//!
//! This library turns groups of columns of a resident matrix block into
//! compressed column groups. For each group it extracts the distinct value
//! tuples together with the rows holding them, optionally quantizes them to
//! 8 bit codes, asks a size estimator for the cheapest encoding and builds it.
//!
//! ```rust,no_run
//! use colcompress::CompressionSettings;
//! use colcompress::MatrixBlock;
//! use colcompress::compress_col_groups;
//!
//! # fn main() -> anyhow::Result<()> {
//! let block = MatrixBlock::from_rows(&[vec![1.0, 7.0], vec![1.0, 8.0], vec![2.0, 7.0]])?;
//! let groups = vec![vec![0], vec![1]];
//! let compressed = compress_col_groups(&block, None, &groups, &CompressionSettings::default(), 4)?;
//! assert_eq!(compressed.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod bitmap;
pub mod colgroup;
pub mod error;
pub mod estimate;
pub mod matrix;
pub mod serialization;
pub mod settings;

pub use bitmap::AnyBitmap;
pub use bitmap::Bitmap;
pub use bitmap::BitmapLossy;
pub use bitmap::extract_bitmap;
pub use bitmap::make_bitmap_lossy;
pub use colgroup::ColGroup;
pub use colgroup::CompressionType;
pub use colgroup::factory::CompressionRatios;
pub use colgroup::factory::compress;
pub use colgroup::factory::compress_col_groups;
pub use colgroup::factory::compress_col_groups_in;
pub use colgroup::factory::compress_col_groups_with;
pub use error::CompressionError;
pub use error::Result;
pub use estimate::CompressedSizeInfoColGroup;
pub use estimate::ExactSizeEstimator;
pub use estimate::SizeEstimator;
pub use matrix::MatrixBlock;
pub use settings::CompressionSettings;
pub use settings::PartitionerType;
