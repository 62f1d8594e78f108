/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Error and Result types for column group compression.

use crate::colgroup::CompressionType;
use thiserror::Error;

/// A convenience `Result` type.
pub type Result<T> = std::result::Result<T, CompressionError>;

/// Errors raised while building compressed column groups.
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Scanning the matrix for distinct values failed.
    #[error("failed to extract bitmap: {0}")]
    ExtractionFailure(String),

    /// The size estimator reported a minimal size of zero bytes.
    #[error("size info of compressed column group is 0 for columns {col_indexes:?}")]
    InvalidEstimate { col_indexes: Vec<usize> },

    /// The dispatcher was asked for an encoding it cannot build.
    #[error("compression type {0:?} is not implemented by the column group factory")]
    UnsupportedEncoding(CompressionType),

    /// Compression settings could not be loaded.
    #[error("invalid compression settings: {0}")]
    Config(String),
}
