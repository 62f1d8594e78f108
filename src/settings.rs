/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Compression settings
//!
//! Settings are plain data shared read-only by every column group task. They
//! can be built in code or loaded from a YAML document:
//!
//! ```yaml
//! transposed: false
//! lossy: true
//! column_partitioner: cost
//! valid_compressions: [ddc, ole]
//! ```

use crate::colgroup::CompressionType;
use crate::error::CompressionError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

/// The column partitioning policy that produced the column groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionerType {
    #[default]
    Static,
    BinPacking,
    /// Cost-driven partitioning trusts the estimator and skips the ratio gate
    Cost,
}

/// Settings controlling how column groups are compressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// The input block is stored transposed (block rows are logical columns)
    pub transposed: bool,
    /// Quantize extracted bitmaps to 8 bit codes
    pub lossy: bool,
    pub column_partitioner: PartitionerType,
    /// Encodings the estimator may pick. Uncompressed is always allowed.
    pub valid_compressions: Vec<CompressionType>,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            transposed: false,
            lossy: false,
            column_partitioner: PartitionerType::Static,
            valid_compressions: vec![
                CompressionType::Ddc,
                CompressionType::Ole,
                CompressionType::Rle,
                CompressionType::Uncompressed,
            ],
        }
    }
}

impl CompressionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transposed(mut self, transposed: bool) -> Self {
        self.transposed = transposed;
        self
    }

    pub fn with_lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    pub fn with_partitioner(mut self, partitioner: PartitionerType) -> Self {
        self.column_partitioner = partitioner;
        self
    }

    pub fn with_valid_compressions(mut self, valid: Vec<CompressionType>) -> Self {
        self.valid_compressions = valid;
        self
    }

    /// Whether the estimator may recommend `compression_type`
    pub fn is_valid(&self, compression_type: CompressionType) -> bool {
        compression_type == CompressionType::Uncompressed
            || self.valid_compressions.contains(&compression_type)
    }

    /// Parse settings from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CompressionError::Config(e.to_string()))
    }

    /// Load settings from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompressionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }
}
