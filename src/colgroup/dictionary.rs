/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Distinct value tuples shared by the dictionary based encodings.

use crate::bitmap::AnyBitmap;
use serde::Deserialize;
use serde::Serialize;

/// Flat table of value tuples, `num_columns` entries per tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Dictionary {
    Plain(Vec<f64>),
    /// 8 bit codes, each standing for `code * scale`
    Quantized { codes: Vec<i8>, scale: f64 },
}

impl Dictionary {
    pub fn from_bitmap(bitmap: &AnyBitmap) -> Self {
        match bitmap {
            AnyBitmap::Lossless(bitmap) => Dictionary::Plain(bitmap.values().to_vec()),
            AnyBitmap::Lossy(bitmap) => Dictionary::Quantized {
                codes: bitmap.quantized_values().to_vec(),
                scale: bitmap.scale(),
            },
        }
    }

    /// Append an all-zero tuple
    pub(crate) fn push_zero_tuple(&mut self, num_columns: usize) {
        match self {
            Dictionary::Plain(values) => values.extend(std::iter::repeat_n(0.0, num_columns)),
            Dictionary::Quantized { codes, .. } => {
                codes.extend(std::iter::repeat_n(0, num_columns))
            }
        }
    }

    /// Value at flat position `idx`
    pub fn value(&self, idx: usize) -> f64 {
        match self {
            Dictionary::Plain(values) => values[idx],
            Dictionary::Quantized { codes, scale } => codes[idx] as f64 * scale,
        }
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        match self {
            Dictionary::Plain(values) => values.len(),
            Dictionary::Quantized { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_in_bytes(&self) -> usize {
        Self::estimate_size(self.len(), matches!(self, Dictionary::Quantized { .. }))
    }

    /// Size of a dictionary holding `cells` values
    pub(crate) fn estimate_size(cells: usize, quantized: bool) -> usize {
        if quantized { cells + 8 } else { cells * 8 }
    }
}
