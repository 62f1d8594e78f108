/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Run-length encoded column groups.

use super::Dictionary;
use super::header_size;
use crate::bitmap::AnyBitmap;
use serde::Deserialize;
use serde::Serialize;

/// Bytes per stored run
const RUN_BYTES: usize = 8;

/// Bytes per distinct tuple pointing at its runs
const POINTER_BYTES: usize = 4;

/// Consecutive rows `start..start + len`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub start: u32,
    pub len: u32,
}

impl Run {
    fn contains(&self, row: u32) -> bool {
        row >= self.start && row - self.start < self.len
    }
}

/// Collapse an ascending offset list into runs
pub(crate) fn encode_runs(offsets: &[u32]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &row in offsets {
        match runs.last_mut() {
            Some(run) if run.start + run.len == row => run.len += 1,
            _ => runs.push(Run { start: row, len: 1 }),
        }
    }
    runs
}

/// Number of runs `encode_runs` would produce
pub(crate) fn count_runs(offsets: &[u32]) -> usize {
    if offsets.is_empty() {
        return 0;
    }
    1 + offsets.windows(2).filter(|w| w[1] != w[0] + 1).count()
}

/// Per distinct tuple, the runs of rows holding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColGroupRle {
    col_indexes: Vec<usize>,
    num_rows: usize,
    dictionary: Dictionary,
    runs: Vec<Vec<Run>>,
}

impl ColGroupRle {
    pub fn new(col_indexes: Vec<usize>, num_rows: usize, bitmap: &AnyBitmap) -> Self {
        let runs = bitmap
            .offset_lists()
            .iter()
            .map(|offsets| encode_runs(offsets))
            .collect();

        Self {
            col_indexes,
            num_rows,
            dictionary: Dictionary::from_bitmap(bitmap),
            runs,
        }
    }

    pub fn col_indexes(&self) -> &[usize] {
        &self.col_indexes
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_values(&self) -> usize {
        self.runs.len()
    }

    pub fn runs(&self, idx: usize) -> &[Run] {
        &self.runs[idx]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let row = row as u32;
        for (idx, runs) in self.runs.iter().enumerate() {
            let pos = runs.partition_point(|run| run.start <= row);
            if pos > 0 && runs[pos - 1].contains(row) {
                return self.dictionary.value(idx * self.col_indexes.len() + col);
            }
        }
        0.0
    }

    pub fn size_in_bytes(&self) -> usize {
        let num_runs: usize = self.runs.iter().map(|runs| runs.len()).sum();
        header_size(self.col_indexes.len())
            + self.dictionary.size_in_bytes()
            + self.runs.len() * POINTER_BYTES
            + num_runs * RUN_BYTES
    }

    pub(crate) fn estimate_size(
        num_columns: usize,
        num_values: usize,
        num_runs: usize,
        quantized: bool,
    ) -> usize {
        header_size(num_columns)
            + Dictionary::estimate_size(num_values * num_columns, quantized)
            + num_values * POINTER_BYTES
            + num_runs * RUN_BYTES
    }
}
