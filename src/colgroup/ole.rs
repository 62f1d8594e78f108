/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Offset-list encoded column groups
//!
//! Each distinct tuple keeps the full ascending list of rows holding it. The
//! list is stored as deltas between consecutive rows (the first delta is the
//! first row itself) in a variable length encoding, so dense clusters of rows
//! cost one byte per row even when they do not form runs.

use super::Dictionary;
use super::header_size;
use crate::bitmap::AnyBitmap;
use serde::Deserialize;
use serde::Serialize;

/// Bytes per distinct tuple for its row count
const COUNT_BYTES: usize = 4;

/// Variable Length Encoding for unsigned integers
///
/// Seven bits per byte, least significant group first, with the high bit set
/// on every byte but the last. Values below 128 take one byte.
pub(crate) fn encode_vle(value: u32, output: &mut Vec<u8>) {
    let mut remaining = value;
    while remaining >= 0x80 {
        output.push((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }
    output.push(remaining as u8);
}

/// Decode one VLE integer, returning the value and the bytes consumed.
///
/// Returns `None` on truncated input or a value wider than 32 bits.
pub(crate) fn decode_vle(input: &[u8]) -> Option<(u32, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (pos, &byte) in input.iter().enumerate() {
        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return u32::try_from(result).ok().map(|value| (value, pos + 1));
        }

        shift += 7;
        if shift >= 35 {
            return None;
        }
    }
    None
}

fn vle_len(value: u32) -> usize {
    match value {
        0..0x80 => 1,
        0x80..0x4000 => 2,
        0x4000..0x20_0000 => 3,
        0x20_0000..0x1000_0000 => 4,
        _ => 5,
    }
}

/// Bytes needed to encode an ascending offset list
pub(crate) fn encoded_len(offsets: &[u32]) -> usize {
    let mut prev = 0;
    offsets
        .iter()
        .map(|&row| {
            let delta = row - prev;
            prev = row;
            vle_len(delta)
        })
        .sum()
}

fn encode_offsets(offsets: &[u32]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(encoded_len(offsets));
    let mut prev = 0;
    for &row in offsets {
        encode_vle(row - prev, &mut encoded);
        prev = row;
    }
    encoded
}

/// Iterator over the rows of one encoded offset list
struct OffsetIter<'a> {
    data: &'a [u8],
    pos: usize,
    row: u32,
}

impl Iterator for OffsetIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let (delta, read) = decode_vle(&self.data[self.pos..])?;
        self.pos += read;
        self.row = self.row.checked_add(delta)?;
        Some(self.row)
    }
}

/// Per distinct tuple, the delta coded list of rows holding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColGroupOle {
    col_indexes: Vec<usize>,
    num_rows: usize,
    dictionary: Dictionary,
    offsets: Vec<Vec<u8>>,
    counts: Vec<u32>,
    /// First and last row of every list, for skipping lists during lookup
    bounds: Vec<(u32, u32)>,
}

impl ColGroupOle {
    pub fn new(col_indexes: Vec<usize>, num_rows: usize, bitmap: &AnyBitmap) -> Self {
        let offsets = bitmap
            .offset_lists()
            .iter()
            .map(|list| encode_offsets(list))
            .collect();
        let counts = bitmap
            .offset_lists()
            .iter()
            .map(|list| list.len() as u32)
            .collect();
        let bounds = bitmap
            .offset_lists()
            .iter()
            .map(|list| match (list.first(), list.last()) {
                (Some(&first), Some(&last)) => (first, last),
                _ => (1, 0),
            })
            .collect();

        Self {
            col_indexes,
            num_rows,
            dictionary: Dictionary::from_bitmap(bitmap),
            offsets,
            counts,
            bounds,
        }
    }

    pub fn col_indexes(&self) -> &[usize] {
        &self.col_indexes
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_values(&self) -> usize {
        self.offsets.len()
    }

    /// Rows holding tuple `idx`
    pub fn offsets(&self, idx: usize) -> impl Iterator<Item = u32> + '_ {
        OffsetIter {
            data: &self.offsets[idx],
            pos: 0,
            row: 0,
        }
        .take(self.counts[idx] as usize)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let row = row as u32;
        for (idx, &(first, last)) in self.bounds.iter().enumerate() {
            if row < first || row > last {
                continue;
            }
            if self.offsets(idx).take_while(|&r| r <= row).any(|r| r == row) {
                return self.dictionary.value(idx * self.col_indexes.len() + col);
            }
        }
        0.0
    }

    pub fn size_in_bytes(&self) -> usize {
        let payload: usize = self.offsets.iter().map(|data| data.len()).sum();
        header_size(self.col_indexes.len())
            + self.dictionary.size_in_bytes()
            + self.offsets.len() * COUNT_BYTES
            + payload
    }

    pub(crate) fn estimate_size(
        num_columns: usize,
        num_values: usize,
        encoded_bytes: usize,
        quantized: bool,
    ) -> usize {
        header_size(num_columns)
            + Dictionary::estimate_size(num_values * num_columns, quantized)
            + num_values * COUNT_BYTES
            + encoded_bytes
    }
}
