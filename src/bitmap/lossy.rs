/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Lossy 8 bit quantization of bitmaps
//!
//! Distinct values are mapped to signed byte codes with a single scale,
//! `scale = max(|min|, max) / 127`, computed over the distinct values. Entries
//! whose codes collide are merged into one entry holding the sorted union of
//! their offsets. Entries quantizing to all zeros are folded into the zero count.

use super::AnyBitmap;
use super::Bitmap;
use super::BitmapLossy;
use super::OffsetList;
use indexmap::IndexMap;
use tracing::debug;
use tracing::warn;

/// Try to build a lossy version of `bitmap`.
///
/// Returns the input unchanged when it has no values or when any value is not
/// finite, since no scale can represent it.
pub fn make_bitmap_lossy(bitmap: Bitmap) -> AnyBitmap {
    let values = bitmap.values();
    if values.is_empty() {
        return AnyBitmap::Lossless(bitmap);
    }

    if values.iter().any(|v| !v.is_finite()) {
        warn!(
            num_values = bitmap.num_values(),
            "Non-finite values in bitmap, defaulting to lossless column group"
        );
        return AnyBitmap::Lossless(bitmap);
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    let scale = min.abs().max(max) / i8::MAX as f64;
    if scale == 0.0 {
        return AnyBitmap::Lossless(bitmap);
    }

    AnyBitmap::Lossy(make_8bit_lossy(bitmap, scale))
}

fn make_8bit_lossy(bitmap: Bitmap, scale: f64) -> BitmapLossy {
    let (num_columns, values, offset_lists, zero_count) = bitmap.into_parts();
    let codes = scale_values(&values, scale);

    let (codes, offset_lists, mut zero_count) =
        merge_quantized(num_columns, &codes, offset_lists, zero_count);

    if num_columns > 1 {
        // Multi column groups always report at least one zero row, so the
        // first sparse-unsafe operation over a fully dense group still
        // accounts for a zero tuple.
        zero_count += 1;
    }

    BitmapLossy::new(num_columns, scale, codes, offset_lists, zero_count)
}

fn scale_values(values: &[f64], scale: f64) -> Vec<i8> {
    values
        .iter()
        .map(|&v| (v / scale).round().clamp(-(i8::MAX as f64), i8::MAX as f64) as i8)
        .collect()
}

/// Group entries by code tuple in order of first appearance and merge the
/// offsets of colliding entries. Lists of entries that do not collide are
/// moved over untouched.
fn merge_quantized(
    num_columns: usize,
    codes: &[i8],
    mut offset_lists: Vec<OffsetList>,
    mut zero_count: usize,
) -> (Vec<i8>, Vec<OffsetList>, usize) {
    let mut groups: IndexMap<&[i8], Vec<usize>> = IndexMap::new();

    for (idx, tuple) in codes.chunks_exact(num_columns).enumerate() {
        if tuple.iter().all(|&code| code == 0) {
            zero_count += offset_lists[idx].len();
        } else {
            groups.entry(tuple).or_default().push(idx);
        }
    }

    let mut merged_codes = Vec::with_capacity(groups.len() * num_columns);
    let mut merged_lists = Vec::with_capacity(groups.len());
    let mut collisions = 0;

    for (tuple, members) in groups {
        merged_codes.extend_from_slice(tuple);
        if let [idx] = members.as_slice() {
            merged_lists.push(std::mem::take(&mut offset_lists[*idx]));
        } else {
            collisions += members.len() - 1;
            let total = members.iter().map(|&idx| offset_lists[idx].len()).sum();
            let mut merged = Vec::with_capacity(total);
            for &idx in &members {
                merged.extend_from_slice(&offset_lists[idx]);
            }
            merged.sort_unstable();
            merged_lists.push(merged);
        }
    }

    debug!(
        entries = merged_lists.len(),
        collisions, zero_count, "Quantized bitmap"
    );

    (merged_codes, merged_lists, zero_count)
}
