/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! Property tests for bitmap extraction, quantization and the correcting loop

use colcompress::AnyBitmap;
use colcompress::CompressedSizeInfoColGroup;
use colcompress::CompressionRatios;
use colcompress::CompressionSettings;
use colcompress::CompressionType;
use colcompress::MatrixBlock;
use colcompress::SizeEstimator;
use colcompress::compress_col_groups_with;
use colcompress::extract_bitmap;
use colcompress::make_bitmap_lossy;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Matrices with many repeated values and zeros
fn matrix_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..6, 1usize..60).prop_flat_map(|(num_columns, num_rows)| {
        let cell = prop_oneof![
            3 => Just(0.0),
            4 => (-4i32..5).prop_map(|v| v as f64),
            2 => -1000.0f64..1000.0,
        ];
        prop::collection::vec(prop::collection::vec(cell, num_columns), num_rows)
    })
}

/// A matrix together with a nonempty column selection
fn selection_strategy() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<usize>)> {
    matrix_strategy().prop_flat_map(|rows| {
        let num_columns = rows[0].len();
        let cols = prop::sample::subsequence((0..num_columns).collect::<Vec<_>>(), 1..=num_columns)
            .prop_shuffle();
        (Just(rows), cols)
    })
}

fn block_variants(rows: &[Vec<f64>]) -> Vec<(MatrixBlock, bool)> {
    let dense = MatrixBlock::from_rows(rows).unwrap();
    vec![
        (dense.clone(), false),
        (MatrixBlock::from_rows_chunked(rows, 7).unwrap(), false),
        (dense.to_sparse(), false),
        (dense.transpose(), true),
        (dense.transpose().to_sparse(), true),
    ]
}

fn quantize(v: f64, scale: f64) -> i8 {
    (v / scale).round().clamp(-127.0, 127.0) as i8
}

/// Reports a fixed ratio of exactly 1 so the correcting loop never stops early
struct NeverWorthIt {
    calls: AtomicUsize,
}

impl SizeEstimator for NeverWorthIt {
    fn estimate(
        &self,
        _bitmap: &AnyBitmap,
        _num_rows: usize,
        settings: &CompressionSettings,
    ) -> CompressedSizeInfoColGroup {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CompressedSizeInfoColGroup::new(
            [
                (CompressionType::Ddc, 64),
                (CompressionType::Uncompressed, 64),
            ],
            settings,
        )
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn proptest_bitmap_partitions_rows((rows, cols) in selection_strategy()) {
        let expected_zero_rows = rows
            .iter()
            .filter(|row| cols.iter().all(|&col| row[col] == 0.0))
            .count();

        for (block, transposed) in block_variants(&rows) {
            let bitmap = extract_bitmap(&cols, &block, transposed).unwrap();
            prop_assert_eq!(bitmap.num_columns(), cols.len());

            let mut seen = BTreeSet::new();
            for (idx, offsets) in bitmap.offset_lists().iter().enumerate() {
                prop_assert!(!offsets.is_empty());
                prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));

                let tuple = bitmap.value_tuple(idx);
                prop_assert!(tuple.iter().any(|&v| v != 0.0));
                for &row in offsets {
                    prop_assert!(seen.insert(row));
                    for (pos, &col) in cols.iter().enumerate() {
                        prop_assert_eq!(tuple[pos], rows[row as usize][col]);
                    }
                }
            }

            prop_assert_eq!(bitmap.zero_count(), expected_zero_rows);
            prop_assert_eq!(seen.len() + bitmap.zero_count(), rows.len());
        }
    }

    #[test]
    fn proptest_layouts_extract_identical_bitmaps((rows, cols) in selection_strategy()) {
        let variants = block_variants(&rows);
        let (reference_block, _) = &variants[0];
        let reference = extract_bitmap(&cols, reference_block, false).unwrap();

        for (block, transposed) in &variants[1..] {
            prop_assert_eq!(&extract_bitmap(&cols, block, *transposed).unwrap(), &reference);
        }
    }

    #[test]
    fn proptest_quantization_error_bound((rows, cols) in selection_strategy()) {
        let block = MatrixBlock::from_rows(&rows).unwrap();
        let bitmap = extract_bitmap(&cols, &block, false).unwrap();
        let original = bitmap.clone();

        let AnyBitmap::Lossy(lossy) = make_bitmap_lossy(bitmap) else {
            // nothing to quantize
            prop_assert_eq!(original.num_values(), 0);
            return Ok(());
        };

        let scale = lossy.scale();
        let max = original.values().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        prop_assert!((scale - max / 127.0).abs() <= f64::EPSILON * max);

        let mut decoded = vec![vec![0.0; cols.len()]; rows.len()];
        for (idx, offsets) in lossy.offset_lists().iter().enumerate() {
            for &row in offsets {
                for (pos, &code) in lossy.value_tuple(idx).iter().enumerate() {
                    decoded[row as usize][pos] = code as f64 * scale;
                }
            }
        }

        for (row, values) in rows.iter().enumerate() {
            for (pos, &col) in cols.iter().enumerate() {
                let error = (values[col] - decoded[row][pos]).abs();
                prop_assert!(
                    error <= scale / 2.0 + 1e-9,
                    "row {} col {}: error {}",
                    row,
                    col,
                    error
                );
            }
        }
    }

    #[test]
    fn proptest_quantization_merges_offsets((rows, cols) in selection_strategy()) {
        let block = MatrixBlock::from_rows(&rows).unwrap();
        let original = extract_bitmap(&cols, &block, false).unwrap();

        let AnyBitmap::Lossy(lossy) = make_bitmap_lossy(original.clone()) else {
            return Ok(());
        };
        let scale = lossy.scale();

        let mut codes_seen = BTreeSet::new();
        let mut merged_rows = 0;
        for (idx, offsets) in lossy.offset_lists().iter().enumerate() {
            let codes = lossy.value_tuple(idx);
            prop_assert!(codes.iter().any(|&code| code != 0));
            prop_assert!(codes_seen.insert(codes.to_vec()));

            let mut expected: Vec<u32> = (0..original.num_values())
                .filter(|&src| {
                    original
                        .value_tuple(src)
                        .iter()
                        .map(|&v| quantize(v, scale))
                        .eq(codes.iter().copied())
                })
                .flat_map(|src| original.offset_lists()[src].iter().copied())
                .collect();
            expected.sort_unstable();

            prop_assert_eq!(offsets, &expected);
            merged_rows += offsets.len();
        }

        let bias = usize::from(cols.len() > 1);
        prop_assert_eq!(merged_rows + lossy.zero_count(), rows.len() + bias);
    }

    #[test]
    fn proptest_correcting_loop_terminates((rows, cols) in selection_strategy()) {
        let block = MatrixBlock::from_rows(&rows).unwrap();
        let ratios: CompressionRatios = cols.iter().map(|&col| (col, col as f64)).collect();
        let estimator = NeverWorthIt { calls: AtomicUsize::new(0) };

        let compressed = compress_col_groups_with(
            &estimator,
            &block,
            Some(&ratios),
            &[cols.clone()],
            &CompressionSettings::default(),
            1,
        )
        .unwrap();

        prop_assert!(compressed[0].is_none());
        prop_assert_eq!(estimator.calls.load(Ordering::SeqCst), cols.len());
    }
}
