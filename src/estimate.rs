/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Compressed size estimation
//!
//! The compressor consults a [`SizeEstimator`] for every extracted bitmap. The
//! estimate is an immutable snapshot holding a byte size per encoding plus the
//! cheapest valid encoding. [`ExactSizeEstimator`] computes the true encoded
//! size of every encoding straight from the bitmap.

use crate::bitmap::AnyBitmap;
use crate::colgroup::ColGroupDdc;
use crate::colgroup::ColGroupOle;
use crate::colgroup::ColGroupRle;
use crate::colgroup::ColGroupUncompressed;
use crate::colgroup::CompressionType;
use crate::colgroup::count_runs;
use crate::colgroup::encoded_len;
use crate::settings::CompressionSettings;
use std::collections::BTreeMap;

/// Predicts the storage cost of each encoding for a bitmap.
///
/// Implementations must be deterministic for identical bitmap content, and are
/// shared across worker threads.
pub trait SizeEstimator: Sync {
    fn estimate(
        &self,
        bitmap: &AnyBitmap,
        num_rows: usize,
        settings: &CompressionSettings,
    ) -> CompressedSizeInfoColGroup;
}

/// Estimated sizes of one column group
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedSizeInfoColGroup {
    sizes: BTreeMap<CompressionType, u64>,
    best_type: CompressionType,
    min_size: u64,
}

impl CompressedSizeInfoColGroup {
    /// Build from per-encoding sizes, choosing the cheapest encoding valid
    /// under `settings`. Equal sizes resolve in `CompressionType` order.
    pub fn new(
        sizes: impl IntoIterator<Item = (CompressionType, u64)>,
        settings: &CompressionSettings,
    ) -> Self {
        let sizes: BTreeMap<CompressionType, u64> = sizes.into_iter().collect();

        let (best_type, min_size) = sizes
            .iter()
            .filter(|(compression_type, _)| settings.is_valid(**compression_type))
            .fold(None, |best: Option<(CompressionType, u64)>, (&t, &size)| match best {
                Some((_, min)) if min <= size => best,
                _ => Some((t, size)),
            })
            .unwrap_or((CompressionType::Uncompressed, 0));

        Self {
            sizes,
            best_type,
            min_size,
        }
    }

    pub fn size_for(&self, compression_type: CompressionType) -> Option<u64> {
        self.sizes.get(&compression_type).copied()
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    pub fn best_type(&self) -> CompressionType {
        self.best_type
    }
}

/// Computes exact encoded sizes from the bitmap
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSizeEstimator;

impl SizeEstimator for ExactSizeEstimator {
    fn estimate(
        &self,
        bitmap: &AnyBitmap,
        num_rows: usize,
        settings: &CompressionSettings,
    ) -> CompressedSizeInfoColGroup {
        let num_columns = bitmap.num_columns();
        let num_values = bitmap.num_values();
        let quantized = bitmap.is_lossy();
        let offset_lists = bitmap.offset_lists();

        let num_runs: usize = offset_lists
            .iter()
            .map(|list| count_runs(list))
            .sum();
        let encoded_bytes: usize = offset_lists
            .iter()
            .map(|list| encoded_len(list))
            .sum();
        let has_zero_rows = bitmap.num_offsets() < num_rows;

        let sizes = [
            (
                CompressionType::Ddc,
                ColGroupDdc::estimate_size(
                    num_rows,
                    num_columns,
                    num_values,
                    has_zero_rows,
                    quantized,
                ),
            ),
            (
                CompressionType::Ole,
                ColGroupOle::estimate_size(num_columns, num_values, encoded_bytes, quantized),
            ),
            (
                CompressionType::Rle,
                ColGroupRle::estimate_size(num_columns, num_values, num_runs, quantized),
            ),
            (
                CompressionType::Uncompressed,
                ColGroupUncompressed::estimate_size(num_rows, num_columns),
            ),
        ];

        CompressedSizeInfoColGroup::new(
            sizes.map(|(compression_type, size)| (compression_type, size as u64)),
            settings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::bitmap::extract_bitmap;
    use crate::matrix::MatrixBlock;

    #[test]
    fn test_best_type_respects_valid_compressions() {
        let sizes = [
            (CompressionType::Ddc, 10),
            (CompressionType::Rle, 5),
            (CompressionType::Uncompressed, 40),
        ];
        let all = CompressedSizeInfoColGroup::new(sizes, &CompressionSettings::default());
        assert_eq!(all.best_type(), CompressionType::Rle);
        assert_eq!(all.min_size(), 5);

        let settings =
            CompressionSettings::new().with_valid_compressions(vec![CompressionType::Ddc]);
        let restricted = CompressedSizeInfoColGroup::new(sizes, &settings);
        assert_eq!(restricted.best_type(), CompressionType::Ddc);
        assert_eq!(restricted.size_for(CompressionType::Rle), Some(5));
        assert_eq!(restricted.size_for(CompressionType::Ole), None);
    }

    #[test]
    fn test_ties_resolve_in_type_order() {
        let sizes = [
            (CompressionType::Uncompressed, 8),
            (CompressionType::Rle, 8),
            (CompressionType::Ole, 8),
        ];
        let info = CompressedSizeInfoColGroup::new(sizes, &CompressionSettings::default());
        assert_eq!(info.best_type(), CompressionType::Ole);
    }

    #[test]
    fn test_long_runs_prefer_rle() {
        let values: Vec<Vec<f64>> = (0..1000).map(|r| vec![(r / 250) as f64 + 1.0]).collect();
        let block = MatrixBlock::from_rows(&values).unwrap();
        let bitmap = AnyBitmap::from(extract_bitmap(&[0], &block, false).unwrap());

        let info = ExactSizeEstimator.estimate(&bitmap, 1000, &CompressionSettings::default());
        assert_eq!(info.best_type(), CompressionType::Rle);
        assert!(info.size_for(CompressionType::Uncompressed).unwrap() > info.min_size());
    }

    #[test]
    fn test_unique_values_prefer_uncompressed() {
        let values: Vec<Vec<f64>> = (0..100).map(|r| vec![r as f64 + 0.5]).collect();
        let block = MatrixBlock::from_rows(&values).unwrap();
        let bitmap = AnyBitmap::from(extract_bitmap(&[0], &block, false).unwrap());

        let info = ExactSizeEstimator.estimate(&bitmap, 100, &CompressionSettings::default());
        assert_eq!(info.best_type(), CompressionType::Uncompressed);
    }

    #[test]
    fn test_deterministic() {
        let bitmap = AnyBitmap::from(Bitmap::new(1, vec![2.0], vec![vec![0, 1, 5]], 3));
        let settings = CompressionSettings::default();
        assert_eq!(
            ExactSizeEstimator.estimate(&bitmap, 6, &settings),
            ExactSizeEstimator.estimate(&bitmap, 6, &settings)
        );
    }
}
