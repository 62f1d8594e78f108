/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Column group factory
//!
//! Turns column index groups into compressed column groups.
//!
//! ## Compression modes
//!
//! - **Forced** (no per-column ratios): extract once, estimate once, build the
//!   cheapest encoding.
//! - **Correcting** (per-column ratios given): extract and estimate; if the group
//!   does not beat its uncompressed size, drop the column with the lowest
//!   individual ratio and try again. A group that runs out of columns yields
//!   `None`, telling the caller to handle those columns on their own.
//!
//! ## Parallelism
//!
//! Groups are independent. With more than one thread each group becomes one
//! task on a rayon pool and results keep the input order. Any failure of the
//! parallel run (pool creation, a task error or a task panic) discards every
//! partial result and the whole batch runs again sequentially.

use super::ColGroup;
use super::ColGroupDdc;
use super::ColGroupOle;
use super::ColGroupRle;
use super::ColGroupUncompressed;
use super::CompressionType;
use crate::bitmap::AnyBitmap;
use crate::bitmap::extract_bitmap;
use crate::bitmap::make_bitmap_lossy;
use crate::error::CompressionError;
use crate::error::Result;
use crate::estimate::ExactSizeEstimator;
use crate::estimate::SizeEstimator;
use crate::matrix::MatrixBlock;
use crate::settings::CompressionSettings;
use crate::settings::PartitionerType;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

/// Individually measured compression ratio per matrix column
pub type CompressionRatios = HashMap<usize, f64>;

/// Compress every group of `groups` using `k` threads and the exact size estimator.
///
/// `result[i]` belongs to `groups[i]`; `None` marks a group that was not worth
/// compressing.
pub fn compress_col_groups(
    block: &MatrixBlock,
    comp_ratios: Option<&CompressionRatios>,
    groups: &[Vec<usize>],
    settings: &CompressionSettings,
    k: usize,
) -> Result<Vec<Option<ColGroup>>> {
    compress_col_groups_with(&ExactSizeEstimator, block, comp_ratios, groups, settings, k)
}

/// Like [`compress_col_groups`] with a caller supplied size estimator
pub fn compress_col_groups_with<E: SizeEstimator>(
    estimator: &E,
    block: &MatrixBlock,
    comp_ratios: Option<&CompressionRatios>,
    groups: &[Vec<usize>],
    settings: &CompressionSettings,
    k: usize,
) -> Result<Vec<Option<ColGroup>>> {
    debug!(groups = groups.len(), k, "Compressing column groups");

    if k <= 1 {
        return compress_sequential(estimator, block, comp_ratios, groups, settings);
    }

    match ThreadPoolBuilder::new().num_threads(k).build() {
        Ok(pool) => compress_col_groups_in(&pool, estimator, block, comp_ratios, groups, settings),
        Err(e) => {
            warn!(error = %e, k, "Failed to create thread pool, compressing sequentially");
            compress_sequential(estimator, block, comp_ratios, groups, settings)
        }
    }
}

/// Compress every group on an existing thread pool
pub fn compress_col_groups_in<E: SizeEstimator>(
    pool: &ThreadPool,
    estimator: &E,
    block: &MatrixBlock,
    comp_ratios: Option<&CompressionRatios>,
    groups: &[Vec<usize>],
    settings: &CompressionSettings,
) -> Result<Vec<Option<ColGroup>>> {
    let parallel = std::panic::catch_unwind(AssertUnwindSafe(|| {
        pool.install(|| {
            groups
                .par_iter()
                .map(|col_indexes| {
                    compress_col_group(estimator, block, comp_ratios, col_indexes, settings)
                })
                .collect::<Result<Vec<_>>>()
        })
    }));

    match parallel {
        Ok(Ok(compressed)) => Ok(compressed),
        Ok(Err(e)) => {
            warn!(error = %e, "Parallel compression failed, retrying sequentially");
            compress_sequential(estimator, block, comp_ratios, groups, settings)
        }
        Err(_) => {
            warn!("Parallel compression task panicked, retrying sequentially");
            compress_sequential(estimator, block, comp_ratios, groups, settings)
        }
    }
}

fn compress_sequential<E: SizeEstimator>(
    estimator: &E,
    block: &MatrixBlock,
    comp_ratios: Option<&CompressionRatios>,
    groups: &[Vec<usize>],
    settings: &CompressionSettings,
) -> Result<Vec<Option<ColGroup>>> {
    groups
        .iter()
        .map(|col_indexes| compress_col_group(estimator, block, comp_ratios, col_indexes, settings))
        .collect()
}

/// Compress one group, correcting the column selection when ratios are given
pub fn compress_col_group<E: SizeEstimator>(
    estimator: &E,
    block: &MatrixBlock,
    comp_ratios: Option<&CompressionRatios>,
    col_indexes: &[usize],
    settings: &CompressionSettings,
) -> Result<Option<ColGroup>> {
    match comp_ratios {
        None => compress_col_group_forced(estimator, block, col_indexes, settings).map(Some),
        Some(ratios) => {
            compress_col_group_correcting(estimator, block, ratios, col_indexes, settings)
        }
    }
}

/// A column of the group being corrected, ordered by its ratio
#[derive(Debug, Clone, Copy)]
struct CompressedColumn {
    col: usize,
    comp_ratio: f64,
}

impl PartialEq for CompressedColumn {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CompressedColumn {}

impl PartialOrd for CompressedColumn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompressedColumn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comp_ratio
            .total_cmp(&other.comp_ratio)
            .then(self.col.cmp(&other.col))
    }
}

/// Min-queue of the group's columns. Columns without a known ratio are never
/// preferred for removal.
fn make_priority_queue(
    comp_ratios: &CompressionRatios,
    col_indexes: &[usize],
) -> BinaryHeap<Reverse<CompressedColumn>> {
    col_indexes
        .iter()
        .map(|&col| {
            Reverse(CompressedColumn {
                col,
                comp_ratio: comp_ratios.get(&col).copied().unwrap_or(f64::INFINITY),
            })
        })
        .collect()
}

fn logical_rows(block: &MatrixBlock, settings: &CompressionSettings) -> usize {
    if settings.transposed {
        block.num_columns()
    } else {
        block.num_rows()
    }
}

fn extract(
    col_indexes: &[usize],
    block: &MatrixBlock,
    settings: &CompressionSettings,
) -> Result<AnyBitmap> {
    let bitmap = extract_bitmap(col_indexes, block, settings.transposed)?;
    Ok(if settings.lossy {
        make_bitmap_lossy(bitmap)
    } else {
        AnyBitmap::Lossless(bitmap)
    })
}

#[instrument(level = "debug", skip(estimator, block, settings))]
fn compress_col_group_forced<E: SizeEstimator>(
    estimator: &E,
    block: &MatrixBlock,
    col_indexes: &[usize],
    settings: &CompressionSettings,
) -> Result<ColGroup> {
    let num_rows = logical_rows(block, settings);
    let bitmap = extract(col_indexes, block, settings)?;
    let size_info = estimator.estimate(&bitmap, num_rows, settings);
    compress(
        col_indexes,
        num_rows,
        &bitmap,
        size_info.best_type(),
        settings,
        block,
    )
}

#[instrument(level = "debug", skip(estimator, block, comp_ratios, settings))]
fn compress_col_group_correcting<E: SizeEstimator>(
    estimator: &E,
    block: &MatrixBlock,
    comp_ratios: &CompressionRatios,
    col_indexes: &[usize],
    settings: &CompressionSettings,
) -> Result<Option<ColGroup>> {
    let num_rows = logical_rows(block, settings);
    let mut queue = make_priority_queue(comp_ratios, col_indexes);
    let mut current = col_indexes.to_vec();

    loop {
        let bitmap = extract(&current, block, settings)?;
        let size_info = estimator.estimate(&bitmap, num_rows, settings);

        if size_info.min_size() == 0 {
            return Err(CompressionError::InvalidEstimate {
                col_indexes: current,
            });
        }

        let uncompressed = size_info
            .size_for(CompressionType::Uncompressed)
            .unwrap_or(0);
        let comp_ratio = uncompressed as f64 / size_info.min_size() as f64;

        if comp_ratio > 1.0 || settings.column_partitioner == PartitionerType::Cost {
            return compress(
                &current,
                num_rows,
                &bitmap,
                size_info.best_type(),
                settings,
                block,
            )
            .map(Some);
        }

        let Some(Reverse(worst)) = queue.pop() else {
            return Ok(None);
        };
        current.retain(|&col| col != worst.col);

        if current.is_empty() {
            debug!(col = worst.col, "Column group not worth compressing");
            return Ok(None);
        }

        debug!(
            col = worst.col,
            comp_ratio = worst.comp_ratio,
            group_ratio = comp_ratio,
            remaining = current.len(),
            "Dropping least compressible column"
        );
    }
}

/// Build the column group of the given encoding from a finalized bitmap.
///
/// Uncompressed groups copy their columns from `block` instead of the bitmap.
/// Every listed row of `bitmap` must be below `num_rows`.
pub fn compress(
    col_indexes: &[usize],
    num_rows: usize,
    bitmap: &AnyBitmap,
    compression_type: CompressionType,
    settings: &CompressionSettings,
    block: &MatrixBlock,
) -> Result<ColGroup> {
    debug!(
        ?col_indexes,
        ?compression_type,
        num_values = bitmap.num_values(),
        "Building column group"
    );

    if let Some(row) = bitmap
        .offset_lists()
        .iter()
        .filter_map(|offsets| offsets.last())
        .find(|&&row| row as usize >= num_rows)
    {
        return Err(CompressionError::ExtractionFailure(format!(
            "bitmap row {} out of bounds for {} rows",
            row, num_rows
        )));
    }

    let col_indexes = col_indexes.to_vec();
    match compression_type {
        CompressionType::Ddc => Ok(ColGroup::Ddc(ColGroupDdc::new(col_indexes, num_rows, bitmap))),
        CompressionType::Rle => Ok(ColGroup::Rle(ColGroupRle::new(col_indexes, num_rows, bitmap))),
        CompressionType::Ole => Ok(ColGroup::Ole(ColGroupOle::new(col_indexes, num_rows, bitmap))),
        CompressionType::Uncompressed => Ok(ColGroup::Uncompressed(ColGroupUncompressed::new(
            col_indexes,
            block,
            settings.transposed,
        )?)),
        unsupported => Err(CompressionError::UnsupportedEncoding(unsupported)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::CompressedSizeInfoColGroup;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering as AtomicOrdering;

    /// Three columns: column 0 repeats, columns 1 and 2 are unique per row
    fn mixed_block() -> MatrixBlock {
        let rows: Vec<Vec<f64>> = (0..64)
            .map(|r| vec![(r % 2) as f64 + 1.0, r as f64 + 0.5, r as f64 * 3.0 + 1.0])
            .collect();
        MatrixBlock::from_rows(&rows).unwrap()
    }

    fn assert_decodes(group: &ColGroup, block: &MatrixBlock) {
        for row in 0..group.num_rows() {
            for (pos, &col) in group.col_indexes().iter().enumerate() {
                assert_eq!(group.get(row, pos), block.get(row, col), "row {} col {}", row, col);
            }
        }
    }

    /// Estimator with fixed sizes, counting its calls
    struct FixedEstimator {
        sizes: Vec<(CompressionType, u64)>,
        calls: AtomicUsize,
    }

    impl FixedEstimator {
        fn new(sizes: Vec<(CompressionType, u64)>) -> Self {
            Self {
                sizes,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SizeEstimator for FixedEstimator {
        fn estimate(
            &self,
            _bitmap: &AnyBitmap,
            _num_rows: usize,
            settings: &CompressionSettings,
        ) -> CompressedSizeInfoColGroup {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            CompressedSizeInfoColGroup::new(self.sizes.clone(), settings)
        }
    }

    #[test]
    fn test_forced_mode_builds_best_type() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let group = compress_col_group(&ExactSizeEstimator, &block, None, &[0], &settings)
            .unwrap()
            .unwrap();

        assert_eq!(group.compression_type(), CompressionType::Ddc);
        assert_eq!(group.col_indexes(), &[0]);
        assert_decodes(&group, &block);
    }

    #[test]
    fn test_correcting_drops_least_compressible_column() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let ratios = CompressionRatios::from([(0, 8.0), (1, 0.9), (2, 0.8)]);

        let group =
            compress_col_group(&ExactSizeEstimator, &block, Some(&ratios), &[0, 1, 2], &settings)
                .unwrap()
                .unwrap();

        assert_eq!(group.col_indexes(), &[0]);
        assert_ne!(group.compression_type(), CompressionType::Uncompressed);
        assert_decodes(&group, &block);
    }

    #[test]
    fn test_correcting_returns_none_for_incompressible_columns() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let ratios = CompressionRatios::from([(1, 0.9), (2, 0.8)]);

        let group =
            compress_col_group(&ExactSizeEstimator, &block, Some(&ratios), &[1, 2], &settings)
                .unwrap();
        assert!(group.is_none());
    }

    #[test]
    fn test_correcting_terminates_within_group_width() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let estimator = FixedEstimator::new(vec![
            (CompressionType::Ddc, 100),
            (CompressionType::Uncompressed, 100),
        ]);
        let ratios = CompressionRatios::from([(0, 1.0), (1, 1.0), (2, 1.0)]);

        let group =
            compress_col_group(&estimator, &block, Some(&ratios), &[0, 1, 2], &settings).unwrap();
        assert!(group.is_none());
        assert_eq!(estimator.calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[test]
    fn test_cost_partitioner_bypasses_ratio_gate() {
        let block = mixed_block();
        let settings = CompressionSettings::new().with_partitioner(PartitionerType::Cost);
        let ratios = CompressionRatios::from([(1, 0.9), (2, 0.8)]);

        let group =
            compress_col_group(&ExactSizeEstimator, &block, Some(&ratios), &[1, 2], &settings)
                .unwrap()
                .unwrap();
        assert_eq!(group.compression_type(), CompressionType::Uncompressed);
        assert_eq!(group.col_indexes(), &[1, 2]);
    }

    #[test]
    fn test_equal_ratios_drop_lowest_column_index() {
        let ratios = CompressionRatios::from([(4, 2.0), (1, 2.0), (7, 3.0)]);
        let mut queue = make_priority_queue(&ratios, &[7, 4, 1]);
        assert_eq!(queue.pop().unwrap().0.col, 1);
        assert_eq!(queue.pop().unwrap().0.col, 4);
        assert_eq!(queue.pop().unwrap().0.col, 7);
    }

    #[test]
    fn test_missing_ratio_is_dropped_last() {
        let mut queue = make_priority_queue(&CompressionRatios::from([(3, 50.0)]), &[2, 3]);
        assert_eq!(queue.pop().unwrap().0.col, 3);
    }

    #[test]
    fn test_zero_minimal_size_is_invalid() {
        let block = mixed_block();
        let estimator = FixedEstimator::new(vec![
            (CompressionType::Ddc, 0),
            (CompressionType::Uncompressed, 10),
        ]);
        let ratios = CompressionRatios::from([(0, 2.0)]);

        let settings = CompressionSettings::default();
        let err =
            compress_col_group(&estimator, &block, Some(&ratios), &[0], &settings).unwrap_err();
        assert!(matches!(
            err,
            CompressionError::InvalidEstimate { col_indexes } if col_indexes == vec![0]
        ));
    }

    #[test]
    fn test_unsupported_encoding() {
        let block = mixed_block();
        let settings =
            CompressionSettings::new().with_valid_compressions(vec![CompressionType::Const]);
        let estimator = FixedEstimator::new(vec![
            (CompressionType::Const, 8),
            (CompressionType::Uncompressed, 100),
        ]);

        let err = compress_col_group(&estimator, &block, None, &[0], &settings).unwrap_err();
        assert!(matches!(err, CompressionError::UnsupportedEncoding(CompressionType::Const)));
    }

    #[test]
    fn test_extraction_failure_is_reported() {
        let block = mixed_block();
        let groups = vec![vec![0], vec![9]];
        let result = compress_col_groups(&block, None, &groups, &CompressionSettings::default(), 4);
        assert!(matches!(result, Err(CompressionError::ExtractionFailure(_))));
    }

    #[test]
    fn test_dispatch_every_encoding() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let bitmap = extract(&[0, 1], &block, &settings).unwrap();

        for compression_type in [
            CompressionType::Ddc,
            CompressionType::Rle,
            CompressionType::Ole,
            CompressionType::Uncompressed,
        ] {
            let group =
                compress(&[0, 1], 64, &bitmap, compression_type, &settings, &block).unwrap();
            assert_eq!(group.compression_type(), compression_type);
            assert_decodes(&group, &block);
        }
    }

    #[test]
    fn test_dispatch_rejects_rows_beyond_num_rows() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let bitmap = extract(&[0], &block, &settings).unwrap();

        for compression_type in [CompressionType::Ddc, CompressionType::Rle, CompressionType::Ole] {
            let result = compress(&[0], 32, &bitmap, compression_type, &settings, &block);
            assert!(matches!(result, Err(CompressionError::ExtractionFailure(_))));
        }
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let block = mixed_block();
        let settings = CompressionSettings::default();
        let groups = vec![vec![0], vec![1, 2], vec![2], vec![0, 1]];

        let sequential = compress_col_groups(&block, None, &groups, &settings, 1).unwrap();
        let parallel = compress_col_groups(&block, None, &groups, &settings, 4).unwrap();
        assert_eq!(sequential, parallel);
    }
}
