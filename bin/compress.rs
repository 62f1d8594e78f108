/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Column group compressor
//!
//! Loads a numeric matrix from CSV, compresses its column groups and prints a
//! summary of the chosen encodings.
//!
//! ## Usage
//!
//! ```bash
//! # Compress every column on its own
//! cargo run --bin compress -- matrix.csv
//!
//! # Compress columns 0 and 1 together and column 2 alone on 4 threads
//! cargo run --bin compress -- matrix.csv --groups "0,1;2" --parallelism 4
//!
//! # Drop poorly compressing columns from groups and save the result
//! cargo run --bin compress -- matrix.csv --groups "0,1,2" --correcting --output matrix.cgroups
//! ```

use anyhow::Context;
use anyhow::Result;
use colcompress::AnyBitmap;
use colcompress::ColGroup;
use colcompress::CompressionRatios;
use colcompress::CompressionSettings;
use colcompress::CompressionType;
use colcompress::ExactSizeEstimator;
use colcompress::MatrixBlock;
use colcompress::SizeEstimator;
use colcompress::compress_col_groups;
use colcompress::extract_bitmap;
use colcompress::make_bitmap_lossy;
use colcompress::serialization::save_to_file;
use serde::Serialize;
use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Below this density the matrix is held in sparse storage
const SPARSE_DENSITY_THRESHOLD: f64 = 0.4;

const USAGE: &str = "Usage: compress <matrix.csv> [options]\n\n\
    Options:\n  \
    --groups <spec>        Column groups, e.g. \"0,1;2\" (default: one group per column)\n  \
    --parallelism <k>      Number of worker threads (default: available cores)\n  \
    --lossy                Quantize values to 8 bit codes\n  \
    --transposed           Store the matrix transposed while compressing\n  \
    --correcting           Drop poorly compressing columns from groups\n  \
    --config <file>        Load compression settings from YAML\n  \
    --output <file>        Save the compressed groups\n  \
    --json                 Print the summary as JSON\n  \
    --help                 Show this help message";

#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    groups: Option<String>,
    parallelism: Option<usize>,
    lossy: bool,
    transposed: bool,
    correcting: bool,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    col_indexes: Vec<usize>,
    compressed: bool,
    compression_type: Option<CompressionType>,
    num_values: usize,
    size_in_bytes: usize,
}

#[derive(Debug, Serialize)]
struct Summary {
    num_rows: usize,
    num_columns: usize,
    sparse: bool,
    uncompressed_bytes: usize,
    compressed_bytes: usize,
    elapsed_ms: u128,
    groups: Vec<GroupSummary>,
}

fn parse_args() -> Result<Option<Args>> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut input = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--groups" | "-g" => {
                parsed.groups = Some(option_value(&args, i)?.to_string());
                i += 2;
            }
            "--parallelism" | "-k" => {
                let value = option_value(&args, i)?;
                parsed.parallelism = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid parallelism: {}", value))?,
                );
                i += 2;
            }
            "--config" | "-c" => {
                parsed.config = Some(PathBuf::from(option_value(&args, i)?));
                i += 2;
            }
            "--output" | "-o" => {
                parsed.output = Some(PathBuf::from(option_value(&args, i)?));
                i += 2;
            }
            "--lossy" => {
                parsed.lossy = true;
                i += 1;
            }
            "--transposed" => {
                parsed.transposed = true;
                i += 1;
            }
            "--correcting" => {
                parsed.correcting = true;
                i += 1;
            }
            "--json" => {
                parsed.json = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(None);
            }
            arg if arg.starts_with('-') => anyhow::bail!("Unknown option: {}\n\n{}", arg, USAGE),
            arg => {
                if input.is_some() {
                    anyhow::bail!("Unexpected argument: {}\n\n{}", arg, USAGE);
                }
                input = Some(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    parsed.input = input.with_context(|| format!("Missing input file\n\n{}", USAGE))?;
    Ok(Some(parsed))
}

fn option_value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", args[i]))
}

/// Parse "0,1;2" into column groups
fn parse_groups(spec: &str, num_columns: usize) -> Result<Vec<Vec<usize>>> {
    spec.split(';')
        .filter(|group| !group.trim().is_empty())
        .map(|group| {
            group
                .split(',')
                .map(|col| -> Result<usize> {
                    let col: usize = col
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid column index: {:?}", col))?;
                    if col >= num_columns {
                        anyhow::bail!("Column {} out of bounds for {} columns", col, num_columns);
                    }
                    Ok(col)
                })
                .collect()
        })
        .collect()
}

/// Load a numeric CSV file. A first record that does not parse is a header.
fn load_matrix(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        let parsed: std::result::Result<Vec<f64>, _> =
            record.iter().map(|cell| cell.parse::<f64>()).collect();

        match parsed {
            Ok(row) => rows.push(row),
            Err(_) if line == 0 => info!("Skipping CSV header"),
            Err(e) => anyhow::bail!("Invalid number in CSV record {}: {}", line + 1, e),
        }
    }
    Ok(rows)
}

/// Individual compression ratio of every column
fn column_ratios(
    block: &MatrixBlock,
    num_columns: usize,
    settings: &CompressionSettings,
) -> Result<CompressionRatios> {
    let num_rows = if settings.transposed {
        block.num_columns()
    } else {
        block.num_rows()
    };

    let mut ratios = CompressionRatios::with_capacity(num_columns);
    for col in 0..num_columns {
        let bitmap = extract_bitmap(&[col], block, settings.transposed)?;
        let bitmap = if settings.lossy {
            make_bitmap_lossy(bitmap)
        } else {
            AnyBitmap::Lossless(bitmap)
        };

        let info = ExactSizeEstimator.estimate(&bitmap, num_rows, settings);
        let uncompressed = info.size_for(CompressionType::Uncompressed).unwrap_or(0);
        let ratio = if info.min_size() == 0 {
            0.0
        } else {
            uncompressed as f64 / info.min_size() as f64
        };
        ratios.insert(col, ratio);
    }
    Ok(ratios)
}

fn summarize(groups: &[Vec<usize>], compressed: &[Option<ColGroup>]) -> Vec<GroupSummary> {
    groups
        .iter()
        .zip(compressed)
        .map(|(requested, group)| match group {
            Some(group) => GroupSummary {
                col_indexes: group.col_indexes().to_vec(),
                compressed: true,
                compression_type: Some(group.compression_type()),
                num_values: group.num_values(),
                size_in_bytes: group.size_in_bytes(),
            },
            None => GroupSummary {
                col_indexes: requested.clone(),
                compressed: false,
                compression_type: None,
                num_values: 0,
                size_in_bytes: 0,
            },
        })
        .collect()
}

fn print_summary(summary: &Summary) {
    println!("\n=== MATRIX ===");
    println!(
        "{} rows x {} columns ({} storage)",
        summary.num_rows,
        summary.num_columns,
        if summary.sparse { "sparse" } else { "dense" }
    );

    println!("\n=== COLUMN GROUPS ===");
    for (idx, group) in summary.groups.iter().enumerate() {
        match group.compression_type {
            Some(compression_type) => println!(
                "  #{} {:?}: {:?}, {} distinct tuples, {} bytes",
                idx, group.col_indexes, compression_type, group.num_values, group.size_in_bytes
            ),
            None => println!("  #{} {:?}: not compressed", idx, group.col_indexes),
        }
    }

    println!("\n=== TOTAL ===");
    println!("Uncompressed: {} bytes", summary.uncompressed_bytes);
    println!("Compressed groups: {} bytes", summary.compressed_bytes);
    if summary.compressed_bytes > 0 {
        println!(
            "Ratio: {:.2}",
            summary.uncompressed_bytes as f64 / summary.compressed_bytes as f64
        );
    }
    println!("Elapsed: {} ms", summary.elapsed_ms);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut settings = match &args.config {
        Some(path) => CompressionSettings::from_yaml_file(path)?,
        None => CompressionSettings::default(),
    };
    settings.lossy |= args.lossy;
    settings.transposed |= args.transposed;

    let rows = load_matrix(&args.input)?;
    let mut block = MatrixBlock::from_rows(&rows)?;
    let (num_rows, num_columns) = (block.num_rows(), block.num_columns());
    info!(num_rows, num_columns, path = %args.input.display(), "Loaded matrix");

    if settings.transposed {
        block = block.transpose();
    }
    let sparse = block.density() < SPARSE_DENSITY_THRESHOLD;
    if sparse {
        block = block.to_sparse();
    }

    let groups = match &args.groups {
        Some(spec) => parse_groups(spec, num_columns)?,
        None => (0..num_columns).map(|col| vec![col]).collect(),
    };

    let ratios = if args.correcting {
        Some(column_ratios(&block, num_columns, &settings)?)
    } else {
        None
    };

    let k = args.parallelism.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    let start = Instant::now();
    let compressed = compress_col_groups(&block, ratios.as_ref(), &groups, &settings, k)?;
    let elapsed_ms = start.elapsed().as_millis();

    let groups = summarize(&groups, &compressed);
    let summary = Summary {
        num_rows,
        num_columns,
        sparse,
        uncompressed_bytes: num_rows * num_columns * 8,
        compressed_bytes: groups.iter().map(|group| group.size_in_bytes).sum(),
        elapsed_ms,
        groups,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(output) = &args.output {
        save_to_file(output, &compressed)?;
        info!(path = %output.display(), "Saved compressed column groups");
    }

    Ok(())
}
