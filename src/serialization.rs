/*
 * Copyright (c) 2025-present Dawid Pawlik
 *
 * For educational use only by employees and students of MIMUW.
 * See LICENSE file for details.
 */

//! # Persistence of compressed column groups
//!
//! The compressor itself never touches storage. This module is the thin layer
//! that writes its output, one entry per requested group (absent groups
//! included), so that runs can be compared byte for byte.
//!
//! ## Layout
//!
//! ```text
//! MAGIC (8 bytes) | header size (u32 LE) | header (bincode) | payload (zstd(bincode))
//! ```
//!
//! ```rust,no_run
//! use colcompress::serialization::load_from_file;
//! use colcompress::serialization::save_to_file;
//!
//! # fn main() -> anyhow::Result<()> {
//! let groups = load_from_file("matrix.cgroups")?;
//! save_to_file("copy.cgroups", &groups)?;
//! # Ok(())
//! # }
//! ```

use crate::colgroup::ColGroup;
use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

// File format constants
const MAGIC_BYTES: &[u8; 8] = b"COLGRP01";
const VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

/// Header preceding the compressed payload
#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    version: u32,
    group_count: u32,
    payload_size: u64,
}

/// Encode compressed groups, keeping `None` entries in place
pub fn encode_col_groups(groups: &[Option<ColGroup>]) -> Result<Vec<u8>> {
    let raw = bincode::serialize(groups).context("Failed to serialize column groups")?;
    let payload = zstd::encode_all(&raw[..], ZSTD_LEVEL).context("Failed to compress payload")?;

    let header = FileHeader {
        version: VERSION,
        group_count: u32::try_from(groups.len()).context("Too many column groups")?,
        payload_size: payload.len() as u64,
    };
    let header_bytes = bincode::serialize(&header)?;

    let mut output = Vec::with_capacity(MAGIC_BYTES.len() + 4 + header_bytes.len() + payload.len());
    output.extend_from_slice(MAGIC_BYTES);
    output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decode groups written by [`encode_col_groups`]
pub fn decode_col_groups(input: &[u8]) -> Result<Vec<Option<ColGroup>>> {
    read_col_groups(&mut &input[..])
}

fn read_col_groups<R: Read>(reader: &mut R) -> Result<Vec<Option<ColGroup>>> {
    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .context("Failed to read magic bytes")?;
    if &magic != MAGIC_BYTES {
        anyhow::bail!("Invalid file format: magic bytes mismatch");
    }

    let mut header_size_bytes = [0u8; 4];
    reader.read_exact(&mut header_size_bytes)?;
    let header_size = u32::from_le_bytes(header_size_bytes);

    let header_bytes = read_section(reader, header_size as u64).context("Truncated file header")?;
    let header: FileHeader =
        bincode::deserialize(&header_bytes).context("Failed to deserialize file header")?;

    if header.version != VERSION {
        anyhow::bail!("Unsupported file version: {}", header.version);
    }

    let payload =
        read_section(reader, header.payload_size).context("Truncated column group payload")?;

    let raw = zstd::decode_all(&payload[..]).context("Failed to decompress payload")?;
    let groups: Vec<Option<ColGroup>> =
        bincode::deserialize(&raw).context("Failed to deserialize column groups")?;

    if groups.len() != header.group_count as usize {
        anyhow::bail!(
            "Column group count mismatch: expected {}, got {}",
            header.group_count,
            groups.len()
        );
    }
    Ok(groups)
}

/// Read exactly `size` bytes, growing the buffer only with the data present
fn read_section<R: Read>(reader: &mut R, size: u64) -> Result<Vec<u8>> {
    let mut section = Vec::new();
    reader.take(size).read_to_end(&mut section)?;
    if (section.len() as u64) != size {
        anyhow::bail!("expected {} bytes, found {}", size, section.len());
    }
    Ok(section)
}

/// Write compressed groups to `path`
pub fn save_to_file<P: AsRef<Path>>(path: P, groups: &[Option<ColGroup>]) -> Result<()> {
    let path = path.as_ref();
    let encoded = encode_col_groups(groups)?;

    let mut file = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );
    file.write_all(&encoded)?;
    file.flush()?;
    Ok(())
}

/// Read compressed groups from `path`
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Option<ColGroup>>> {
    let path = path.as_ref();
    let mut file = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
    );
    read_col_groups(&mut file)
}
