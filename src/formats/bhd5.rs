//! BHD5 main-archive index and bulk extraction
//!
//! The packed install keeps almost every game file inside one data
//! blob (`dvdbnd.bdt`) indexed by a BHD5 header of
//! `(path hash, size, offset)` records grouped into hash buckets. The
//! header carries no names; a [`HashDictionary`] turns hashes back
//! into paths. Extraction streams record-by-record from the data file
//! so the install never has to fit in memory.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use byteorder::ReadBytesExt;

use crate::dict::HashDictionary;
use crate::error::{Error, Result};
use crate::formats::bnd3::{read_u32, read_u64};
use crate::paths::normalize_entry_name;

const MAGIC: &[u8; 4] = b"BHD5";

/// One record of the archive index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bhd5Record {
    /// 32-bit path hash, see [`crate::dict::path_hash`]
    pub hash: u32,
    /// Payload length in the data file
    pub size: u32,
    /// Absolute payload offset in the data file
    pub offset: u64,
}

/// A parsed BHD5 header
#[derive(Debug)]
pub struct Bhd5 {
    /// Records in on-disk bucket order
    pub records: Vec<Bhd5Record>,
}

impl Bhd5 {
    /// Whether the file at `path` starts with the BHD5 magic
    pub fn is<P: AsRef<Path>>(path: P) -> bool {
        let mut magic = [0u8; 4];
        File::open(path)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map(|_| &magic == MAGIC)
            .unwrap_or(false)
    }

    /// Read and parse a header file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parse a header from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::format("BHD5", format!("bad magic {magic:02X?}")));
        }

        let big_endian = cursor.read_u8()? != 0;
        let mut pad = [0u8; 3];
        cursor.read_exact(&mut pad)?;
        let version = read_u32(&mut cursor, big_endian)?;
        if version != 1 {
            return Err(Error::format("BHD5", format!("unsupported version {version}")));
        }
        let _header_len = read_u32(&mut cursor, big_endian)?;
        let bucket_count = read_u32(&mut cursor, big_endian)? as usize;
        let buckets_offset = read_u32(&mut cursor, big_endian)? as u64;

        cursor.seek(SeekFrom::Start(buckets_offset))?;
        let mut buckets = Vec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            let record_count = read_u32(&mut cursor, big_endian)? as usize;
            let records_offset = read_u32(&mut cursor, big_endian)? as u64;
            buckets.push((record_count, records_offset));
        }

        let mut records = Vec::new();
        for (record_count, records_offset) in buckets {
            cursor.seek(SeekFrom::Start(records_offset))?;
            for _ in 0..record_count {
                let hash = read_u32(&mut cursor, big_endian)?;
                let size = read_u32(&mut cursor, big_endian)?;
                let offset = read_u64(&mut cursor, big_endian)?;
                records.push(Bhd5Record { hash, size, offset });
            }
        }

        Ok(Self { records })
    }
}

/// Options for [`extract_all`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Leave destination files that already exist untouched
    pub skip_existing: bool,
    /// Drop records whose hash has no dictionary name instead of
    /// writing them under `_unknown/`
    pub skip_unknown: bool,
}

/// What a bulk extraction did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files written
    pub written: u64,
    /// Records skipped because the destination already existed
    pub skipped_existing: u64,
    /// Records without a dictionary name, written under `_unknown/`
    pub unknown_kept: u64,
    /// Records without a dictionary name, dropped by `skip_unknown`
    pub unknown_dropped: u64,
    /// Whether the cancellation flag stopped the run early
    pub cancelled: bool,
}

/// Extract every record of `bhd_path`/`bdt_path` under `dest`
///
/// Destination names come from `dict`, normalized to lowercase native
/// paths; unnamed records land in `_unknown/<hash hex>.bin` unless
/// dropped by the options. `progress` is advisory and receives the
/// completed fraction in `[0, 1]` after each record; it must not
/// affect control flow. `cancel` is checked between records; no
/// current caller raises it mid-run, so effective granularity is
/// "before the call".
pub fn extract_all(
    bhd_path: &Path,
    bdt_path: &Path,
    dict: &HashDictionary,
    dest: &Path,
    options: ExtractOptions,
    progress: &mut dyn FnMut(f64),
    cancel: &AtomicBool,
) -> Result<ExtractSummary> {
    let bhd = Bhd5::read(bhd_path)?;
    let mut data = BufReader::new(File::open(bdt_path)?);
    let mut summary = ExtractSummary::default();

    let total = bhd.records.len();
    for (index, record) in bhd.records.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            summary.cancelled = true;
            break;
        }

        let relative = match dict.name_for(record.hash) {
            Some(name) => normalize_entry_name(name, true),
            None if options.skip_unknown => {
                summary.unknown_dropped += 1;
                progress((index + 1) as f64 / total as f64);
                continue;
            }
            None => {
                summary.unknown_kept += 1;
                Path::new("_unknown").join(format!("{:08x}.bin", record.hash))
            }
        };

        let out_path = dest.join(relative);
        if options.skip_existing && out_path.exists() {
            summary.skipped_existing += 1;
            progress((index + 1) as f64 / total as f64);
            continue;
        }

        data.seek(SeekFrom::Start(record.offset))?;
        let mut bytes = vec![0u8; record.size as usize];
        data.read_exact(&mut bytes)?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &bytes)?;
        summary.written += 1;

        progress((index + 1) as f64 / total as f64);
    }

    Ok(summary)
}
