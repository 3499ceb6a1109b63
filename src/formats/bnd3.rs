//! BND3 binder format
//!
//! BND3 is the engine's general-purpose container: a named, ordered
//! list of files with per-entry ids and flags. Boot and mission
//! binders ship in this format, and repacked map resources must be
//! written back in it byte-for-byte deterministically or the engine
//! rejects them.
//!
//! ## Layout
//!
//! - 4-byte magic `BND3`, 8-byte padded ASCII version tag
//! - format byte (feature bitmask), big-endian byte, bit-big-endian
//!   byte, one pad byte
//! - entry count and entry-headers-end offset
//! - per entry: raw flags byte (3 pad bytes), data size, data offset,
//!   id (when [`FORMAT_IDS`]), name offset (when [`FORMAT_NAMES`]),
//!   uncompressed size (when [`FORMAT_COMPRESSION`])
//! - null-terminated name table, then 16-byte-aligned data region

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"BND3";

/// Entry table carries ids
pub const FORMAT_IDS: u8 = 0x02;
/// Entry table carries name offsets
pub const FORMAT_NAMES: u8 = 0x04;
/// Entry table carries an uncompressed-size column
pub const FORMAT_COMPRESSION: u8 = 0x20;

/// Format bitmask the engine expects on repacked map binders
pub const FORMAT_ENGINE: u8 = FORMAT_IDS | FORMAT_NAMES | FORMAT_COMPRESSION;

/// Per-entry flag assigned on repack
pub const ENTRY_FLAG_DEFAULT: u8 = 0x40;

/// Version tag the engine expects on repacked map binders
pub const VERSION_ENGINE: &str = "JP100";

/// A single file inside a binder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderEntry {
    /// Relative path within the container, as stored
    pub name: String,
    /// File contents
    pub bytes: Vec<u8>,
    /// Sequential id; becomes the on-disk id on re-pack
    pub id: i32,
    /// Raw flags byte
    pub flags: u8,
}

/// An in-memory BND3 container
///
/// Entry order is insertion order and is semantically meaningful: it
/// becomes the id assignment when [`Binder::finalize_for_engine`]
/// runs before a write.
#[derive(Debug, Clone)]
pub struct Binder {
    /// Padded ASCII version tag, at most 8 bytes
    pub version: String,
    /// Feature bitmask, see the `FORMAT_*` constants
    pub format: u8,
    /// Multi-byte fields are big-endian
    pub big_endian: bool,
    /// Flag bits are stored most-significant-first
    pub bit_big_endian: bool,
    /// Ordered entries
    pub entries: Vec<BinderEntry>,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    /// Empty binder with engine-neutral metadata
    pub fn new() -> Self {
        Self {
            version: VERSION_ENGINE.to_string(),
            format: FORMAT_ENGINE,
            big_endian: true,
            bit_big_endian: true,
            entries: Vec::new(),
        }
    }

    /// Whether the file at `path` starts with the BND3 magic
    pub fn is<P: AsRef<Path>>(path: P) -> bool {
        let mut magic = [0u8; 4];
        File::open(path)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map(|_| &magic == MAGIC)
            .unwrap_or(false)
    }

    /// Read a binder from a file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parse a binder from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::format("BND3", format!("bad magic {magic:02X?}")));
        }

        let mut version_raw = [0u8; 8];
        cursor.read_exact(&mut version_raw)?;
        let version = ascii_tag(&version_raw);

        let format = cursor.read_u8()?;
        let big_endian = cursor.read_u8()? != 0;
        let bit_big_endian = cursor.read_u8()? != 0;
        let _pad = cursor.read_u8()?;

        let count = read_u32(&mut cursor, big_endian)? as usize;
        let _headers_end = read_u32(&mut cursor, big_endian)?;
        let _unk18 = read_u32(&mut cursor, big_endian)?;
        let _unk1c = read_u32(&mut cursor, big_endian)?;

        let mut raw_entries = Vec::with_capacity(count);
        for _ in 0..count {
            let flags = cursor.read_u8()?;
            let mut pad = [0u8; 3];
            cursor.read_exact(&mut pad)?;
            let size = read_u32(&mut cursor, big_endian)?;
            let data_offset = read_u32(&mut cursor, big_endian)?;
            let id = if format & FORMAT_IDS != 0 {
                read_u32(&mut cursor, big_endian)? as i32
            } else {
                0
            };
            let name_offset = if format & FORMAT_NAMES != 0 {
                read_u32(&mut cursor, big_endian)?
            } else {
                0
            };
            if format & FORMAT_COMPRESSION != 0 {
                let _uncompressed = read_u32(&mut cursor, big_endian)?;
            }
            raw_entries.push((flags, size, data_offset, id, name_offset));
        }

        let mut entries = Vec::with_capacity(count);
        for (flags, size, data_offset, id, name_offset) in raw_entries {
            let name = if format & FORMAT_NAMES != 0 {
                read_cstring(bytes, name_offset as usize, "BND3")?
            } else {
                String::new()
            };

            let start = data_offset as usize;
            let end = start
                .checked_add(size as usize)
                .filter(|&e| e <= bytes.len())
                .ok_or_else(|| {
                    Error::format("BND3", format!("entry data out of bounds for {name}"))
                })?;

            entries.push(BinderEntry {
                name,
                bytes: bytes[start..end].to_vec(),
                id,
                flags,
            });
        }

        Ok(Self {
            version,
            format,
            big_endian,
            bit_big_endian,
            entries,
        })
    }

    /// Stamp the metadata and id/flag assignment the engine expects
    ///
    /// Ids are assigned `0..N` in entry order; every entry gets
    /// [`ENTRY_FLAG_DEFAULT`]; container metadata becomes the fixed
    /// big-endian uncompressed `JP100` form.
    pub fn finalize_for_engine(&mut self) {
        self.version = VERSION_ENGINE.to_string();
        self.format = FORMAT_ENGINE;
        self.big_endian = true;
        self.bit_big_endian = true;

        for (id, entry) in self.entries.iter_mut().enumerate() {
            entry.id = id as i32;
            entry.flags = ENTRY_FLAG_DEFAULT;
        }
    }

    /// Write the binder to a file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Encode the binder
    ///
    /// The encoding is deterministic: identical entries and metadata
    /// produce identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let entry_size = self.entry_header_size();
        let headers_end = 0x20 + entry_size * self.entries.len();

        // Name table layout
        let mut name_offsets = Vec::with_capacity(self.entries.len());
        let mut name_table = Vec::new();
        for entry in &self.entries {
            name_offsets.push((headers_end + name_table.len()) as u32);
            name_table.extend_from_slice(entry.name.as_bytes());
            name_table.push(0);
        }

        // Data region layout, each entry aligned to 16
        let mut data_offsets = Vec::with_capacity(self.entries.len());
        let mut offset = align16(headers_end + name_table.len());
        for entry in &self.entries {
            data_offsets.push(offset as u32);
            offset = align16(offset + entry.bytes.len());
        }

        let mut out = Vec::with_capacity(offset);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&padded_tag(&self.version));
        out.push(self.format);
        out.push(self.big_endian as u8);
        out.push(self.bit_big_endian as u8);
        out.push(0);
        write_u32(&mut out, self.entries.len() as u32, self.big_endian);
        write_u32(&mut out, headers_end as u32, self.big_endian);
        write_u32(&mut out, 0, self.big_endian);
        write_u32(&mut out, 0, self.big_endian);

        for (i, entry) in self.entries.iter().enumerate() {
            out.push(entry.flags);
            out.extend_from_slice(&[0, 0, 0]);
            write_u32(&mut out, entry.bytes.len() as u32, self.big_endian);
            write_u32(&mut out, data_offsets[i], self.big_endian);
            if self.format & FORMAT_IDS != 0 {
                write_u32(&mut out, entry.id as u32, self.big_endian);
            }
            if self.format & FORMAT_NAMES != 0 {
                write_u32(&mut out, name_offsets[i], self.big_endian);
            }
            if self.format & FORMAT_COMPRESSION != 0 {
                // Stored uncompressed, so both size columns agree
                write_u32(&mut out, entry.bytes.len() as u32, self.big_endian);
            }
        }

        out.extend_from_slice(&name_table);
        for (i, entry) in self.entries.iter().enumerate() {
            pad_to(&mut out, data_offsets[i] as usize);
            out.extend_from_slice(&entry.bytes);
        }
        pad_to(&mut out, offset);

        Ok(out)
    }

    fn entry_header_size(&self) -> usize {
        let mut size = 4 + 4 + 4;
        if self.format & FORMAT_IDS != 0 {
            size += 4;
        }
        if self.format & FORMAT_NAMES != 0 {
            size += 4;
        }
        if self.format & FORMAT_COMPRESSION != 0 {
            size += 4;
        }
        size
    }
}

pub(crate) fn read_u32<R: Read>(reader: &mut R, big_endian: bool) -> Result<u32> {
    let value = if big_endian {
        reader.read_u32::<BigEndian>()?
    } else {
        reader.read_u32::<LittleEndian>()?
    };
    Ok(value)
}

pub(crate) fn read_u64<R: Read>(reader: &mut R, big_endian: bool) -> Result<u64> {
    let value = if big_endian {
        reader.read_u64::<BigEndian>()?
    } else {
        reader.read_u64::<LittleEndian>()?
    };
    Ok(value)
}

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32, big_endian: bool) {
    let bytes = if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    };
    out.extend_from_slice(&bytes);
}

pub(crate) fn ascii_tag(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

pub(crate) fn padded_tag(tag: &str) -> [u8; 8] {
    let mut out = [0u8; 8];
    let bytes = tag.as_bytes();
    let len = bytes.len().min(8);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

pub(crate) fn read_cstring(bytes: &[u8], offset: usize, format: &'static str) -> Result<String> {
    let slice = bytes
        .get(offset..)
        .ok_or_else(|| Error::format(format, format!("name offset {offset:#x} out of bounds")))?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::format(format, "unterminated name string"))?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

fn align16(value: usize) -> usize {
    (value + 0xF) & !0xF
}

fn pad_to(out: &mut Vec<u8>, target: usize) {
    debug_assert!(out.len() <= target);
    out.resize(target, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_binder() -> Binder {
        let mut binder = Binder::new();
        binder.entries.push(BinderEntry {
            name: "model\\m001.flv".to_string(),
            bytes: vec![1, 2, 3, 4, 5],
            id: 0,
            flags: 0,
        });
        binder.entries.push(BinderEntry {
            name: "model\\m001.hmd".to_string(),
            bytes: vec![0xAA; 33],
            id: 0,
            flags: 0,
        });
        binder.finalize_for_engine();
        binder
    }

    #[test]
    fn test_round_trip() {
        let binder = sample_binder();
        let bytes = binder.to_bytes().unwrap();
        let parsed = Binder::parse(&bytes).unwrap();

        assert_eq!(parsed.version, VERSION_ENGINE);
        assert_eq!(parsed.format, FORMAT_ENGINE);
        assert!(parsed.big_endian);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].name, "model\\m001.flv");
        assert_eq!(parsed.entries[0].bytes, vec![1, 2, 3, 4, 5]);
        assert_eq!(parsed.entries[0].id, 0);
        assert_eq!(parsed.entries[1].id, 1);
        assert_eq!(parsed.entries[1].flags, ENTRY_FLAG_DEFAULT);
    }

    #[test]
    fn test_write_is_deterministic() {
        let binder = sample_binder();
        assert_eq!(binder.to_bytes().unwrap(), binder.to_bytes().unwrap());
    }

    #[test]
    fn test_bad_magic_is_format_error() {
        let err = Binder::parse(b"ZIP9not a binder").unwrap_err();
        assert!(matches!(err, Error::Format { format: "BND3", .. }));
    }

    #[test]
    fn test_is_detects_magic() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.bnd");
        let bad = dir.path().join("b.bnd");
        std::fs::write(&good, sample_binder().to_bytes().unwrap()).unwrap();
        std::fs::write(&bad, b"plain text").unwrap();

        assert!(Binder::is(&good));
        assert!(!Binder::is(&bad));
        assert!(!Binder::is(dir.path().join("missing.bnd")));
    }
}
