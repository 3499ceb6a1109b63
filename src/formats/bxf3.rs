//! BHF3/BDF3 split binder format
//!
//! Scripts ship as a header/data file pair: the BHF3 header carries
//! the entry table and names, the BDF3 data file carries nothing but
//! blobs at the offsets the header points to. Only reading is needed;
//! the tool never re-packs scripts.

use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::ReadBytesExt;

use crate::error::{Error, Result};
use crate::formats::bnd3::{ascii_tag, read_cstring, read_u32, Binder, BinderEntry, FORMAT_IDS, FORMAT_NAMES};

const HEADER_MAGIC: &[u8; 4] = b"BHF3";
const DATA_MAGIC: &[u8; 4] = b"BDF3";

/// Whether the file at `path` starts with the BHF3 header magic
pub fn is_header<P: AsRef<Path>>(path: P) -> bool {
    starts_with_magic(path, HEADER_MAGIC)
}

/// Whether the file at `path` starts with the BDF3 data magic
pub fn is_data<P: AsRef<Path>>(path: P) -> bool {
    starts_with_magic(path, DATA_MAGIC)
}

fn starts_with_magic<P: AsRef<Path>>(path: P, magic: &[u8; 4]) -> bool {
    let mut buf = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut buf))
        .map(|_| &buf == magic)
        .unwrap_or(false)
}

/// Read a split binder from its header and data files
///
/// Entry ids and names come from the header; bytes are sliced out of
/// the data file. The result is an ordinary in-memory [`Binder`].
pub fn read<P: AsRef<Path>>(header_path: P, data_path: P) -> Result<Binder> {
    let header_bytes = fs::read(&header_path)?;
    let data_bytes = fs::read(&data_path)?;

    if !data_bytes.starts_with(DATA_MAGIC) {
        return Err(Error::format("BDF3", "bad data-file magic"));
    }

    parse_header(&header_bytes, &data_bytes)
}

fn parse_header(header: &[u8], data: &[u8]) -> Result<Binder> {
    let mut cursor = Cursor::new(header);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != HEADER_MAGIC {
        return Err(Error::format("BHF3", format!("bad magic {magic:02X?}")));
    }

    let mut version_raw = [0u8; 8];
    cursor.read_exact(&mut version_raw)?;
    let version = ascii_tag(&version_raw);

    let format = cursor.read_u8()?;
    let big_endian = cursor.read_u8()? != 0;
    let bit_big_endian = cursor.read_u8()? != 0;
    let _pad = cursor.read_u8()?;

    let count = read_u32(&mut cursor, big_endian)? as usize;
    let _unk14 = read_u32(&mut cursor, big_endian)?;
    let _unk18 = read_u32(&mut cursor, big_endian)?;
    let _unk1c = read_u32(&mut cursor, big_endian)?;

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let flags = cursor.read_u8()?;
        let mut pad = [0u8; 3];
        cursor.read_exact(&mut pad)?;
        let size = read_u32(&mut cursor, big_endian)? as usize;
        let data_offset = read_u32(&mut cursor, big_endian)? as usize;
        let id = if format & FORMAT_IDS != 0 {
            read_u32(&mut cursor, big_endian)? as i32
        } else {
            0
        };
        let name = if format & FORMAT_NAMES != 0 {
            let name_offset = read_u32(&mut cursor, big_endian)? as usize;
            read_cstring(header, name_offset, "BHF3")?
        } else {
            String::new()
        };

        let end = data_offset
            .checked_add(size)
            .filter(|&e| e <= data.len())
            .ok_or_else(|| Error::format("BDF3", format!("entry data out of bounds for {name}")))?;

        entries.push(BinderEntry {
            name,
            bytes: data[data_offset..end].to_vec(),
            id,
            flags,
        });
    }

    Ok(Binder {
        version,
        format,
        big_endian,
        bit_big_endian,
        entries,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_pair() {
        let dir = tempfile::tempdir().unwrap();
        let header_path = dir.path().join("script.bhd");
        let data_path = dir.path().join("script.bdt");

        let (header, data) = test_build::build(&[
            ("ai\\logic.lc", b"lua one"),
            ("m01scene.lc", b"lua two"),
        ]);
        fs::write(&header_path, header).unwrap();
        fs::write(&data_path, data).unwrap();

        assert!(is_header(&header_path));
        assert!(!is_header(&data_path));
        assert!(is_data(&data_path));

        let binder = read(&header_path, &data_path).unwrap();
        assert_eq!(binder.entries.len(), 2);
        assert_eq!(binder.entries[0].name, "ai\\logic.lc");
        assert_eq!(binder.entries[0].bytes, b"lua one");
        assert_eq!(binder.entries[1].name, "m01scene.lc");
        assert_eq!(binder.entries[1].id, 1);
    }

    #[test]
    fn test_wrong_magic_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let header_path = dir.path().join("script.bhd");
        let data_path = dir.path().join("script.bdt");
        fs::write(&header_path, b"BND3 not a split header").unwrap();
        fs::write(&data_path, b"BDF3\0\0\0\0\0\0\0\0\0\0\0\0").unwrap();

        let err = read(&header_path, &data_path).unwrap_err();
        assert!(matches!(err, Error::Format { format: "BHF3", .. }));
    }
}
