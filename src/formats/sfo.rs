//! PARAM.SFO system-file parser
//!
//! PS3 titles ship a PSF parameter table (`PARAM.SFO`) next to
//! `USRDIR`; game identification reads its `TITLE` and `TITLE_ID`
//! entries. PSF is little-endian regardless of console endianness:
//! a header, a key-name table, and a data table of UTF-8 or integer
//! values.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"\0PSF";

const FMT_UTF8: u16 = 0x0204;
const FMT_UTF8_NOTERM: u16 = 0x0004;
const FMT_U32: u16 = 0x0404;

/// A parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SfoValue {
    /// UTF-8 text, terminator stripped
    Text(String),
    /// 32-bit integer
    Integer(u32),
}

/// A parsed PARAM.SFO table
#[derive(Debug)]
pub struct Sfo {
    params: HashMap<String, SfoValue>,
}

impl Sfo {
    /// Read and parse a PARAM.SFO file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Parse a PARAM.SFO table from bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::format("PARAM.SFO", format!("bad magic {magic:02X?}")));
        }

        let _version = cursor.read_u32::<LittleEndian>()?;
        let key_table_start = cursor.read_u32::<LittleEndian>()? as usize;
        let data_table_start = cursor.read_u32::<LittleEndian>()? as usize;
        let entry_count = cursor.read_u32::<LittleEndian>()? as usize;

        let mut params = HashMap::with_capacity(entry_count);
        for _ in 0..entry_count {
            let key_offset = cursor.read_u16::<LittleEndian>()? as usize;
            let data_fmt = cursor.read_u16::<LittleEndian>()?;
            let data_len = cursor.read_u32::<LittleEndian>()? as usize;
            let _data_max_len = cursor.read_u32::<LittleEndian>()?;
            let data_offset = cursor.read_u32::<LittleEndian>()? as usize;

            let key = read_key(bytes, key_table_start + key_offset)?;
            let data_start = data_table_start + data_offset;
            let data = bytes
                .get(data_start..data_start + data_len)
                .ok_or_else(|| Error::format("PARAM.SFO", format!("data out of bounds for {key}")))?;

            let value = match data_fmt {
                FMT_UTF8 | FMT_UTF8_NOTERM => {
                    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                    SfoValue::Text(String::from_utf8_lossy(&data[..end]).into_owned())
                }
                FMT_U32 => {
                    let mut data_cursor = Cursor::new(data);
                    SfoValue::Integer(data_cursor.read_u32::<LittleEndian>()?)
                }
                other => {
                    return Err(Error::format(
                        "PARAM.SFO",
                        format!("unknown data format {other:#06x} for {key}"),
                    ))
                }
            };

            params.insert(key, value);
        }

        Ok(Self { params })
    }

    /// Text value of a parameter, if present and textual
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(SfoValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Raw value of a parameter
    pub fn get_value(&self, key: &str) -> Option<&SfoValue> {
        self.params.get(key)
    }
}

fn read_key(bytes: &[u8], offset: usize) -> Result<String> {
    let slice = bytes
        .get(offset..)
        .ok_or_else(|| Error::format("PARAM.SFO", format!("key offset {offset:#x} out of bounds")))?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::format("PARAM.SFO", "unterminated key string"))?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}
