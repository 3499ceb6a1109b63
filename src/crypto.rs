//! SDAT script decryption
//!
//! PS3 installs ship the script binder pair wrapped in SDAT secure
//! data (`script.bhd.sdat`, `script.bdt.sdat`). An SDAT file is an
//! NPD envelope over AES-128-CBC content keyed with a fixed static
//! key and a zero IV. The gate in [`maybe_decrypt_script`] decides
//! per file whether that unwrapping must run before the binder codec
//! can parse it.

use std::fs;
use std::path::{Path, PathBuf};

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};
use crate::platform::PlatformType;
use crate::report::Reporter;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// File extension marking PS3-encrypted content
pub const SDAT_EXTENSION: &str = "sdat";

/// NPD envelope magic
const NPD_MAGIC: &[u8; 4] = b"NPD\0";

/// Content starts after the NPD + EDAT headers
const SDAT_DATA_OFFSET: usize = 0x100;

/// Plain-content length field inside the EDAT header
const SDAT_LEN_OFFSET: usize = 0x88;

/// Static SDAT content key
const SDAT_KEY: [u8; 16] = [
    0x0D, 0x65, 0x5E, 0xF8, 0xE6, 0x74, 0xA9, 0x8A,
    0xB8, 0x50, 0x5C, 0xFA, 0x7D, 0x01, 0x29, 0x33,
];

/// Whether `bytes` carry the NPD envelope magic
pub fn is_sdat(bytes: &[u8]) -> bool {
    bytes.len() >= SDAT_DATA_OFFSET && bytes.starts_with(NPD_MAGIC)
}

/// Unwrap SDAT content
///
/// # Arguments
/// * `bytes` - A complete SDAT file, envelope included
///
/// # Returns
/// The decrypted content, truncated to the plain length the envelope
/// declares
pub fn decrypt_sdat(bytes: &[u8]) -> Result<Vec<u8>> {
    if !is_sdat(bytes) {
        return Err(Error::Decryption("missing NPD envelope".to_string()));
    }

    let plain_len = BigEndian::read_u64(&bytes[SDAT_LEN_OFFSET..SDAT_LEN_OFFSET + 8]) as usize;
    let payload = &bytes[SDAT_DATA_OFFSET..];
    if !payload.len().is_multiple_of(16) {
        return Err(Error::Decryption(format!(
            "payload length {} is not a multiple of 16",
            payload.len()
        )));
    }
    if plain_len > payload.len() {
        return Err(Error::Decryption(format!(
            "declared length {plain_len} exceeds payload length {}",
            payload.len()
        )));
    }

    // Zero IV, zero padding, same shape as every other fixed-key
    // content container on the console
    let iv = [0u8; 16];
    let cipher = Aes128CbcDec::new(&SDAT_KEY.into(), &iv.into());

    let mut buffer = payload.to_vec();
    cipher
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|e| Error::Decryption(format!("AES decryption failed: {e:?}")))?;

    buffer.truncate(plain_len);
    Ok(buffer)
}

/// Decryption gate for script files
///
/// When `path` carries the SDAT extension and its contents pass the
/// envelope check, the decrypted bytes are written to the sibling
/// path with the extension stripped and that path is returned.
/// Otherwise `path` is returned unchanged. Triggering on a non-PS3
/// platform warns about the likely misconfiguration but proceeds:
/// the bytes decide, not the platform tag.
pub fn maybe_decrypt_script(
    path: &Path,
    platform: PlatformType,
    reporter: &mut Reporter,
) -> Result<PathBuf> {
    let is_marked = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SDAT_EXTENSION));
    if !is_marked {
        return Ok(path.to_path_buf());
    }

    let bytes = fs::read(path)?;
    if !is_sdat(&bytes) {
        return Ok(path.to_path_buf());
    }

    if platform != PlatformType::PS3 {
        reporter.warn(&format!(
            "{} is PS3 SDAT content but the resolved platform is {platform}, decrypting anyway",
            path.display()
        ));
    }

    let decrypted = decrypt_sdat(&bytes)?;
    let out_path = path.with_extension("");
    fs::write(&out_path, decrypted)?;
    Ok(out_path)
}

#[cfg(test)]
pub(crate) mod test_build {
    //! Synthetic SDAT files for tests

    use aes::cipher::{block_padding::ZeroPadding, BlockEncryptMut, KeyIvInit};
    use byteorder::{BigEndian, ByteOrder};

    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

    /// Wrap `plain` in a minimal SDAT envelope
    pub fn build(plain: &[u8]) -> Vec<u8> {
        let padded_len = plain.len().div_ceil(16).max(1) * 16;
        let mut payload = vec![0u8; padded_len];
        payload[..plain.len()].copy_from_slice(plain);

        let iv = [0u8; 16];
        let cipher = Aes128CbcEnc::new(&super::SDAT_KEY.into(), &iv.into());
        let encrypted = cipher
            .encrypt_padded_mut::<ZeroPadding>(&mut payload, padded_len)
            .expect("buffer sized to padded length")
            .to_vec();

        let mut out = vec![0u8; super::SDAT_DATA_OFFSET];
        out[..4].copy_from_slice(super::NPD_MAGIC);
        BigEndian::write_u64(
            &mut out[super::SDAT_LEN_OFFSET..super::SDAT_LEN_OFFSET + 8],
            plain.len() as u64,
        );
        out.extend_from_slice(&encrypted);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdat_round_trip() {
        let plain = b"function think() return end";
        let sdat = test_build::build(plain);
        assert!(is_sdat(&sdat));
        assert_eq!(decrypt_sdat(&sdat).unwrap(), plain);
    }

    #[test]
    fn test_not_sdat_rejected() {
        assert!(!is_sdat(b"BHF3 short"));
        assert!(decrypt_sdat(b"BHF3 short").is_err());
    }

    #[test]
    fn test_gate_strips_extension_and_decrypts() {
        let dir = tempfile::tempdir().unwrap();
        let sdat_path = dir.path().join("script.bhd.sdat");
        fs::write(&sdat_path, test_build::build(b"header bytes")).unwrap();

        let mut reporter = Reporter::new();
        let out = maybe_decrypt_script(&sdat_path, PlatformType::PS3, &mut reporter).unwrap();
        assert_eq!(out, dir.path().join("script.bhd"));
        assert_eq!(fs::read(&out).unwrap(), b"header bytes");
        // Original envelope is left in place
        assert!(sdat_path.exists());
    }

    #[test]
    fn test_gate_passes_through_unmarked_and_unwrapped() {
        let dir = tempfile::tempdir().unwrap();

        let plain_path = dir.path().join("script.bhd");
        fs::write(&plain_path, b"BHF3").unwrap();
        let mut reporter = Reporter::new();
        let out = maybe_decrypt_script(&plain_path, PlatformType::PS3, &mut reporter).unwrap();
        assert_eq!(out, plain_path);

        // Marked extension but no envelope: returned unchanged
        let fake_path = dir.path().join("script.bdt.sdat");
        fs::write(&fake_path, b"not an envelope").unwrap();
        let out = maybe_decrypt_script(&fake_path, PlatformType::PS3, &mut reporter).unwrap();
        assert_eq!(out, fake_path);
    }

    #[test]
    fn test_gate_warns_but_proceeds_on_wrong_platform() {
        let dir = tempfile::tempdir().unwrap();
        let sdat_path = dir.path().join("script.bdt.sdat");
        fs::write(&sdat_path, test_build::build(b"data bytes")).unwrap();

        let mut reporter = Reporter::new();
        let out = maybe_decrypt_script(&sdat_path, PlatformType::Xbox360, &mut reporter).unwrap();
        assert_eq!(out, dir.path().join("script.bdt"));
        assert_eq!(fs::read(&out).unwrap(), b"data bytes");
    }
}
