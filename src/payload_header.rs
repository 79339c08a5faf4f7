use crate::err::{PayloadError, Result};
use crate::payload_parser::ParserSettings;
use crate::utils::PayloadCursor;
use crate::utils::bytes;

use log::{trace, warn};
use serde::{Serialize, Serializer};

pub const PAYLOAD_MAGIC: &[u8; 4] = b"CrAU";

/// Payload layout without a metadata signature length field.
pub const CHROMEOS_MAJOR_PAYLOAD_VERSION: u64 = 1;
/// Payload layout carrying a metadata signature block after the manifest.
pub const BRILLO_MAJOR_PAYLOAD_VERSION: u64 = 2;

const VERSION_SIZE: usize = 8;
const MANIFEST_LEN_SIZE: usize = 8;
const METADATA_SIGNATURE_LEN_SIZE: usize = 4;

/// The fixed-width prefix of a `payload.bin` container.
///
/// ```text
/// offset  size  field
///      0     4  magic "CrAU"
///      4     8  major version            (big-endian)
///     12     8  manifest length          (big-endian)
///     20     4  metadata signature length (big-endian, version 2 only)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadHeader {
    #[serde(serialize_with = "serialize_magic")]
    pub magic: [u8; 4],
    pub version: u64,
    pub manifest_len: u64,
    pub metadata_signature_len: Option<u32>,
}

fn serialize_magic<S: Serializer>(
    magic: &[u8; 4],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(magic))
}

impl PayloadHeader {
    /// Reads the header, leaving `cursor` at the first byte of the manifest.
    ///
    /// Fields are consumed strictly in order and parsing stops at the first failure: a bad magic
    /// means nothing after it is read.
    pub fn from_cursor(cursor: &mut PayloadCursor<'_>, settings: &ParserSettings) -> Result<Self> {
        let magic_offset = cursor.pos();
        let tag = cursor.ascii_tag(PAYLOAD_MAGIC.len(), "payload magic")?;
        if tag.as_bytes() != PAYLOAD_MAGIC {
            let found = bytes::read_array::<4>(cursor.buf(), magic_offset).unwrap_or_default();
            return Err(PayloadError::InvalidMagic { found });
        }
        trace!("payload magic ok at offset {magic_offset}");

        let version = cursor.read_uint(VERSION_SIZE, "payload major version")?;
        trace!("payload major version: {version}");
        match version {
            CHROMEOS_MAJOR_PAYLOAD_VERSION | BRILLO_MAJOR_PAYLOAD_VERSION => {}
            other if settings.should_allow_unsupported_versions() => {
                warn!(
                    "unsupported payload major version {other}, continuing without a metadata signature"
                );
            }
            other => return Err(PayloadError::UnsupportedVersion(other)),
        }

        let manifest_len = cursor.read_uint(MANIFEST_LEN_SIZE, "manifest length")?;
        trace!("manifest length: {manifest_len}");

        let metadata_signature_len = if version == BRILLO_MAJOR_PAYLOAD_VERSION {
            let len =
                cursor.read_uint(METADATA_SIGNATURE_LEN_SIZE, "metadata signature length")?;
            trace!("metadata signature length: {len}");
            // 4-byte read, always fits.
            Some(len as u32)
        } else {
            None
        };

        Ok(PayloadHeader {
            magic: *PAYLOAD_MAGIC,
            version,
            manifest_len,
            metadata_signature_len,
        })
    }

    /// Encoded size of the header itself (20 bytes for version 1, 24 for version 2).
    pub fn encoded_len(&self) -> usize {
        let base = PAYLOAD_MAGIC.len() + VERSION_SIZE + MANIFEST_LEN_SIZE;
        match self.metadata_signature_len {
            Some(_) => base + METADATA_SIGNATURE_LEN_SIZE,
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;

    fn header_bytes(
        magic: &[u8; 4],
        version: u64,
        manifest_len: u64,
        sig_len: Option<u32>,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(magic);
        buf.extend_from_slice(&version.to_be_bytes());
        buf.extend_from_slice(&manifest_len.to_be_bytes());
        if let Some(len) = sig_len {
            buf.extend_from_slice(&len.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_parses_version_1_header() {
        ensure_env_logger_initialized();
        let mut buf = header_bytes(PAYLOAD_MAGIC, 1, 7, None);
        buf.extend_from_slice(b"MANIFEST");

        let mut cursor = PayloadCursor::new(&buf);
        let header = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap();

        assert_eq!(
            header,
            PayloadHeader {
                magic: *b"CrAU",
                version: 1,
                manifest_len: 7,
                metadata_signature_len: None,
            }
        );
        assert_eq!(cursor.pos(), 20);
        assert_eq!(header.encoded_len(), 20);
    }

    #[test]
    fn test_parses_version_2_header() {
        ensure_env_logger_initialized();
        let buf = header_bytes(PAYLOAD_MAGIC, 2, 0x0102_0304_0506, Some(0x0A0B));

        let mut cursor = PayloadCursor::new(&buf);
        let header = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap();

        assert_eq!(header.version, 2);
        assert_eq!(header.manifest_len, 0x0102_0304_0506);
        assert_eq!(header.metadata_signature_len, Some(0x0A0B));
        assert_eq!(cursor.pos(), 24);
        assert_eq!(header.encoded_len(), 24);
    }

    #[test]
    fn test_invalid_magic_stops_before_version() {
        let buf = header_bytes(b"PK\x03\x04", 2, 5, Some(3));

        let mut cursor = PayloadCursor::new(&buf);
        let err = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap_err();

        assert!(matches!(err, PayloadError::InvalidMagic { found } if &found == b"PK\x03\x04"));
        assert_eq!(cursor.pos(), 4);
    }

    #[test]
    fn test_invalid_utf8_magic_is_rejected() {
        let buf = header_bytes(&[0xFF, 0xFE, 0x00, 0x41], 1, 0, None);

        let mut cursor = PayloadCursor::new(&buf);
        let err = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap_err();

        assert!(matches!(
            err,
            PayloadError::InvalidMagic { found } if found == [0xFF, 0xFE, 0x00, 0x41]
        ));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let buf = header_bytes(PAYLOAD_MAGIC, 3, 5, None);

        let mut cursor = PayloadCursor::new(&buf);
        let err = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap_err();

        assert!(matches!(err, PayloadError::UnsupportedVersion(3)));
        assert_eq!(cursor.pos(), 12);
    }

    #[test]
    fn test_unsupported_version_can_be_tolerated() {
        ensure_env_logger_initialized();
        let buf = header_bytes(PAYLOAD_MAGIC, 3, 5, None);
        let settings = ParserSettings::new().allow_unsupported_versions(true);

        let mut cursor = PayloadCursor::new(&buf);
        let header = PayloadHeader::from_cursor(&mut cursor, &settings).unwrap();

        assert_eq!(header.version, 3);
        assert_eq!(header.metadata_signature_len, None);
        assert_eq!(cursor.pos(), 20);
    }

    #[test]
    fn test_version_2_without_signature_len_is_truncated() {
        let buf = header_bytes(PAYLOAD_MAGIC, 2, 5, None);

        let mut cursor = PayloadCursor::new(&buf);
        let err = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default()).unwrap_err();

        assert!(matches!(
            err,
            PayloadError::Truncated {
                what: "metadata signature length",
                offset: 20,
                need: 4,
                have: 0
            }
        ));
        assert_eq!(cursor.pos(), 20);
    }

    #[test]
    fn test_every_short_prefix_is_truncated() {
        let buf = header_bytes(PAYLOAD_MAGIC, 2, 5, Some(3));

        for len in 0..buf.len() {
            let mut cursor = PayloadCursor::new(&buf[..len]);
            let err = PayloadHeader::from_cursor(&mut cursor, &ParserSettings::default())
                .expect_err("short header must fail");
            assert!(
                matches!(err, PayloadError::Truncated { .. }),
                "prefix of {len} bytes gave {err:?}"
            );
            assert!(cursor.pos() <= len);
        }
    }

    #[test]
    fn test_header_serializes_magic_as_text() {
        let header = PayloadHeader {
            magic: *PAYLOAD_MAGIC,
            version: 2,
            manifest_len: 5,
            metadata_signature_len: Some(3),
        };
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "magic": "CrAU",
                "version": 2,
                "manifest_len": 5,
                "metadata_signature_len": 3
            })
        );
    }
}
