use crate::err::{PayloadError, PayloadStage, Result};
use crate::payload_header::PayloadHeader;
use crate::schema_decoder::{SchemaDecoder, UpdateMetadataDecoder};
use crate::update_metadata::{DeltaArchiveManifest, Signatures};
use crate::utils::PayloadCursor;

use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    allow_unsupported_versions: bool,
    decode_metadata_signature: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            allow_unsupported_versions: false,
            decode_metadata_signature: true,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Keep going when the header carries a major version other than 1 or 2.
    ///
    /// Such payloads are read with the version 1 layout (no metadata signature).
    pub fn allow_unsupported_versions(mut self, allow: bool) -> Self {
        self.allow_unsupported_versions = allow;
        self
    }

    /// When disabled, the metadata signature block is still framed and bounds checked, but
    /// handed to nobody.
    pub fn decode_metadata_signature(mut self, decode: bool) -> Self {
        self.decode_metadata_signature = decode;
        self
    }

    pub fn should_allow_unsupported_versions(&self) -> bool {
        self.allow_unsupported_versions
    }

    pub fn should_decode_metadata_signature(&self) -> bool {
        self.decode_metadata_signature
    }
}

/// A fully parsed payload container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPayload<M = DeltaArchiveManifest, S = Signatures> {
    pub header: PayloadHeader,
    pub manifest: M,
    pub metadata_signature: Option<S>,
    /// Offset of the first byte after the metadata signature. Operation `data_offset` values in
    /// the manifest are relative to this point.
    pub metadata_size: u64,
}

/// Parses a single payload buffer.
///
/// A parser is built for one buffer and consumed by [`PayloadParser::parse`].
pub struct PayloadParser<'a, D = UpdateMetadataDecoder> {
    data: &'a [u8],
    decoder: D,
    config: ParserSettings,
}

impl<'a> PayloadParser<'a> {
    pub fn from_buffer(data: &'a [u8]) -> Self {
        PayloadParser {
            data,
            decoder: UpdateMetadataDecoder,
            config: ParserSettings::default(),
        }
    }
}

impl<'a, D: SchemaDecoder> PayloadParser<'a, D> {
    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    pub fn with_decoder<T: SchemaDecoder>(self, decoder: T) -> PayloadParser<'a, T> {
        PayloadParser {
            data: self.data,
            decoder,
            config: self.config,
        }
    }

    pub fn parse(self) -> Result<ParsedPayload<D::Manifest, D::Signatures>> {
        let mut cursor = PayloadCursor::new(self.data);

        let header = PayloadHeader::from_cursor(&mut cursor, &self.config)?;
        debug!("payload header: {header:?}");

        let manifest_raw = take_block(&mut cursor, header.manifest_len, PayloadStage::Manifest)?;
        debug!(
            "manifest block: {} bytes at offset {}",
            manifest_raw.len(),
            cursor.pos() - manifest_raw.len()
        );
        let manifest = self
            .decoder
            .decode_manifest(manifest_raw)
            .map_err(|source| PayloadError::ManifestDecode {
                len: manifest_raw.len(),
                source,
            })?;

        let metadata_signature = match header.metadata_signature_len {
            Some(len) => {
                let signature_raw =
                    take_block(&mut cursor, u64::from(len), PayloadStage::MetadataSignature)?;
                debug!("metadata signature block: {} bytes", signature_raw.len());

                if self.config.should_decode_metadata_signature() {
                    let decoded = self.decoder.decode_signatures(signature_raw).map_err(
                        |source| PayloadError::SignatureDecode {
                            len: signature_raw.len(),
                            source,
                        },
                    )?;
                    Some(decoded)
                } else {
                    None
                }
            }
            None => None,
        };

        info!(
            "parsed payload version {} ({} bytes of metadata, {} bytes of data)",
            header.version,
            cursor.pos(),
            cursor.remaining()
        );

        Ok(ParsedPayload {
            header,
            manifest,
            metadata_signature,
            metadata_size: cursor.position(),
        })
    }
}

fn take_block<'a>(
    cursor: &mut PayloadCursor<'a>,
    len: u64,
    stage: PayloadStage,
) -> Result<&'a [u8]> {
    let too_short = || PayloadError::PayloadTooShort {
        stage,
        offset: cursor.position(),
        need: len,
        have: cursor.remaining(),
    };

    let len = usize::try_from(len).map_err(|_| too_short())?;
    match stage {
        PayloadStage::Manifest => cursor.take_bytes(len, "manifest"),
        PayloadStage::MetadataSignature => cursor.take_bytes(len, "metadata signature"),
    }
    .map_err(|e| e.into_stage(stage))
}

/// Parses `data` as a `payload.bin` container with the default settings and decoder.
pub fn parse_payload(data: &[u8]) -> Result<ParsedPayload> {
    PayloadParser::from_buffer(data).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;
    use crate::err::DecodeError;
    use std::cell::RefCell;

    /// Records every slice it is handed and returns the slice length.
    #[derive(Default)]
    struct RecordingDecoder {
        manifests: RefCell<Vec<Vec<u8>>>,
        signatures: RefCell<Vec<Vec<u8>>>,
    }

    impl SchemaDecoder for &RecordingDecoder {
        type Manifest = usize;
        type Signatures = usize;

        fn decode_manifest(&self, bytes: &[u8]) -> std::result::Result<usize, DecodeError> {
            self.manifests.borrow_mut().push(bytes.to_vec());
            Ok(bytes.len())
        }

        fn decode_signatures(&self, bytes: &[u8]) -> std::result::Result<usize, DecodeError> {
            self.signatures.borrow_mut().push(bytes.to_vec());
            Ok(bytes.len())
        }

        fn operation_types(&self) -> &'static [(i32, &'static str)] {
            &[]
        }
    }

    struct FailingDecoder;

    impl SchemaDecoder for FailingDecoder {
        type Manifest = ();
        type Signatures = ();

        fn decode_manifest(&self, bytes: &[u8]) -> std::result::Result<(), DecodeError> {
            if bytes.starts_with(b"bad") {
                Err("manifest rejected".into())
            } else {
                Ok(())
            }
        }

        fn decode_signatures(&self, _bytes: &[u8]) -> std::result::Result<(), DecodeError> {
            Err("signature rejected".into())
        }

        fn operation_types(&self) -> &'static [(i32, &'static str)] {
            &[]
        }
    }

    fn payload(version: u64, manifest: &[u8], signature: Option<&[u8]>) -> Vec<u8> {
        let mut buf = b"CrAU".to_vec();
        buf.extend_from_slice(&version.to_be_bytes());
        buf.extend_from_slice(&(manifest.len() as u64).to_be_bytes());
        if let Some(sig) = signature {
            buf.extend_from_slice(&(sig.len() as u32).to_be_bytes());
        }
        buf.extend_from_slice(manifest);
        if let Some(sig) = signature {
            buf.extend_from_slice(sig);
        }
        buf
    }

    #[test]
    fn test_decoders_receive_exact_blocks() {
        ensure_env_logger_initialized();
        let buf = payload(2, b"12345", Some(&b"abc"[..]));
        let decoder = RecordingDecoder::default();

        let parsed = PayloadParser::from_buffer(&buf)
            .with_decoder(&decoder)
            .parse()
            .unwrap();

        assert_eq!(parsed.header.version, 2);
        assert_eq!(parsed.header.manifest_len, 5);
        assert_eq!(parsed.header.metadata_signature_len, Some(3));
        assert_eq!(parsed.manifest, 5);
        assert_eq!(parsed.metadata_signature, Some(3));
        assert_eq!(parsed.metadata_size, 32);
        assert_eq!(*decoder.manifests.borrow(), vec![b"12345".to_vec()]);
        assert_eq!(*decoder.signatures.borrow(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_version_1_has_no_signature() {
        let buf = payload(1, b"12345", None);
        let decoder = RecordingDecoder::default();

        let parsed = PayloadParser::from_buffer(&buf)
            .with_decoder(&decoder)
            .parse()
            .unwrap();

        assert_eq!(parsed.header.metadata_signature_len, None);
        assert_eq!(parsed.metadata_signature, None);
        assert_eq!(parsed.metadata_size, 25);
        assert!(decoder.signatures.borrow().is_empty());
    }

    #[test]
    fn test_trailing_data_is_left_alone() {
        let mut buf = payload(2, b"m", Some(&b"s"[..]));
        buf.extend_from_slice(&[0xEE; 64]);
        let decoder = RecordingDecoder::default();

        let parsed = PayloadParser::from_buffer(&buf)
            .with_decoder(&decoder)
            .parse()
            .unwrap();

        assert_eq!(parsed.metadata_size, 26);
        assert_eq!(*decoder.manifests.borrow(), vec![b"m".to_vec()]);
    }

    #[test]
    fn test_short_manifest_reports_stage() {
        let mut buf = payload(2, b"12345", Some(&b"abc"[..]));
        buf.truncate(24 + 4);
        let decoder = RecordingDecoder::default();

        let err = PayloadParser::from_buffer(&buf)
            .with_decoder(&decoder)
            .parse()
            .unwrap_err();

        assert!(matches!(
            err,
            PayloadError::PayloadTooShort {
                stage: PayloadStage::Manifest,
                offset: 24,
                need: 5,
                have: 4
            }
        ));
        assert!(decoder.manifests.borrow().is_empty());
    }

    #[test]
    fn test_short_signature_reports_stage() {
        let mut buf = payload(2, b"12345", Some(&b"abc"[..]));
        buf.truncate(buf.len() - 1);
        let decoder = RecordingDecoder::default();

        let err = PayloadParser::from_buffer(&buf)
            .with_decoder(&decoder)
            .parse()
            .unwrap_err();

        assert!(matches!(
            err,
            PayloadError::PayloadTooShort {
                stage: PayloadStage::MetadataSignature,
                offset: 29,
                need: 3,
                have: 2
            }
        ));
    }

    #[test]
    fn test_huge_manifest_length_is_too_short() {
        let mut buf = payload(1, b"", None);
        buf[12..20].copy_from_slice(&u64::MAX.to_be_bytes());

        let err = parse_payload(&buf).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::PayloadTooShort {
                stage: PayloadStage::Manifest,
                need: u64::MAX,
                have: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_failures_are_wrapped() {
        let buf = payload(2, b"bad manifest", Some(&b"sig"[..]));
        let err = PayloadParser::from_buffer(&buf)
            .with_decoder(FailingDecoder)
            .parse()
            .unwrap_err();
        assert!(matches!(err, PayloadError::ManifestDecode { len: 12, .. }));
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "manifest rejected"
        );

        let buf = payload(2, b"good manifest", Some(&b"sig"[..]));
        let err = PayloadParser::from_buffer(&buf)
            .with_decoder(FailingDecoder)
            .parse()
            .unwrap_err();
        assert!(matches!(err, PayloadError::SignatureDecode { len: 3, .. }));
    }

    #[test]
    fn test_signature_decode_can_be_skipped() {
        let buf = payload(2, b"good manifest", Some(&b"sig"[..]));
        let parsed = PayloadParser::from_buffer(&buf)
            .with_decoder(FailingDecoder)
            .with_configuration(ParserSettings::new().decode_metadata_signature(false))
            .parse()
            .unwrap();

        assert_eq!(parsed.header.metadata_signature_len, Some(3));
        assert_eq!(parsed.metadata_signature, None);
        assert_eq!(parsed.metadata_size, 24 + 13 + 3);
    }

    #[test]
    fn test_skipped_signature_is_still_bounds_checked() {
        let mut buf = payload(2, b"good manifest", Some(&b"sig"[..]));
        buf.pop();
        let err = PayloadParser::from_buffer(&buf)
            .with_decoder(FailingDecoder)
            .with_configuration(ParserSettings::new().decode_metadata_signature(false))
            .parse()
            .unwrap_err();

        assert!(matches!(
            err,
            PayloadError::PayloadTooShort {
                stage: PayloadStage::MetadataSignature,
                ..
            }
        ));
    }

    #[test]
    fn test_default_decoder_parses_empty_manifest() {
        let buf = payload(2, b"", Some(&b""[..]));
        let parsed = parse_payload(&buf).unwrap();

        assert_eq!(parsed.manifest, DeltaArchiveManifest::default());
        assert_eq!(parsed.metadata_signature, Some(Signatures::default()));
        assert_eq!(parsed.metadata_size, 24);
    }
}
