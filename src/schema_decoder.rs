use crate::err::DecodeError;
use crate::update_metadata::{DeltaArchiveManifest, OPERATION_TYPES, Signatures};

use prost::Message;

/// Turns the raw manifest and metadata signature blocks into structured values.
///
/// The payload container only frames these blocks; their wire format belongs to the decoder.
/// Decoding must be pure: the parser never retries a failed decode.
pub trait SchemaDecoder {
    type Manifest;
    type Signatures;

    fn decode_manifest(&self, bytes: &[u8]) -> Result<Self::Manifest, DecodeError>;

    fn decode_signatures(&self, bytes: &[u8]) -> Result<Self::Signatures, DecodeError>;

    /// `(code, name)` pairs of the operation type enumeration declared by this schema.
    fn operation_types(&self) -> &'static [(i32, &'static str)];
}

/// Decodes `update_metadata.proto` messages using `prost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateMetadataDecoder;

impl SchemaDecoder for UpdateMetadataDecoder {
    type Manifest = DeltaArchiveManifest;
    type Signatures = Signatures;

    fn decode_manifest(&self, bytes: &[u8]) -> Result<DeltaArchiveManifest, DecodeError> {
        Ok(DeltaArchiveManifest::decode(bytes)?)
    }

    fn decode_signatures(&self, bytes: &[u8]) -> Result<Signatures, DecodeError> {
        Ok(Signatures::decode(bytes)?)
    }

    fn operation_types(&self) -> &'static [(i32, &'static str)] {
        &OPERATION_TYPES
    }
}
