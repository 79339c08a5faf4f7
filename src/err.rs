use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PayloadError>;

/// Boxed error produced by a [`crate::SchemaDecoder`].
pub type DecodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The block being extracted when the buffer ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStage {
    Manifest,
    MetadataSignature,
}

impl fmt::Display for PayloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadStage::Manifest => f.write_str("manifest"),
            PayloadStage::MetadataSignature => f.write_str("metadata signature"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("cannot read a {size} byte integer for {what} at offset {offset}")]
    InvalidIntegerWidth {
        what: &'static str,
        offset: u64,
        size: usize,
    },

    #[error(
        "invalid payload magic, expected `CrAU`, found `{}` ({:02X?})",
        String::from_utf8_lossy(.found),
        .found
    )]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported payload major version {0} (expected 1 or 2)")]
    UnsupportedVersion(u64),

    #[error(
        "payload too short for {stage} block at offset {offset} (need {need} bytes, have {have})"
    )]
    PayloadTooShort {
        stage: PayloadStage,
        offset: u64,
        need: u64,
        have: usize,
    },

    #[error("failed to decode manifest ({len} bytes)")]
    ManifestDecode {
        len: usize,
        #[source]
        source: DecodeError,
    },

    #[error("failed to decode metadata signature ({len} bytes)")]
    SignatureDecode {
        len: usize,
        #[source]
        source: DecodeError,
    },
}

impl PayloadError {
    /// Re-labels a cursor truncation as a block-level failure for `stage`.
    pub(crate) fn into_stage(self, stage: PayloadStage) -> Self {
        match self {
            PayloadError::Truncated {
                offset, need, have, ..
            } => PayloadError::PayloadTooShort {
                stage,
                offset,
                need: need as u64,
                have,
            },
            other => other,
        }
    }
}
