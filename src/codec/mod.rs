//! Pixel codec dispatch.
//!
//! Every record is decoded by the [`Codec`] its transfer syntax maps to in a
//! [`CodecRegistry`]. Transfer syntaxes known to dicom-rs are decoded by its
//! pixel data layer; callers can plug additional decoders in through
//! [`FrameDecoder`].

mod pixeldata;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dicom::encoding::transfer_syntax::TransferSyntaxIndex;
use dicom::transfer_syntax::TransferSyntaxRegistry;
use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

use crate::enums::FrameSelector;
use crate::record::SliceRecord;

/// Uncompressed transfer syntax UIDs.
pub mod uids {
    pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
    pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
    pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
    pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

    /// Whether pixel data under `uid` is stored uncompressed.
    pub fn is_native(uid: &str) -> bool {
        matches!(
            uid,
            IMPLICIT_VR_LITTLE_ENDIAN
                | EXPLICIT_VR_LITTLE_ENDIAN
                | DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN
                | EXPLICIT_VR_BIG_ENDIAN
        )
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported transfer syntax: {0}")]
    UnsupportedTransferSyntax(String),

    #[error("Frame {frame} out of range: record holds {available} frames")]
    FrameOutOfRange { frame: u32, available: u32 },

    #[error("Pixel data too short: need {required} bytes, got {actual}")]
    Truncated { required: usize, actual: usize },

    #[error("Record carries no data set to decode pixels from")]
    MissingPixelSource,

    #[error("Failed to decode pixel data: {0}")]
    Pixel(#[from] dicom::pixeldata::Error),

    /// Failure raised outside the built-in codec, passed through untouched.
    #[error(transparent)]
    External(Box<dyn std::error::Error + Send + Sync>),
}

/// Decoder supplied by the caller for a transfer syntax the built-in codec
/// does not cover.
///
/// Implementations return the raw samples of the selected frames, honoring
/// the record's rows, columns, samples per pixel, bits allocated, planar
/// configuration and signedness.
pub trait FrameDecoder: Send + Sync {
    fn decode<'a>(
        &'a self,
        record: &'a SliceRecord,
        frame: FrameSelector,
    ) -> BoxFuture<'a, Result<Bytes, DecodeError>>;
}

#[derive(Clone)]
pub enum Codec {
    /// dicom-rs pixel decoding of the record's source object.
    Dicom,
    Custom(Arc<dyn FrameDecoder>),
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Dicom => f.write_str("Dicom"),
            Codec::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Codec {
    pub async fn decode(
        &self,
        record: &SliceRecord,
        frame: FrameSelector,
    ) -> Result<Bytes, DecodeError> {
        match self {
            Codec::Dicom => pixeldata::decode(record, frame),
            Codec::Custom(decoder) => decoder.decode(record, frame).await,
        }
    }
}

/// Table from transfer syntax UID to codec.
///
/// Registered codecs take precedence. Other transfer syntaxes fall back to
/// the built-in codec when dicom-rs knows them.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Codec>,
    builtin: Option<Codec>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    /// Registry backed by the built-in codec.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            builtin: Some(Codec::Dicom),
        }
    }

    /// Registry without any codec.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
            builtin: None,
        }
    }

    pub fn register(&mut self, transfer_syntax: impl Into<String>, codec: Codec) {
        self.codecs.insert(transfer_syntax.into(), codec);
    }

    pub fn with_codec(mut self, transfer_syntax: impl Into<String>, codec: Codec) -> Self {
        self.register(transfer_syntax, codec);
        self
    }

    pub fn codec_for(&self, transfer_syntax: &str) -> Result<&Codec, DecodeError> {
        self.codecs
            .get(transfer_syntax)
            .or_else(|| {
                self.builtin
                    .as_ref()
                    .filter(|_| TransferSyntaxRegistry.get(transfer_syntax).is_some())
            })
            .ok_or_else(|| DecodeError::UnsupportedTransferSyntax(transfer_syntax.to_string()))
    }

    /// Codec selected for `record`.
    pub fn decoder_for(&self, record: &SliceRecord) -> Result<&Codec, DecodeError> {
        let codec = self.codec_for(&record.transfer_syntax)?;
        debug!(
            transfer_syntax = %record.transfer_syntax,
            codec = ?codec,
            "Selected codec"
        );
        Ok(codec)
    }
}
