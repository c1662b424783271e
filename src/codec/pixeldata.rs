//! Built-in decoding through the dicom-rs pixel data layer.

use bytes::Bytes;
use dicom::pixeldata::PixelDecoder;

use super::DecodeError;
use crate::enums::FrameSelector;
use crate::record::{PixelSource, SliceRecord};

pub(super) fn decode(record: &SliceRecord, frame: FrameSelector) -> Result<Bytes, DecodeError> {
    let source = record
        .source
        .as_ref()
        .ok_or(DecodeError::MissingPixelSource)?;

    match frame {
        FrameSelector::All => decode_all(source).cloned(),
        FrameSelector::Frame(n) => {
            let available = record.implicit_frame_count();
            if n >= available {
                return Err(DecodeError::FrameOutOfRange {
                    frame: n,
                    available,
                });
            }
            if available == 1 {
                return decode_all(source).cloned();
            }
            match source.decoded() {
                Some(all) => frame_of(all, n, record.frame_size()),
                None => {
                    let decoded = source.object().decode_pixel_data_frame(n)?;
                    Ok(Bytes::copy_from_slice(decoded.data()))
                }
            }
        }
    }
}

/// Samples of every frame, decoded on first use and kept on the source.
fn decode_all(source: &PixelSource) -> Result<&Bytes, DecodeError> {
    if let Some(all) = source.decoded() {
        return Ok(all);
    }
    let decoded = source.object().decode_pixel_data()?;
    Ok(source.store_decoded(Bytes::copy_from_slice(decoded.data())))
}

fn frame_of(all: &Bytes, n: u32, frame_size: usize) -> Result<Bytes, DecodeError> {
    let start = n as usize * frame_size;
    let end = start + frame_size;
    if all.len() < end {
        return Err(DecodeError::Truncated {
            required: end,
            actual: all.len(),
        });
    }
    Ok(all.slice(start..end))
}
