//! De-interleaving of mosaic images: a grid of equal tiles packed in one
//! physical frame, each tile being one logical slice.

use rayon::prelude::*;

use crate::codec::DecodeError;
use crate::record::SliceRecord;

/// Tile grid of a mosaic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicLayout {
    pub mosaic_rows: usize,
    pub mosaic_cols: usize,
    /// Width of the whole mosaic in pixels.
    pub mosaic_width: usize,
    /// Height of the whole mosaic in pixels.
    pub mosaic_height: usize,
    pub bytes_per_sample: usize,
}

impl MosaicLayout {
    pub fn for_record(record: &SliceRecord) -> Self {
        Self {
            mosaic_rows: record.mosaic_rows.max(1) as usize,
            mosaic_cols: record.mosaic_cols.max(1) as usize,
            mosaic_width: record.columns as usize,
            mosaic_height: record.rows as usize,
            bytes_per_sample: record.bytes_allocated() * usize::from(record.samples_per_pixel.max(1)),
        }
    }

    pub fn tile_width(&self) -> usize {
        self.mosaic_width / self.mosaic_cols
    }

    pub fn tile_height(&self) -> usize {
        self.mosaic_height / self.mosaic_rows
    }

    pub fn tile_count(&self) -> usize {
        self.mosaic_rows * self.mosaic_cols
    }

    pub fn tile_bytes(&self) -> usize {
        self.tile_width() * self.tile_height() * self.bytes_per_sample
    }

    /// Sample offset in the mosaic of pixel (`col`, `row`) of tile `slice`.
    fn source_offset(&self, slice: usize, row: usize, col: usize) -> usize {
        let x = (slice % self.mosaic_cols) * self.tile_width() + col;
        let y = (slice / self.mosaic_cols) * self.tile_height() + row;
        x + y * self.mosaic_width
    }
}

/// Rearrange the tiles of `data` so every slice is contiguous, slice 0
/// first. Sample bytes are copied verbatim.
pub fn unpack_mosaic(data: &[u8], layout: &MosaicLayout) -> Result<Vec<u8>, DecodeError> {
    let required = layout.mosaic_width * layout.mosaic_height * layout.bytes_per_sample;
    if data.len() < required {
        return Err(DecodeError::Truncated {
            required,
            actual: data.len(),
        });
    }

    let bps = layout.bytes_per_sample;
    let tile_width = layout.tile_width();
    let tile_bytes = layout.tile_bytes();
    let mut out = vec![0u8; layout.tile_count() * tile_bytes];
    if tile_bytes == 0 {
        return Ok(out);
    }

    out.par_chunks_mut(tile_bytes)
        .enumerate()
        .for_each(|(slice, tile)| {
            for (row, tile_row) in tile.chunks_exact_mut(tile_width * bps).enumerate() {
                let src = layout.source_offset(slice, row, 0) * bps;
                tile_row.copy_from_slice(&data[src..src + tile_width * bps]);
            }
        });
    Ok(out)
}
