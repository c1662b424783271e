//! The decoded frames of a series, handed to renderers as one object.

use bytemuck::Pod;
use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use nalgebra::{Matrix4, Vector3};
use ndarray::{Array4, ShapeError};
use tracing::{debug, info};
use web_time::Instant;

use crate::aabb::AxisAlignedBox;
use crate::classify::Classification;
use crate::codec::{CodecRegistry, DecodeError};
use crate::enums::FrameSelector;
use crate::geometry::PixelTransform;
use crate::mosaic::{MosaicLayout, unpack_mosaic};
use crate::record::SliceRecord;

/// What a renderer needs to interpret the pixel buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayInfo {
    pub columns: usize,
    pub rows: usize,
    /// Logical frames held in the buffer.
    pub n_frames: usize,
    pub samples_per_pixel: usize,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub bytes_allocated: usize,
    pub is_signed: bool,
    pub is_rgb: bool,
    pub planar_configuration: u16,
    pub is_palette: bool,
    pub window_center: Option<f64>,
    pub window_width: Option<f64>,
    pub rescale_slope: Option<f64>,
    pub rescale_intercept: Option<f64>,
}

impl DisplayInfo {
    pub fn from_record(record: &SliceRecord, n_frames: usize) -> Self {
        let photometric = record.photometric_interpretation.as_str();
        Self {
            columns: record.columns as usize,
            rows: record.rows as usize,
            n_frames,
            samples_per_pixel: usize::from(record.samples_per_pixel.max(1)),
            bits_allocated: record.bits_allocated,
            bits_stored: record.bits_stored,
            bytes_allocated: record.bytes_allocated(),
            is_signed: record.is_signed(),
            is_rgb: record.samples_per_pixel == 3
                || photometric.starts_with("RGB")
                || photometric.starts_with("YBR"),
            planar_configuration: record.planar_configuration,
            is_palette: photometric == "PALETTE COLOR",
            window_center: record.window_center,
            window_width: record.window_width,
            rescale_slope: record.rescale_slope,
            rescale_intercept: record.rescale_intercept,
        }
    }

    pub fn frame_bytes(&self) -> usize {
        self.columns * self.rows * self.samples_per_pixel * self.bytes_allocated
    }
}

/// Decoded pixels of a whole series plus its placement in patient space.
#[derive(Debug, Clone)]
pub struct AssembledFrameSet {
    pub display: DisplayInfo,
    /// Every frame, concatenated in series order.
    pub pixel_data: Bytes,
    pub mat4_pix_to_pat: Matrix4<f64>,
    pub transform: PixelTransform,
    /// -1 when the buffer holds all frames.
    pub frame_no: i32,
    pub visible: bool,
    /// Slice spacing in mm supplied with explicit ordering.
    pub slice_spacing_hint: Option<f64>,
}

impl AssembledFrameSet {
    pub fn new(display: DisplayInfo, pixel_data: Bytes, transform: PixelTransform) -> Self {
        Self {
            display,
            pixel_data,
            mat4_pix_to_pat: transform.to_matrix(),
            transform,
            frame_no: -1,
            visible: true,
            slice_spacing_hint: None,
        }
    }

    /// Decode `records`, already in final order, into one frame set.
    ///
    /// A record holding several physical frames is decoded once as a whole;
    /// otherwise frame 0 of every record is decoded. Decodes run
    /// concurrently but buffers are concatenated in record order, and the
    /// first failure aborts the assembly.
    pub async fn assemble(
        records: &[&SliceRecord],
        classification: &Classification,
        registry: &CodecRegistry,
        transform: PixelTransform,
    ) -> Result<Self, DecodeError> {
        let Some(&first) = records.first() else {
            return Ok(Self::new(DisplayInfo::default(), Bytes::new(), transform));
        };
        let start = Instant::now();

        let frames_in_file = classification.number_of_frames_in_file;
        let (buffers, mut n_frames) = if frames_in_file > 1 {
            let codec = registry.decoder_for(first)?;
            let buffer = codec.decode(first, FrameSelector::All).await?;
            (vec![buffer], frames_in_file as usize)
        } else {
            let decodes = records.iter().map(|&record| async move {
                registry
                    .decoder_for(record)?
                    .decode(record, FrameSelector::Frame(0))
                    .await
            });
            (try_join_all(decodes).await?, records.len())
        };

        let mut display = DisplayInfo::from_record(first, n_frames);
        let buffers = if classification.is_mosaic {
            let layout = MosaicLayout::for_record(first);
            debug!(
                tiles = layout.tile_count(),
                tile_width = layout.tile_width(),
                tile_height = layout.tile_height(),
                "Unpacking mosaic frames"
            );
            display.columns = layout.tile_width();
            display.rows = layout.tile_height();
            n_frames = buffers.len() * layout.tile_count();
            buffers
                .iter()
                .map(|buffer| unpack_mosaic(buffer, &layout).map(Bytes::from))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            buffers
        };
        display.n_frames = n_frames;

        let mut pixel_data = BytesMut::with_capacity(buffers.iter().map(Bytes::len).sum());
        for buffer in &buffers {
            pixel_data.extend_from_slice(buffer);
        }

        info!(
            frames = n_frames,
            bytes = pixel_data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Assembled frames"
        );
        Ok(Self::new(display, pixel_data.freeze(), transform))
    }

    /// (frames, rows, columns)
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.display.n_frames, self.display.rows, self.display.columns)
    }

    pub fn pixel_to_patient(&self, pixel: Vector3<f64>) -> Vector3<f64> {
        (self.mat4_pix_to_pat * pixel.push(1.0)).xyz()
    }

    /// `None` when the transform is not invertible.
    pub fn patient_to_pixel(&self, patient: Vector3<f64>) -> Option<Vector3<f64>> {
        let inverse = self.mat4_pix_to_pat.try_inverse()?;
        Some((inverse * patient.push(1.0)).xyz())
    }

    /// Patient space box covering every pixel center of every frame.
    pub fn bounding_box(&self) -> AxisAlignedBox {
        let (frames, rows, columns) = self.dim();
        if frames == 0 || rows == 0 || columns == 0 {
            return AxisAlignedBox::null();
        }
        let far = Vector3::new(
            (columns - 1) as f64,
            (rows - 1) as f64,
            (frames - 1) as f64,
        );
        AxisAlignedBox::from_points(Vector3::zeros(), far, 0.0).transformed(&self.mat4_pix_to_pat)
    }

    /// Samples reinterpreted as `T`, in native byte order.
    pub fn samples<T: Pod>(&self) -> Vec<T> {
        bytemuck::pod_collect_to_vec(&self.pixel_data[..])
    }

    /// Pixel buffer as (frames, rows, columns, samples).
    pub fn to_ndarray<T: Pod>(&self) -> Result<Array4<T>, ShapeError> {
        let (frames, rows, columns) = self.dim();
        let spp = self.display.samples_per_pixel;
        let samples = self.samples::<T>();
        if self.display.planar_configuration == 1 && spp > 1 {
            let planar = Array4::from_shape_vec((frames, spp, rows, columns), samples)?;
            Ok(planar.permuted_axes([0, 2, 3, 1]))
        } else {
            Array4::from_shape_vec((frames, rows, columns, spp), samples)
        }
    }
}
