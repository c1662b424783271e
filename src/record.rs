//! Parsed slice records (one DICOM instance each) and the attribute
//! accessors the classifier, the orderer and the geometry builder rely on.
//!
//! Optional attributes are `Option`s so that an absent value is never
//! mistaken for zero.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use dicom::core::{DicomValue, Tag};
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use dicom_dictionary_std::tags;
use nalgebra::Vector3;
use thiserror::Error;

use crate::codec::uids;
use crate::enums::SliceDirection;

/// Siemens private "AcquisitionMatrixText", e.g. `64p*64s`.
const ACQUISITION_MATRIX_TEXT: Tag = Tag(0x0051, 0x100B);

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Missing required attribute {0}")]
    MissingAttribute(&'static str),

    #[error("Invalid value for {attribute}: {message}")]
    InvalidValue {
        attribute: &'static str,
        message: String,
    },
}

/// The data set a record was read from, kept for pixel decoding.
///
/// Once every frame of the record has been decoded the samples are kept
/// here and reused by later requests.
#[derive(Debug, Clone)]
pub struct PixelSource {
    object: Arc<DefaultDicomObject>,
    decoded: OnceLock<Bytes>,
}

impl PixelSource {
    pub fn new(object: Arc<DefaultDicomObject>) -> Self {
        Self {
            object,
            decoded: OnceLock::new(),
        }
    }

    pub fn object(&self) -> &DefaultDicomObject {
        &self.object
    }

    /// Samples of every frame, if already decoded.
    pub fn decoded(&self) -> Option<&Bytes> {
        self.decoded.get()
    }

    /// Keep the samples of every frame. The first stored value wins.
    pub fn store_decoded(&self, samples: Bytes) -> &Bytes {
        self.decoded.get_or_init(|| samples)
    }
}

/// One parsed DICOM instance.
#[derive(Debug, Clone)]
pub struct SliceRecord {
    pub series_id: String,
    pub series_instance_uid: Option<String>,
    pub series_description: Option<String>,
    pub instance_number: Option<i32>,

    pub image_position: Option<[f64; 3]>,
    /// Row direction cosines followed by column direction cosines.
    pub image_orientation: Option<[f64; 6]>,
    /// Pixel spacing in mm, in stored order.
    pub pixel_spacing: Option<[f64; 2]>,
    pub slice_thickness: Option<f64>,
    pub slice_location: Option<f64>,
    /// Per-frame offsets along the slice axis (grid frame offset vector).
    pub slice_location_vector: Option<Vec<f64>>,

    pub temporal_position: Option<i32>,
    pub temporal_number: Option<i32>,
    pub frame_time: Option<f64>,

    /// Frame count declared by the instance.
    pub number_of_frames: u32,
    pub mosaic_rows: u32,
    pub mosaic_cols: u32,
    pub image_type: Vec<String>,
    pub manufacturer: Option<String>,

    pub transfer_syntax: String,
    pub rows: u32,
    pub columns: u32,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub pixel_representation: u16,
    pub planar_configuration: u16,
    pub photometric_interpretation: String,
    pub window_center: Option<f64>,
    pub window_width: Option<f64>,
    pub rescale_slope: Option<f64>,
    pub rescale_intercept: Option<f64>,
    /// Byte length of uncompressed pixel data, `None` when encapsulated.
    pub pixel_data_len: Option<usize>,
    /// Data set to decode pixels from. Records built without one can
    /// only be decoded by a custom codec.
    pub source: Option<PixelSource>,

    /// Position in the ordered series, assigned by [`Series::build_series`].
    ///
    /// [`Series::build_series`]: crate::series::Series::build_series
    pub index: Option<usize>,
}

impl Default for SliceRecord {
    fn default() -> Self {
        Self {
            series_id: String::new(),
            series_instance_uid: None,
            series_description: None,
            instance_number: None,
            image_position: None,
            image_orientation: None,
            pixel_spacing: None,
            slice_thickness: None,
            slice_location: None,
            slice_location_vector: None,
            temporal_position: None,
            temporal_number: None,
            frame_time: None,
            number_of_frames: 1,
            mosaic_rows: 1,
            mosaic_cols: 1,
            image_type: Vec::new(),
            manufacturer: None,
            transfer_syntax: uids::EXPLICIT_VR_LITTLE_ENDIAN.to_string(),
            rows: 0,
            columns: 0,
            samples_per_pixel: 1,
            bits_allocated: 16,
            bits_stored: 16,
            pixel_representation: 0,
            planar_configuration: 0,
            photometric_interpretation: "MONOCHROME2".to_string(),
            window_center: None,
            window_width: None,
            rescale_slope: None,
            rescale_intercept: None,
            pixel_data_len: Some(0),
            source: None,
            index: None,
        }
    }
}

impl SliceRecord {
    /// Build a record from a file object read by dicom-rs. The object is
    /// kept as the record's pixel source.
    pub fn from_dicom_object(dicom_object: Arc<DefaultDicomObject>) -> Result<Self, RecordError> {
        let mut record = Self::from_dataset(&dicom_object, dicom_object.meta().transfer_syntax())?;
        record.source = Some(PixelSource::new(dicom_object));
        Ok(record)
    }

    /// Build a record from a data set encoded with `transfer_syntax`.
    pub fn from_dataset(obj: &InMemDicomObject, transfer_syntax: &str) -> Result<Self, RecordError> {
        let rows = get_u32(obj, tags::ROWS).ok_or(RecordError::MissingAttribute("Rows"))?;
        let columns =
            get_u32(obj, tags::COLUMNS).ok_or(RecordError::MissingAttribute("Columns"))?;

        let series_instance_uid = get_string(obj, tags::SERIES_INSTANCE_UID);
        let series_id = series_instance_uid
            .clone()
            .or_else(|| get_string(obj, tags::SERIES_NUMBER))
            .unwrap_or_default();

        let image_type = get_string(obj, tags::IMAGE_TYPE)
            .map(|s| s.split('\\').map(|v| v.trim().to_string()).collect())
            .unwrap_or_default();

        let mut record = Self {
            series_id,
            series_instance_uid,
            series_description: get_string(obj, tags::SERIES_DESCRIPTION),
            instance_number: get_i32(obj, tags::INSTANCE_NUMBER),
            image_position: get_fixed::<3>(obj, tags::IMAGE_POSITION_PATIENT),
            image_orientation: get_fixed::<6>(obj, tags::IMAGE_ORIENTATION_PATIENT),
            pixel_spacing: get_fixed::<2>(obj, tags::PIXEL_SPACING),
            slice_thickness: get_f64(obj, tags::SLICE_THICKNESS),
            slice_location: get_f64(obj, tags::SLICE_LOCATION),
            slice_location_vector: get_f64_vec(obj, tags::GRID_FRAME_OFFSET_VECTOR)
                .filter(|v| !v.is_empty()),
            temporal_position: get_i32(obj, tags::TEMPORAL_POSITION_IDENTIFIER),
            temporal_number: get_i32(obj, tags::NUMBER_OF_TEMPORAL_POSITIONS),
            frame_time: get_f64(obj, tags::FRAME_TIME),
            number_of_frames: get_u32(obj, tags::NUMBER_OF_FRAMES).unwrap_or(1).max(1),
            mosaic_rows: 1,
            mosaic_cols: 1,
            image_type,
            manufacturer: get_string(obj, tags::MANUFACTURER),
            transfer_syntax: transfer_syntax
                .trim_end_matches(['\0', ' '])
                .to_string(),
            rows,
            columns,
            samples_per_pixel: get_u16(obj, tags::SAMPLES_PER_PIXEL).unwrap_or(1),
            bits_allocated: get_u16(obj, tags::BITS_ALLOCATED).unwrap_or(16),
            bits_stored: get_u16(obj, tags::BITS_STORED).unwrap_or(16),
            pixel_representation: get_u16(obj, tags::PIXEL_REPRESENTATION).unwrap_or(0),
            planar_configuration: get_u16(obj, tags::PLANAR_CONFIGURATION).unwrap_or(0),
            photometric_interpretation: get_string(obj, tags::PHOTOMETRIC_INTERPRETATION)
                .unwrap_or_else(|| "MONOCHROME2".to_string()),
            window_center: get_f64_vec(obj, tags::WINDOW_CENTER).and_then(|v| v.first().copied()),
            window_width: get_f64_vec(obj, tags::WINDOW_WIDTH).and_then(|v| v.first().copied()),
            rescale_slope: get_f64(obj, tags::RESCALE_SLOPE),
            rescale_intercept: get_f64(obj, tags::RESCALE_INTERCEPT),
            pixel_data_len: read_pixel_data_len(obj)?,
            source: None,
            index: None,
        };

        if record.is_mosaic() {
            if let Some((acq_rows, acq_cols)) =
                get_string(obj, ACQUISITION_MATRIX_TEXT).and_then(|s| parse_matrix_text(&s))
            {
                record.mosaic_rows = (rows / acq_rows).max(1);
                record.mosaic_cols = (columns / acq_cols).max(1);
            }
        }

        Ok(record)
    }

    pub fn bytes_allocated(&self) -> usize {
        (usize::from(self.bits_allocated).div_ceil(8)).max(1)
    }

    /// Bytes of one decoded frame.
    pub fn frame_size(&self) -> usize {
        self.rows as usize
            * self.columns as usize
            * usize::from(self.samples_per_pixel.max(1))
            * self.bytes_allocated()
    }

    pub fn is_signed(&self) -> bool {
        self.pixel_representation == 1
    }

    pub fn position(&self) -> Option<Vector3<f64>> {
        self.image_position.map(Vector3::from)
    }

    pub fn row_direction(&self) -> Option<Vector3<f64>> {
        self.image_orientation
            .map(|o| Vector3::new(o[0], o[1], o[2]))
    }

    pub fn column_direction(&self) -> Option<Vector3<f64>> {
        self.image_orientation
            .map(|o| Vector3::new(o[3], o[4], o[5]))
    }

    /// Unit normal of the image plane (row x column).
    pub fn slice_normal(&self) -> Option<Vector3<f64>> {
        let normal = self.row_direction()?.cross(&self.column_direction()?);
        normal.try_normalize(f64::EPSILON)
    }

    /// Image position projected on the axis of `dir`. For an unknown
    /// direction the position is projected on the slice normal, or the z
    /// coordinate when there is no orientation.
    pub fn position_along(&self, dir: SliceDirection) -> Option<f64> {
        let position = self.position()?;
        Some(match dir.axis() {
            Some(axis) => position[axis],
            None => self
                .slice_normal()
                .map_or(position.z, |normal| position.dot(&normal)),
        })
    }

    /// Six character orientation code: the patient axes (`X`, `Y`, `Z`) the
    /// rows, the columns and the slices run along, then the sign of each.
    pub fn orientation_string(&self) -> Option<String> {
        let row = self.row_direction()?;
        let col = self.column_direction()?;
        let row_axis = row.iamax();
        let mut col_axis = col.iamax();
        if col_axis == row_axis {
            // degenerate cosines, fall back to the next strongest component
            col_axis = (0..3)
                .filter(|&i| i != row_axis)
                .max_by(|&a, &b| col[a].abs().total_cmp(&col[b].abs()))
                .unwrap_or((row_axis + 1) % 3);
        }
        let slice_axis = 3 - row_axis - col_axis;
        let normal = row.cross(&col);

        let letter = |axis: usize| ['X', 'Y', 'Z'][axis];
        let sign = |v: f64| if v < 0.0 { '-' } else { '+' };
        Some(
            [
                letter(row_axis),
                letter(col_axis),
                letter(slice_axis),
                sign(row[row_axis]),
                sign(col[col_axis]),
                sign(normal[slice_axis]),
            ]
            .iter()
            .collect(),
        )
    }

    pub fn acquired_slice_direction(&self) -> SliceDirection {
        self.orientation_string()
            .and_then(|o| o.chars().nth(2))
            .map_or(SliceDirection::Unknown, SliceDirection::from_axis_letter)
    }

    /// Image position rendered as text, used to detect records sharing one
    /// location. Absent positions render as the empty string.
    pub fn position_signature(&self) -> String {
        self.image_position
            .map(|p| format!("{},{},{}", p[0], p[1], p[2]))
            .unwrap_or_default()
    }

    pub fn is_mosaic(&self) -> bool {
        self.image_type
            .iter()
            .any(|value| value.eq_ignore_ascii_case("MOSAIC"))
    }

    pub fn is_elscint(&self) -> bool {
        self.manufacturer
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().contains("elscint"))
    }

    pub fn is_compressed(&self) -> bool {
        self.pixel_data_len.is_none()
            || !uids::is_native(&self.transfer_syntax)
    }

    /// Frames physically present in the pixel data. Native data is measured
    /// from its size; compressed data trusts the declared count.
    pub fn implicit_frame_count(&self) -> u32 {
        if self.is_compressed() {
            return self.number_of_frames;
        }
        let frame_size = self.frame_size();
        if frame_size == 0 {
            return self.number_of_frames;
        }
        (self.pixel_data_len.unwrap_or(0) / frame_size) as u32
    }

    /// Frame time in ms; zero when absent.
    pub fn frame_time(&self) -> f64 {
        self.frame_time.unwrap_or(0.0)
    }

    /// z range covered by the frames of a single-instance volume: the image
    /// position plus the smallest and largest grid frame offsets.
    pub fn frames_position_z_range(&self) -> Option<(f64, f64)> {
        let z = self.image_position?[2];
        match self.slice_location_vector.as_deref() {
            Some(offsets) if !offsets.is_empty() => {
                let lo = offsets.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = offsets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some((z + lo, z + hi))
            }
            _ => Some((z, z)),
        }
    }
}

fn read_pixel_data_len(obj: &InMemDicomObject) -> Result<Option<usize>, RecordError> {
    let element = obj
        .element(tags::PIXEL_DATA)
        .map_err(|_| RecordError::MissingAttribute("PixelData"))?;
    match element.value() {
        DicomValue::PixelSequence(_) => Ok(None),
        _ => {
            let bytes = element
                .to_bytes()
                .map_err(|e| RecordError::InvalidValue {
                    attribute: "PixelData",
                    message: e.to_string(),
                })?;
            Ok(Some(bytes.len()))
        }
    }
}

/// Leading integers of both sides of an `A*B` matrix text.
fn parse_matrix_text(text: &str) -> Option<(u32, u32)> {
    let (a, b) = text.split_once('*')?;
    let leading = |s: &str| -> Option<u32> {
        let digits: String = s
            .trim()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok().filter(|&n| n > 0)
    };
    Some((leading(a)?, leading(b)?))
}

fn get_string(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = obj.element(tag).ok()?.to_str().ok()?;
    let trimmed = value.trim_end_matches(['\0', ' ']).trim_start();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn get_i32(obj: &InMemDicomObject, tag: Tag) -> Option<i32> {
    obj.element(tag).ok()?.to_int::<i32>().ok()
}

fn get_u32(obj: &InMemDicomObject, tag: Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_u16(obj: &InMemDicomObject, tag: Tag) -> Option<u16> {
    obj.element(tag).ok()?.to_int::<u16>().ok()
}

fn get_f64(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

fn get_f64_vec(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    obj.element(tag).ok()?.to_multi_float64().ok()
}

fn get_fixed<const N: usize>(obj: &InMemDicomObject, tag: Tag) -> Option<[f64; N]> {
    get_f64_vec(obj, tag)?.get(..N)?.try_into().ok()
}
