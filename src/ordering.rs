//! Slice and time ordering of a classified series.
//!
//! Records are first grouped into time points, then every time point is
//! sorted spatially. Both steps go through [`OrderedMap`], so records tying
//! on a sort key collapse to the last one written.

use tracing::{debug, warn};

use crate::classify::Classification;
use crate::enums::SliceDirection;
use crate::ordered_map::OrderedMap;
use crate::record::SliceRecord;

/// Which spatial attributes the first record of a series carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialKeys {
    pub has_image_position: bool,
    pub has_slice_location: bool,
    pub has_image_number: bool,
}

impl SpatialKeys {
    pub fn of(first: &SliceRecord) -> Self {
        Self {
            has_image_position: first.image_position.is_some(),
            has_slice_location: first.slice_location.is_some(),
            has_image_number: first.instance_number.is_some(),
        }
    }

    /// Marker telling two records at the same place apart from two records
    /// at different places.
    fn marker(&self, record: &SliceRecord, dir: SliceDirection) -> Option<f64> {
        if self.has_image_position {
            record.position_along(dir)
        } else if self.has_slice_location {
            record.slice_location
        } else {
            record.instance_number.map(f64::from)
        }
    }
}

/// Group record indices into time points, keyed in ascending time order.
///
/// With explicit temporal attributes (every record has a temporal position
/// and the first declares `number_of_frames` temporal positions) records are
/// grouped by temporal position. Otherwise records are walked slice by slice
/// in acquisition order and each joins the first time point that does not
/// already hold a record at its location.
pub fn order_by_time(
    records: &[SliceRecord],
    number_of_frames: u32,
    dir: SliceDirection,
    keys: SpatialKeys,
) -> OrderedMap<i64, Vec<usize>> {
    let mut time_map: OrderedMap<i64, Vec<usize>> = OrderedMap::new();
    let Some(first) = records.first() else {
        return time_map;
    };

    let explicit = number_of_frames > 1
        && records.iter().all(|r| r.temporal_position.is_some())
        && first.temporal_number == Some(number_of_frames as i32);

    if explicit {
        debug!(frames = number_of_frames, "Grouping by temporal position");
        for (i, record) in records.iter().enumerate() {
            let position = record.temporal_position.map_or(0, i64::from);
            time_map.get_or_insert_with(position, Vec::new).push(i);
        }
        return time_map;
    }

    debug!(frames = number_of_frames, "Grouping by repeated slice location");

    // slice first, then acquisition order within a slice
    let mut time_by_slice: OrderedMap<f64, OrderedMap<usize, usize>> = OrderedMap::new();
    for (i, record) in records.iter().enumerate() {
        let slice_marker = if keys.has_image_position {
            record.position_along(dir).unwrap_or(0.0)
        } else if keys.has_slice_location {
            record.slice_location.unwrap_or(0.0)
        } else {
            i as f64
        };
        time_by_slice
            .get_or_insert_with(slice_marker, OrderedMap::new)
            .put(i, i);
    }
    let by_slice_then_time = time_by_slice
        .into_values()
        .flat_map(|slice| slice.into_values());

    for i in by_slice_then_time {
        let marker = keys.marker(&records[i], dir);
        let free_bucket = time_map
            .iter()
            .find(|(_, members)| {
                !members
                    .iter()
                    .any(|&m| keys.marker(&records[m], dir) == marker)
            })
            .map(|(key, _)| *key);
        let key = free_bucket.unwrap_or(time_map.len() as i64);
        time_map.get_or_insert_with(key, Vec::new).push(i);
    }
    time_map
}

/// Sort `members` ascending by `key`. Members without a key sort as zero.
fn sort_by_key(
    members: &[usize],
    key: impl Fn(usize) -> Option<f64>,
) -> impl Iterator<Item = usize> {
    let mut sorted = OrderedMap::new();
    for &m in members {
        sorted.put(key(m).unwrap_or(0.0), m);
    }
    sorted.into_values()
}

/// Final sequence of a series: time points in ascending order, each sorted
/// by image position, else slice location, else instance number. Returns
/// indices into `records`.
pub fn order_records(
    records: &[SliceRecord],
    number_of_frames: u32,
    dir: SliceDirection,
) -> Vec<usize> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let keys = SpatialKeys::of(first);
    let time_map = order_by_time(records, number_of_frames, dir, keys);

    let mut ordered = Vec::with_capacity(records.len());
    for bucket in time_map.values() {
        if keys.has_image_position {
            ordered.extend(sort_by_key(bucket, |m| records[m].position_along(dir)));
        } else if keys.has_slice_location {
            ordered.extend(sort_by_key(bucket, |m| records[m].slice_location));
        } else if keys.has_image_number {
            ordered.extend(sort_by_key(bucket, |m| {
                records[m].instance_number.map(f64::from)
            }));
        } else {
            ordered.extend_from_slice(bucket);
        }
    }

    if ordered.len() < records.len() {
        warn!(
            dropped = records.len() - ordered.len(),
            "Records sharing a sort key were collapsed"
        );
    }
    ordered
}

/// Whether physical position increases through the ordered sequence, given
/// its first and last records.
pub fn resolve_slice_sense(
    first: &SliceRecord,
    last: &SliceRecord,
    classification: &Classification,
    dir: SliceDirection,
    explicit_ordering: bool,
) -> bool {
    if explicit_ordering {
        return false;
    }
    if classification.is_mosaic {
        return true;
    }

    let first_location = first.position_along(dir).unwrap_or(0.0);
    let last_location = last.position_along(dir).unwrap_or(0.0);
    let diff = last_location - first_location;

    if classification.is_multi_frame {
        return match first.slice_location_vector.as_deref() {
            Some(locations) if !locations.is_empty() => {
                let spread = locations[0] - locations[locations.len() - 1];
                let slices_along_z = first
                    .orientation_string()
                    .is_some_and(|o| o.chars().nth(2) == Some('Z'));
                if slices_along_z { spread < 0.0 } else { spread > 0.0 }
            }
            _ => first_location >= 0.0,
        };
    }

    // x grows to the patient's left, y to posterior, z to the head
    match dir {
        SliceDirection::Sagittal | SliceDirection::Coronal => diff <= 0.0,
        _ => diff > 0.0,
    }
}
