/// Anatomical axis a series is acquired along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceDirection {
    Axial,
    Coronal,
    Sagittal,
    #[default]
    Unknown,
}

impl SliceDirection {
    /// Index of the patient axis this direction runs along (x = 0, y = 1, z = 2).
    pub fn axis(&self) -> Option<usize> {
        match self {
            SliceDirection::Sagittal => Some(0),
            SliceDirection::Coronal => Some(1),
            SliceDirection::Axial => Some(2),
            SliceDirection::Unknown => None,
        }
    }

    /// Direction whose slice axis is named by `letter` (`'X'`, `'Y'` or `'Z'`).
    pub fn from_axis_letter(letter: char) -> Self {
        match letter {
            'X' => SliceDirection::Sagittal,
            'Y' => SliceDirection::Coronal,
            'Z' => SliceDirection::Axial,
            _ => SliceDirection::Unknown,
        }
    }
}

/// Which frames a codec should decode from one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSelector {
    /// Every frame of the record, concatenated.
    All,
    Frame(u32),
}
