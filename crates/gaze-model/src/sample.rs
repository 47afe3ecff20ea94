//! Raw gaze samples and the binary sample-record format.
//!
//! Recorded sessions are stored as a flat sequence of fixed-size,
//! little-endian records. A live recording may be cut mid-record, so a
//! short trailing chunk is silently dropped rather than reported.
//!
//! The validity bitmask is advisory only: coordinates are re-checked on
//! conversion and anything non-finite or outside `[0.0, 1.0]` is treated as
//! invalid regardless of what the tracker claimed.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::settings::EyeSelection;

/// Size of one encoded [`SampleRecord`] in bytes.
pub const RECORD_SIZE: usize = 72;

/// Eyelid opening (mm) at or below which an eye is considered closed.
pub const CLOSED_EYELID_MM: f32 = 0.5;

/// One gaze sample, already reduced to a single gaze point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGazeSample {
    /// Monotonic seconds since stream start.
    pub time_sec: f64,
    /// Normalized X coordinate [0.0, 1.0] when valid.
    pub x_norm: f32,
    /// Normalized Y coordinate [0.0, 1.0] when valid.
    pub y_norm: f32,
    /// Eye-to-screen distance in meters, 0 if unknown.
    pub distance_m: f32,
    /// Whether the gaze point is usable.
    pub valid: bool,
    /// Eyelid reported open (or not reported). `false` marks a blink.
    pub eyelid_open_valid: bool,
}

impl RawGazeSample {
    /// A valid sample at the given normalized position.
    ///
    /// Coordinates outside `[0.0, 1.0]` produce an invalid sample.
    pub fn new(time_sec: f64, x_norm: f32, y_norm: f32, distance_m: f32) -> Self {
        Self {
            time_sec,
            x_norm,
            y_norm,
            distance_m,
            valid: true,
            eyelid_open_valid: true,
        }
        .sanitized()
    }

    /// Tracking lost, eye not reported closed.
    pub fn lost(time_sec: f64) -> Self {
        Self {
            time_sec,
            x_norm: 0.0,
            y_norm: 0.0,
            distance_m: 0.0,
            valid: false,
            eyelid_open_valid: true,
        }
    }

    /// Tracking lost while the eyelid was reported closed.
    pub fn blink(time_sec: f64) -> Self {
        Self {
            eyelid_open_valid: false,
            ..Self::lost(time_sec)
        }
    }

    /// Clear `valid` if the coordinates are non-finite or out of range.
    pub fn sanitized(mut self) -> Self {
        if !in_unit_range(self.x_norm, self.y_norm) {
            self.valid = false;
        }
        self
    }

    /// Valid and carrying in-range, finite coordinates.
    pub fn is_usable(&self) -> bool {
        self.valid && in_unit_range(self.x_norm, self.y_norm)
    }
}

/// Whether both coordinates are finite and inside `[0.0, 1.0]`.
pub fn in_unit_range(x: f32, y: f32) -> bool {
    x.is_finite() && y.is_finite() && (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)
}

/// Per-sample validity bitmask as written by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValidityFlags(pub u32);

impl ValidityFlags {
    pub const BEST_GAZE: u32 = 1 << 0;
    pub const LEFT_GAZE: u32 = 1 << 1;
    pub const RIGHT_GAZE: u32 = 1 << 2;
    pub const LEFT_ORIGIN: u32 = 1 << 3;
    pub const RIGHT_ORIGIN: u32 = 1 << 4;
    pub const LEFT_PUPIL: u32 = 1 << 5;
    pub const RIGHT_PUPIL: u32 = 1 << 6;
    pub const LEFT_EYELID: u32 = 1 << 7;
    pub const RIGHT_EYELID: u32 = 1 << 8;

    pub fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

/// A decoded binary sample record with every per-eye field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    pub flags: ValidityFlags,
    pub timestamp_sec: f32,
    pub best_gaze: [f32; 2],
    pub left_gaze: [f32; 2],
    pub right_gaze: [f32; 2],
    /// Left eye gaze origin in meters (x, y, z).
    pub left_origin_m: [f32; 3],
    /// Right eye gaze origin in meters (x, y, z).
    pub right_origin_m: [f32; 3],
    pub left_pupil_mm: f32,
    pub right_pupil_mm: f32,
    pub left_eyelid_mm: f32,
    pub right_eyelid_mm: f32,
}

impl SampleRecord {
    /// Decode one little-endian record.
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let f = |offset: usize| {
            f32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Self {
            flags: ValidityFlags(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            timestamp_sec: f(4),
            best_gaze: [f(8), f(12)],
            left_gaze: [f(16), f(20)],
            right_gaze: [f(24), f(28)],
            left_origin_m: [f(32), f(36), f(40)],
            right_origin_m: [f(44), f(48), f(52)],
            left_pupil_mm: f(56),
            right_pupil_mm: f(60),
            left_eyelid_mm: f(64),
            right_eyelid_mm: f(68),
        }
    }

    /// Encode into the on-disk layout.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..4].copy_from_slice(&self.flags.0.to_le_bytes());

        let floats = [
            self.timestamp_sec,
            self.best_gaze[0],
            self.best_gaze[1],
            self.left_gaze[0],
            self.left_gaze[1],
            self.right_gaze[0],
            self.right_gaze[1],
            self.left_origin_m[0],
            self.left_origin_m[1],
            self.left_origin_m[2],
            self.right_origin_m[0],
            self.right_origin_m[1],
            self.right_origin_m[2],
            self.left_pupil_mm,
            self.right_pupil_mm,
            self.left_eyelid_mm,
            self.right_eyelid_mm,
        ];
        for (i, value) in floats.iter().enumerate() {
            let offset = 4 + i * 4;
            out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Reduce this record to one gaze sample for the selected eye.
    pub fn to_gaze_sample(&self, eye: EyeSelection) -> RawGazeSample {
        let flags = self.flags;
        let usable = |bit: u32, gaze: [f32; 2]| flags.has(bit) && in_unit_range(gaze[0], gaze[1]);
        let left = usable(ValidityFlags::LEFT_GAZE, self.left_gaze);
        let right = usable(ValidityFlags::RIGHT_GAZE, self.right_gaze);
        let best = usable(ValidityFlags::BEST_GAZE, self.best_gaze);

        let gaze = match eye {
            EyeSelection::Left => left.then_some(self.left_gaze),
            EyeSelection::Right => right.then_some(self.right_gaze),
            EyeSelection::Average => match (left, right) {
                (true, true) => Some([
                    (self.left_gaze[0] + self.right_gaze[0]) * 0.5,
                    (self.left_gaze[1] + self.right_gaze[1]) * 0.5,
                ]),
                (true, false) => Some(self.left_gaze),
                (false, true) => Some(self.right_gaze),
                (false, false) => best.then_some(self.best_gaze),
            },
        };

        let (x_norm, y_norm, valid) = match gaze {
            Some([x, y]) => (x, y, true),
            None => (0.0, 0.0, false),
        };

        RawGazeSample {
            time_sec: self.timestamp_sec as f64,
            x_norm,
            y_norm,
            distance_m: self.eye_distance_m(),
            valid,
            eyelid_open_valid: !self.eyelid_closed(eye),
        }
        .sanitized()
    }

    /// Eye-to-screen distance from the gaze origins, 0 if neither is usable.
    pub fn eye_distance_m(&self) -> f32 {
        let usable = |bit: u32, z: f32| self.flags.has(bit) && z.is_finite() && z > 0.0;
        let left = usable(ValidityFlags::LEFT_ORIGIN, self.left_origin_m[2]);
        let right = usable(ValidityFlags::RIGHT_ORIGIN, self.right_origin_m[2]);

        match (left, right) {
            (true, true) => (self.left_origin_m[2] + self.right_origin_m[2]) * 0.5,
            (true, false) => self.left_origin_m[2],
            (false, true) => self.right_origin_m[2],
            (false, false) => 0.0,
        }
    }

    fn eyelid_closed(&self, eye: EyeSelection) -> bool {
        let closed =
            |bit: u32, mm: f32| self.flags.has(bit) && mm.is_finite() && mm <= CLOSED_EYELID_MM;
        let left = closed(ValidityFlags::LEFT_EYELID, self.left_eyelid_mm);
        let right = closed(ValidityFlags::RIGHT_EYELID, self.right_eyelid_mm);

        match eye {
            EyeSelection::Left => left,
            EyeSelection::Right => right,
            EyeSelection::Average => left || right,
        }
    }
}

/// Decode every complete record in `bytes`; a partial tail is discarded.
pub fn decode_records(bytes: &[u8]) -> Vec<SampleRecord> {
    bytes
        .chunks_exact(RECORD_SIZE)
        .filter_map(|chunk| <&[u8; RECORD_SIZE]>::try_from(chunk).ok())
        .map(SampleRecord::decode)
        .collect()
}

/// Read a whole record stream until EOF.
pub fn read_records<R: Read>(mut reader: R) -> std::io::Result<Vec<SampleRecord>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(decode_records(&bytes))
}

/// Convert records to gaze samples, dropping non-increasing timestamps.
pub fn samples_from_records(records: &[SampleRecord], eye: EyeSelection) -> Vec<RawGazeSample> {
    let mut samples: Vec<RawGazeSample> = Vec::with_capacity(records.len());

    for record in records {
        let sample = record.to_gaze_sample(eye);
        if !sample.time_sec.is_finite() {
            continue;
        }
        if samples
            .last()
            .map(|prev| sample.time_sec <= prev.time_sec)
            .unwrap_or(false)
        {
            continue;
        }
        samples.push(sample);
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binocular_record(t: f32, lx: f32, rx: f32) -> SampleRecord {
        SampleRecord {
            flags: ValidityFlags(
                ValidityFlags::BEST_GAZE
                    | ValidityFlags::LEFT_GAZE
                    | ValidityFlags::RIGHT_GAZE
                    | ValidityFlags::LEFT_ORIGIN
                    | ValidityFlags::RIGHT_ORIGIN,
            ),
            timestamp_sec: t,
            best_gaze: [0.5, 0.5],
            left_gaze: [lx, 0.4],
            right_gaze: [rx, 0.6],
            left_origin_m: [-0.03, 0.0, 0.60],
            right_origin_m: [0.03, 0.0, 0.64],
            ..SampleRecord::default()
        }
    }

    #[test]
    fn test_record_encode_decode() {
        let record = binocular_record(1.25, 0.2, 0.3);
        let decoded = SampleRecord::decode(&record.encode());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_partial_trailing_record_is_dropped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&binocular_record(0.0, 0.2, 0.3).encode());
        bytes.extend_from_slice(&binocular_record(0.01, 0.2, 0.3).encode());
        bytes.extend_from_slice(&[0u8; 17]);

        let records = decode_records(&bytes);
        assert_eq!(records.len(), 2);

        let from_reader = read_records(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(from_reader.len(), 2);
    }

    #[test]
    fn test_eye_selection() {
        let record = binocular_record(0.0, 0.2, 0.4);

        let left = record.to_gaze_sample(EyeSelection::Left);
        assert!(left.valid);
        assert!((left.x_norm - 0.2).abs() < 1e-6);

        let right = record.to_gaze_sample(EyeSelection::Right);
        assert!((right.y_norm - 0.6).abs() < 1e-6);

        let avg = record.to_gaze_sample(EyeSelection::Average);
        assert!((avg.x_norm - 0.3).abs() < 1e-6);
        assert!((avg.y_norm - 0.5).abs() < 1e-6);
        assert!((avg.distance_m - 0.62).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_overrides_validity_flag() {
        let record = binocular_record(0.0, 1.4, 0.3);
        let left = record.to_gaze_sample(EyeSelection::Left);
        assert!(!left.valid);

        // Average falls back to the remaining usable eye
        let avg = record.to_gaze_sample(EyeSelection::Average);
        assert!(avg.valid);
        assert!((avg.x_norm - 0.3).abs() < 1e-6);

        let nan = RawGazeSample::new(0.0, f32::NAN, 0.5, 0.6);
        assert!(!nan.valid);
    }

    #[test]
    fn test_closed_eyelid_marks_blink() {
        let mut record = binocular_record(0.0, 0.2, 0.3);
        record.flags.0 |= ValidityFlags::LEFT_EYELID | ValidityFlags::RIGHT_EYELID;
        record.left_eyelid_mm = 9.0;
        record.right_eyelid_mm = 0.1;

        assert!(record.to_gaze_sample(EyeSelection::Left).eyelid_open_valid);
        assert!(!record.to_gaze_sample(EyeSelection::Right).eyelid_open_valid);
        assert!(!record.to_gaze_sample(EyeSelection::Average).eyelid_open_valid);
    }

    #[test]
    fn test_distance_falls_back_to_single_eye() {
        let mut record = binocular_record(0.0, 0.2, 0.3);
        record.flags.0 &= !ValidityFlags::RIGHT_ORIGIN;
        assert!((record.eye_distance_m() - 0.60).abs() < 1e-6);

        record.flags.0 &= !ValidityFlags::LEFT_ORIGIN;
        assert_eq!(record.eye_distance_m(), 0.0);
    }

    #[test]
    fn test_non_increasing_timestamps_are_dropped() {
        let records = vec![
            binocular_record(0.00, 0.2, 0.3),
            binocular_record(0.01, 0.2, 0.3),
            binocular_record(0.01, 0.2, 0.3),
            binocular_record(0.005, 0.2, 0.3),
            binocular_record(0.02, 0.2, 0.3),
        ];
        let samples = samples_from_records(&records, EyeSelection::Average);
        assert_eq!(samples.len(), 3);
        assert!(samples.windows(2).all(|w| w[1].time_sec > w[0].time_sec));
    }
}
