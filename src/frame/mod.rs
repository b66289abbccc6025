// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Thermal frame data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThermalError};

/// Coldest temperature the engine treats as a plausible sensor reading (°C).
pub const MIN_PLAUSIBLE_C: f64 = -100.0;

/// Hottest temperature the engine treats as a plausible sensor reading (°C).
pub const MAX_PLAUSIBLE_C: f64 = 200.0;

/// One calibrated sensor sample: a row-major temperature grid plus a
/// precomputed summary.
///
/// Immutable once produced. The caller owns the frame and passes it by
/// reference into the engine for the duration of one processing call.
/// `timestamp_ms` is a monotonic millisecond clock and `frame_number` is
/// monotonically increasing; ordering is a caller contract, not checked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalFrame {
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,

    /// Monotonically increasing frame counter
    pub frame_number: u64,

    /// Grid width in pixels
    pub width: usize,

    /// Grid height in pixels
    pub height: usize,

    /// Row-major Celsius values, length `width * height`
    pub temperature_data: Vec<f64>,

    /// Mean of `temperature_data`
    pub avg_temp: f64,

    /// Minimum of `temperature_data`
    pub min_temp: f64,

    /// Maximum of `temperature_data`
    pub max_temp: f64,

    /// Wall-clock capture time, for display/export only
    pub captured_at: DateTime<Utc>,
}

impl ThermalFrame {
    /// Build a frame from raw grid data, computing the summary fields.
    ///
    /// Fails with a `Data` error if the data length does not match the
    /// declared geometry. Width and height are always explicit; the engine
    /// never infers geometry from the data length.
    pub fn from_data(
        timestamp_ms: u64,
        frame_number: u64,
        width: usize,
        height: usize,
        temperature_data: Vec<f64>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ThermalError::data(format!(
                "frame {frame_number}: zero dimension {width}x{height}"
            )));
        }
        if temperature_data.len() != width * height {
            return Err(ThermalError::data(format!(
                "frame {}: {} samples for {}x{} grid",
                frame_number,
                temperature_data.len(),
                width,
                height
            )));
        }

        let mut min_temp = f64::MAX;
        let mut max_temp = f64::MIN;
        let mut sum = 0.0;
        for &t in &temperature_data {
            min_temp = min_temp.min(t);
            max_temp = max_temp.max(t);
            sum += t;
        }
        let avg_temp = sum / temperature_data.len() as f64;

        Ok(Self {
            timestamp_ms,
            frame_number,
            width,
            height,
            temperature_data,
            avg_temp,
            min_temp,
            max_temp,
            captured_at: Utc::now(),
        })
    }

    /// Number of pixels in the grid.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Temperature at `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.temperature_data[y * self.width + x])
    }

    /// Iterate `(x, y, temperature)` over every pixel in row-major order.
    pub fn iter_pixels(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let width = self.width;
        self.temperature_data
            .iter()
            .enumerate()
            .map(move |(i, &t)| (i % width, i / width, t))
    }

    /// True when a value is inside the plausible sensor band.
    pub fn is_plausible(temp: f64) -> bool {
        (MIN_PLAUSIBLE_C..=MAX_PLAUSIBLE_C).contains(&temp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_summary() {
        let frame = ThermalFrame::from_data(0, 1, 2, 2, vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(frame.avg_temp, 25.0);
        assert_eq!(frame.min_temp, 10.0);
        assert_eq!(frame.max_temp, 40.0);
        assert_eq!(frame.pixel_count(), 4);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let err = ThermalFrame::from_data(0, 1, 3, 2, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, ThermalError::Data(_)));
    }

    #[test]
    fn test_non_square_indexing() {
        // 4x2 grid: pixel (3, 1) is the last sample
        let data: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let frame = ThermalFrame::from_data(0, 1, 4, 2, data).unwrap();
        assert_eq!(frame.get(3, 1), Some(7.0));
        assert_eq!(frame.get(1, 0), Some(1.0));
        assert_eq!(frame.get(4, 0), None);
    }

    #[test]
    fn test_plausibility_band() {
        assert!(ThermalFrame::is_plausible(22.0));
        assert!(ThermalFrame::is_plausible(-100.0));
        assert!(!ThermalFrame::is_plausible(-140.0));
        assert!(!ThermalFrame::is_plausible(420.0));
    }
}
