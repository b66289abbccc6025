// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Isotherm generation - derived constant-temperature lines over the range

use serde::{Deserialize, Serialize};

use super::TemperatureRange;

/// Isotherm generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsothermSettings {
    /// Regenerate isotherms whenever the range or spacing changes
    pub auto_generate: bool,

    /// °C between consecutive isotherms
    pub spacing: f64,
}

impl Default for IsothermSettings {
    fn default() -> Self {
        Self {
            auto_generate: true,
            spacing: 10.0,
        }
    }
}

/// One derived line of constant temperature. Purely presentational state,
/// recomputed whenever the range or spacing changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isotherm {
    /// Temperature of the line (°C)
    pub temperature: f64,

    /// Hex color along the blue→red gradient, keyed by position in range
    pub color: String,

    /// Display label
    pub label: String,
}

/// One isotherm per `spacing`-interval crossing inside the range, colored
/// along a blue→red gradient by normalized position.
pub fn generate_isotherms(range: &TemperatureRange, settings: &IsothermSettings) -> Vec<Isotherm> {
    if settings.spacing <= 0.0 {
        return Vec::new();
    }

    let mut isotherms = Vec::new();
    let first = (range.min / settings.spacing).ceil() * settings.spacing;
    let mut temp = first;
    while temp <= range.max + 1e-9 {
        let normalized = (temp - range.min) / range.span();
        isotherms.push(Isotherm {
            temperature: temp,
            color: gradient_color(normalized),
            label: format!("{temp:.0}°C"),
        });
        temp += settings.spacing;
    }
    isotherms
}

/// Blue→red gradient: cold maps to blue, hot maps to red, with a dim green
/// midpoint so mid-range lines stay readable.
fn gradient_color(normalized: f64) -> String {
    let t = normalized.clamp(0.0, 1.0);
    let r = (255.0 * t).round() as u8;
    let g = (96.0 * (1.0 - (2.0 * t - 1.0).abs())).round() as u8;
    let b = (255.0 * (1.0 - t)).round() as u8;
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotherms_cover_spacing_crossings() {
        let range = TemperatureRange::new(0.0, 100.0).unwrap();
        let settings = IsothermSettings {
            auto_generate: true,
            spacing: 25.0,
        };
        let isotherms = generate_isotherms(&range, &settings);
        let temps: Vec<f64> = isotherms.iter().map(|i| i.temperature).collect();
        assert_eq!(temps, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn test_gradient_endpoints() {
        let range = TemperatureRange::new(0.0, 50.0).unwrap();
        let settings = IsothermSettings {
            auto_generate: true,
            spacing: 50.0,
        };
        let isotherms = generate_isotherms(&range, &settings);
        assert_eq!(isotherms.first().unwrap().color, "#0000ff");
        assert_eq!(isotherms.last().unwrap().color, "#ff0000");
    }

    #[test]
    fn test_misaligned_range_starts_at_first_crossing() {
        let range = TemperatureRange::new(13.0, 42.0).unwrap();
        let settings = IsothermSettings {
            auto_generate: true,
            spacing: 10.0,
        };
        let temps: Vec<f64> = generate_isotherms(&range, &settings)
            .iter()
            .map(|i| i.temperature)
            .collect();
        assert_eq!(temps, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_zero_spacing_yields_nothing() {
        let range = TemperatureRange::new(0.0, 100.0).unwrap();
        let settings = IsothermSettings {
            auto_generate: true,
            spacing: 0.0,
        };
        assert!(generate_isotherms(&range, &settings).is_empty());
    }
}
