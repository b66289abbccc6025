// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermalert-rs

//! Error taxonomy for the thermal alert engine

use thiserror::Error;

/// Engine-level errors.
///
/// Nothing in this taxonomy is fatal to the process: a `Configuration` error
/// leaves state untouched, an `Evaluation` error degrades a single rule for a
/// single frame, and a `Data` error drops samples while the frame is still
/// evaluated on a best-effort basis.
#[derive(Debug, Error)]
pub enum ThermalError {
    /// Invalid configuration: bad range, unknown id on update/remove.
    /// The operation fails without mutating any state.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single detector failed while evaluating one rule against one frame.
    /// Caught and logged; remaining rules still run.
    #[error("evaluation error for rule '{rule_id}': {message}")]
    Evaluation {
        /// The rule whose detector failed
        rule_id: String,
        /// What went wrong
        message: String,
    },

    /// Frame data is inconsistent (dimension mismatch) or implausible.
    #[error("data error: {0}")]
    Data(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ThermalError>;

impl ThermalError {
    /// Shorthand for a configuration failure.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Shorthand for a data failure.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }
}
