//! Status document posted to the backend for every reading.

use serde::{Deserialize, Serialize};

/// Temperature sent in every document; the device has no temperature sensor.
pub const PLACEHOLDER_TEMPERATURE: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A single fill-level reading handed over by the sensing side.
pub struct Measurement {
    /// Non-recyclable waste fill percentage. Range is the producer's business.
    pub fill_level: f32,
}

impl Measurement {
    /// Wrap a raw reading.
    #[must_use]
    pub fn new(fill_level: f32) -> Self {
        Self { fill_level }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Four-category bin snapshot in the shape the backend expects.
///
/// Only `non_recyclable` is measured. The other categories are always zero and
/// `temperature` is always [`PLACEHOLDER_TEMPERATURE`].
pub struct BinStatus {
    /// Measured fill level of the non-recyclable compartment.
    pub non_recyclable: f32,
    /// Recyclable compartment, not measured.
    pub recyclable: u32,
    /// Organic compartment, not measured.
    pub organic: u32,
    /// Ambient temperature placeholder.
    pub temperature: f32,
}

impl BinStatus {
    /// Build the snapshot for one fill-level reading.
    #[must_use]
    pub fn from_fill_level(fill_level: f32) -> Self {
        Self {
            non_recyclable: fill_level,
            recyclable: 0,
            organic: 0,
            temperature: PLACEHOLDER_TEMPERATURE,
        }
    }

    /// Serialize into the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<Measurement> for BinStatus {
    fn from(measurement: Measurement) -> Self {
        Self::from_fill_level(measurement.fill_level)
    }
}
