//! Core types and delivery pipeline for the binwatch fill-level reporter.

/// Wire document and measurement types.
pub mod model;
/// Result of a single reporting call and its failure taxonomy.
pub mod outcome;
/// Traits describing the transport and measurement collaborators.
pub mod ports;
/// The telemetry reporter itself.
pub mod reporter;
/// Layered settings for the backend endpoint and delivery policy.
pub mod settings;

pub use model::*;
pub use outcome::*;
pub use ports::*;
pub use reporter::*;
pub use settings::*;
