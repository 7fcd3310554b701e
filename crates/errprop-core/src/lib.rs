//! Shared building blocks for first-order uncertainty propagation: the error
//! taxonomy, source identifiers, dtype-tagged arrays, index regions and
//! configuration.
#![deny(missing_docs)]

pub mod config;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod region;
pub mod shape;

pub use config::CalculusConfig;
pub use errors::{ErrorInfo, PropError};
pub use ids::{SourceId, SourceIdGenerator, SourceIdRange, NO_SOURCE};
pub use numeric::{DType, NumArray};
pub use region::{AxisSlice, Region, ResolvedRegion};

/// Re-export of the complex element type used by [`NumArray::Complex`].
pub use num_complex::Complex64;
