#![deny(missing_docs)]
#![doc = include_str!("../docs/propagation.md")]

//! Linear uncertainty propagation over dtype-tagged arrays.

pub mod context;
pub mod ops;
pub mod profile;
pub mod record;
pub mod ufunc;
pub mod value;

pub use context::UncertaintyContext;
pub use profile::{ProfileBuilder, UncertaintyProfile};
pub use record::DependencyRecord;
pub use ufunc::{lookup, BinaryUfunc, Ufunc, UnaryUfunc, BINARY_UFUNCS, UNARY_UFUNCS};
pub use value::{Operand, UncertainValue, ValueParts};

/// Re-export of the shared building blocks.
pub use errprop_core::{
    AxisSlice, CalculusConfig, Complex64, DType, ErrorInfo, NumArray, PropError, Region, SourceId,
    SourceIdGenerator,
};
