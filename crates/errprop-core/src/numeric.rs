//! Dtype-tagged numeric arrays used for nominal values and sensitivities.

use std::borrow::Cow;
use std::fmt;

use ndarray::{Array1, ArrayD, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PropError};
use crate::region::ResolvedRegion;
use crate::shape;

/// Element type of a [`NumArray`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 64-bit IEEE floating point.
    Float64,
    /// Pair of 64-bit floats.
    Complex128,
}

impl DType {
    /// Binary promotion: the result type of combining `self` with `other`.
    pub fn promote(self, other: DType) -> DType {
        self.max(other)
    }

    /// Returns `true` for complex element types.
    pub fn is_complex(self) -> bool {
        matches!(self, DType::Complex128)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float64 => write!(f, "float64"),
            DType::Complex128 => write!(f, "complex128"),
        }
    }
}

/// N-dimensional numeric array of either real or complex elements.
#[derive(Debug, Clone, PartialEq)]
pub enum NumArray {
    /// Real-valued elements.
    Real(ArrayD<f64>),
    /// Complex-valued elements.
    Complex(ArrayD<Complex64>),
}

impl NumArray {
    /// Zero-filled array of the given dtype and shape.
    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        match dtype {
            DType::Float64 => NumArray::Real(ArrayD::zeros(IxDyn(shape))),
            DType::Complex128 => NumArray::Complex(ArrayD::zeros(IxDyn(shape))),
        }
    }

    /// Zero-dimensional real array.
    pub fn scalar(value: f64) -> Self {
        NumArray::Real(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Real array from row-major data.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f64>) -> Result<Self, PropError> {
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(NumArray::Real)
            .map_err(|_| {
                PropError::ShapeMismatch(
                    ErrorInfo::new("data-length", "data length does not match the shape")
                        .with_context("shape", format!("{shape:?}"))
                        .with_context("len", len.to_string()),
                )
            })
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        match self {
            NumArray::Real(_) => DType::Float64,
            NumArray::Complex(_) => DType::Complex128,
        }
    }

    /// Array shape.
    pub fn shape(&self) -> &[usize] {
        match self {
            NumArray::Real(a) => a.shape(),
            NumArray::Complex(a) => a.shape(),
        }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Returns `true` when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the real data, if the array is real.
    pub fn as_real(&self) -> Option<&ArrayD<f64>> {
        match self {
            NumArray::Real(a) => Some(a),
            NumArray::Complex(_) => None,
        }
    }

    /// Borrows the complex data, if the array is complex.
    pub fn as_complex(&self) -> Option<&ArrayD<Complex64>> {
        match self {
            NumArray::Complex(a) => Some(a),
            NumArray::Real(_) => None,
        }
    }

    /// Complex view of the data, converting real arrays on the fly.
    pub fn to_complex(&self) -> Cow<'_, ArrayD<Complex64>> {
        match self {
            NumArray::Real(a) => Cow::Owned(a.mapv(|re| Complex64::new(re, 0.0))),
            NumArray::Complex(a) => Cow::Borrowed(a),
        }
    }

    /// Converts to `dtype`.
    ///
    /// Widening always succeeds. Narrowing complex to real is only permitted
    /// when every imaginary part is exactly zero, so no data is ever dropped.
    pub fn cast(&self, dtype: DType) -> Result<NumArray, PropError> {
        match (self, dtype) {
            (NumArray::Real(_), DType::Float64) | (NumArray::Complex(_), DType::Complex128) => {
                Ok(self.clone())
            }
            (NumArray::Real(_), DType::Complex128) => {
                Ok(NumArray::Complex(self.to_complex().into_owned()))
            }
            (NumArray::Complex(a), DType::Float64) => {
                if a.iter().any(|c| c.im != 0.0) {
                    return Err(PropError::InvalidOperation(
                        ErrorInfo::new(
                            "narrowing-cast",
                            "complex data with imaginary parts cannot become real",
                        )
                        .with_hint("take .real() explicitly"),
                    ));
                }
                Ok(NumArray::Real(a.mapv(|c| c.re)))
            }
        }
    }

    /// Widens in place to `dtype` if it is the wider type; never narrows.
    ///
    /// Returns `true` when the representation changed.
    pub fn widen_to(&mut self, dtype: DType) -> bool {
        let widened = match (&*self, dtype) {
            (NumArray::Real(a), DType::Complex128) => a.mapv(|re| Complex64::new(re, 0.0)),
            _ => return false,
        };
        *self = NumArray::Complex(widened);
        true
    }

    /// Applies a kernel elementwise, keeping the dtype.
    pub fn map<R, C>(&self, real: R, complex: C) -> NumArray
    where
        R: Fn(f64) -> f64,
        C: Fn(Complex64) -> Complex64,
    {
        match self {
            NumArray::Real(a) => NumArray::Real(a.mapv(real)),
            NumArray::Complex(a) => NumArray::Complex(a.mapv(complex)),
        }
    }

    /// Combines two arrays elementwise with broadcasting and dtype promotion.
    pub fn zip_with<R, C>(
        &self,
        other: &NumArray,
        real: R,
        complex: C,
    ) -> Result<NumArray, PropError>
    where
        R: Fn(f64, f64) -> f64,
        C: Fn(Complex64, Complex64) -> Complex64,
    {
        match (self, other) {
            (NumArray::Real(a), NumArray::Real(b)) => {
                shape::zip_broadcast(a, b, real).map(NumArray::Real)
            }
            _ => {
                let (lhs, rhs) = (self.to_complex(), other.to_complex());
                shape::zip_broadcast(&*lhs, &*rhs, complex).map(NumArray::Complex)
            }
        }
    }

    /// Elementwise sum.
    pub fn add(&self, other: &NumArray) -> Result<NumArray, PropError> {
        self.zip_with(other, |a, b| a + b, |a, b| a + b)
    }

    /// Elementwise product.
    pub fn mul(&self, other: &NumArray) -> Result<NumArray, PropError> {
        self.zip_with(other, |a, b| a * b, |a, b| a * b)
    }

    /// Real part (a copy for real arrays).
    pub fn real(&self) -> NumArray {
        match self {
            NumArray::Real(a) => NumArray::Real(a.clone()),
            NumArray::Complex(a) => NumArray::Real(a.mapv(|c| c.re)),
        }
    }

    /// Imaginary part (zeros for real arrays).
    pub fn imag(&self) -> NumArray {
        match self {
            NumArray::Real(a) => NumArray::Real(ArrayD::zeros(a.raw_dim())),
            NumArray::Complex(a) => NumArray::Real(a.mapv(|c| c.im)),
        }
    }

    /// Complex conjugate (a copy for real arrays).
    pub fn conj(&self) -> NumArray {
        self.map(|re| re, |c| c.conj())
    }

    /// Modulus, always real.
    pub fn abs(&self) -> NumArray {
        match self {
            NumArray::Real(a) => NumArray::Real(a.mapv(f64::abs)),
            NumArray::Complex(a) => NumArray::Real(a.mapv(|c| c.norm())),
        }
    }

    /// Copies out a sub-array.
    pub fn select(&self, region: &ResolvedRegion) -> NumArray {
        match self {
            NumArray::Real(a) => NumArray::Real(shape::select_array(a, region)),
            NumArray::Complex(a) => NumArray::Complex(shape::select_array(a, region)),
        }
    }

    /// Writes `source` (broadcast) into `region`. `self` must already be at
    /// least as wide as `source`.
    pub fn assign(&mut self, region: &ResolvedRegion, source: &NumArray) -> Result<(), PropError> {
        match self {
            NumArray::Real(a) => {
                let source = source.cast(DType::Float64)?;
                let source = source.as_real().ok_or_else(narrowing)?;
                shape::assign_array(a, region, source)
            }
            NumArray::Complex(a) => shape::assign_array(a, region, &*source.to_complex()),
        }
    }

    /// Zeroes the elements inside `region`.
    pub fn clear(&mut self, region: &ResolvedRegion) {
        match self {
            NumArray::Real(a) => shape::fill_array(a, region, 0.0),
            NumArray::Complex(a) => shape::fill_array(a, region, Complex64::new(0.0, 0.0)),
        }
    }

    /// Materialised broadcast to `shape`.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<NumArray, PropError> {
        match self {
            NumArray::Real(a) => shape::broadcast_array(a, shape).map(NumArray::Real),
            NumArray::Complex(a) => shape::broadcast_array(a, shape).map(NumArray::Complex),
        }
    }

    /// Row-major reshape.
    pub fn reshape(&self, shape: &[usize]) -> Result<NumArray, PropError> {
        match self {
            NumArray::Real(a) => shape::reshape_array(a, shape).map(NumArray::Real),
            NumArray::Complex(a) => shape::reshape_array(a, shape).map(NumArray::Complex),
        }
    }

    /// Axis permutation; `None` reverses the axes.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<NumArray, PropError> {
        match self {
            NumArray::Real(a) => shape::transpose_array(a, axes).map(NumArray::Real),
            NumArray::Complex(a) => shape::transpose_array(a, axes).map(NumArray::Complex),
        }
    }

    /// Repeats each element `count` times along `axis`.
    pub fn repeat(&self, count: usize, axis: usize) -> Result<NumArray, PropError> {
        match self {
            NumArray::Real(a) => shape::repeat_array(a, count, axis).map(NumArray::Real),
            NumArray::Complex(a) => shape::repeat_array(a, count, axis).map(NumArray::Complex),
        }
    }
}

fn narrowing() -> PropError {
    PropError::invalid_operation(
        "narrowing-cast",
        "complex data cannot be written into a real array",
    )
}

impl From<ArrayD<f64>> for NumArray {
    fn from(array: ArrayD<f64>) -> Self {
        NumArray::Real(array)
    }
}

impl From<ArrayD<Complex64>> for NumArray {
    fn from(array: ArrayD<Complex64>) -> Self {
        NumArray::Complex(array)
    }
}

impl From<f64> for NumArray {
    fn from(value: f64) -> Self {
        NumArray::scalar(value)
    }
}

impl From<Complex64> for NumArray {
    fn from(value: Complex64) -> Self {
        NumArray::Complex(ArrayD::from_elem(IxDyn(&[]), value))
    }
}

impl From<Vec<f64>> for NumArray {
    fn from(values: Vec<f64>) -> Self {
        NumArray::Real(Array1::from(values).into_dyn())
    }
}
