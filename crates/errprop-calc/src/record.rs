//! Sparse per-element dependency on error sources.
//!
//! A record pairs an integer name array with a derivative array of the same
//! shape. Every element names at most one source (or [`NO_SOURCE`]) together
//! with the sensitivity of the value at that element to the source.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::AddAssign;

use errprop_core::shape;
use errprop_core::{
    DType, ErrorInfo, NumArray, PropError, Region, ResolvedRegion, SourceId, SourceIdRange,
    NO_SOURCE,
};
use ndarray::{ArrayD, ArrayViewMutD, IxDyn, Zip};
use num_complex::Complex64;

/// One layer of an uncertainty profile.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRecord {
    names: ArrayD<u64>,
    derivatives: NumArray,
}

impl DependencyRecord {
    /// Pairs a name array with a derivative array of the same shape.
    pub fn new(names: ArrayD<u64>, derivatives: NumArray) -> Result<Self, PropError> {
        if names.shape() != derivatives.shape() {
            return Err(PropError::shape_mismatch(
                "record-shape",
                "names and derivatives must share a shape",
                names.shape(),
                derivatives.shape(),
            ));
        }
        Ok(Self { names, derivatives })
    }

    /// Record of the given shape that references no source.
    pub fn empty(dtype: DType, shape: &[usize]) -> Self {
        Self {
            names: ArrayD::zeros(IxDyn(shape)),
            derivatives: NumArray::zeros(dtype, shape),
        }
    }

    /// Record assigning one fresh source per element, in row-major order.
    pub fn fresh(ids: SourceIdRange, derivatives: NumArray) -> Result<Self, PropError> {
        if ids.len() != derivatives.len() {
            return Err(PropError::ShapeMismatch(
                ErrorInfo::new("id-count", "one source id is required per element")
                    .with_context("ids", ids.len().to_string())
                    .with_context("elements", derivatives.len().to_string()),
            ));
        }
        let names = ArrayD::from_shape_vec(IxDyn(derivatives.shape()), ids.raw().collect())
            .map_err(|_| {
                PropError::shape_mismatch(
                    "record-shape",
                    "id block does not fit the shape",
                    &[ids.len()],
                    derivatives.shape(),
                )
            })?;
        Self::new(names, derivatives)
    }

    /// Shape shared by names and derivatives.
    pub fn shape(&self) -> &[usize] {
        self.names.shape()
    }

    /// Element type of the derivatives.
    pub fn dtype(&self) -> DType {
        self.derivatives.dtype()
    }

    /// Raw source names, [`NO_SOURCE`] marking empty slots.
    pub fn names(&self) -> &ArrayD<u64> {
        &self.names
    }

    /// Sensitivities paired with the names.
    pub fn derivatives(&self) -> &NumArray {
        &self.derivatives
    }

    /// Source referenced at `index`, if any.
    pub fn source_at(&self, index: &[usize]) -> Option<SourceId> {
        self.names
            .get(IxDyn(index))
            .copied()
            .and_then(SourceId::from_raw)
    }

    /// Distinct sources referenced anywhere in the record.
    pub fn sources(&self) -> BTreeSet<SourceId> {
        self.names
            .iter()
            .copied()
            .filter_map(SourceId::from_raw)
            .collect()
    }

    /// Returns `true` when no element references a source.
    pub fn is_empty(&self) -> bool {
        self.names.iter().all(|&name| name == NO_SOURCE)
    }

    /// Returns `true` when at least one element references a source.
    pub fn is_nonempty(&self) -> bool {
        !self.is_empty()
    }

    /// Per-element variance contribution, `derivative²`.
    pub fn variance(&self) -> Result<ArrayD<f64>, PropError> {
        match &self.derivatives {
            NumArray::Real(d) => Ok(d.mapv(|x| x * x)),
            NumArray::Complex(_) => Err(complex_variance()),
        }
    }

    /// Chain rule: a new record with `derivatives * factor`, names broadcast
    /// to the result shape.
    pub fn scale(&self, factor: &NumArray) -> Result<Self, PropError> {
        let derivatives = self.derivatives.mul(factor)?;
        let names = shape::broadcast_array(&self.names, derivatives.shape())?;
        Self::new(names, derivatives)
    }

    /// Folds `other` into `region` of this record (the whole record by default).
    ///
    /// Slots already naming the same source accumulate the derivative; empty
    /// slots take over the incoming source. Returns the remnant of `other`
    /// (broadcast to the region shape) with every consumed element zeroed.
    pub fn merge_into(
        &mut self,
        other: DependencyRecord,
        region: Option<&Region>,
    ) -> Result<Self, PropError> {
        let resolved = region.map(|r| r.resolve(self.shape())).transpose()?;
        self.merge_resolved(other, resolved.as_ref())
    }

    pub(crate) fn merge_resolved(
        &mut self,
        other: DependencyRecord,
        region: Option<&ResolvedRegion>,
    ) -> Result<Self, PropError> {
        let region = self.region_or_full(region)?;
        let mut other = other.broadcast_to(region.shape())?;
        let dtype = self.dtype().promote(other.dtype());
        if self.derivatives.widen_to(dtype) {
            tracing::debug!(
                from = %DType::Float64,
                to = %dtype,
                "widened record derivatives for merge"
            );
        }
        other.derivatives.widen_to(dtype);

        let names = self.names.slice_mut(region.as_slice_info());
        match (&mut self.derivatives, &mut other.derivatives) {
            (NumArray::Real(own), NumArray::Real(incoming)) => fold_slots(
                names,
                own.slice_mut(region.as_slice_info()),
                &mut other.names,
                incoming,
                0.0,
            ),
            (NumArray::Complex(own), NumArray::Complex(incoming)) => fold_slots(
                names,
                own.slice_mut(region.as_slice_info()),
                &mut other.names,
                incoming,
                Complex64::new(0.0, 0.0),
            ),
            _ => {
                return Err(PropError::invalid_operation(
                    "dtype-mismatch",
                    "derivative dtypes diverged after promotion",
                ))
            }
        }
        Ok(other)
    }

    /// Zeroes names and derivatives inside `region` (everything by default).
    pub fn clear(&mut self, region: Option<&Region>) -> Result<(), PropError> {
        let resolved = region.map(|r| r.resolve(self.shape())).transpose()?;
        self.clear_resolved(resolved.as_ref())
    }

    pub(crate) fn clear_resolved(
        &mut self,
        region: Option<&ResolvedRegion>,
    ) -> Result<(), PropError> {
        let region = self.region_or_full(region)?;
        shape::fill_array(&mut self.names, &region, NO_SOURCE);
        self.derivatives.clear(&region);
        Ok(())
    }

    fn region_or_full<'a>(
        &self,
        region: Option<&'a ResolvedRegion>,
    ) -> Result<Cow<'a, ResolvedRegion>, PropError> {
        match region {
            Some(region) => Ok(Cow::Borrowed(region)),
            None => Region::full().resolve(self.shape()).map(Cow::Owned),
        }
    }

    /// Sub-record selected by `region`.
    pub fn select(&self, region: &Region) -> Result<Self, PropError> {
        let resolved = region.resolve(self.shape())?;
        Ok(self.select_resolved(&resolved))
    }

    pub(crate) fn select_resolved(&self, region: &ResolvedRegion) -> Self {
        Self {
            names: shape::select_array(&self.names, region),
            derivatives: self.derivatives.select(region),
        }
    }

    /// Broadcasts names and derivatives together, so each broadcast copy
    /// keeps naming the same source.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Self, PropError> {
        if self.shape() == target {
            return Ok(self.clone());
        }
        Ok(Self {
            names: shape::broadcast_array(&self.names, target)?,
            derivatives: self.derivatives.broadcast_to(target)?,
        })
    }

    /// Row-major reshape of both arrays.
    pub fn reshape(&self, target: &[usize]) -> Result<Self, PropError> {
        Ok(Self {
            names: shape::reshape_array(&self.names, target)?,
            derivatives: self.derivatives.reshape(target)?,
        })
    }

    /// Axis permutation of both arrays; `None` reverses the axes.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Self, PropError> {
        Ok(Self {
            names: shape::transpose_array(&self.names, axes)?,
            derivatives: self.derivatives.transpose(axes)?,
        })
    }

    /// Repeats every element `count` times along `axis`.
    pub fn repeat(&self, count: usize, axis: usize) -> Result<Self, PropError> {
        Ok(Self {
            names: shape::repeat_array(&self.names, count, axis)?,
            derivatives: self.derivatives.repeat(count, axis)?,
        })
    }

    /// Same sources with the real part of each derivative.
    pub fn real(&self) -> Self {
        self.with_derivatives(self.derivatives.real())
    }

    /// Same sources with the imaginary part of each derivative.
    pub fn imag(&self) -> Self {
        self.with_derivatives(self.derivatives.imag())
    }

    /// Same sources with conjugated derivatives.
    pub fn conj(&self) -> Self {
        self.with_derivatives(self.derivatives.conj())
    }

    fn with_derivatives(&self, derivatives: NumArray) -> Self {
        Self {
            names: self.names.clone(),
            derivatives,
        }
    }

    /// Elementwise covariance contributed by sources both records share at
    /// the same position. Both records must have the same shape.
    pub fn covariance_with(&self, other: &DependencyRecord) -> Result<ArrayD<f64>, PropError> {
        if self.shape() != other.shape() {
            return Err(PropError::shape_mismatch(
                "record-shape",
                "covariance requires records of equal shape",
                self.shape(),
                other.shape(),
            ));
        }
        let (NumArray::Real(lhs), NumArray::Real(rhs)) = (&self.derivatives, &other.derivatives)
        else {
            return Err(complex_variance());
        };
        Ok(Zip::from(&self.names)
            .and(&other.names)
            .and(lhs)
            .and(rhs)
            .map_collect(|&a, &b, &da, &db| {
                if a != NO_SOURCE && a == b {
                    da * db
                } else {
                    0.0
                }
            }))
    }
}

fn fold_slots<T>(
    names: ArrayViewMutD<'_, u64>,
    derivatives: ArrayViewMutD<'_, T>,
    other_names: &mut ArrayD<u64>,
    other_derivatives: &mut ArrayD<T>,
    zero: T,
) where
    T: Copy + AddAssign,
{
    Zip::from(names)
        .and(derivatives)
        .and(other_names)
        .and(other_derivatives)
        .for_each(|name, derivative, other_name, other_derivative| {
            if *other_name == NO_SOURCE {
                return;
            }
            if *name == *other_name {
                *derivative += *other_derivative;
            } else if *name == NO_SOURCE {
                *name = *other_name;
                *derivative = *other_derivative;
            } else {
                return;
            }
            *other_name = NO_SOURCE;
            *other_derivative = zero;
        });
}

fn complex_variance() -> PropError {
    PropError::InvalidOperation(
        ErrorInfo::new(
            "complex-variance",
            "variance is undefined for complex sensitivities",
        )
        .with_hint("take .real() or .imag() of the value first"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(names: Vec<u64>, derivatives: Vec<f64>) -> DependencyRecord {
        let shape = [names.len()];
        DependencyRecord::new(
            ArrayD::from_shape_vec(IxDyn(&shape), names).unwrap(),
            NumArray::from(derivatives),
        )
        .unwrap()
    }

    fn scalar_record(name: u64, derivative: f64) -> DependencyRecord {
        let names = ArrayD::from_elem(IxDyn(&[]), name);
        DependencyRecord::new(names, NumArray::scalar(derivative)).unwrap()
    }

    fn reals(record: &DependencyRecord) -> &[f64] {
        record.derivatives().as_real().unwrap().as_slice().unwrap()
    }

    #[test]
    fn merge_matches_then_fills_then_leaves_remnant() {
        let mut own = record(vec![1, 0, 2], vec![0.5, 0.0, 1.0]);
        let incoming = record(vec![1, 3, 4], vec![0.25, 2.0, 3.0]);
        let remnant = own.merge_into(incoming, None).unwrap();

        assert_eq!(own.names().as_slice().unwrap(), &[1, 3, 2]);
        assert_eq!(reals(&own), &[0.75, 2.0, 1.0]);
        assert_eq!(remnant.names().as_slice().unwrap(), &[0, 0, 4]);
        assert_eq!(reals(&remnant), &[0.0, 0.0, 3.0]);
    }

    #[test]
    fn merge_into_region_broadcasts_incoming() {
        let mut own = DependencyRecord::empty(DType::Float64, &[4]);
        let scalar = scalar_record(7, 0.1);
        let remnant = own.merge_into(scalar, Some(&Region::range(1, 3))).unwrap();
        assert!(remnant.is_empty());
        assert_eq!(own.names().as_slice().unwrap(), &[0, 7, 7, 0]);
    }

    #[test]
    fn merge_rejects_unbroadcastable_region() {
        let mut own = DependencyRecord::empty(DType::Float64, &[4]);
        let incoming = record(vec![1, 2, 3], vec![1.0; 3]);
        let err = own.merge_into(incoming, Some(&Region::range(0, 2))).unwrap_err();
        assert!(matches!(err, PropError::ShapeMismatch(_)));
    }

    #[test]
    fn complex_merge_widens_real_record() {
        let mut own = record(vec![1], vec![1.0]);
        let incoming = DependencyRecord::new(
            ArrayD::from_elem(IxDyn(&[1]), 1),
            NumArray::Complex(ArrayD::from_elem(IxDyn(&[1]), Complex64::new(0.0, 1.0))),
        )
        .unwrap();
        own.merge_into(incoming, None).unwrap();
        assert_eq!(own.dtype(), DType::Complex128);
        assert_eq!(own.variance().unwrap_err().info().code, "complex-variance");
        assert_eq!(own.real().variance().unwrap().as_slice().unwrap(), &[1.0]);
    }

    #[test]
    fn scale_broadcasts_names() {
        let scalar = scalar_record(9, 2.0);
        let scaled = scalar.scale(&NumArray::from(vec![1.0, -1.0, 0.5])).unwrap();
        assert_eq!(scaled.names().as_slice().unwrap(), &[9, 9, 9]);
        assert_eq!(reals(&scaled), &[2.0, -2.0, 1.0]);
        assert_eq!(scalar.shape(), &[] as &[usize]);
    }

    #[test]
    fn clear_region_only() {
        let mut own = record(vec![1, 2, 3], vec![1.0, 2.0, 3.0]);
        own.clear(Some(&Region::index(1))).unwrap();
        assert_eq!(own.names().as_slice().unwrap(), &[1, 0, 3]);
        assert_eq!(reals(&own), &[1.0, 0.0, 3.0]);
        own.clear(None).unwrap();
        assert!(own.is_empty());
    }
}
