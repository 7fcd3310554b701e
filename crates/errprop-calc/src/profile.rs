//! Aggregate uncertainty: the ordered set of dependency records of a value.

use std::collections::BTreeSet;

use errprop_core::shape::broadcast_shapes;
use errprop_core::{DType, NumArray, PropError, Region, ResolvedRegion, SourceId};
use ndarray::{ArrayD, IxDyn};

use crate::record::DependencyRecord;

/// Immutable uncertainty profile. All records share [`shape`](Self::shape).
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyProfile {
    shape: Vec<usize>,
    records: Vec<DependencyRecord>,
}

impl UncertaintyProfile {
    /// Profile of an exactly known value.
    pub fn empty(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            records: Vec::new(),
        }
    }

    /// Shape shared by every record.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The records, in merge order.
    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    /// Returns `true` when no record references a source.
    pub fn is_exact(&self) -> bool {
        self.records.iter().all(DependencyRecord::is_empty)
    }

    /// Widest derivative dtype across records, `None` for an empty profile.
    pub fn dtype(&self) -> Option<DType> {
        self.records
            .iter()
            .map(DependencyRecord::dtype)
            .reduce(DType::promote)
    }

    /// Distinct sources referenced by any record.
    pub fn sources(&self) -> BTreeSet<SourceId> {
        self.records
            .iter()
            .flat_map(DependencyRecord::sources)
            .collect()
    }

    /// Elementwise sum of every record's variance.
    pub fn variance(&self) -> Result<ArrayD<f64>, PropError> {
        let mut total = ArrayD::zeros(IxDyn(&self.shape));
        for record in &self.records {
            total += &record.variance()?;
        }
        Ok(total)
    }

    /// Scales every record by `factor`; the result has the broadcast shape.
    pub fn scale(&self, factor: &NumArray) -> Result<Self, PropError> {
        let shape = broadcast_shapes(&self.shape, factor.shape())?;
        let records = self
            .records
            .iter()
            .map(|record| record.scale(factor)?.broadcast_to(&shape))
            .collect::<Result<_, _>>()?;
        Ok(Self { shape, records })
    }

    /// Elementwise covariance with `other` after broadcasting both profiles.
    pub fn covariance(&self, other: &UncertaintyProfile) -> Result<ArrayD<f64>, PropError> {
        let shape = broadcast_shapes(&self.shape, &other.shape)?;
        let lhs = self.broadcast_to(&shape)?;
        let rhs = other.broadcast_to(&shape)?;
        let mut total = ArrayD::zeros(IxDyn(&shape));
        for a in &lhs.records {
            for b in &rhs.records {
                total += &a.covariance_with(b)?;
            }
        }
        Ok(total)
    }

    /// Sub-profile selected by `region`.
    pub fn select(&self, region: &Region) -> Result<Self, PropError> {
        let resolved = region.resolve(&self.shape)?;
        Ok(self.select_resolved(&resolved))
    }

    pub(crate) fn select_resolved(&self, region: &ResolvedRegion) -> Self {
        Self {
            shape: region.shape().to_vec(),
            records: self
                .records
                .iter()
                .map(|r| r.select_resolved(region))
                .collect(),
        }
    }

    /// Broadcast to a larger shape, names included.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, PropError> {
        self.map_records(shape, |record| record.broadcast_to(shape))
    }

    /// Row-major reshape of every record.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, PropError> {
        let target = NumArray::zeros(DType::Float64, &self.shape).reshape(shape)?;
        self.map_records(target.shape(), |record| record.reshape(shape))
    }

    /// Axis permutation of every record.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Self, PropError> {
        let target = NumArray::zeros(DType::Float64, &self.shape).transpose(axes)?;
        self.map_records(target.shape(), |record| record.transpose(axes))
    }

    /// Repeats every element `count` times along `axis`.
    pub fn repeat(&self, count: usize, axis: usize) -> Result<Self, PropError> {
        let target = NumArray::zeros(DType::Float64, &self.shape).repeat(count, axis)?;
        self.map_records(target.shape(), |record| record.repeat(count, axis))
    }

    /// Real part of every derivative.
    pub fn real(&self) -> Self {
        self.map_infallible(DependencyRecord::real)
    }

    /// Imaginary part of every derivative.
    pub fn imag(&self) -> Self {
        self.map_infallible(DependencyRecord::imag)
    }

    /// Conjugate of every derivative.
    pub fn conj(&self) -> Self {
        self.map_infallible(DependencyRecord::conj)
    }

    /// Hands the records to a builder for in-place editing.
    pub fn into_builder(self) -> ProfileBuilder {
        ProfileBuilder {
            shape: self.shape,
            records: self.records,
        }
    }

    fn map_records<F>(&self, shape: &[usize], f: F) -> Result<Self, PropError>
    where
        F: Fn(&DependencyRecord) -> Result<DependencyRecord, PropError>,
    {
        Ok(Self {
            shape: shape.to_vec(),
            records: self.records.iter().map(f).collect::<Result<_, _>>()?,
        })
    }

    fn map_infallible<F>(&self, f: F) -> Self
    where
        F: Fn(&DependencyRecord) -> DependencyRecord,
    {
        Self {
            shape: self.shape.clone(),
            records: self.records.iter().map(f).collect(),
        }
    }
}

/// Mutable profile under construction.
///
/// Only a builder can be merged into. A builder is never shared: it belongs
/// to the value being built (or re-assigned) until [`finish`](Self::finish)
/// freezes it.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    shape: Vec<usize>,
    records: Vec<DependencyRecord>,
}

impl ProfileBuilder {
    /// Empty builder for values of `shape`.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            records: Vec::new(),
        }
    }

    /// Shape of the profile being built.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Appends a record verbatim; its shape must equal the builder's.
    pub fn append(&mut self, record: DependencyRecord) -> Result<(), PropError> {
        if record.shape() != self.shape.as_slice() {
            return Err(PropError::shape_mismatch(
                "record-shape",
                "appended record must match the profile shape",
                &self.shape,
                record.shape(),
            ));
        }
        self.records.push(record);
        Ok(())
    }

    /// Folds every record of `other` into `region` (the whole profile by default).
    pub fn merge_into(
        &mut self,
        other: UncertaintyProfile,
        region: Option<&Region>,
    ) -> Result<(), PropError> {
        let resolved = region.map(|r| r.resolve(&self.shape)).transpose()?;
        for record in other.records {
            self.merge_resolved(record, resolved.as_ref())?;
        }
        Ok(())
    }

    /// Folds a single record into `region`.
    pub fn merge_record(
        &mut self,
        record: DependencyRecord,
        region: Option<&Region>,
    ) -> Result<(), PropError> {
        let resolved = region.map(|r| r.resolve(&self.shape)).transpose()?;
        self.merge_resolved(record, resolved.as_ref())
    }

    fn merge_resolved(
        &mut self,
        record: DependencyRecord,
        region: Option<&ResolvedRegion>,
    ) -> Result<(), PropError> {
        let mut remnant = record;
        for own in &mut self.records {
            if remnant.is_empty() {
                return Ok(());
            }
            remnant = own.merge_resolved(remnant, region)?;
        }
        if remnant.is_empty() {
            return Ok(());
        }
        tracing::trace!(
            shape = ?self.shape,
            records = self.records.len() + 1,
            "allocating record for merge remnant"
        );
        let mut fresh = DependencyRecord::empty(remnant.dtype(), &self.shape);
        let leftover = fresh.merge_resolved(remnant, region)?;
        debug_assert!(leftover.is_empty());
        self.records.push(fresh);
        Ok(())
    }

    /// Drops every source reference inside `region` (everything by default).
    pub fn clear(&mut self, region: Option<&Region>) -> Result<(), PropError> {
        let resolved = region.map(|r| r.resolve(&self.shape)).transpose()?;
        for record in &mut self.records {
            record.clear_resolved(resolved.as_ref())?;
        }
        Ok(())
    }

    /// Freezes the builder; records left without any source are dropped.
    pub fn finish(mut self) -> UncertaintyProfile {
        self.records.retain(DependencyRecord::is_nonempty);
        UncertaintyProfile {
            shape: self.shape,
            records: self.records,
        }
    }
}
