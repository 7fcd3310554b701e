//! The user-facing uncertain array value.

use std::collections::BTreeSet;

use errprop_core::{DType, ErrorInfo, NumArray, PropError, Region, SourceId, SourceIdGenerator};
use ndarray::{ArrayD, IxDyn, Zip};
use num_complex::Complex64;

use crate::profile::{ProfileBuilder, UncertaintyProfile};
use crate::record::DependencyRecord;

/// Nominal array plus the profile describing its uncertainty.
///
/// Arithmetic never mutates an operand: every operation builds a fresh value.
/// Only [`set`](Self::set) and [`update_nominal`](Self::update_nominal) edit a
/// value in place, and those require exclusive access.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertainValue {
    nominal: NumArray,
    profile: UncertaintyProfile,
}

/// Loose constructor arguments, validated by [`UncertainValue::construct`].
///
/// Exactly one of these combinations is accepted:
/// `nominal + stddev`, `nominal + dependencies`, `nominal + profile`, `shape`.
#[derive(Debug, Clone, Default)]
pub struct ValueParts<'a> {
    /// Best-estimate values.
    pub nominal: Option<NumArray>,
    /// Standard deviation of fresh independent sources, one per element.
    pub stddev: Option<NumArray>,
    /// Values this one derives from, with the local partial derivatives.
    pub dependencies: Option<Vec<(&'a UncertainValue, NumArray)>>,
    /// Ready-made profile to take over.
    pub profile: Option<UncertaintyProfile>,
    /// Shape of an exactly known zero value.
    pub shape: Option<Vec<usize>>,
}

/// Either side of an operation: a plain array or an uncertain value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Exactly known numbers.
    Certain(NumArray),
    /// Value carrying an uncertainty profile.
    Uncertain(UncertainValue),
}

impl Operand {
    /// Nominal values of either variant.
    pub fn nominal(&self) -> &NumArray {
        match self {
            Operand::Certain(array) => array,
            Operand::Uncertain(value) => value.nominal(),
        }
    }

    /// The uncertain value, if this operand carries one.
    pub fn as_uncertain(&self) -> Option<&UncertainValue> {
        match self {
            Operand::Certain(_) => None,
            Operand::Uncertain(value) => Some(value),
        }
    }

    /// Converts into an uncertain value; certain arrays become exact values.
    pub fn into_uncertain(self) -> UncertainValue {
        match self {
            Operand::Certain(array) => UncertainValue::exact(array),
            Operand::Uncertain(value) => value,
        }
    }
}

impl From<NumArray> for Operand {
    fn from(array: NumArray) -> Self {
        Operand::Certain(array)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Certain(NumArray::scalar(value))
    }
}

impl From<UncertainValue> for Operand {
    fn from(value: UncertainValue) -> Self {
        Operand::Uncertain(value)
    }
}

impl UncertainValue {
    /// Validates `parts` and dispatches to the matching constructor.
    pub fn construct(ids: &SourceIdGenerator, parts: ValueParts<'_>) -> Result<Self, PropError> {
        match parts {
            ValueParts {
                nominal: Some(nominal),
                stddev: Some(stddev),
                dependencies: None,
                profile: None,
                shape: None,
            } => Self::from_stddev(ids, nominal, stddev),
            ValueParts {
                nominal: Some(nominal),
                stddev: None,
                dependencies: Some(dependencies),
                profile: None,
                shape: None,
            } => Self::from_dependencies(nominal, &dependencies),
            ValueParts {
                nominal: Some(nominal),
                stddev: None,
                dependencies: None,
                profile: Some(profile),
                shape: None,
            } => Self::from_profile(nominal, profile),
            ValueParts {
                nominal: None,
                stddev: None,
                dependencies: None,
                profile: None,
                shape: Some(shape),
            } => Ok(Self::zeros(&shape)),
            other => {
                let given: Vec<&str> = [
                    ("nominal", other.nominal.is_some()),
                    ("stddev", other.stddev.is_some()),
                    ("dependencies", other.dependencies.is_some()),
                    ("profile", other.profile.is_some()),
                    ("shape", other.shape.is_some()),
                ]
                .into_iter()
                .filter_map(|(name, present)| present.then_some(name))
                .collect();
                Err(PropError::InvalidConstruction(
                    ErrorInfo::new(
                        "ambiguous-arguments",
                        "unsupported combination of constructor arguments",
                    )
                    .with_context("given", given.join(","))
                    .with_hint("pass nominal plus one of stddev, dependencies, profile"),
                ))
            }
        }
    }

    /// New independent sources, one per element, with the given standard deviation.
    pub fn from_stddev(
        ids: &SourceIdGenerator,
        nominal: NumArray,
        stddev: NumArray,
    ) -> Result<Self, PropError> {
        let NumArray::Real(stddev) = stddev.broadcast_to(nominal.shape())? else {
            return Err(PropError::invalid_construction(
                "complex-stddev",
                "standard deviations must be real",
            ));
        };
        if stddev.iter().any(|s| s.is_nan() || *s < 0.0) {
            return Err(PropError::InvalidConstruction(
                ErrorInfo::new(
                    "negative-stddev",
                    "standard deviations must be non-negative",
                )
                .with_hint("NaN is rejected as well"),
            ));
        }
        let block = ids.next_ids(stddev.len())?;
        let record = DependencyRecord::fresh(block, NumArray::Real(stddev))?;
        let mut builder = ProfileBuilder::new(nominal.shape());
        builder.append(record)?;
        Ok(Self {
            nominal,
            profile: builder.finish(),
        })
    }

    /// Chain-rule construction: each dependency's profile scaled by its local
    /// derivative and merged into a fresh profile.
    pub fn from_dependencies(
        nominal: NumArray,
        dependencies: &[(&UncertainValue, NumArray)],
    ) -> Result<Self, PropError> {
        let mut builder = ProfileBuilder::new(nominal.shape());
        for (value, derivative) in dependencies {
            let scaled = value.profile.scale(derivative)?;
            builder.merge_into(scaled, None)?;
        }
        Ok(Self {
            nominal,
            profile: builder.finish(),
        })
    }

    /// Takes over an existing profile, which must match the nominal shape.
    /// A real nominal is widened when the profile carries complex sensitivities.
    pub fn from_profile(
        mut nominal: NumArray,
        profile: UncertaintyProfile,
    ) -> Result<Self, PropError> {
        if nominal.shape() != profile.shape() {
            return Err(PropError::shape_mismatch(
                "profile-shape",
                "profile shape must equal the nominal shape",
                nominal.shape(),
                profile.shape(),
            ));
        }
        if let Some(dtype) = profile.dtype() {
            widen_nominal(&mut nominal, dtype, "profile adoption");
        }
        Ok(Self { nominal, profile })
    }

    /// Exactly known value.
    pub fn exact(nominal: NumArray) -> Self {
        let profile = UncertaintyProfile::empty(nominal.shape());
        Self { nominal, profile }
    }

    /// Exactly known zeros of `shape`.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::exact(NumArray::zeros(DType::Float64, shape))
    }

    /// Best-estimate values.
    pub fn nominal(&self) -> &NumArray {
        &self.nominal
    }

    /// The uncertainty profile.
    pub fn profile(&self) -> &UncertaintyProfile {
        &self.profile
    }

    /// Consumes the value into its parts.
    pub fn into_parts(self) -> (NumArray, UncertaintyProfile) {
        (self.nominal, self.profile)
    }

    /// Shape of nominal and profile.
    pub fn shape(&self) -> &[usize] {
        self.nominal.shape()
    }

    /// Element type of the nominal values.
    pub fn dtype(&self) -> DType {
        self.nominal.dtype()
    }

    /// Returns `true` when nothing about the value is uncertain.
    pub fn is_exact(&self) -> bool {
        self.profile.is_exact()
    }

    /// Distinct sources the value depends on.
    pub fn sources(&self) -> BTreeSet<SourceId> {
        self.profile.sources()
    }

    /// Elementwise variance.
    pub fn variance(&self) -> Result<ArrayD<f64>, PropError> {
        self.profile.variance()
    }

    /// Elementwise standard deviation.
    pub fn stddev(&self) -> Result<ArrayD<f64>, PropError> {
        Ok(self.variance()?.mapv(f64::sqrt))
    }

    /// Elementwise covariance with `other`, over the sources both share.
    pub fn covariance(&self, other: &UncertainValue) -> Result<ArrayD<f64>, PropError> {
        self.profile.covariance(&other.profile)
    }

    /// Elementwise correlation coefficient; zero where either stddev is zero.
    pub fn correlation(&self, other: &UncertainValue) -> Result<ArrayD<f64>, PropError> {
        let covariance = self.covariance(other)?;
        let sa = self.stddev()?;
        let sb = other.stddev()?;
        let sa = sa
            .broadcast(covariance.raw_dim())
            .ok_or_else(|| stddev_broadcast(sa.shape(), covariance.shape()))?;
        let sb = sb
            .broadcast(covariance.raw_dim())
            .ok_or_else(|| stddev_broadcast(sb.shape(), covariance.shape()))?;
        Ok(Zip::from(&covariance)
            .and(sa)
            .and(sb)
            .map_collect(|&c, &a, &b| {
                let denom = a * b;
                if denom == 0.0 {
                    0.0
                } else {
                    c / denom
                }
            }))
    }

    /// Real part of nominal and sensitivities.
    pub fn real(&self) -> Self {
        Self {
            nominal: self.nominal.real(),
            profile: self.profile.real(),
        }
    }

    /// Imaginary part of nominal and sensitivities.
    pub fn imag(&self) -> Self {
        Self {
            nominal: self.nominal.imag(),
            profile: self.profile.imag(),
        }
    }

    /// Complex conjugate of nominal and sensitivities.
    pub fn conjugate(&self) -> Self {
        Self {
            nominal: self.nominal.conj(),
            profile: self.profile.conj(),
        }
    }

    /// Independent deep copy.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Sub-value selected by `region`; correlations with `self` are kept.
    pub fn get(&self, region: &Region) -> Result<Self, PropError> {
        let resolved = region.resolve(self.shape())?;
        Ok(Self {
            nominal: self.nominal.select(&resolved),
            profile: self.profile.select_resolved(&resolved),
        })
    }

    /// Overwrites `region` with `operand`.
    ///
    /// The region's old uncertainty is cleared before the operand's profile is
    /// merged in, so no stale correlation survives the overwrite. A complex
    /// operand (nominal or sensitivities) widens a real nominal first. On error
    /// the value is left untouched.
    pub fn set(&mut self, region: &Region, operand: &Operand) -> Result<(), PropError> {
        let resolved = region.resolve(self.shape())?;
        let incoming = operand.nominal().broadcast_to(resolved.shape())?;
        let mut dtype = self.nominal.dtype().promote(incoming.dtype());
        if let Some(profile_dtype) = operand.as_uncertain().and_then(|v| v.profile.dtype()) {
            dtype = dtype.promote(profile_dtype);
        }

        let mut builder = self.profile.clone().into_builder();
        builder.clear(Some(region))?;
        if let Operand::Uncertain(value) = operand {
            builder.merge_into(value.profile.clone(), Some(region))?;
        }
        let mut nominal = self.nominal.clone();
        widen_nominal(&mut nominal, dtype, "region assignment");
        nominal.assign(&resolved, &incoming)?;

        self.nominal = nominal;
        self.profile = builder.finish();
        Ok(())
    }

    /// Edits nominal data in place. The shape must survive the edit.
    pub fn update_nominal<F>(&mut self, edit: F) -> Result<(), PropError>
    where
        F: FnOnce(&mut NumArray),
    {
        let mut nominal = self.nominal.clone();
        edit(&mut nominal);
        if nominal.shape() != self.nominal.shape() {
            return Err(PropError::shape_mismatch(
                "nominal-shape",
                "nominal edits must keep the shape",
                self.nominal.shape(),
                nominal.shape(),
            ));
        }
        self.nominal = nominal;
        Ok(())
    }

    /// Broadcasts to a larger shape; broadcast copies stay fully correlated.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, PropError> {
        Ok(Self {
            nominal: self.nominal.broadcast_to(shape)?,
            profile: self.profile.broadcast_to(shape)?,
        })
    }

    /// Row-major reshape.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self, PropError> {
        Ok(Self {
            nominal: self.nominal.reshape(shape)?,
            profile: self.profile.reshape(shape)?,
        })
    }

    /// Axis permutation; `None` reverses the axes.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<Self, PropError> {
        Ok(Self {
            nominal: self.nominal.transpose(axes)?,
            profile: self.profile.transpose(axes)?,
        })
    }

    /// Repeats every element `count` times along `axis`.
    pub fn repeat(&self, count: usize, axis: usize) -> Result<Self, PropError> {
        Ok(Self {
            nominal: self.nominal.repeat(count, axis)?,
            profile: self.profile.repeat(count, axis)?,
        })
    }

    /// Sum of all elements as a zero-dimensional value.
    pub fn sum(&self) -> Result<Self, PropError> {
        let nominal = match &self.nominal {
            NumArray::Real(a) => NumArray::scalar(a.sum()),
            NumArray::Complex(a) => NumArray::Complex(ArrayD::from_elem(IxDyn(&[]), a.sum())),
        };
        let flat = self.profile.reshape(&[self.nominal.len()])?;
        let mut builder = ProfileBuilder::new(&[]);
        for index in 0..self.nominal.len() {
            builder.merge_into(flat.select(&Region::index(index as isize))?, None)?;
        }
        Ok(Self {
            nominal,
            profile: builder.finish(),
        })
    }

    /// Nominal value of a zero-dimensional real value.
    pub fn to_scalar(&self) -> Option<f64> {
        match &self.nominal {
            NumArray::Real(a) if a.ndim() == 0 => a.iter().next().copied(),
            _ => None,
        }
    }

    /// Nominal value of a zero-dimensional complex value.
    pub fn to_complex_scalar(&self) -> Option<Complex64> {
        match &self.nominal {
            NumArray::Complex(a) if a.ndim() == 0 => a.iter().next().copied(),
            _ => None,
        }
    }
}

fn stddev_broadcast(stddev: &[usize], target: &[usize]) -> PropError {
    PropError::shape_mismatch("broadcast", "stddev does not broadcast", stddev, target)
}

fn widen_nominal(nominal: &mut NumArray, dtype: DType, reason: &str) {
    let from = nominal.dtype();
    if nominal.widen_to(dtype) {
        tracing::debug!(%from, to = %dtype, reason, "widened nominal");
    }
}
