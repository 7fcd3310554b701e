//! Index regions selecting a sub-array, resolved against a concrete shape.

use ndarray::SliceInfoElem;

use crate::errors::{ErrorInfo, PropError};

/// Selector applied to a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSlice {
    /// Picks one position and drops the axis. Negative values count from the end.
    Index(isize),
    /// Half-open range with a positive step; bounds clamp like Python slices.
    Range {
        /// Inclusive start; negative values count from the end.
        start: isize,
        /// Exclusive end, `None` meaning the axis length.
        end: Option<isize>,
        /// Stride between selected positions, at least one.
        step: usize,
    },
    /// Keeps the whole axis.
    Full,
}

/// Ordered per-axis selectors. Axes beyond the listed selectors are kept whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    axes: Vec<AxisSlice>,
}

impl Region {
    /// Region covering the whole array.
    pub fn full() -> Self {
        Self::default()
    }

    /// Builds a region from explicit selectors.
    pub fn new(axes: Vec<AxisSlice>) -> Self {
        Self { axes }
    }

    /// Selects one position along the leading axis.
    pub fn index(index: isize) -> Self {
        Self::new(vec![AxisSlice::Index(index)])
    }

    /// Selects one element by its full coordinate.
    pub fn at(coords: &[isize]) -> Self {
        Self::new(coords.iter().map(|&c| AxisSlice::Index(c)).collect())
    }

    /// Selects `start..end` along the leading axis.
    pub fn range(start: isize, end: isize) -> Self {
        Self::new(vec![AxisSlice::Range {
            start,
            end: Some(end),
            step: 1,
        }])
    }

    /// Appends a selector for the next axis.
    pub fn then(mut self, axis: AxisSlice) -> Self {
        self.axes.push(axis);
        self
    }

    /// Returns the listed selectors.
    pub fn axes(&self) -> &[AxisSlice] {
        &self.axes
    }

    /// Validates the region against `shape` and normalises every selector.
    pub fn resolve(&self, shape: &[usize]) -> Result<ResolvedRegion, PropError> {
        if self.axes.len() > shape.len() {
            return Err(PropError::ShapeMismatch(
                ErrorInfo::new("region-rank", "region lists more axes than the array has")
                    .with_context("selectors", self.axes.len().to_string())
                    .with_context("shape", format!("{shape:?}")),
            ));
        }
        let mut elems = Vec::with_capacity(shape.len());
        let mut selected = Vec::with_capacity(shape.len());
        for (axis, &len) in shape.iter().enumerate() {
            match self.axes.get(axis).copied().unwrap_or(AxisSlice::Full) {
                AxisSlice::Index(index) => {
                    let normalized = if index < 0 {
                        index + len as isize
                    } else {
                        index
                    };
                    if normalized < 0 || normalized >= len as isize {
                        return Err(PropError::ShapeMismatch(
                            ErrorInfo::new("index-out-of-bounds", "index outside the axis")
                                .with_context("axis", axis.to_string())
                                .with_context("index", index.to_string())
                                .with_context("len", len.to_string()),
                        ));
                    }
                    elems.push(SliceInfoElem::Index(normalized));
                }
                AxisSlice::Range { start, end, step } => {
                    if step == 0 {
                        return Err(PropError::invalid_operation(
                            "zero-step",
                            "range step must be at least one",
                        ));
                    }
                    let start = clamp_bound(start, len);
                    let end = clamp_bound(end.unwrap_or(len as isize), len).max(start);
                    selected.push((end - start).div_ceil(step));
                    elems.push(SliceInfoElem::Slice {
                        start: start as isize,
                        end: Some(end as isize),
                        step: step as isize,
                    });
                }
                AxisSlice::Full => {
                    selected.push(len);
                    elems.push(SliceInfoElem::Slice {
                        start: 0,
                        end: None,
                        step: 1,
                    });
                }
            }
        }
        Ok(ResolvedRegion {
            elems,
            shape: selected,
        })
    }
}

fn clamp_bound(bound: isize, len: usize) -> usize {
    let len = len as isize;
    let bound = if bound < 0 { bound + len } else { bound };
    bound.clamp(0, len) as usize
}

/// Region normalised against a concrete shape; every selector is in bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRegion {
    elems: Vec<SliceInfoElem>,
    shape: Vec<usize>,
}

impl ResolvedRegion {
    /// Shape of the selected sub-array.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Selectors in the form ndarray slicing consumes.
    pub fn as_slice_info(&self) -> &[SliceInfoElem] {
        &self.elems
    }
}
