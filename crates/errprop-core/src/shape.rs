//! Shape arithmetic and element-type-agnostic array transforms.
//!
//! Dependency records carry an integer name array next to a numeric
//! derivative array; both must go through exactly the same transform, so the
//! helpers here are generic over the element type.

use ndarray::{ArrayD, Axis, IxDyn, Zip};

use crate::errors::{ErrorInfo, PropError};
use crate::region::ResolvedRegion;

/// Standard trailing-axis broadcasting of two shapes.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, PropError> {
    let ndim = lhs.len().max(rhs.len());
    let mut out = vec![0; ndim];
    for axis in 0..ndim {
        let l = dim_from_end(lhs, ndim - 1 - axis);
        let r = dim_from_end(rhs, ndim - 1 - axis);
        out[axis] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(PropError::shape_mismatch(
                    "broadcast",
                    "operand shapes cannot be broadcast together",
                    lhs,
                    rhs,
                ))
            }
        };
    }
    Ok(out)
}

fn dim_from_end(shape: &[usize], from_end: usize) -> usize {
    if from_end < shape.len() {
        shape[shape.len() - 1 - from_end]
    } else {
        1
    }
}

/// Materialises `array` broadcast to `shape` as an owned, standard-layout array.
pub fn broadcast_array<T: Clone>(
    array: &ArrayD<T>,
    shape: &[usize],
) -> Result<ArrayD<T>, PropError> {
    if array.shape() == shape {
        return Ok(array.clone());
    }
    array
        .broadcast(IxDyn(shape))
        .map(|view| view.to_owned())
        .ok_or_else(|| {
            PropError::shape_mismatch(
                "broadcast",
                "array cannot be broadcast to the target shape",
                array.shape(),
                shape,
            )
        })
}

/// Applies `f` elementwise after broadcasting both arrays to a common shape.
pub fn zip_broadcast<A, B, C, F>(
    lhs: &ArrayD<A>,
    rhs: &ArrayD<B>,
    f: F,
) -> Result<ArrayD<C>, PropError>
where
    A: Clone,
    B: Clone,
    F: Fn(A, B) -> C,
{
    let shape = broadcast_shapes(lhs.shape(), rhs.shape())?;
    let dim = IxDyn(&shape);
    let (Some(l), Some(r)) = (lhs.broadcast(dim.clone()), rhs.broadcast(dim)) else {
        return Err(PropError::shape_mismatch(
            "broadcast",
            "operand shapes cannot be broadcast together",
            lhs.shape(),
            rhs.shape(),
        ));
    };
    Ok(Zip::from(l)
        .and(r)
        .map_collect(|a, b| f(a.clone(), b.clone())))
}

/// Copies out the sub-array selected by `region`.
pub fn select_array<T: Clone>(array: &ArrayD<T>, region: &ResolvedRegion) -> ArrayD<T> {
    array.slice(region.as_slice_info()).to_owned()
}

/// Writes `source`, broadcast to the region's shape, into the region of `array`.
pub fn assign_array<T: Clone>(
    array: &mut ArrayD<T>,
    region: &ResolvedRegion,
    source: &ArrayD<T>,
) -> Result<(), PropError> {
    let source = broadcast_array(source, region.shape())?;
    array.slice_mut(region.as_slice_info()).assign(&source);
    Ok(())
}

/// Fills the region of `array` with `value`.
pub fn fill_array<T: Clone>(array: &mut ArrayD<T>, region: &ResolvedRegion, value: T) {
    array.slice_mut(region.as_slice_info()).fill(value);
}

/// Reinterprets the elements (in row-major order) under a new shape.
pub fn reshape_array<T: Clone>(array: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>, PropError> {
    array
        .as_standard_layout()
        .into_owned()
        .into_shape(IxDyn(shape))
        .map_err(|_| {
            PropError::shape_mismatch(
                "reshape",
                "element count does not match the requested shape",
                array.shape(),
                shape,
            )
        })
}

/// Permutes the axes; `None` reverses them.
pub fn transpose_array<T: Clone>(
    array: &ArrayD<T>,
    axes: Option<&[usize]>,
) -> Result<ArrayD<T>, PropError> {
    let Some(axes) = axes else {
        return Ok(array
            .clone()
            .reversed_axes()
            .as_standard_layout()
            .into_owned());
    };
    let mut seen = vec![false; array.ndim()];
    let valid = axes.len() == array.ndim()
        && axes
            .iter()
            .all(|&axis| {
                axis < seen.len() && !std::mem::replace(&mut seen[axis], true)
            });
    if !valid {
        return Err(PropError::ShapeMismatch(
            ErrorInfo::new(
                "transpose-axes",
                "axes are not a permutation of the array axes",
            )
            .with_context("axes", format!("{axes:?}"))
            .with_context("shape", format!("{:?}", array.shape())),
        ));
    }
    Ok(array
        .clone()
        .permuted_axes(IxDyn(axes))
        .as_standard_layout()
        .into_owned())
}

/// Repeats every element `count` times along `axis`, consecutively.
pub fn repeat_array<T: Clone>(
    array: &ArrayD<T>,
    count: usize,
    axis: usize,
) -> Result<ArrayD<T>, PropError> {
    if axis >= array.ndim() {
        return Err(PropError::ShapeMismatch(
            ErrorInfo::new("repeat-axis", "repeat axis out of range")
                .with_context("axis", axis.to_string())
                .with_context("ndim", array.ndim().to_string()),
        ));
    }
    let indices: Vec<usize> = (0..array.len_of(Axis(axis)))
        .flat_map(|idx| std::iter::repeat(idx).take(count))
        .collect();
    Ok(array.select(Axis(axis), &indices))
}
