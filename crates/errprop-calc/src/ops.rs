//! Operator sugar and named math methods on [`UncertainValue`].
//!
//! The operators panic on shape mismatch, the way ndarray's arithmetic does.
//! Use the [`ufunc`](crate::ufunc) objects directly for a `Result`.

use std::ops::{Add, Div, Mul, Neg, Sub};

use errprop_core::{NumArray, PropError};

use crate::ufunc;
use crate::value::UncertainValue;

fn unwrap_or_panic(result: Result<UncertainValue, PropError>) -> UncertainValue {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $ufunc:ident) => {
        impl $trait<&UncertainValue> for &UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: &UncertainValue) -> UncertainValue {
                unwrap_or_panic(ufunc::$ufunc.apply(self, rhs))
            }
        }

        impl $trait<UncertainValue> for UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: UncertainValue) -> UncertainValue {
                $trait::$method(&self, &rhs)
            }
        }

        impl $trait<&UncertainValue> for UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: &UncertainValue) -> UncertainValue {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<UncertainValue> for &UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: UncertainValue) -> UncertainValue {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<f64> for &UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: f64) -> UncertainValue {
                unwrap_or_panic(ufunc::$ufunc.apply_lhs(self, &NumArray::scalar(rhs)))
            }
        }

        impl $trait<f64> for UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: f64) -> UncertainValue {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<&UncertainValue> for f64 {
            type Output = UncertainValue;

            fn $method(self, rhs: &UncertainValue) -> UncertainValue {
                unwrap_or_panic(ufunc::$ufunc.apply_rhs(&NumArray::scalar(self), rhs))
            }
        }

        impl $trait<UncertainValue> for f64 {
            type Output = UncertainValue;

            fn $method(self, rhs: UncertainValue) -> UncertainValue {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<&NumArray> for &UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: &NumArray) -> UncertainValue {
                unwrap_or_panic(ufunc::$ufunc.apply_lhs(self, rhs))
            }
        }

        impl $trait<&NumArray> for UncertainValue {
            type Output = UncertainValue;

            fn $method(self, rhs: &NumArray) -> UncertainValue {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<&UncertainValue> for &NumArray {
            type Output = UncertainValue;

            fn $method(self, rhs: &UncertainValue) -> UncertainValue {
                unwrap_or_panic(ufunc::$ufunc.apply_rhs(self, rhs))
            }
        }
    };
}

binary_operator!(Add, add, ADD);
binary_operator!(Sub, sub, SUBTRACT);
binary_operator!(Mul, mul, MULTIPLY);
binary_operator!(Div, div, DIVIDE);

impl Neg for &UncertainValue {
    type Output = UncertainValue;

    fn neg(self) -> UncertainValue {
        unwrap_or_panic(ufunc::NEGATIVE.apply(self))
    }
}

impl Neg for UncertainValue {
    type Output = UncertainValue;

    fn neg(self) -> UncertainValue {
        -&self
    }
}

macro_rules! unary_methods {
    ($($(#[$doc:meta])* $method:ident => $ufunc:ident;)*) => {
        impl UncertainValue {
            $(
                $(#[$doc])*
                pub fn $method(&self) -> Result<UncertainValue, PropError> {
                    ufunc::$ufunc.apply(self)
                }
            )*
        }
    };
}

unary_methods! {
    /// Modulus; real even for complex values.
    abs => ABSOLUTE;
    /// Square root.
    sqrt => SQRT;
    /// `self * self` with a single derivative `2y`.
    square => SQUARE;
    /// Sine.
    sin => SIN;
    /// Cosine.
    cos => COS;
    /// Tangent.
    tan => TAN;
    /// Inverse sine.
    asin => ARCSIN;
    /// Inverse cosine.
    acos => ARCCOS;
    /// Inverse tangent.
    atan => ARCTAN;
    /// Hyperbolic sine.
    sinh => SINH;
    /// Hyperbolic cosine.
    cosh => COSH;
    /// Hyperbolic tangent.
    tanh => TANH;
    /// Inverse hyperbolic sine.
    asinh => ARCSINH;
    /// Inverse hyperbolic cosine.
    acosh => ARCCOSH;
    /// Inverse hyperbolic tangent.
    atanh => ARCTANH;
    /// Natural exponential.
    exp => EXP;
    /// `2^y`.
    exp2 => EXP2;
    /// Natural logarithm.
    ln => LOG;
    /// Base-2 logarithm.
    log2 => LOG2;
    /// Base-10 logarithm.
    log10 => LOG10;
}

impl UncertainValue {
    /// Raises to an exact power.
    pub fn powf(&self, exponent: f64) -> Result<UncertainValue, PropError> {
        ufunc::POWER.apply_lhs(self, &NumArray::scalar(exponent))
    }

    /// Raises to an uncertain power.
    pub fn pow(&self, exponent: &UncertainValue) -> Result<UncertainValue, PropError> {
        ufunc::POWER.apply(self, exponent)
    }

    /// Four-quadrant `atan2(self, x)`.
    pub fn atan2(&self, x: &UncertainValue) -> Result<UncertainValue, PropError> {
        ufunc::ARCTAN2.apply(self, x)
    }
}
