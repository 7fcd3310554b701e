//! Chain-rule operation objects.
//!
//! Each operation knows its nominal kernel and its analytic partial
//! derivative(s). Certain-only inputs go straight to the plain kernel; as soon
//! as one input is uncertain, every uncertain input's profile is scaled by its
//! partial and merged into the result's fresh profile.
//!
//! The statics in this module, reachable by name through [`lookup`], are the
//! hook a host array library's operator dispatch routes to.

use std::f64::consts::{LN_10, LN_2};

use errprop_core::{ErrorInfo, NumArray, PropError};
use num_complex::Complex64;

use crate::value::{Operand, UncertainValue};

type Kernel = fn(&NumArray) -> NumArray;
type BinaryKernel = fn(&NumArray, &NumArray) -> Result<NumArray, PropError>;
type Partials = fn(&NumArray, &NumArray) -> Result<(NumArray, NumArray), PropError>;
type ComplexPath = fn(&UncertainValue) -> Result<UncertainValue, PropError>;

const ONE: Complex64 = Complex64::new(1.0, 0.0);
const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Single-argument operation `f(y)` with derivative `f'(y)`.
pub struct UnaryUfunc {
    name: &'static str,
    value: Kernel,
    derivative: Kernel,
    complex_path: Option<ComplexPath>,
}

impl UnaryUfunc {
    /// Registry name (numpy spelling).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Nominal kernel applied to plain numbers.
    pub fn eval(&self, y: &NumArray) -> NumArray {
        (self.value)(y)
    }

    /// Analytic derivative evaluated at `y`.
    pub fn derivative(&self, y: &NumArray) -> NumArray {
        (self.derivative)(y)
    }

    /// Dispatches on the operand variant.
    pub fn call(&self, operand: &Operand) -> Result<Operand, PropError> {
        match operand {
            Operand::Certain(array) => Ok(Operand::Certain(self.eval(array))),
            Operand::Uncertain(value) => self.apply(value).map(Operand::Uncertain),
        }
    }

    /// Applies the operation to an uncertain value.
    pub fn apply(&self, value: &UncertainValue) -> Result<UncertainValue, PropError> {
        if let (Some(path), true) = (self.complex_path, value.dtype().is_complex()) {
            return path(value);
        }
        let nominal = self.eval(value.nominal());
        let derivative = self.derivative(value.nominal());
        UncertainValue::from_dependencies(nominal, &[(value, derivative)])
    }
}

impl std::fmt::Debug for UnaryUfunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnaryUfunc")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Two-argument operation `f(y1, y2)` with both partial derivatives.
pub struct BinaryUfunc {
    name: &'static str,
    value: BinaryKernel,
    partials: Partials,
}

enum Arg<'a> {
    Certain(&'a NumArray),
    Uncertain(&'a UncertainValue),
}

impl<'a> Arg<'a> {
    fn nominal(&self) -> &'a NumArray {
        match self {
            Arg::Certain(array) => array,
            Arg::Uncertain(value) => value.nominal(),
        }
    }

    fn uncertain(&self) -> Option<&'a UncertainValue> {
        match self {
            Arg::Certain(_) => None,
            Arg::Uncertain(value) => Some(value),
        }
    }
}

impl<'a> From<&'a Operand> for Arg<'a> {
    fn from(operand: &'a Operand) -> Self {
        match operand {
            Operand::Certain(array) => Arg::Certain(array),
            Operand::Uncertain(value) => Arg::Uncertain(value),
        }
    }
}

impl BinaryUfunc {
    /// Registry name (numpy spelling).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Nominal kernel applied to plain numbers.
    pub fn eval(&self, y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
        (self.value)(y1, y2)
    }

    /// Both partial derivatives evaluated at `(y1, y2)`.
    pub fn partials(
        &self,
        y1: &NumArray,
        y2: &NumArray,
    ) -> Result<(NumArray, NumArray), PropError> {
        (self.partials)(y1, y2)
    }

    /// Dispatches on the operand variants.
    pub fn call(&self, lhs: &Operand, rhs: &Operand) -> Result<Operand, PropError> {
        match (lhs, rhs) {
            (Operand::Certain(a), Operand::Certain(b)) => self.eval(a, b).map(Operand::Certain),
            _ => self.propagate(lhs.into(), rhs.into()).map(Operand::Uncertain),
        }
    }

    /// Both operands uncertain.
    pub fn apply(
        &self,
        lhs: &UncertainValue,
        rhs: &UncertainValue,
    ) -> Result<UncertainValue, PropError> {
        self.propagate(Arg::Uncertain(lhs), Arg::Uncertain(rhs))
    }

    /// Uncertain left operand, certain right operand.
    pub fn apply_lhs(
        &self,
        lhs: &UncertainValue,
        rhs: &NumArray,
    ) -> Result<UncertainValue, PropError> {
        self.propagate(Arg::Uncertain(lhs), Arg::Certain(rhs))
    }

    /// Certain left operand, uncertain right operand.
    pub fn apply_rhs(
        &self,
        lhs: &NumArray,
        rhs: &UncertainValue,
    ) -> Result<UncertainValue, PropError> {
        self.propagate(Arg::Certain(lhs), Arg::Uncertain(rhs))
    }

    fn propagate(&self, lhs: Arg<'_>, rhs: Arg<'_>) -> Result<UncertainValue, PropError> {
        let nominal = self.eval(lhs.nominal(), rhs.nominal())?;
        let (d1, d2) = self.partials(lhs.nominal(), rhs.nominal())?;
        let mut dependencies = Vec::with_capacity(2);
        if let Some(value) = lhs.uncertain() {
            dependencies.push((value, d1));
        }
        if let Some(value) = rhs.uncertain() {
            dependencies.push((value, d2));
        }
        UncertainValue::from_dependencies(nominal, &dependencies)
    }
}

impl std::fmt::Debug for BinaryUfunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryUfunc")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Either kind of operation, as returned by [`lookup`].
#[derive(Debug, Clone, Copy)]
pub enum Ufunc {
    /// One-argument operation.
    Unary(&'static UnaryUfunc),
    /// Two-argument operation.
    Binary(&'static BinaryUfunc),
}

/// Finds an operation by its numpy name.
pub fn lookup(name: &str) -> Option<Ufunc> {
    UNARY_UFUNCS
        .iter()
        .copied()
        .find(|u| u.name == name)
        .map(Ufunc::Unary)
        .or_else(|| {
            BINARY_UFUNCS
                .iter()
                .copied()
                .find(|b| b.name == name)
                .map(Ufunc::Binary)
        })
}

macro_rules! kernel {
    ($name:ident, $real:expr, $complex:expr) => {
        fn $name(y: &NumArray) -> NumArray {
            y.map($real, $complex)
        }
    };
}

macro_rules! unary {
    ($static:ident, $name:literal, $value:ident, $derivative:ident) => {
        #[doc = concat!("`", $name, "`")]
        pub static $static: UnaryUfunc = UnaryUfunc {
            name: $name,
            value: $value,
            derivative: $derivative,
            complex_path: None,
        };
    };
}

fn unit(_: &NumArray) -> NumArray {
    NumArray::scalar(1.0)
}

fn negative_unit(_: &NumArray) -> NumArray {
    NumArray::scalar(-1.0)
}

kernel!(identity, |y| y, |y| y);
kernel!(negate, |y: f64| -y, |y: Complex64| -y);

fn absolute_value(y: &NumArray) -> NumArray {
    y.abs()
}

// conj(y)/|y|: the branch-consistent form of sqrt(conj(y)/y), sign(y) on the real axis.
kernel!(
    absolute_derivative,
    |y: f64| if y == 0.0 { 0.0 } else { y.signum() },
    |y: Complex64| if y == ZERO { ZERO } else { y.conj() / y.norm() }
);

// |y| = sqrt(re(y * conj(y))), which keeps sensitivities to real sources real.
fn absolute_complex(value: &UncertainValue) -> Result<UncertainValue, PropError> {
    let modulus_squared = MULTIPLY.apply(value, &value.conjugate())?.real();
    let squared = modulus_squared.nominal();
    // Zero modulus gets a zero derivative, as on the real path.
    let derivative = squared.map(
        |m: f64| if m == 0.0 { 0.0 } else { 0.5 / m.sqrt() },
        |m: Complex64| {
            if m == ZERO {
                ZERO
            } else {
                (m.sqrt() * 2.0).inv()
            }
        },
    );
    UncertainValue::from_dependencies(sqrt_value(squared), &[(&modulus_squared, derivative)])
}

kernel!(sqrt_value, f64::sqrt, Complex64::sqrt);
kernel!(
    sqrt_derivative,
    |y: f64| 0.5 / y.sqrt(),
    |y: Complex64| (y.sqrt() * 2.0).inv()
);
kernel!(square_value, |y: f64| y * y, |y: Complex64| y * y);
kernel!(square_derivative, |y: f64| 2.0 * y, |y: Complex64| y * 2.0);

kernel!(sin_value, f64::sin, Complex64::sin);
kernel!(cos_value, f64::cos, Complex64::cos);
kernel!(cos_derivative, |y: f64| -y.sin(), |y: Complex64| -y.sin());
kernel!(tan_value, f64::tan, Complex64::tan);
kernel!(
    tan_derivative,
    |y: f64| 1.0 / (y.cos() * y.cos()),
    |y: Complex64| (y.cos() * y.cos()).inv()
);
kernel!(arcsin_value, f64::asin, Complex64::asin);
kernel!(
    arcsin_derivative,
    |y: f64| 1.0 / (1.0 - y * y).sqrt(),
    |y: Complex64| (ONE - y * y).sqrt().inv()
);
kernel!(arccos_value, f64::acos, Complex64::acos);
kernel!(
    arccos_derivative,
    |y: f64| -1.0 / (1.0 - y * y).sqrt(),
    |y: Complex64| -(ONE - y * y).sqrt().inv()
);
kernel!(arctan_value, f64::atan, Complex64::atan);
kernel!(
    arctan_derivative,
    |y: f64| 1.0 / (1.0 + y * y),
    |y: Complex64| (ONE + y * y).inv()
);

kernel!(sinh_value, f64::sinh, Complex64::sinh);
kernel!(cosh_value, f64::cosh, Complex64::cosh);
kernel!(tanh_value, f64::tanh, Complex64::tanh);
kernel!(
    tanh_derivative,
    |y: f64| 1.0 / (y.cosh() * y.cosh()),
    |y: Complex64| (y.cosh() * y.cosh()).inv()
);
kernel!(arcsinh_value, f64::asinh, Complex64::asinh);
kernel!(
    arcsinh_derivative,
    |y: f64| 1.0 / (y * y + 1.0).sqrt(),
    |y: Complex64| (y * y + ONE).sqrt().inv()
);
kernel!(arccosh_value, f64::acosh, Complex64::acosh);
kernel!(
    arccosh_derivative,
    |y: f64| 1.0 / (y * y - 1.0).sqrt(),
    |y: Complex64| ((y - ONE).sqrt() * (y + ONE).sqrt()).inv()
);
kernel!(arctanh_value, f64::atanh, Complex64::atanh);
kernel!(
    arctanh_derivative,
    |y: f64| 1.0 / (1.0 - y * y),
    |y: Complex64| (ONE - y * y).inv()
);

kernel!(exp_value, f64::exp, Complex64::exp);
kernel!(exp2_value, f64::exp2, |y: Complex64| (y * LN_2).exp());
kernel!(
    exp2_derivative,
    |y: f64| LN_2 * y.exp2(),
    |y: Complex64| (y * LN_2).exp() * LN_2
);
kernel!(log_value, f64::ln, Complex64::ln);
kernel!(log_derivative, |y: f64| 1.0 / y, |y: Complex64| y.inv());
kernel!(log2_value, f64::log2, |y: Complex64| y.ln() / LN_2);
kernel!(
    log2_derivative,
    |y: f64| 1.0 / (y * LN_2),
    |y: Complex64| (y * LN_2).inv()
);
kernel!(log10_value, f64::log10, |y: Complex64| y.ln() / LN_10);
kernel!(
    log10_derivative,
    |y: f64| 1.0 / (y * LN_10),
    |y: Complex64| (y * LN_10).inv()
);

unary!(POSITIVE, "positive", identity, unit);
unary!(NEGATIVE, "negative", negate, negative_unit);
unary!(SQRT, "sqrt", sqrt_value, sqrt_derivative);
unary!(SQUARE, "square", square_value, square_derivative);
unary!(SIN, "sin", sin_value, cos_value);
unary!(COS, "cos", cos_value, cos_derivative);
unary!(TAN, "tan", tan_value, tan_derivative);
unary!(ARCSIN, "arcsin", arcsin_value, arcsin_derivative);
unary!(ARCCOS, "arccos", arccos_value, arccos_derivative);
unary!(ARCTAN, "arctan", arctan_value, arctan_derivative);
unary!(SINH, "sinh", sinh_value, cosh_value);
unary!(COSH, "cosh", cosh_value, sinh_value);
unary!(TANH, "tanh", tanh_value, tanh_derivative);
unary!(ARCSINH, "arcsinh", arcsinh_value, arcsinh_derivative);
unary!(ARCCOSH, "arccosh", arccosh_value, arccosh_derivative);
unary!(ARCTANH, "arctanh", arctanh_value, arctanh_derivative);
unary!(EXP, "exp", exp_value, exp_value);
unary!(EXP2, "exp2", exp2_value, exp2_derivative);
unary!(LOG, "log", log_value, log_derivative);
unary!(LOG2, "log2", log2_value, log2_derivative);
unary!(LOG10, "log10", log10_value, log10_derivative);

/// `absolute`; complex inputs go through `sqrt(re(y * conj(y)))`.
pub static ABSOLUTE: UnaryUfunc = UnaryUfunc {
    name: "absolute",
    value: absolute_value,
    derivative: absolute_derivative,
    complex_path: Some(absolute_complex),
};

/// Every unary operation, in registry order.
pub static UNARY_UFUNCS: [&UnaryUfunc; 22] = [
    &POSITIVE, &NEGATIVE, &ABSOLUTE, &SQRT, &SQUARE, &SIN, &COS, &TAN, &ARCSIN, &ARCCOS, &ARCTAN,
    &SINH, &COSH, &TANH, &ARCSINH, &ARCCOSH, &ARCTANH, &EXP, &EXP2, &LOG, &LOG2, &LOG10,
];

fn add_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    y1.add(y2)
}

fn add_partials(_: &NumArray, _: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    Ok((NumArray::scalar(1.0), NumArray::scalar(1.0)))
}

fn subtract_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    y1.zip_with(y2, |a, b| a - b, |a, b| a - b)
}

fn subtract_partials(_: &NumArray, _: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    Ok((NumArray::scalar(1.0), NumArray::scalar(-1.0)))
}

fn multiply_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    y1.mul(y2)
}

fn multiply_partials(y1: &NumArray, y2: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    Ok((y2.clone(), y1.clone()))
}

fn divide_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    y1.zip_with(y2, |a, b| a / b, |a, b| a / b)
}

// -(y1/y2)/y2 rather than -y1/y2²: for y1 == y2 it equals -1/y2 bit for bit,
// so a/a cancels exactly.
fn divide_partials(y1: &NumArray, y2: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    let d1 = y2.map(|b| 1.0 / b, |b| b.inv());
    let d2 = y1.zip_with(y2, |a, b| -(a / b) / b, |a, b| -(a / b) / b)?;
    Ok((d1, d2))
}

fn power_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    y1.zip_with(y2, f64::powf, |a, b| a.powc(b))
}

// Where a factor vanishes the partial is its limit (0) rather than 0·∞.
fn power_partials(y1: &NumArray, y2: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    let d1 = y1.zip_with(
        y2,
        |a, b| if b == 0.0 { 0.0 } else { b * a.powf(b - 1.0) },
        |a, b| if b == ZERO { ZERO } else { b * a.powc(b - ONE) },
    )?;
    let d2 = y1.zip_with(
        y2,
        |a, b| {
            let value = a.powf(b);
            if value == 0.0 {
                0.0
            } else {
                a.ln() * value
            }
        },
        |a, b| {
            let value = a.powc(b);
            if value == ZERO {
                ZERO
            } else {
                a.ln() * value
            }
        },
    )?;
    Ok((d1, d2))
}

fn require_real(name: &str, y1: &NumArray, y2: &NumArray) -> Result<(), PropError> {
    if y1.dtype().is_complex() || y2.dtype().is_complex() {
        return Err(PropError::InvalidOperation(
            ErrorInfo::new(
                "complex-operand",
                "operation is only defined for real operands",
            )
            .with_context("ufunc", name),
        ));
    }
    Ok(())
}

fn arctan2_value(y1: &NumArray, y2: &NumArray) -> Result<NumArray, PropError> {
    require_real("arctan2", y1, y2)?;
    y1.zip_with(y2, f64::atan2, |_, _| ZERO)
}

// No singular derivative at the origin: both partials are zero there.
fn arctan2_partials(y1: &NumArray, y2: &NumArray) -> Result<(NumArray, NumArray), PropError> {
    require_real("arctan2", y1, y2)?;
    let radius = |y: f64, x: f64| y * y + x * x;
    let d1 = y1.zip_with(
        y2,
        |y, x| if radius(y, x) == 0.0 { 0.0 } else { x / radius(y, x) },
        |_, _| ZERO,
    )?;
    let d2 = y1.zip_with(
        y2,
        |y, x| if radius(y, x) == 0.0 { 0.0 } else { -y / radius(y, x) },
        |_, _| ZERO,
    )?;
    Ok((d1, d2))
}

/// `add`
pub static ADD: BinaryUfunc = BinaryUfunc {
    name: "add",
    value: add_value,
    partials: add_partials,
};

/// `subtract`
pub static SUBTRACT: BinaryUfunc = BinaryUfunc {
    name: "subtract",
    value: subtract_value,
    partials: subtract_partials,
};

/// `multiply`
pub static MULTIPLY: BinaryUfunc = BinaryUfunc {
    name: "multiply",
    value: multiply_value,
    partials: multiply_partials,
};

/// `divide`
pub static DIVIDE: BinaryUfunc = BinaryUfunc {
    name: "divide",
    value: divide_value,
    partials: divide_partials,
};

/// `power`
pub static POWER: BinaryUfunc = BinaryUfunc {
    name: "power",
    value: power_value,
    partials: power_partials,
};

/// `arctan2(y, x)`, four-quadrant; real operands only.
pub static ARCTAN2: BinaryUfunc = BinaryUfunc {
    name: "arctan2",
    value: arctan2_value,
    partials: arctan2_partials,
};

/// Every binary operation, in registry order.
pub static BINARY_UFUNCS: [&BinaryUfunc; 6] =
    [&ADD, &SUBTRACT, &MULTIPLY, &DIVIDE, &POWER, &ARCTAN2];
