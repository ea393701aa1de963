//! Operator overloads and intrinsic constructors for assembling expression graphs.
//!
//! ```
//! use graphjit::{Var, builder::{sin, pow}};
//! let a = Var::new("a");
//! let b = Var::new("b");
//! let e = sin(&a * 10.01) + sin(&b * pow(&a, &b));
//! assert_eq!(e.to_string(), "(sin((a * 10.01)) + sin((b * pow(a, b))))");
//! ```

use crate::expr::{BinaryOp, Expr, Var};
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! impl_binary_ops {
    ($($lhs:ty),*) => {$(
        impl<R: Into<Expr>> Add<R> for $lhs {
            type Output = Expr;
            fn add(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Add, self, rhs) }
        }
        impl<R: Into<Expr>> Sub<R> for $lhs {
            type Output = Expr;
            fn sub(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Sub, self, rhs) }
        }
        impl<R: Into<Expr>> Mul<R> for $lhs {
            type Output = Expr;
            fn mul(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Mul, self, rhs) }
        }
        impl<R: Into<Expr>> Div<R> for $lhs {
            type Output = Expr;
            fn div(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Div, self, rhs) }
        }
        impl Neg for $lhs {
            type Output = Expr;
            fn neg(self) -> Expr { Expr::neg(self) }
        }
    )*};
}

impl_binary_ops!(Expr, Var);

macro_rules! impl_binary_ops_ref {
    ($($lhs:ty),*) => {$(
        impl<'a, R: Into<Expr>> Add<R> for &'a $lhs {
            type Output = Expr;
            fn add(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Add, self, rhs) }
        }
        impl<'a, R: Into<Expr>> Sub<R> for &'a $lhs {
            type Output = Expr;
            fn sub(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Sub, self, rhs) }
        }
        impl<'a, R: Into<Expr>> Mul<R> for &'a $lhs {
            type Output = Expr;
            fn mul(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Mul, self, rhs) }
        }
        impl<'a, R: Into<Expr>> Div<R> for &'a $lhs {
            type Output = Expr;
            fn div(self, rhs: R) -> Expr { Expr::binary(BinaryOp::Div, self, rhs) }
        }
        impl<'a> Neg for &'a $lhs {
            type Output = Expr;
            fn neg(self) -> Expr { Expr::neg(self) }
        }
    )*};
}

impl_binary_ops_ref!(Expr, Var);

// f64 on the left: `2.0 * x`.
macro_rules! impl_scalar_lhs {
    ($($rhs:ty),*) => {$(
        impl Add<$rhs> for f64 {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr { Expr::binary(BinaryOp::Add, self, rhs) }
        }
        impl Sub<$rhs> for f64 {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr { Expr::binary(BinaryOp::Sub, self, rhs) }
        }
        impl Mul<$rhs> for f64 {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr { Expr::binary(BinaryOp::Mul, self, rhs) }
        }
        impl Div<$rhs> for f64 {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr { Expr::binary(BinaryOp::Div, self, rhs) }
        }
    )*};
}

impl_scalar_lhs!(Expr, &Expr, Var, &Var);

/// Call to any intrinsic by name. Resolution is deferred to link time.
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::call(name, args)
}

macro_rules! unary_intrinsics {
    ($($(#[$m:meta])* $name:ident),* $(,)?) => {$(
        $(#[$m])*
        pub fn $name(x: impl Into<Expr>) -> Expr {
            Expr::call(stringify!($name), vec![x.into()])
        }
    )*};
}

unary_intrinsics!(
    sin, cos, tan, asin, acos, atan, sinh, cosh, tanh,
    exp,
    /// Natural logarithm.
    ln,
    log10, log2, sqrt, abs, floor, ceil,
    /// Logs the value and passes it through.
    printd,
);

macro_rules! binary_intrinsics {
    ($($name:ident),* $(,)?) => {$(
        pub fn $name(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
            Expr::call(stringify!($name), vec![a.into(), b.into()])
        }
    )*};
}

binary_intrinsics!(pow, atan2, hypot, min, max);
