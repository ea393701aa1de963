#![cfg(feature = "optimize")]

use graphjit::builder::sin;
use graphjit::{CALLEE, Expr, Jit, JitError, Strategy, Var};

#[test]
fn constant_subtrees_are_folded_before_lowering() -> Result<(), JitError> {
    let jit = Jit::new()?;
    let x = Var::new("x");
    let e = &x * (Expr::constant(2.0) + 3.0) - 0.0;
    let unit = jit.lower(&e, &[x], Strategy::Positional)?;
    let ir = unit.function(CALLEE).map(|f| f.display().to_string()).unwrap_or_default();
    assert_eq!(ir.matches("fadd").count(), 0, "{}", ir);
    assert_eq!(ir.matches("fsub").count(), 0, "{}", ir);
    assert_eq!(ir.matches("fmul").count(), 1, "{}", ir);
    Ok(())
}

#[test]
fn folding_keeps_results() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let e = sin(Expr::constant(0.25) * 2.0) * (&x / 1.0) - (Expr::constant(1.0) - 1.0);
    let f = jit.compile_expr(&e, &[x.clone()], Strategy::Buffer)?;
    assert!((f.invoke(&[3.0])? - e.eval(&[x], &[3.0])?).abs() < 1e-12);
    Ok(())
}

#[test]
fn adding_zero_keeps_the_sign_of_zero() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let e = &x + 0.0;
    let f = jit.compile_expr(&e, &[x.clone()], Strategy::Positional)?;
    let jitted = f.invoke(&[-0.0])?;
    assert!(jitted.is_sign_positive());
    assert_eq!(jitted.to_bits(), e.eval(&[x], &[-0.0])?.to_bits());
    Ok(())
}
