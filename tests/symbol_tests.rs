use graphjit::builder::{call, printd, sin};
use graphjit::{Callable, Expr, Jit, JitConfig, JitError, Strategy, SymbolResolver, SymbolSource, Var};

extern "C" fn triple(x: f64) -> f64 {
    3.0 * x
}

extern "C" fn avg(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

#[test]
fn missing_symbol_fails_at_link_time() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let e = call("graphjit_no_such_symbol", vec![Expr::var(&x)]);

    // Declaring is fine; resolution happens when compiling.
    let unit = jit.lower(&e, &[x.clone()], Strategy::Positional)?;
    assert_eq!(unit.imports(), vec!["graphjit_no_such_symbol"]);
    let verified = jit.verify(unit)?;
    match jit.compile(verified) {
        Err(JitError::UnresolvedSymbol(name)) => assert_eq!(name, "graphjit_no_such_symbol"),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("compiled a call to a missing symbol"),
    }
    Ok(())
}

#[test]
fn failed_compile_leaves_earlier_entries_working() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let good = jit.compile_expr(&(sin(&x) * 2.0), &[x.clone()], Strategy::Buffer)?;
    let bad = call("graphjit_missing_too", vec![Expr::var(&x)]);
    assert!(matches!(
        jit.compile_expr(&bad, &[x.clone()], Strategy::Auto),
        Err(JitError::UnresolvedSymbol(_))
    ));
    assert!((good.invoke(&[0.5])? - 2.0 * 0.5f64.sin()).abs() < 1e-12);
    Ok(())
}

#[test]
fn builtins_resolve_statically() {
    let symbols = SymbolResolver::builtins_only();
    for (name, arity) in [("sin", 1), ("cos", 1), ("exp", 1), ("ln", 1), ("sqrt", 1), ("pow", 2), ("atan2", 2), ("printd", 1)] {
        let (addr, source) = symbols.resolve(name, arity).unwrap();
        assert!(!addr.is_null());
        assert_eq!(source, SymbolSource::Builtin);
    }
    assert_eq!(symbols.known("pow").map(|i| i.arity), Some(2));
    assert!(matches!(symbols.resolve("cbrt", 1), Err(JitError::UnresolvedSymbol(_))));
    match symbols.resolve("pow", 1) {
        Err(JitError::UnresolvedSymbol(name)) => assert_eq!(name, "pow/1"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[cfg(target_os = "linux")]
#[test]
fn host_symbols_come_from_the_process() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let (_, source) = jit.symbols().resolve("cbrt", 1)?;
    assert_eq!(source, SymbolSource::Host);

    let x = Var::new("x");
    let e = call("cbrt", vec![Expr::var(&x)]) + 1.0;
    let f = jit.compile_expr(&e, &[x.clone()], Strategy::Positional)?;
    assert!((f.invoke(&[27.0])? - 4.0).abs() < 1e-12);
    assert!((jit.evaluate(&e, &[x], &[8.0])? - 3.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn host_lookup_can_be_disabled() -> Result<(), JitError> {
    let mut jit = Jit::with_config(JitConfig::default().host_symbols(false))?;
    let x = Var::new("x");
    let e = call("cbrt", vec![Expr::var(&x)]);
    assert!(matches!(
        jit.compile_expr(&e, &[x], Strategy::Positional),
        Err(JitError::UnresolvedSymbol(_))
    ));
    Ok(())
}

#[test]
fn registered_functions_are_callable() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    jit.register_unary("triple", triple)?;
    jit.register_binary("avg", avg)?;
    let a = Var::new("a");
    let b = Var::new("b");
    let e = call("triple", vec![call("avg", vec![Expr::var(&a), Expr::var(&b)])]);
    for strategy in [Strategy::Positional, Strategy::Buffer] {
        let f = jit.compile_expr(&e, &[a.clone(), b.clone()], strategy)?;
        assert_eq!(f.invoke(&[1.0, 3.0])?, 6.0);
    }
    assert_eq!(jit.symbols().resolve("avg", 2)?.1, SymbolSource::Registered);
    assert_eq!(jit.evaluate(&e, &[a, b], &[2.0, 4.0])?, 9.0);
    Ok(())
}

#[test]
fn duplicate_registration_is_rejected() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    jit.register_unary("triple", triple)?;
    match jit.register_unary("triple", triple) {
        Err(JitError::FunctionExists { name, arity }) => {
            assert_eq!(name, "triple");
            assert_eq!(arity, 1);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(jit.register_binary("pow", avg), Err(JitError::FunctionExists { .. })));

    jit.symbols_mut().clear_registered();
    jit.register_unary("triple", triple)?;
    Ok(())
}

#[test]
fn link_rejects_intrinsic_registered_with_other_arity() -> Result<(), JitError> {
    let mut jit = Jit::with_config(JitConfig::default().host_symbols(false))?;
    let a = Var::new("a");
    let b = Var::new("b");
    let e = call("late_bound", vec![Expr::var(&a), Expr::var(&b)]);
    let verified = jit.verify(jit.lower(&e, &[a, b], Strategy::Positional)?)?;

    // Registered as unary after the unit declared it with two parameters.
    jit.register_unary("late_bound", triple)?;
    match jit.compile(verified) {
        Err(JitError::UnresolvedSymbol(name)) => assert_eq!(name, "late_bound/2"),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(entry) => {
            let got = Callable::new(entry, 2)?.invoke(&[1.0, 2.0])?;
            panic!("arity-2 call linked against a unary intrinsic, returned {}", got);
        }
    }
    Ok(())
}

#[test]
fn registration_rejects_unsupported_arity() {
    let mut symbols = SymbolResolver::builtins_only();
    match symbols.register("ternary", 3, avg as *const u8) {
        Err(JitError::UnsupportedArity { name, arity }) => {
            assert_eq!(name, "ternary");
            assert_eq!(arity, 3);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(symbols.register("nullary", 0, triple as *const u8), Err(JitError::UnsupportedArity { .. })));
    assert!(symbols.known("ternary").is_none());
}

#[test]
fn intrinsic_arity_is_checked_while_lowering() -> Result<(), JitError> {
    let jit = Jit::new()?;
    let x = Var::new("x");
    let cases = [
        call("sin", vec![Expr::var(&x), Expr::var(&x)]),
        call("pow", vec![Expr::var(&x)]),
        call("anything", vec![]),
        call("anything", vec![Expr::var(&x), Expr::var(&x), Expr::var(&x)]),
        call("other", vec![Expr::var(&x)]) + call("other", vec![Expr::var(&x), Expr::var(&x)]),
    ];
    for e in &cases {
        match jit.lower(e, &[x.clone()], Strategy::Auto) {
            Err(JitError::Lowering(_)) => {}
            other => panic!("{}: unexpected result: {:?}", e, other.map(|u| u.id())),
        }
    }
    Ok(())
}

#[test]
fn imports_are_declared_once_per_unit() -> Result<(), JitError> {
    let jit = Jit::new()?;
    let x = Var::new("x");
    let y = Var::new("y");
    let e = sin(&x) + sin(&y) * sin(2.0 * &x);
    let unit = jit.lower(&e, &[x, y], Strategy::Buffer)?;
    assert_eq!(unit.imports(), vec!["sin"]);
    Ok(())
}

#[test]
fn printd_passes_its_value_through() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let e = printd(&x * 2.0) + 1.0;
    let f = jit.compile_expr(&e, &[x], Strategy::Positional)?;
    assert_eq!(f.invoke(&[4.0])?, 9.0);
    Ok(())
}
