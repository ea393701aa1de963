use graphjit::builder::sin;
use graphjit::{CALLEE, CALLER, Callable, Jit, JitError, Strategy, Var};

fn compile_sum(jit: &mut Jit, strategy: Strategy) -> Result<Callable, JitError> {
    let a = Var::new("a");
    let b = Var::new("b");
    jit.compile_expr(&(&a + &b), &[a, b], strategy)
}

#[test]
fn invoke_after_engine_drop_is_rejected() -> Result<(), JitError> {
    for strategy in [Strategy::Positional, Strategy::Buffer] {
        let f = {
            let mut jit = Jit::new()?;
            let f = compile_sum(&mut jit, strategy)?;
            assert_eq!(f.invoke(&[1.0, 2.0])?, 3.0);
            f
        };
        assert!(!f.entry().is_live());
        match f.invoke(&[1.0, 2.0]) {
            Err(JitError::DanglingEntry) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
    Ok(())
}

#[test]
fn free_memory_invalidates_outstanding_entries() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let old = compile_sum(&mut jit, Strategy::Buffer)?;
    assert_eq!(old.invoke(&[2.0, 2.0])?, 4.0);

    jit.free_memory();
    assert!(matches!(old.invoke(&[2.0, 2.0]), Err(JitError::DanglingEntry)));
    assert!(matches!(old.entry().address_of(CALLER), Err(JitError::DanglingEntry)));

    // The engine stays usable.
    let new = compile_sum(&mut jit, Strategy::Buffer)?;
    assert_eq!(new.invoke(&[2.0, 5.0])?, 7.0);
    assert!(matches!(old.invoke(&[2.0, 2.0]), Err(JitError::DanglingEntry)));
    Ok(())
}

#[test]
fn argument_count_is_checked_before_the_call() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    for strategy in [Strategy::Positional, Strategy::Buffer] {
        let f = compile_sum(&mut jit, strategy)?;
        assert_eq!(f.arity(), 2);
        match f.invoke(&[1.0]) {
            Err(JitError::ArityMismatch { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(f.invoke(&[1.0, 2.0, 3.0]), Err(JitError::ArityMismatch { .. })));
    }
    Ok(())
}

#[test]
fn wrapper_arity_must_match_entry() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let x = Var::new("x");
    let unit = jit.lower(&sin(&x), &[x], Strategy::Positional)?;
    let verified = jit.verify(unit)?;
    let entry = jit.compile(verified)?;
    assert_eq!(entry.arity(), 1);
    match Callable::new(entry, 3) {
        Err(JitError::ArityMismatch { expected: 1, got: 3 }) => {}
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("wrapper accepted a wrong parameter count"),
    }
    Ok(())
}

#[test]
fn entry_exposes_addresses_by_name() -> Result<(), JitError> {
    let mut jit = Jit::new()?;
    let pos = compile_sum(&mut jit, Strategy::Positional)?;
    assert!(!pos.entry().address_of(CALLEE)?.is_null());
    assert!(matches!(pos.entry().address_of(CALLER), Err(JitError::SymbolNotFound(_))));

    let buf = compile_sum(&mut jit, Strategy::Buffer)?;
    assert!(!buf.entry().address_of(CALLEE)?.is_null());
    assert!(!buf.entry().address_of(CALLER)?.is_null());
    match buf.entry().address_of("main") {
        Err(JitError::SymbolNotFound(name)) => assert_eq!(name, "main"),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}
