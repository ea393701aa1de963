//! Structural checks run before a unit may reach the JIT.
//!
//! Per function: Cranelift's verifier (terminated blocks, operand types, SSA
//! dominance so every value is defined before use, return values matching the
//! signature). Per unit: every call target names a declaration of this unit with
//! an identical signature, every local declaration has exactly one body, and
//! every entry point returns a single f64.

use crate::error::JitError;
use crate::unit::{CompiledUnit, DeclLinkage, VerifiedUnit};
use cranelift::codegen::ir::{ExternalName, Function, types};
use cranelift::codegen::{settings, verify_function};
use log::debug;

/// Check `unit`; on success it becomes a [`VerifiedUnit`]. The unit is not modified.
pub fn verify(unit: CompiledUnit) -> Result<VerifiedUnit, JitError> {
    verify_with(unit, &settings::Flags::new(settings::builder()))
}

pub(crate) fn verify_with(unit: CompiledUnit, flags: &settings::Flags) -> Result<VerifiedUnit, JitError> {
    check_unit(&unit, flags)?;
    debug!("unit {} verified", unit.id);
    Ok(VerifiedUnit(unit))
}

fn check_unit(unit: &CompiledUnit, flags: &settings::Flags) -> Result<(), JitError> {
    for (idx, decl) in unit.decls.iter().enumerate() {
        let bodies = unit.bodies.iter().filter(|(i, _)| *i == idx).count();
        match decl.linkage {
            DeclLinkage::Local if bodies != 1 => {
                return Err(JitError::Verification(format!(
                    "local function {} has {} bodies",
                    decl.name, bodies
                )));
            }
            DeclLinkage::Import if bodies != 0 => {
                return Err(JitError::Verification(format!("import {} has a body", decl.name)));
            }
            _ => {}
        }
        let returns: Vec<_> = decl.signature.returns.iter().map(|p| p.value_type).collect();
        if returns != [types::F64] {
            return Err(JitError::Verification(format!(
                "{} must return a single f64, declared {}",
                decl.name, decl.signature
            )));
        }
    }

    for (idx, func) in &unit.bodies {
        let decl = unit
            .decls
            .get(*idx)
            .ok_or_else(|| JitError::Verification(format!("body for undeclared function #{}", idx)))?;
        if func.signature != decl.signature {
            return Err(JitError::Verification(format!(
                "{}: body signature {} differs from declaration {}",
                decl.name, func.signature, decl.signature
            )));
        }
        if func.layout.entry_block().is_none() {
            return Err(JitError::Verification(format!("{}: function has no entry block", decl.name)));
        }
        verify_function(func, flags)
            .map_err(|errors| JitError::Verification(format!("{}: {}", decl.name, errors)))?;
        check_calls(unit, &decl.name, func)?;
    }
    Ok(())
}

fn check_calls(unit: &CompiledUnit, fname: &str, func: &Function) -> Result<(), JitError> {
    for (fref, ext) in func.dfg.ext_funcs.iter() {
        let ExternalName::User(name_ref) = &ext.name else {
            return Err(JitError::Verification(format!(
                "{}: {} does not reference a unit declaration",
                fname, fref
            )));
        };
        let user = &func.params.user_named_funcs()[*name_ref];
        let target = unit.decls.get(user.index as usize).filter(|_| user.namespace == 0).ok_or_else(|| {
            JitError::Verification(format!("{}: {} references missing declaration {}", fname, fref, user))
        })?;
        let sig = &func.dfg.signatures[ext.signature];
        if *sig != target.signature {
            return Err(JitError::Verification(format!(
                "{}: call to {} uses signature {}, declared {}",
                fname, target.name, sig, target.signature
            )));
        }
    }
    Ok(())
}
