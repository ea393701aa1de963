use crate::config::JitConfig;
use crate::error::JitError;
use cranelift::codegen::isa::{CallConv, OwnedTargetIsa};
use cranelift::prelude::*;
use cranelift_native as native;
use log::debug;

/// Host code-generation target, built once per engine.
#[derive(Clone)]
pub struct Target {
    isa: OwnedTargetIsa,
}

impl Target {
    /// Detect the host ISA and apply `config`.
    pub fn host(config: &JitConfig) -> Result<Self, JitError> {
        let mut flag_builder = settings::builder();
        let set = |b: &mut settings::Builder, k: &str, v: &str| {
            b.set(k, v).map_err(|e| JitError::Target(format!("settings error: {}: {}", k, e)))
        };
        set(&mut flag_builder, "opt_level", config.opt_level.as_setting())?;
        set(&mut flag_builder, "enable_verifier", if config.enable_verifier { "true" } else { "false" })?;
        // JIT code is placed at arbitrary addresses.
        set(&mut flag_builder, "use_colocated_libcalls", "false")?;
        set(&mut flag_builder, "is_pic", "false")?;

        let isa_builder = native::builder().map_err(|e| JitError::Target(e.to_string()))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| JitError::Target(e.to_string()))?;
        debug!("host target: {} ({:?})", isa.triple(), isa.default_call_conv());
        Ok(Self { isa })
    }

    pub fn isa(&self) -> &OwnedTargetIsa {
        &self.isa
    }

    pub fn pointer_type(&self) -> Type {
        self.isa.pointer_type()
    }

    pub fn call_conv(&self) -> CallConv {
        self.isa.default_call_conv()
    }

    pub fn flags(&self) -> &settings::Flags {
        self.isa.flags()
    }

    /// `(f64, ..., f64) -> f64` with `arity` parameters in the host calling convention.
    pub fn f64_signature(&self, arity: usize) -> Signature {
        let mut sig = Signature::new(self.call_conv());
        for _ in 0..arity {
            sig.params.push(AbiParam::new(types::F64));
        }
        sig.returns.push(AbiParam::new(types::F64));
        sig
    }
}
