use crate::engine::CompiledEntry;
use crate::error::JitError;
use crate::expr::Var;
use crate::rt_types::{call_caller, call_positional};
use crate::unit::{CALLEE, CALLER, Strategy};
use log::trace;

/// Typed handle for invoking compiled code with a slice of f64 arguments.
pub struct Callable {
    entry: CompiledEntry,
    n: usize,
    pub(crate) params: Vec<Var>,
}

impl Callable {
    /// Wrap `entry`, which must have been compiled for exactly `n` parameters.
    pub fn new(entry: CompiledEntry, n: usize) -> Result<Self, JitError> {
        if entry.arity() != n {
            return Err(JitError::ArityMismatch { expected: entry.arity(), got: n });
        }
        Ok(Self { entry, n, params: Vec::new() })
    }

    pub fn arity(&self) -> usize {
        self.n
    }

    pub fn strategy(&self) -> Strategy {
        self.entry.strategy()
    }

    pub fn entry(&self) -> &CompiledEntry {
        &self.entry
    }

    /// Parameters in binding order when built through [`crate::Jit::compile_expr`]
    /// or [`crate::Jit::compile_inferred`]; empty for [`Callable::new`].
    pub fn params(&self) -> &[Var] {
        &self.params
    }

    /// Run the compiled code. `args[i]` binds to parameter `i`.
    pub fn invoke(&self, args: &[f64]) -> Result<f64, JitError> {
        if args.len() != self.n {
            return Err(JitError::ArityMismatch { expected: self.n, got: args.len() });
        }
        match self.entry.strategy() {
            Strategy::Buffer => {
                let addr = self.entry.address_of(CALLER)?;
                let buffer = self
                    .entry
                    .buffer
                    .as_ref()
                    .ok_or_else(|| JitError::Internal("buffer strategy without argument buffer".into()))?;
                if Some(buffer.addr()) != self.entry.baked_addr {
                    return Err(JitError::StaleBufferAddress);
                }
                buffer.write(args);
                trace!("invoking {} via buffer at {:#x}", self.entry.unit_id(), buffer.addr());
                // SAFETY: the entry is live (checked by address_of) and the shim reads
                // exactly `n` slots from the buffer this entry owns.
                Ok(unsafe { call_caller(addr) })
            }
            _ => {
                let addr = self.entry.address_of(CALLEE)?;
                // SAFETY: live entry whose callee takes `n` f64 parameters.
                unsafe { call_positional(addr, args) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Jit;

    #[test]
    fn moved_buffer_address_is_rejected_before_the_call() {
        let mut jit = Jit::new().unwrap();
        let a = Var::new("a");
        let b = Var::new("b");
        let mut f = jit.compile_expr(&(&a * &b), &[a, b], Strategy::Buffer).unwrap();
        assert_eq!(f.invoke(&[3.0, 4.0]).unwrap(), 12.0);

        let addr = f.entry.buffer.as_ref().map(|buf| buf.addr()).unwrap();
        f.entry.baked_addr = Some(addr + 8);
        match f.invoke(&[5.0, 6.0]) {
            Err(JitError::StaleBufferAddress) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        // Nothing was written: the buffer still holds the previous arguments.
        assert_eq!(f.entry.buffer.as_ref().map(|buf| buf.values()).unwrap(), vec![3.0, 4.0]);

        f.entry.baked_addr = Some(addr);
        assert_eq!(f.invoke(&[5.0, 6.0]).unwrap(), 30.0);
    }
}
