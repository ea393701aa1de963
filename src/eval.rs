use crate::error::JitError;
use crate::expr::{Expr, Node, NodeId, Var, VarId};
use crate::rt_types::call_positional;
use crate::symbols::SymbolResolver;
use std::collections::{HashMap, HashSet};

impl Expr {
    /// Evaluate by walking the graph, with `args[i]` bound to `params[i]`.
    ///
    /// Only built-in intrinsics are available; use [`crate::Jit::evaluate`] to
    /// reach registered and host symbols.
    ///
    /// ```
    /// use graphjit::{Var, builder::sqrt};
    /// let x = Var::new("x");
    /// let e = sqrt(&x) * 2.0;
    /// assert_eq!(e.eval(&[x], &[9.0]).unwrap(), 6.0);
    /// ```
    pub fn eval(&self, params: &[Var], args: &[f64]) -> Result<f64, JitError> {
        eval(self, params, args, &SymbolResolver::builtins_only())
    }
}

pub(crate) fn eval(expr: &Expr, params: &[Var], args: &[f64], symbols: &SymbolResolver) -> Result<f64, JitError> {
    if args.len() != params.len() {
        return Err(JitError::ArityMismatch { expected: params.len(), got: args.len() });
    }
    let bindings: HashMap<VarId, f64> = params.iter().map(Var::id).zip(args.iter().copied()).collect();
    let mut walker = Walker { symbols, bindings, memo: HashMap::new(), in_progress: HashSet::new() };
    walker.eval(expr)
}

struct Walker<'s> {
    symbols: &'s SymbolResolver,
    bindings: HashMap<VarId, f64>,
    memo: HashMap<NodeId, f64>,
    in_progress: HashSet<NodeId>,
}

impl Walker<'_> {
    fn eval(&mut self, e: &Expr) -> Result<f64, JitError> {
        let id = e.id();
        if let Some(&v) = self.memo.get(&id) {
            return Ok(v);
        }
        if !self.in_progress.insert(id) {
            return Err(JitError::Lowering(format!("cycle detected at node {:?}", id)));
        }
        let v = match e.node() {
            Node::Constant(c) => *c,
            Node::Variable(var) => *self
                .bindings
                .get(&var.id())
                .ok_or_else(|| JitError::UnboundVariable(var.name().to_string()))?,
            Node::Neg(x) => -self.eval(x)?,
            Node::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                op.apply(a, b)
            }
            Node::Call { name, args } => {
                let expected = match self.symbols.known(name) {
                    Some(i) => i.arity as usize,
                    None => args.len().clamp(1, 2),
                };
                if args.len() != expected {
                    return Err(JitError::ArityMismatch { expected, got: args.len() });
                }
                let (addr, _) = self.symbols.resolve(name, args.len())?;
                let mut argv = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(self.eval(a)?);
                }
                // SAFETY: resolved intrinsics take `args.len()` f64s and return f64.
                unsafe { call_positional(addr, &argv)? }
            }
        };
        self.in_progress.remove(&id);
        self.memo.insert(id, v);
        Ok(v)
    }
}
