use crate::buffer::PinnedBuffer;
use crate::error::JitError;
use crate::expr::{BinaryOp, Expr, Node, NodeId, Var, VarId};
#[cfg(feature = "optimize")]
use crate::optimizer::optimize;
use crate::rt_types::MAX_POSITIONAL_ARGS;
use crate::symbols::SymbolResolver;
use crate::target::Target;
use crate::unit::{CALLEE, CALLER, CompiledUnit, DeclLinkage, FuncDecl, Strategy};
use cranelift::codegen::ir::{ExtFuncData, ExternalName, FuncRef, Function, UserExternalName, UserFuncName};
use cranelift::prelude::*;
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Turns an expression graph into a [`CompiledUnit`].
///
/// Each call to [`Lowerer::lower`] creates a fresh binding table and a fresh unit;
/// nothing is shared between units.
pub struct Lowerer<'a> {
    target: &'a Target,
    symbols: &'a SymbolResolver,
}

impl<'a> Lowerer<'a> {
    pub fn new(target: &'a Target, symbols: &'a SymbolResolver) -> Self {
        Self { target, symbols }
    }

    /// Lower `expr` into a unit whose callee takes `params` in order.
    ///
    /// With [`Strategy::Buffer`] (or `Auto` above the positional limit) the unit
    /// also owns a pinned argument buffer and a `caller` shim that loads from it.
    pub fn lower(&self, expr: &Expr, params: &[Var], strategy: Strategy) -> Result<CompiledUnit, JitError> {
        let arity = params.len();
        let strategy = resolve_strategy(strategy, arity)?;

        let mut bindings: HashMap<VarId, usize> = HashMap::with_capacity(arity);
        for (idx, p) in params.iter().enumerate() {
            if bindings.insert(p.id(), idx).is_some() {
                return Err(JitError::Lowering(format!("variable {} is bound to more than one parameter", p)));
            }
        }

        #[cfg(feature = "optimize")]
        let optimized = optimize(expr);
        #[cfg(feature = "optimize")]
        let expr = &optimized;

        let mut decls = vec![FuncDecl {
            name: CALLEE.to_string(),
            linkage: DeclLinkage::Local,
            signature: self.target.f64_signature(arity),
        }];
        let callee = self.lower_callee(expr, &bindings, &mut decls)?;
        let mut bodies = vec![(0, callee)];

        let mut buffer = None;
        let mut baked_addr = None;
        if strategy == Strategy::Buffer {
            let buf = PinnedBuffer::new(arity);
            let addr = buf.addr();
            let caller_index = decls.len();
            decls.push(FuncDecl {
                name: CALLER.to_string(),
                linkage: DeclLinkage::Local,
                signature: self.target.f64_signature(0),
            });
            let caller = self.lower_caller(caller_index, 0, &decls[0].signature, arity, addr);
            bodies.push((caller_index, caller));
            buffer = Some(buf);
            baked_addr = Some(addr);
        }

        let unit = CompiledUnit { id: Uuid::new_v4(), decls, bodies, arity, strategy, buffer, baked_addr };
        debug!("lowered {}\n{}", expr, unit);
        Ok(unit)
    }

    fn lower_callee(
        &self,
        expr: &Expr,
        bindings: &HashMap<VarId, usize>,
        decls: &mut Vec<FuncDecl>,
    ) -> Result<Function, JitError> {
        let sig = decls[0].signature.clone();
        let mut func = Function::with_name_signature(UserFuncName::user(0, 0), sig);
        let mut fb_ctx = FunctionBuilderContext::new();
        {
            let mut builder = FunctionBuilder::new(&mut func, &mut fb_ctx);
            let block = builder.create_block();
            builder.append_block_params_for_function_params(block);
            builder.switch_to_block(block);
            builder.seal_block(block);

            let params = builder.block_params(block).to_vec();
            let mut pass = LoweringPass {
                target: self.target,
                symbols: self.symbols,
                bindings,
                params,
                decls,
                memo: HashMap::new(),
                in_progress: HashSet::new(),
                imports: HashMap::new(),
            };
            let result = pass.lower(&mut builder, expr)?;
            builder.ins().return_(&[result]);
            builder.finalize();
        }
        Ok(func)
    }

    /// `caller() -> f64`: loads `arity` f64 slots from `addr` and calls the callee.
    fn lower_caller(
        &self,
        caller_index: usize,
        callee_index: usize,
        callee_sig: &Signature,
        arity: usize,
        addr: usize,
    ) -> Function {
        let sig = self.target.f64_signature(0);
        let mut func = Function::with_name_signature(UserFuncName::user(0, caller_index as u32), sig);
        let callee = declare_in_func(&mut func, callee_index, callee_sig.clone());
        let mut fb_ctx = FunctionBuilderContext::new();
        {
            let mut builder = FunctionBuilder::new(&mut func, &mut fb_ctx);
            let block = builder.create_block();
            builder.switch_to_block(block);
            builder.seal_block(block);

            let base = builder.ins().iconst(self.target.pointer_type(), addr as i64);
            let mf = MemFlags::trusted();
            let argv: Vec<Value> = (0..arity)
                .map(|i| builder.ins().load(types::F64, mf, base, (i * 8) as i32))
                .collect();
            let call = builder.ins().call(callee, &argv);
            let result = builder.inst_results(call)[0];
            builder.ins().return_(&[result]);
            builder.finalize();
        }
        func
    }
}

fn resolve_strategy(strategy: Strategy, arity: usize) -> Result<Strategy, JitError> {
    match strategy {
        Strategy::Auto if arity <= MAX_POSITIONAL_ARGS => Ok(Strategy::Positional),
        Strategy::Auto => Ok(Strategy::Buffer),
        Strategy::Positional if arity > MAX_POSITIONAL_ARGS => Err(JitError::Lowering(format!(
            "positional strategy supports at most {} parameters, got {}; use Strategy::Buffer",
            MAX_POSITIONAL_ARGS, arity
        ))),
        s => Ok(s),
    }
}

/// Import declaration `index` of the unit into `func`. Calls use absolute
/// addresses since JIT allocations are not guaranteed to be near each other.
fn declare_in_func(func: &mut Function, index: usize, sig: Signature) -> FuncRef {
    let signature = func.import_signature(sig);
    let name_ref = func.declare_imported_user_function(UserExternalName::new(0, index as u32));
    func.import_function(ExtFuncData { name: ExternalName::user(name_ref), signature, colocated: false })
}

/// Per-function traversal state. Lives for one `lower_callee` call.
struct LoweringPass<'p> {
    target: &'p Target,
    symbols: &'p SymbolResolver,
    bindings: &'p HashMap<VarId, usize>,
    params: Vec<Value>,
    decls: &'p mut Vec<FuncDecl>,
    /// Shared nodes are lowered once and reused.
    memo: HashMap<NodeId, Value>,
    /// Nodes on the current traversal path.
    in_progress: HashSet<NodeId>,
    imports: HashMap<String, (FuncRef, usize)>,
}

impl LoweringPass<'_> {
    fn lower(&mut self, builder: &mut FunctionBuilder, expr: &Expr) -> Result<Value, JitError> {
        let id = expr.id();
        if let Some(&v) = self.memo.get(&id) {
            trace!("reusing shared node {}", expr);
            return Ok(v);
        }
        if !self.in_progress.insert(id) {
            return Err(JitError::Lowering(format!("cycle detected at node {:?}", id)));
        }

        let value = match expr.node() {
            Node::Variable(var) => {
                let idx = *self
                    .bindings
                    .get(&var.id())
                    .ok_or_else(|| JitError::UnboundVariable(var.name().to_string()))?;
                self.params[idx]
            }
            Node::Constant(c) => builder.ins().f64const(*c),
            Node::Neg(x) => {
                let v = self.lower(builder, x)?;
                builder.ins().fneg(v)
            }
            Node::Binary { op, lhs, rhs } => {
                let a = self.lower(builder, lhs)?;
                let b = self.lower(builder, rhs)?;
                match op {
                    BinaryOp::Add => builder.ins().fadd(a, b),
                    BinaryOp::Sub => builder.ins().fsub(a, b),
                    BinaryOp::Mul => builder.ins().fmul(a, b),
                    BinaryOp::Div => builder.ins().fdiv(a, b),
                }
            }
            Node::Call { name, args } => {
                // Declaration and arity checks happen before any operand is emitted.
                let callee = self.import(builder, name, args.len())?;
                let mut argv: Vec<Value> = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(self.lower(builder, a)?);
                }
                let call = builder.ins().call(callee, &argv);
                builder.inst_results(call)[0]
            }
        };

        self.in_progress.remove(&id);
        self.memo.insert(id, value);
        Ok(value)
    }

    fn import(&mut self, builder: &mut FunctionBuilder, name: &str, arity: usize) -> Result<FuncRef, JitError> {
        if !(1..=2).contains(&arity) {
            return Err(JitError::Lowering(format!(
                "intrinsic {} called with {} arguments; only 1 or 2 are supported",
                name, arity
            )));
        }
        if let Some(known) = self.symbols.known(name) {
            if known.arity as usize != arity {
                return Err(JitError::Lowering(format!(
                    "intrinsic {} takes {} arguments, called with {}",
                    name, known.arity, arity
                )));
            }
        }
        if let Some(&(fref, declared)) = self.imports.get(name) {
            if declared != arity {
                return Err(JitError::Lowering(format!(
                    "intrinsic {} called with {} arguments after being declared with {}",
                    name, arity, declared
                )));
            }
            return Ok(fref);
        }

        let sig = self.target.f64_signature(arity);
        let index = match self
            .decls
            .iter()
            .position(|d| d.linkage == DeclLinkage::Import && d.name == name)
        {
            Some(i) => i,
            None => {
                self.decls.push(FuncDecl { name: name.to_string(), linkage: DeclLinkage::Import, signature: sig.clone() });
                self.decls.len() - 1
            }
        };
        let fref = declare_in_func(&mut *builder.func, index, sig);
        trace!("declared import {}/{} as decl {}", name, arity, index);
        self.imports.insert(name.to_string(), (fref, arity));
        Ok(fref)
    }
}
