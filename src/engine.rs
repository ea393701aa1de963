use crate::buffer::PinnedBuffer;
use crate::callable::Callable;
use crate::config::JitConfig;
use crate::error::JitError;
use crate::expr::{Expr, Var};
use crate::lower::Lowerer;
use crate::symbols::{Binary, SymbolResolver, Unary};
use crate::target::Target;
use crate::unit::{CompiledUnit, DeclLinkage, Strategy, VerifiedUnit};
use crate::verify::verify_with;
use cranelift::codegen::Context;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use log::{debug, trace};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{
    Arc, Weak,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

/// Liveness token shared (weakly) with every entry the engine hands out.
#[derive(Debug, Default)]
pub(crate) struct EngineToken {
    generation: AtomicUsize,
}

/// The JIT compiler and owner of all generated code.
///
/// Every compiled unit gets its own backend module; all of them are freed by
/// [`Jit::free_memory`] or when the engine is dropped, after which outstanding
/// entries report [`JitError::DanglingEntry`].
pub struct Jit {
    target: Target,
    symbols: SymbolResolver,
    modules: Vec<JITModule>,
    token: Arc<EngineToken>,
}

impl Jit {
    pub fn new() -> Result<Self, JitError> {
        Self::with_config(JitConfig::default())
    }

    pub fn with_config(config: JitConfig) -> Result<Self, JitError> {
        let target = Target::host(&config)?;
        Ok(Self {
            target,
            symbols: SymbolResolver::new(config.host_symbols),
            modules: Vec::new(),
            token: Arc::new(EngineToken::default()),
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn symbols(&self) -> &SymbolResolver {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolResolver {
        &mut self.symbols
    }

    pub fn register_unary(&mut self, name: &'static str, f: Unary) -> Result<(), JitError> {
        self.symbols.register_unary(name, f)
    }

    pub fn register_binary(&mut self, name: &'static str, f: Binary) -> Result<(), JitError> {
        self.symbols.register_binary(name, f)
    }

    pub fn lowerer(&self) -> Lowerer<'_> {
        Lowerer::new(&self.target, &self.symbols)
    }

    pub fn lower(&self, expr: &Expr, params: &[Var], strategy: Strategy) -> Result<CompiledUnit, JitError> {
        self.lowerer().lower(expr, params, strategy)
    }

    /// Verify with the engine's target flags.
    pub fn verify(&self, unit: CompiledUnit) -> Result<VerifiedUnit, JitError> {
        verify_with(unit, self.target.flags())
    }

    /// Link and generate native code for `unit`.
    ///
    /// Imports are resolved before any code is emitted; a missing symbol fails
    /// this call with [`JitError::UnresolvedSymbol`] and leaves previously
    /// compiled entries untouched.
    pub fn compile(&mut self, unit: VerifiedUnit) -> Result<CompiledEntry, JitError> {
        let VerifiedUnit(unit) = unit;

        let mut jb = JITBuilder::with_isa(self.target.isa().clone(), cranelift_module::default_libcall_names());
        for decl in unit.decls.iter().filter(|d| d.linkage == DeclLinkage::Import) {
            let (addr, source) = self.symbols.resolve(&decl.name, decl.signature.params.len())?;
            trace!("unit {}: {} -> {:p} ({:?})", unit.id, decl.name, addr, source);
            jb.symbol(decl.name.as_str(), addr);
        }
        let mut module = JITModule::new(jb);

        let mut ids = Vec::with_capacity(unit.decls.len());
        for (idx, decl) in unit.decls.iter().enumerate() {
            let linkage = match decl.linkage {
                DeclLinkage::Local => Linkage::Local,
                DeclLinkage::Import => Linkage::Import,
            };
            let symbol = unit.symbol_name(decl);
            let id = module
                .declare_function(&symbol, linkage, &decl.signature)
                .map_err(|e| JitError::Compilation(e.to_string()))?;
            // Call sites name declarations by index; the module must agree.
            if id.as_u32() as usize != idx {
                return Err(JitError::Internal(format!(
                    "declaration {} ({}) became function id {}",
                    idx, decl.name, id
                )));
            }
            ids.push(id);
        }

        let CompiledUnit { id: unit_id, decls, bodies, arity, strategy, buffer, baked_addr } = unit;
        for (idx, func) in bodies {
            let mut ctx = Context::for_function(func);
            debug!("JIT code for {} in unit {}\n{}", decls[idx].name, unit_id, ctx.func.display());
            module
                .define_function(ids[idx], &mut ctx)
                .map_err(|e| JitError::Compilation(format!("{}: {:?}", decls[idx].name, e)))?;
            module.clear_context(&mut ctx);
        }
        module
            .finalize_definitions()
            .map_err(|e| JitError::Compilation(e.to_string()))?;

        let mut addrs = HashMap::new();
        for (idx, decl) in decls.iter().enumerate() {
            if decl.linkage == DeclLinkage::Local {
                addrs.insert(decl.name.clone(), module.get_finalized_function(ids[idx]) as usize);
            }
        }
        self.modules.push(module);
        debug!("compiled unit {} ({} functions)", unit_id, addrs.len());

        Ok(CompiledEntry {
            unit_id,
            addrs,
            arity,
            strategy,
            buffer,
            baked_addr,
            token: Arc::downgrade(&self.token),
            generation: self.token.generation.load(Ordering::Relaxed),
            _not_send: PhantomData,
        })
    }

    /// Lower, verify, compile and wrap `expr` with `params` as its parameters.
    pub fn compile_expr(&mut self, expr: &Expr, params: &[Var], strategy: Strategy) -> Result<Callable, JitError> {
        let unit = self.lower(expr, params, strategy)?;
        let verified = self.verify(unit)?;
        let entry = self.compile(verified)?;
        let mut callable = Callable::new(entry, params.len())?;
        callable.params = params.to_vec();
        Ok(callable)
    }

    /// Like [`Jit::compile_expr`], with the expression's variables in
    /// first-appearance order as parameters. See [`Callable::params`].
    pub fn compile_inferred(&mut self, expr: &Expr, strategy: Strategy) -> Result<Callable, JitError> {
        self.compile_expr(expr, &expr.variables(), strategy)
    }

    /// Tree-walking evaluation through this engine's symbol resolver.
    pub fn evaluate(&self, expr: &Expr, params: &[Var], args: &[f64]) -> Result<f64, JitError> {
        crate::eval::eval(expr, params, args, &self.symbols)
    }

    /// Free all generated code. Entries compiled so far become dangling.
    pub fn free_memory(&mut self) {
        let n = self.modules.len();
        for module in self.modules.drain(..) {
            unsafe {
                module.free_memory();
            }
        }
        // bump generation to invalidate previously compiled entries
        self.token.generation.fetch_add(1, Ordering::Relaxed);
        debug!("freed {} JIT modules", n);
    }
}

impl Drop for Jit {
    fn drop(&mut self) {
        self.free_memory();
    }
}

/// Native code for one unit: entry addresses plus the argument buffer (if any).
///
/// Holds only a weak reference to its engine. Not `Send`/`Sync`: entries stay on
/// the engine's thread.
pub struct CompiledEntry {
    unit_id: Uuid,
    addrs: HashMap<String, usize>,
    arity: usize,
    strategy: Strategy,
    pub(crate) buffer: Option<PinnedBuffer>,
    pub(crate) baked_addr: Option<usize>,
    token: Weak<EngineToken>,
    generation: usize,
    _not_send: PhantomData<*const ()>,
}

impl CompiledEntry {
    pub fn unit_id(&self) -> Uuid {
        self.unit_id
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether the owning engine is alive and has not freed this code.
    pub fn is_live(&self) -> bool {
        self.check_live().is_ok()
    }

    pub(crate) fn check_live(&self) -> Result<(), JitError> {
        match self.token.upgrade() {
            Some(t) if t.generation.load(Ordering::Relaxed) == self.generation => Ok(()),
            _ => Err(JitError::DanglingEntry),
        }
    }

    /// Native entry address of `name` (`"callee"` or `"caller"`).
    pub fn address_of(&self, name: &str) -> Result<*const u8, JitError> {
        self.check_live()?;
        self.addrs
            .get(name)
            .map(|&a| a as *const u8)
            .ok_or_else(|| JitError::SymbolNotFound(name.to_string()))
    }
}
