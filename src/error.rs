use thiserror::Error;

#[derive(Debug, Error)]
pub enum JitError {
    #[error("unbound variable: {0}")]
    UnboundVariable(String),
    #[error("lowering error: {0}")]
    Lowering(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),
    #[error("compilation error: {0}")]
    Compilation(String),
    #[error("symbol not found in compiled entry: {0}")]
    SymbolNotFound(String),
    #[error("arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("argument buffer address changed since lowering")]
    StaleBufferAddress,
    #[error("compiled entry used after its engine was freed or dropped")]
    DanglingEntry,
    #[error("intrinsic already exists: {name}/{arity}")]
    FunctionExists { name: String, arity: u8 },
    #[error("intrinsic {name} has arity {arity}; only 1 or 2 are supported")]
    UnsupportedArity { name: String, arity: u8 },
    #[error("target initialization failed: {0}")]
    Target(String),
    #[error("jit internal error: {0}")]
    Internal(String),
}
