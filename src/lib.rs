mod error;
mod expr;
pub mod builder;
mod collect;
mod config;
mod target;
mod rt_types;
mod symbols;
mod unit;
mod lower;
mod verify;
mod buffer;
mod engine;
mod callable;
mod eval;
#[cfg(feature = "optimize")]
mod optimizer;
mod macros;

pub use error::JitError;
pub use expr::{BinaryOp, Expr, Node, NodeId, Var, VarId};
pub use config::{JitConfig, OptLevel};
pub use target::Target;
pub use rt_types::{CallerFn, Fn0, Fn1, Fn2, Fn3, Fn4, Fn5, Fn6, Fn7, Fn8, MAX_POSITIONAL_ARGS};
pub use symbols::{Binary, Intrinsic, IntrinsicMeta, SymbolResolver, SymbolSource, Unary};
pub use unit::{CALLEE, CALLER, CompiledUnit, DeclLinkage, FuncDecl, Strategy, VerifiedUnit};
pub use lower::Lowerer;
pub use verify::verify;
pub use buffer::PinnedBuffer;
pub use engine::{CompiledEntry, Jit};
pub use callable::Callable;

// Re-export inventory and the #[intrinsic] macro for user crates
pub use inventory;
pub use macros::intrinsic;
