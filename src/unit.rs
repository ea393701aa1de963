use crate::buffer::PinnedBuffer;
use cranelift::codegen::ir::Function;
use cranelift::prelude::Signature;
use std::fmt;
use uuid::Uuid;

/// Logical name of the function computing the expression.
pub const CALLEE: &str = "callee";
/// Logical name of the zero-argument shim used by the buffer strategy.
pub const CALLER: &str = "caller";

/// How a compiled expression receives its arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Arguments are passed directly as native f64 parameters.
    Positional,
    /// Arguments are written to a pinned buffer that a generated shim reads.
    Buffer,
    /// Positional up to `MAX_POSITIONAL_ARGS` parameters, buffer above.
    Auto,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclLinkage {
    /// Defined in this unit.
    Local,
    /// Resolved against intrinsics or the host process at link time.
    Import,
}

/// One function declaration. Its position in the unit is its declaration index,
/// which is also the `UserExternalName` index used by call sites.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: String,
    pub linkage: DeclLinkage,
    pub signature: Signature,
}

/// Lowered, not yet verified functions plus every declaration they reference.
pub struct CompiledUnit {
    pub(crate) id: Uuid,
    pub(crate) decls: Vec<FuncDecl>,
    /// (declaration index, body) for every `Local` declaration.
    pub(crate) bodies: Vec<(usize, Function)>,
    pub(crate) arity: usize,
    pub(crate) strategy: Strategy,
    pub(crate) buffer: Option<PinnedBuffer>,
    /// Address baked into the caller shim.
    pub(crate) baked_addr: Option<usize>,
}

impl CompiledUnit {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn decls(&self) -> &[FuncDecl] {
        &self.decls
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Resolved strategy; never `Auto`.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Names of the external symbols the unit imports, in declaration order.
    pub fn imports(&self) -> Vec<&str> {
        self.decls
            .iter()
            .filter(|d| d.linkage == DeclLinkage::Import)
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.bodies
            .iter()
            .find(|(idx, _)| self.decls[*idx].name == name)
            .map(|(_, f)| f)
    }

    /// Backend symbol name for a declaration: local functions are suffixed with
    /// the unit id, imports keep their plain name.
    pub(crate) fn symbol_name(&self, decl: &FuncDecl) -> String {
        match decl.linkage {
            DeclLinkage::Local => format!("{}_{}", decl.name, self.id.simple()),
            DeclLinkage::Import => decl.name.clone(),
        }
    }
}

impl fmt::Display for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; unit {} ({:?}, {} params)", self.id, self.strategy, self.arity)?;
        for d in self.decls.iter().filter(|d| d.linkage == DeclLinkage::Import) {
            writeln!(f, "; import {} {}", d.name, d.signature)?;
        }
        for (idx, func) in &self.bodies {
            writeln!(f, "; {}", self.decls[*idx].name)?;
            write!(f, "{}", func.display())?;
        }
        Ok(())
    }
}

/// A unit that passed [`crate::verify::verify`]. Only the verifier constructs it.
pub struct VerifiedUnit(pub(crate) CompiledUnit);

impl VerifiedUnit {
    pub fn unit(&self) -> &CompiledUnit {
        &self.0
    }
}

impl fmt::Display for VerifiedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
