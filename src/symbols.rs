use crate::error::JitError;
use log::{info, trace};
use std::collections::HashMap;
use std::sync::OnceLock;

pub type Unary = extern "C" fn(f64) -> f64;
pub type Binary = extern "C" fn(f64, f64) -> f64;

/// An intrinsic with a statically known `(f64 x arity) -> f64` signature.
#[derive(Copy, Clone, Debug)]
pub struct Intrinsic {
    pub name: &'static str,
    pub arity: u8,
    pub addr: *const u8,
}

// Same as IntrinsicMeta: the address is only ever called, never written through.
unsafe impl Send for Intrinsic {}
unsafe impl Sync for Intrinsic {}

/// Registration record submitted by `#[graphjit::intrinsic]`.
pub struct IntrinsicMeta {
    pub name: &'static str,
    pub arity: u8,
    pub addr: *const u8,
    pub mod_path: &'static str,
}

// The address is a plain `extern "C" fn` item and is never written through.
unsafe impl Sync for IntrinsicMeta {}

inventory::collect!(IntrinsicMeta);

/// Where a symbol was found at link time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolSource {
    Builtin,
    Registered,
    Host,
}

macro_rules! builtin_shims {
    (unary: $($u:ident => $uf:expr),* ; binary: $($b:ident => $bf:expr),* $(,)?) => {
        mod shims {
            $( pub(super) extern "C" fn $u(x: f64) -> f64 { ($uf)(x) } )*
            $( pub(super) extern "C" fn $b(a: f64, b: f64) -> f64 { ($bf)(a, b) } )*
        }

        const BUILTINS: &[(&str, u8, Shim)] = &[
            $( (stringify!($u), 1, Shim::Unary(shims::$u)), )*
            $( (stringify!($b), 2, Shim::Binary(shims::$b)), )*
        ];
    };
}

#[derive(Copy, Clone)]
enum Shim {
    Unary(Unary),
    Binary(Binary),
}

impl Shim {
    fn addr(self) -> *const u8 {
        match self {
            Shim::Unary(f) => f as *const u8,
            Shim::Binary(f) => f as *const u8,
        }
    }
}

fn printd(x: f64) -> f64 {
    info!("printd: {}", x);
    x
}

builtin_shims! {
    unary:
        sin => f64::sin, cos => f64::cos, tan => f64::tan,
        asin => f64::asin, acos => f64::acos, atan => f64::atan,
        sinh => f64::sinh, cosh => f64::cosh, tanh => f64::tanh,
        exp => f64::exp, ln => f64::ln, log10 => f64::log10, log2 => f64::log2,
        sqrt => f64::sqrt, abs => f64::abs, floor => f64::floor, ceil => f64::ceil,
        printd => super::printd;
    binary:
        pow => f64::powf, atan2 => f64::atan2, hypot => f64::hypot,
        min => f64::min, max => f64::max,
}

fn builtin_table() -> &'static HashMap<&'static str, Intrinsic> {
    static TABLE: OnceLock<HashMap<&'static str, Intrinsic>> = OnceLock::new();
    TABLE.get_or_init(|| {
        BUILTINS
            .iter()
            .map(|&(name, arity, shim)| (name, Intrinsic { name, arity, addr: shim.addr() }))
            .collect()
    })
}

/// Maps intrinsic call names to native addresses.
///
/// Lookup order: built-in table, registered intrinsics, then (when enabled) the
/// host process's dynamic symbol table. Host symbols are assumed to have the
/// `(f64 x arity) -> f64` signature the call site declares.
pub struct SymbolResolver {
    builtins: &'static HashMap<&'static str, Intrinsic>,
    registered: HashMap<String, Intrinsic>,
    #[cfg(unix)]
    host: Option<libloading::os::unix::Library>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SymbolResolver {
    pub fn new(host_symbols: bool) -> Self {
        #[cfg(not(unix))]
        let _ = host_symbols;
        Self {
            builtins: builtin_table(),
            registered: HashMap::new(),
            #[cfg(unix)]
            host: if host_symbols { Some(libloading::os::unix::Library::this()) } else { None },
        }
    }

    /// Resolver with only the built-in table.
    pub fn builtins_only() -> Self {
        Self::new(false)
    }

    pub fn register(&mut self, name: &'static str, arity: u8, addr: *const u8) -> Result<(), JitError> {
        if !(1..=2).contains(&arity) {
            return Err(JitError::UnsupportedArity { name: name.to_string(), arity });
        }
        if let Some(existing) = self.known(name) {
            return Err(JitError::FunctionExists { name: name.to_string(), arity: existing.arity });
        }
        self.registered.insert(name.to_string(), Intrinsic { name, arity, addr });
        Ok(())
    }

    pub fn register_unary(&mut self, name: &'static str, f: Unary) -> Result<(), JitError> {
        self.register(name, 1, f as *const u8)
    }

    pub fn register_binary(&mut self, name: &'static str, f: Binary) -> Result<(), JitError> {
        self.register(name, 2, f as *const u8)
    }

    /// Register an intrinsic collected from `#[graphjit::intrinsic]` by function name.
    pub fn register_collected(&mut self, name: &str) -> Result<(), JitError> {
        let meta = inventory::iter::<IntrinsicMeta>
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| JitError::UnresolvedSymbol(name.to_string()))?;
        trace!("registering {}/{} from {}", meta.name, meta.arity, meta.mod_path);
        self.register(meta.name, meta.arity, meta.addr)
    }

    /// Register every intrinsic collected in the binary; returns how many were added.
    pub fn register_all_collected(&mut self) -> Result<usize, JitError> {
        let mut n = 0;
        for meta in inventory::iter::<IntrinsicMeta> {
            if self.registered.contains_key(meta.name) {
                continue;
            }
            self.register(meta.name, meta.arity, meta.addr)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn clear_registered(&mut self) {
        self.registered.clear();
    }

    /// Statically known intrinsic (built-in or registered), if any.
    pub fn known(&self, name: &str) -> Option<Intrinsic> {
        self.builtins.get(name).or_else(|| self.registered.get(name)).copied()
    }

    /// Resolve `name`, called with `arity` arguments, to a native address.
    ///
    /// A built-in or registered intrinsic of another arity does not match;
    /// the result is `UnresolvedSymbol("name/arity")`.
    pub fn resolve(&self, name: &str, arity: usize) -> Result<(*const u8, SymbolSource), JitError> {
        let known = match (self.builtins.get(name), self.registered.get(name)) {
            (Some(i), _) => Some((i, SymbolSource::Builtin)),
            (None, Some(i)) => Some((i, SymbolSource::Registered)),
            (None, None) => None,
        };
        if let Some((i, source)) = known {
            if i.arity as usize != arity {
                trace!("{} takes {} arguments, call site passes {}", name, i.arity, arity);
                return Err(JitError::UnresolvedSymbol(format!("{}/{}", name, arity)));
            }
            return Ok((i.addr, source));
        }
        if let Some(addr) = self.lookup_host(name) {
            trace!("resolved {} from host process at {:p}", name, addr);
            return Ok((addr, SymbolSource::Host));
        }
        Err(JitError::UnresolvedSymbol(name.to_string()))
    }

    #[cfg(unix)]
    fn lookup_host(&self, name: &str) -> Option<*const u8> {
        let lib = self.host.as_ref()?;
        // SAFETY: only the symbol's address is read; nothing is called here.
        let sym = unsafe { lib.get::<*const std::ffi::c_void>(name.as_bytes()) }.ok()?;
        let addr = *sym as *const u8;
        if addr.is_null() { None } else { Some(addr) }
    }

    #[cfg(not(unix))]
    fn lookup_host(&self, _name: &str) -> Option<*const u8> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_built_once() {
        let a = SymbolResolver::builtins_only();
        let b = SymbolResolver::new(false);
        assert!(std::ptr::eq(a.builtins, b.builtins));
        assert_eq!(a.builtins.len(), BUILTINS.len());
        assert!(a.registered.is_empty());
    }
}
