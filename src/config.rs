/// Backend optimization level, forwarded to Cranelift's `opt_level` setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    pub(crate) fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Engine configuration.
///
/// ```
/// use graphjit::{JitConfig, OptLevel};
/// let cfg = JitConfig::default().opt_level(OptLevel::None).host_symbols(false);
/// assert!(!cfg.host_symbols);
/// ```
#[derive(Clone, Debug)]
pub struct JitConfig {
    pub opt_level: OptLevel,
    /// Run Cranelift's own verifier inside the backend as well.
    pub enable_verifier: bool,
    /// Resolve unknown intrinsics against the host process's symbol table.
    pub host_symbols: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self { opt_level: OptLevel::Speed, enable_verifier: true, host_symbols: true }
    }
}

impl JitConfig {
    pub fn opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn enable_verifier(mut self, on: bool) -> Self {
        self.enable_verifier = on;
        self
    }

    pub fn host_symbols(mut self, on: bool) -> Self {
        self.host_symbols = on;
        self
    }
}
