use crate::error::JitError;

/// Largest parameter count the positional strategy passes directly.
///
/// Eight is the number of floating-point argument registers on SysV x86-64 and
/// AAPCS64; beyond that the buffer strategy is used.
pub const MAX_POSITIONAL_ARGS: usize = 8;

/// Buffer-strategy shim: reads its arguments from the pinned buffer.
pub type CallerFn = unsafe extern "C" fn() -> f64;

pub type Fn0 = unsafe extern "C" fn() -> f64;
pub type Fn1 = unsafe extern "C" fn(f64) -> f64;
pub type Fn2 = unsafe extern "C" fn(f64, f64) -> f64;
pub type Fn3 = unsafe extern "C" fn(f64, f64, f64) -> f64;
pub type Fn4 = unsafe extern "C" fn(f64, f64, f64, f64) -> f64;
pub type Fn5 = unsafe extern "C" fn(f64, f64, f64, f64, f64) -> f64;
pub type Fn6 = unsafe extern "C" fn(f64, f64, f64, f64, f64, f64) -> f64;
pub type Fn7 = unsafe extern "C" fn(f64, f64, f64, f64, f64, f64, f64) -> f64;
pub type Fn8 = unsafe extern "C" fn(f64, f64, f64, f64, f64, f64, f64, f64) -> f64;

/// Call the native function at `addr` with `args` passed positionally.
///
/// # Safety
/// `addr` must be the entry of a live function with signature
/// `extern "C" fn(f64 x args.len()) -> f64`.
pub(crate) unsafe fn call_positional(addr: *const u8, args: &[f64]) -> Result<f64, JitError> {
    let out = unsafe {
        match *args {
            [] => std::mem::transmute::<*const u8, Fn0>(addr)(),
            [a] => std::mem::transmute::<*const u8, Fn1>(addr)(a),
            [a, b] => std::mem::transmute::<*const u8, Fn2>(addr)(a, b),
            [a, b, c] => std::mem::transmute::<*const u8, Fn3>(addr)(a, b, c),
            [a, b, c, d] => std::mem::transmute::<*const u8, Fn4>(addr)(a, b, c, d),
            [a, b, c, d, e] => std::mem::transmute::<*const u8, Fn5>(addr)(a, b, c, d, e),
            [a, b, c, d, e, f] => std::mem::transmute::<*const u8, Fn6>(addr)(a, b, c, d, e, f),
            [a, b, c, d, e, f, g] => {
                std::mem::transmute::<*const u8, Fn7>(addr)(a, b, c, d, e, f, g)
            }
            [a, b, c, d, e, f, g, h] => {
                std::mem::transmute::<*const u8, Fn8>(addr)(a, b, c, d, e, f, g, h)
            }
            _ => {
                return Err(JitError::Internal(format!(
                    "positional call with {} arguments exceeds {}",
                    args.len(),
                    MAX_POSITIONAL_ARGS
                )));
            }
        }
    };
    Ok(out)
}

/// Call the buffer-strategy shim at `addr`.
///
/// # Safety
/// `addr` must be the entry of a live caller shim whose baked buffer is alive.
pub(crate) unsafe fn call_caller(addr: *const u8) -> f64 {
    unsafe {
        let f: CallerFn = std::mem::transmute::<*const u8, CallerFn>(addr);
        f()
    }
}
