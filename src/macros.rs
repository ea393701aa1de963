pub use graphjit_macros::intrinsic;

/// Register intrinsics declared with `#[graphjit::intrinsic]` on a [`crate::Jit`].
///
/// Expands to a `Result<(), JitError>` expression; stops at the first failure.
///
/// ```ignore
/// #[graphjit::intrinsic]
/// fn clamp01(x: f64) -> f64 { x.clamp(0.0, 1.0) }
///
/// let mut jit = graphjit::Jit::new()?;
/// graphjit::register_intrinsics!(jit, clamp01)?;
/// ```
#[macro_export]
macro_rules! register_intrinsics {
    ($jit:expr, $($f:ident),+ $(,)?) => {{
        let jit: &mut $crate::Jit = &mut $jit;
        let mut result: ::core::result::Result<(), $crate::JitError> = Ok(());
        $(
            if result.is_ok() {
                result = jit.symbols_mut().register_collected(stringify!($f));
            }
        )+
        result
    }};
}
