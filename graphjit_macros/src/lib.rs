use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn};

fn is_f64(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Path(tp) if tp.qself.is_none() && tp.path.is_ident("f64"))
}

fn error(span: impl quote::ToTokens, msg: &str) -> TokenStream {
    syn::Error::new_spanned(span, msg).to_compile_error().into()
}

/// Mark `fn(f64) -> f64` or `fn(f64, f64) -> f64` as a graphjit intrinsic.
///
/// Generates an `extern "C"` shim and submits it to the intrinsic inventory under
/// the function's name; register it with `register_intrinsics!` or
/// `SymbolResolver::register_collected`.
#[proc_macro_attribute]
pub fn intrinsic(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);
    let sig = &func.sig;
    let ident = &sig.ident;

    let ret_ok = match &sig.output {
        syn::ReturnType::Type(_, ty) => is_f64(ty),
        syn::ReturnType::Default => false,
    };
    if !ret_ok {
        return error(&sig.output, "#[intrinsic] requires return type f64");
    }
    if sig.asyncness.is_some() || sig.unsafety.is_some() || !sig.generics.params.is_empty() {
        return error(sig, "#[intrinsic] requires a plain, non-generic, safe fn");
    }

    let mut param_idents: Vec<syn::Ident> = Vec::new();
    for input in &sig.inputs {
        match input {
            syn::FnArg::Typed(pt) => {
                let syn::Pat::Ident(pat_ident) = &*pt.pat else {
                    return error(&pt.pat, "#[intrinsic] requires simple identifier parameters");
                };
                if !is_f64(&pt.ty) {
                    return error(&pt.ty, "#[intrinsic] only supports f64 parameters");
                }
                param_idents.push(pat_ident.ident.clone());
            }
            syn::FnArg::Receiver(_) => {
                return error(input, "#[intrinsic] does not support receiver parameters");
            }
        }
    }
    let arity = param_idents.len();
    if !(1..=2).contains(&arity) {
        return error(&sig.inputs, "#[intrinsic] supports 1 or 2 parameters");
    }

    let name_str = ident.to_string();
    let shim_ident = format_ident!("__graphjit_shim_{}", ident);
    let arity_lit = arity as u8;

    let output = quote! {
        #func

        #[allow(non_snake_case)]
        extern "C" fn #shim_ident( #( #param_idents: f64 ),* ) -> f64 { #ident( #( #param_idents ),* ) }

        ::graphjit::inventory::submit! {
            ::graphjit::IntrinsicMeta {
                name: #name_str,
                arity: #arity_lit,
                addr: #shim_ident as *const u8,
                mod_path: module_path!(),
            }
        }
    };

    output.into()
}
