use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::parse::Parser;
use syn::{FnArg, ItemFn, LitBool, LitStr, ReturnType};

// Properties accepted by #[native_udf(...)]
//
// Example:
//  #[native_udf(name = "add", window = false, doc = "Adds two integers")]
#[derive(Default)]
struct NativeUdfProps {
    name: Option<LitStr>,
    window: Option<LitBool>,
    project: Option<LitBool>,
    doc: Option<LitStr>,
}

fn parse_props(attr: proc_macro2::TokenStream) -> syn::Result<NativeUdfProps> {
    let mut props = NativeUdfProps::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            props.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("window") {
            props.window = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("project") {
            props.project = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("doc") {
            props.doc = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("expected one of name, window, project, doc"));
        }
        Ok(())
    });
    parser.parse2(attr)?;
    Ok(props)
}

// Keeps the function and appends a registration function next to it
//
// Example Input:
//  #[native_udf(name = "add")]
//  pub extern "C" fn add_i32(x: i32, y: i32) -> i32 { x + y }
//
// Example Output:
//  pub extern "C" fn add_i32(x: i32, y: i32) -> i32 { x + y }
//  pub fn register_add_i32(library: &mut ::udf_registry::UdfLibrary) {
//      library
//          .register_external("add")
//          .allow_window(true)
//          .allow_project(true)
//          .args::<(i32, i32,)>("add_i32", NativeFnPtr::from_addr(add_i32 as usize))
//          .returns::<i32>();
//  }
fn native_udf2(
    attr: proc_macro2::TokenStream,
    item: proc_macro2::TokenStream,
) -> syn::Result<proc_macro2::TokenStream> {
    let props = parse_props(attr)?;
    let func: ItemFn = syn::parse2(item)?;
    if func.sig.abi.is_none() {
        return Err(syn::Error::new_spanned(
            &func.sig,
            "native_udf must be placed on an extern \"C\" fn",
        ));
    }
    let fn_ident = &func.sig.ident;
    let arg_types = func
        .sig
        .inputs
        .iter()
        .map(|input| match input {
            FnArg::Typed(arg) => Ok(&*arg.ty),
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "a native udf cannot take self",
            )),
        })
        .collect::<syn::Result<Vec<_>>>()?;
    let return_type = match &func.sig.output {
        ReturnType::Type(_, ty) => ty,
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                &func.sig,
                "a native udf must declare a return type",
            ))
        }
    };

    let name = props
        .name
        .map(|name| name.value())
        .unwrap_or_else(|| fn_ident.to_string());
    let symbol = fn_ident.to_string();
    let window = props.window.map(|flag| flag.value).unwrap_or(true);
    let project = props.project.map(|flag| flag.value).unwrap_or(true);
    let doc = props.doc.map(|doc| quote! { .doc(#doc) });
    let register_ident = format_ident!("register_{}", fn_ident);
    let vis = &func.vis;

    Ok(quote! {
        #func

        #vis fn #register_ident(library: &mut ::udf_registry::UdfLibrary) {
            library
                .register_external(#name)
                #doc
                .allow_window(#window)
                .allow_project(#project)
                .args::<(#(#arg_types,)*)>(
                    #symbol,
                    ::udf_registry::fndef::NativeFnPtr::from_addr(#fn_ident as usize),
                )
                .returns::<#return_type>();
        }
    })
}

/// Registers an `extern "C"` function as an external udf overload
///
/// The function is kept as written.  Next to it the macro generates
/// `register_<fn>(&mut UdfLibrary)` which registers the function under `name`
/// (the function's own name by default) with a signature taken from the Rust
/// parameter and return types.
///
/// # Examples
/// ```ignore
/// use udf_registry::macros::native_udf;
///
/// #[native_udf(name = "add", window = false, doc = "Adds two integers")]
/// pub extern "C" fn add_i32(x: i32, y: i32) -> i32 {
///     x + y
/// }
///
/// let mut library = udf_registry::UdfLibrary::new();
/// register_add_i32(&mut library);
/// ```
#[proc_macro_attribute]
pub fn native_udf(attr: TokenStream, item: TokenStream) -> TokenStream {
    native_udf2(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
