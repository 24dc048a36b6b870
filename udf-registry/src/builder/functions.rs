//! Registration builders for scalar functions
//!
//! Each builder registers any number of overloads under one name.  Calls to
//! `args` / `variadic_args` append an overload, the other methods adjust the
//! most recently appended one.
use std::sync::Arc;

use crate::builder::types::{ArgType, ArgTypes, Signature};
use crate::context::ResolveContext;
use crate::error::{Result, UdfError};
use crate::fndef::{CodeGenContext, NativeFnPtr, NativeValue};
use crate::helpers::expr::ExprId;
use crate::helpers::types::{DataType, TypeInfer};
use crate::library::{
    CodeGenPayload, ExternalPayload, LambdaBody, Payload, RegisteredOverload, UdfLibrary,
};

/// Tracks the overload the next flag or option applies to
///
/// The window and projection flags are sticky.  Setting one changes the most
/// recent overload and becomes the default for overloads appended later.
pub(crate) struct OverloadCursor {
    name: String,
    last: Option<usize>,
    appended: bool,
    allow_window: bool,
    allow_project: bool,
}

impl OverloadCursor {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            last: None,
            appended: false,
            allow_window: true,
            allow_project: true,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn install(&mut self, library: &mut UdfLibrary, signature: Signature, payload: Payload) {
        let overload = RegisteredOverload::new(
            self.name.clone(),
            signature,
            self.allow_window,
            self.allow_project,
            payload,
        );
        self.last = library.append_overload(overload);
        self.appended = true;
    }

    pub(crate) fn last_mut<'l>(
        &self,
        library: &'l mut UdfLibrary,
    ) -> Option<&'l mut RegisteredOverload> {
        match self.last {
            Some(index) => library.overload_mut(&self.name, index),
            None => None,
        }
    }

    pub(crate) fn set_allow_window(&mut self, library: &mut UdfLibrary, allow: bool) {
        self.allow_window = allow;
        if let Some(overload) = self.last_mut(library) {
            overload.allow_window = allow;
        }
    }

    pub(crate) fn set_allow_project(&mut self, library: &mut UdfLibrary, allow: bool) {
        self.allow_project = allow;
        if let Some(overload) = self.last_mut(library) {
            overload.allow_project = allow;
        }
    }

    fn set_min_tail_args(&mut self, library: &mut UdfLibrary, count: usize) {
        let name = self.name.clone();
        match self.last_mut(library) {
            Some(overload) => {
                let signature = overload.signature().to_string();
                match overload.signature_mut().variadic.as_mut() {
                    Some(tail) => tail.min_count = count,
                    None => library.record_error(UdfError::invalid_registration(format!(
                        "min_tail_args was set on {}{} which is not variadic",
                        name, signature
                    ))),
                }
            }
            None if !self.appended => library.record_error(UdfError::invalid_registration(
                format!("min_tail_args was set on {} before any overload", name),
            )),
            None => {}
        }
    }
}

macro_rules! overload_options {
    () => {
        /// Allow or forbid the most recent overload (and later ones) in windowed calls
        pub fn allow_window(mut self, allow: bool) -> Self {
            self.cursor.set_allow_window(self.library, allow);
            self
        }

        /// Allow or forbid the most recent overload (and later ones) in plain projections
        pub fn allow_project(mut self, allow: bool) -> Self {
            self.cursor.set_allow_project(self.library, allow);
            self
        }

        /// Require at least `count` trailing arguments for the most recent
        /// overload, which must be variadic
        pub fn min_tail_args(mut self, count: usize) -> Self {
            self.cursor.set_min_tail_args(self.library, count);
            self
        }

        /// Attach documentation to the function name
        pub fn doc(self, doc: impl Into<String>) -> Self {
            self.library.set_doc(self.cursor.name(), doc.into());
            self
        }
    };
}

/// Registers overloads implemented as inlined expression templates
///
/// The template receives one placeholder expression per actual argument and
/// builds the body out of them, usually by resolving other functions through
/// [ResolveContext::transform].
pub struct ExprUdfBuilder<'a> {
    library: &'a mut UdfLibrary,
    cursor: OverloadCursor,
}

impl<'a> ExprUdfBuilder<'a> {
    pub(crate) fn new(library: &'a mut UdfLibrary, name: String) -> Self {
        Self {
            library,
            cursor: OverloadCursor::new(name),
        }
    }

    overload_options!();

    /// Append a fixed-arity overload with formals `A`, e.g. `(f64, AnyArg)`
    pub fn args<A: ArgTypes>(
        mut self,
        body: impl Fn(&mut ResolveContext<'_>, &[ExprId]) -> ExprId + Send + Sync + 'static,
    ) -> Self {
        let payload = Payload::ExprLambda(LambdaBody::Fixed(Arc::new(body)));
        self.cursor
            .install(self.library, Signature::fixed(A::specifiers()), payload);
        self
    }

    /// Append a variadic overload with the fixed formals `P` followed by any
    /// number of arguments matching `T`
    ///
    /// The template receives the prefix placeholders and the tail placeholders separately.
    pub fn variadic_args<P: ArgTypes, T: ArgType>(
        mut self,
        body: impl Fn(&mut ResolveContext<'_>, &[ExprId], &[ExprId]) -> ExprId
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let payload = Payload::ExprLambda(LambdaBody::Variadic(Arc::new(body)));
        let signature = Signature::variadic(P::specifiers(), T::specifier());
        self.cursor.install(self.library, signature, payload);
        self
    }
}

/// Registers overloads implemented by natively linked routines
///
/// Every overload needs a return type, set with [returns](Self::returns) right
/// after the overload is appended.  A missing one fails [UdfLibrary::seal].
pub struct ExternalUdfBuilder<'a> {
    library: &'a mut UdfLibrary,
    cursor: OverloadCursor,
}

impl<'a> ExternalUdfBuilder<'a> {
    pub(crate) fn new(library: &'a mut UdfLibrary, name: String) -> Self {
        Self {
            library,
            cursor: OverloadCursor::new(name),
        }
    }

    overload_options!();

    pub fn args<A: ArgTypes>(mut self, symbol: impl Into<String>, fn_ptr: NativeFnPtr) -> Self {
        let payload = Self::payload(symbol.into(), fn_ptr);
        self.cursor
            .install(self.library, Signature::fixed(A::specifiers()), payload);
        self
    }

    /// Append a variadic overload.  The routine receives the position of the
    /// first trailing argument as [variadic_pos](crate::fndef::ExternalFnDef::variadic_pos).
    pub fn variadic_args<P: ArgTypes, T: ArgType>(
        mut self,
        symbol: impl Into<String>,
        fn_ptr: NativeFnPtr,
    ) -> Self {
        let payload = Self::payload(symbol.into(), fn_ptr);
        let signature = Signature::variadic(P::specifiers(), T::specifier());
        self.cursor.install(self.library, signature, payload);
        self
    }

    /// Set the return type of the most recent overload
    pub fn returns<T: TypeInfer>(self) -> Self {
        self.returns_type(T::as_udf_type())
    }

    pub fn returns_type(self, return_type: DataType) -> Self {
        if let Some(overload) = self.cursor.last_mut(self.library) {
            if let Payload::External(external) = &mut overload.payload {
                external.return_type = Some(return_type);
            }
        }
        self
    }

    fn payload(symbol: String, fn_ptr: NativeFnPtr) -> Payload {
        Payload::External(ExternalPayload {
            symbol,
            fn_ptr,
            return_type: None,
        })
    }
}

/// Registers overloads lowered by a code generation hook
///
/// Each overload has two halves.  `infer` runs during resolution and decides
/// the call's return type (it may reject the call through the context).
/// `generator` runs later, in the backend, through
/// [UdfByCodeGenDef::generate](crate::fndef::UdfByCodeGenDef::generate).
pub struct CodeGenUdfBuilder<'a> {
    library: &'a mut UdfLibrary,
    cursor: OverloadCursor,
}

impl<'a> CodeGenUdfBuilder<'a> {
    pub(crate) fn new(library: &'a mut UdfLibrary, name: String) -> Self {
        Self {
            library,
            cursor: OverloadCursor::new(name),
        }
    }

    overload_options!();

    pub fn args<A: ArgTypes>(
        mut self,
        infer: impl Fn(&mut ResolveContext<'_>, &[Option<DataType>]) -> Option<DataType>
            + Send
            + Sync
            + 'static,
        generator: impl Fn(&mut dyn CodeGenContext, &[NativeValue]) -> Result<NativeValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let payload = Payload::CodeGen(CodeGenPayload {
            infer: Arc::new(infer),
            generator: Arc::new(generator),
        });
        self.cursor
            .install(self.library, Signature::fixed(A::specifiers()), payload);
        self
    }

    pub fn variadic_args<P: ArgTypes, T: ArgType>(
        mut self,
        infer: impl Fn(&mut ResolveContext<'_>, &[Option<DataType>]) -> Option<DataType>
            + Send
            + Sync
            + 'static,
        generator: impl Fn(&mut dyn CodeGenContext, &[NativeValue]) -> Result<NativeValue>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let payload = Payload::CodeGen(CodeGenPayload {
            infer: Arc::new(infer),
            generator: Arc::new(generator),
        });
        let signature = Signature::variadic(P::specifiers(), T::specifier());
        self.cursor.install(self.library, signature, payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::types::{AnyArg, TypeSpecifier};
    use crate::error::UdfError;
    use crate::fndef::NativeFnPtr;
    use crate::helpers::types::{self, StringRef};
    use crate::library::{OverloadKind, UdfLibrary};

    #[test]
    fn flags_are_sticky() {
        let mut library = UdfLibrary::new();
        library
            .register_expr_udf("add")
            .allow_window(false)
            .args::<(AnyArg, AnyArg)>(|_, args| args[0])
            .args::<(f64, i32)>(|_, args| args[0])
            .allow_project(false)
            .args::<(StringRef,)>(|_, args| args[0]);
        let library = library.seal().unwrap();
        let set = library.overload_set("add").unwrap();
        let flags = set
            .overloads()
            .iter()
            .map(|overload| (overload.allow_window(), overload.allow_project()))
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![(false, true), (false, false), (false, false)]);
        assert!(set
            .overloads()
            .iter()
            .all(|overload| overload.kind() == OverloadKind::ExprLambda));
    }

    #[test]
    fn variadic_registration_shape() {
        let mut library = UdfLibrary::new();
        library
            .register_external("concat")
            .variadic_args::<(i32,), AnyArg>("concat1", NativeFnPtr::null())
            .returns::<StringRef>()
            .min_tail_args(1);
        let library = library.seal().unwrap();
        let overload = &library.overload_set("concat").unwrap().overloads()[0];
        let signature = overload.signature();
        assert_eq!(signature.args, vec![TypeSpecifier::Concrete(types::int32())]);
        let tail = signature.variadic.as_ref().unwrap();
        assert_eq!(tail.specifier, TypeSpecifier::Any);
        assert_eq!(tail.min_count, 1);
    }

    #[test]
    fn min_tail_args_requires_variadic() {
        let mut library = UdfLibrary::new();
        library
            .register_expr_udf("neg")
            .args::<(i32,)>(|_, args| args[0])
            .min_tail_args(2);
        let err = library.seal().err().unwrap();
        assert!(matches!(err, UdfError::InvalidRegistration(_)));
        assert_eq!(
            err.to_string(),
            "Invalid registration: min_tail_args was set on neg(int32) which is not variadic"
        );
    }

    #[test]
    fn min_tail_args_after_duplicate_reports_the_duplicate() {
        let mut library = UdfLibrary::new();
        library
            .register_expr_udf("neg")
            .args::<(i32,)>(|_, args| args[0])
            .args::<(i32,)>(|_, args| args[0])
            .min_tail_args(1);
        let err = library.seal().err().unwrap();
        assert_eq!(
            err.to_string(),
            "Invalid registration: neg(int32) is registered twice"
        );
    }
}
