//! # The function registry
//!
//! A [UdfLibrary] is built once, single threaded, by bootstrap code using the
//! registration builders.  [UdfLibrary::seal] validates what was registered and
//! turns it into a [SealedUdfLibrary].  Only the sealed library can resolve
//! calls, and nothing can be registered into it, so resolution is a read-only
//! operation that many compilations may run concurrently against one shared
//! library.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::builder::functions::{CodeGenUdfBuilder, ExprUdfBuilder, ExternalUdfBuilder};
use crate::builder::types::Signature;
use crate::builder::udaf::SimpleUdafBuilder;
use crate::context::{AnalysisContext, ResolveContext};
use crate::error::{Result, UdfError};
use crate::fndef::{ExternalFnDef, FnDef, GenFn, LambdaDef, NativeFnPtr, UdfByCodeGenDef};
use crate::helpers::expr::{ExprId, NodeManager, WindowDef};
use crate::helpers::types::DataType;
use crate::udaf::UdafDescriptor;
use crate::util::{format_arg_types, HasRequiredPropertiesRef};

/// Settings that shape how a library resolves calls
#[derive(Clone, Debug)]
pub struct LibraryParams {
    /// Let an actual argument match a formal of a wider type, e.g. int32 for double
    pub allow_implicit_widening: bool,
    /// How deeply resolutions may nest (aggregate building blocks, lambdas
    /// that resolve other functions) before the call is rejected
    pub max_resolve_depth: usize,
}

impl Default for LibraryParams {
    fn default() -> Self {
        Self {
            allow_implicit_widening: true,
            max_resolve_depth: 32,
        }
    }
}

impl LibraryParams {
    /// Only exact and placeholder matches are allowed
    pub fn new_strict() -> Self {
        Self {
            allow_implicit_widening: false,
            ..Default::default()
        }
    }
}

pub(crate) type LambdaFn =
    Arc<dyn Fn(&mut ResolveContext<'_>, &[ExprId]) -> ExprId + Send + Sync>;
pub(crate) type VariadicLambdaFn =
    Arc<dyn Fn(&mut ResolveContext<'_>, &[ExprId], &[ExprId]) -> ExprId + Send + Sync>;
pub(crate) type InferFn =
    Arc<dyn Fn(&mut ResolveContext<'_>, &[Option<DataType>]) -> Option<DataType> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum LambdaBody {
    Fixed(LambdaFn),
    /// Receives the prefix arguments and the tail arguments separately
    Variadic(VariadicLambdaFn),
}

#[derive(Clone)]
pub(crate) struct ExternalPayload {
    pub(crate) symbol: String,
    pub(crate) fn_ptr: NativeFnPtr,
    pub(crate) return_type: Option<DataType>,
}

#[derive(Clone)]
pub(crate) struct CodeGenPayload {
    pub(crate) infer: InferFn,
    pub(crate) generator: GenFn,
}

/// What a registered overload turns into once it is selected
#[derive(Clone)]
pub(crate) enum Payload {
    ExprLambda(LambdaBody),
    External(ExternalPayload),
    CodeGen(CodeGenPayload),
    UdafInstance(Arc<UdafDescriptor>),
}

/// The kind of implementation behind an overload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverloadKind {
    ExprLambda,
    External,
    CodeGen,
    UdafInstance,
}

/// One implementation of a function, bound to a signature
pub struct RegisteredOverload {
    name: String,
    signature: Signature,
    pub(crate) allow_window: bool,
    pub(crate) allow_project: bool,
    pub(crate) payload: Payload,
}

impl RegisteredOverload {
    pub(crate) fn new(
        name: String,
        signature: Signature,
        allow_window: bool,
        allow_project: bool,
        payload: Payload,
    ) -> Self {
        Self {
            name,
            signature,
            allow_window,
            allow_project,
            payload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn signature_mut(&mut self) -> &mut Signature {
        &mut self.signature
    }

    pub fn allow_window(&self) -> bool {
        self.allow_window
    }

    pub fn allow_project(&self) -> bool {
        self.allow_project
    }

    pub fn kind(&self) -> OverloadKind {
        match &self.payload {
            Payload::ExprLambda(_) => OverloadKind::ExprLambda,
            Payload::External(_) => OverloadKind::External,
            Payload::CodeGen(_) => OverloadKind::CodeGen,
            Payload::UdafInstance(_) => OverloadKind::UdafInstance,
        }
    }

    /// True if the overload may be used in a windowed call (`windowed`) or in
    /// a plain projection (`!windowed`)
    pub fn accepts_context(&self, windowed: bool) -> bool {
        if windowed {
            self.allow_window
        } else {
            self.allow_project
        }
    }

    #[cfg(test)]
    pub(crate) fn marker(name: &str, signature: Signature) -> Self {
        Self::new(
            name.to_string(),
            signature,
            true,
            true,
            Payload::External(ExternalPayload {
                symbol: name.to_string(),
                fn_ptr: NativeFnPtr::null(),
                return_type: None,
            }),
        )
    }
}

impl fmt::Debug for RegisteredOverload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredOverload")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("allow_window", &self.allow_window)
            .field("allow_project", &self.allow_project)
            .field("kind", &self.kind())
            .finish()
    }
}

/// All overloads registered under one name, in registration order
pub struct OverloadSet {
    name: String,
    overloads: Vec<RegisteredOverload>,
    doc: Option<String>,
}

impl OverloadSet {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
            doc: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overloads(&self) -> &[RegisteredOverload] {
        &self.overloads
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn len(&self) -> usize {
        self.overloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }

    /// Appends an overload and returns its index
    pub(crate) fn push(&mut self, overload: RegisteredOverload) -> usize {
        self.overloads.push(overload);
        self.overloads.len() - 1
    }
}

/// A library under construction
///
/// Registration problems (e.g. two overloads with the same signature) do not
/// interrupt the builder chains.  They are recorded and reported by [seal](Self::seal).
#[derive(Default)]
pub struct UdfLibrary {
    params: LibraryParams,
    sets: BTreeMap<String, OverloadSet>,
    aliases: BTreeMap<String, String>,
    errors: Vec<UdfError>,
}

impl UdfLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: LibraryParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Register overloads implemented as inlined expression templates
    pub fn register_expr_udf(&mut self, name: impl Into<String>) -> ExprUdfBuilder<'_> {
        ExprUdfBuilder::new(self, name.into())
    }

    /// Register overloads implemented by natively linked routines
    pub fn register_external(&mut self, name: impl Into<String>) -> ExternalUdfBuilder<'_> {
        ExternalUdfBuilder::new(self, name.into())
    }

    /// Register overloads lowered by a code generation hook
    pub fn register_codegen_udf(&mut self, name: impl Into<String>) -> CodeGenUdfBuilder<'_> {
        CodeGenUdfBuilder::new(self, name.into())
    }

    /// Register a family of aggregates, one instantiation per element type
    pub fn register_simple_udaf(&mut self, name: impl Into<String>) -> SimpleUdafBuilder<'_> {
        SimpleUdafBuilder::new(self, name.into())
    }

    /// Make `alias` resolve exactly as `target`
    pub fn register_alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut Self {
        let alias = alias.into();
        let target = target.into();
        if self.aliases.contains_key(&alias) {
            self.record_error(UdfError::invalid_registration(format!(
                "The alias {} was registered twice",
                alias
            )));
        } else {
            self.aliases.insert(alias, target);
        }
        self
    }

    pub(crate) fn record_error(&mut self, error: UdfError) {
        warn!(%error, "rejected udf registration");
        self.errors.push(error);
    }

    /// Appends an overload to the set for its name, creating the set if needed
    ///
    /// Returns the overload's index, or None (and records an error) if an
    /// overload with the same signature already exists.
    pub(crate) fn append_overload(&mut self, overload: RegisteredOverload) -> Option<usize> {
        let set = self
            .sets
            .entry(overload.name().to_string())
            .or_insert_with(|| OverloadSet::new(overload.name()));
        if set
            .overloads()
            .iter()
            .any(|existing| existing.signature().same_shape(overload.signature()))
        {
            let error = UdfError::invalid_registration(format!(
                "{}{} is registered twice",
                overload.name(),
                overload.signature()
            ));
            self.record_error(error);
            None
        } else {
            Some(set.push(overload))
        }
    }

    pub(crate) fn overload_mut(
        &mut self,
        name: &str,
        index: usize,
    ) -> Option<&mut RegisteredOverload> {
        self.sets
            .get_mut(name)
            .and_then(|set| set.overloads.get_mut(index))
    }

    pub(crate) fn set_doc(&mut self, name: &str, doc: String) {
        let set = self
            .sets
            .entry(name.to_string())
            .or_insert_with(|| OverloadSet::new(name));
        set.doc = Some(doc);
    }

    /// Validate the registrations and freeze the library
    pub fn seal(self) -> Result<SealedUdfLibrary> {
        let UdfLibrary {
            params,
            sets,
            aliases,
            errors,
        } = self;
        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }
        for set in sets.values() {
            for overload in set.overloads() {
                if let Payload::External(external) = &overload.payload {
                    if external.return_type.is_none() {
                        return Err(UdfError::invalid_registration(format!(
                            "External overload {}{} ({}) has no return type",
                            set.name(),
                            overload.signature(),
                            external.symbol
                        )));
                    }
                }
            }
        }
        for (alias, target) in &aliases {
            if sets.contains_key(alias) {
                return Err(UdfError::invalid_registration(format!(
                    "The alias {} shadows a registered function",
                    alias
                )));
            }
            if !sets.contains_key(target) {
                return Err(UdfError::invalid_registration(format!(
                    "The alias {} refers to the unregistered function {}",
                    alias, target
                )));
            }
        }
        debug!(
            functions = sets.len(),
            aliases = aliases.len(),
            "sealed udf library"
        );
        Ok(SealedUdfLibrary {
            params,
            sets,
            aliases,
        })
    }
}

/// A library in its read-only phase
///
/// Share it between compilations with an `Arc`.
pub struct SealedUdfLibrary {
    params: LibraryParams,
    sets: BTreeMap<String, OverloadSet>,
    aliases: BTreeMap<String, String>,
}

impl SealedUdfLibrary {
    pub fn params(&self) -> &LibraryParams {
        &self.params
    }

    /// Looks up the overloads for a function name or alias
    pub fn overload_set(&self, name: &str) -> Option<&OverloadSet> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.sets.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.overload_set(name).is_some()
    }

    /// Every registered function name and alias, sorted
    pub fn function_names(&self) -> Vec<&str> {
        let mut names = self
            .sets
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn doc(&self, name: &str) -> Option<&str> {
        self.overload_set(name).and_then(|set| set.doc())
    }

    /// Resolve a call and build the call node for it
    ///
    /// `args` are nodes of `ctx`'s node manager.  Their output types (possibly
    /// unset) decide which overload is used.  A call with a window definition
    /// only considers overloads that allow windows, a call without one only
    /// those that allow projection.
    ///
    /// On success the returned node is a call whose [FnDef] is the selected
    /// implementation.  On failure nothing usable is returned.
    pub fn transform(
        &self,
        name: &str,
        args: &[ExprId],
        over: Option<&WindowDef>,
        ctx: &mut AnalysisContext<'_>,
    ) -> Result<ExprId> {
        self.transform_at_depth(name, args, over, ctx.node_manager(), 0)
    }

    pub(crate) fn transform_at_depth(
        &self,
        name: &str,
        args: &[ExprId],
        over: Option<&WindowDef>,
        node_manager: &mut NodeManager,
        depth: usize,
    ) -> Result<ExprId> {
        let fn_def = self.resolve_definition(name, args, over, node_manager, depth)?;
        Ok(node_manager.make_call(fn_def, args.to_vec()))
    }

    pub(crate) fn resolve_definition(
        &self,
        name: &str,
        args: &[ExprId],
        over: Option<&WindowDef>,
        node_manager: &mut NodeManager,
        depth: usize,
    ) -> Result<FnDef> {
        let set = self
            .overload_set(name)
            .ok_or_else(|| UdfError::not_found(name))?;
        let arg_types = args
            .iter()
            .map(|arg| node_manager.output_type(*arg).cloned())
            .collect::<Vec<_>>();
        if depth > self.params.max_resolve_depth {
            return Err(UdfError::logic_error(
                set.name(),
                format_arg_types(arg_types.iter().map(|typ| typ.as_ref())),
                format!(
                    "resolution nested deeper than {} levels",
                    self.params.max_resolve_depth
                ),
            ));
        }
        let overload =
            crate::resolve::select_overload(set, &arg_types, over.is_some(), &self.params)?;
        self.invoke(overload, &arg_types, over, node_manager, depth)
    }

    /// Runs the selected overload's payload to produce its definition
    fn invoke(
        &self,
        overload: &RegisteredOverload,
        arg_types: &[Option<DataType>],
        over: Option<&WindowDef>,
        node_manager: &mut NodeManager,
        depth: usize,
    ) -> Result<FnDef> {
        let rejected = |message: String| {
            UdfError::logic_error(
                overload.name(),
                format_arg_types(arg_types.iter().map(|typ| typ.as_ref())),
                message,
            )
        };
        let signature = overload.signature();
        if let Some(tail) = &signature.variadic {
            let tail_len = arg_types.len() - signature.prefix_len();
            if tail_len < tail.min_count {
                return Err(rejected(format!(
                    "expected at least {} variadic arguments but received {}",
                    tail.min_count, tail_len
                )));
            }
        }

        match &overload.payload {
            Payload::ExprLambda(body) => {
                let params = arg_types
                    .iter()
                    .enumerate()
                    .map(|(idx, typ)| {
                        node_manager.make_typed_expr_id(format!("arg_{}", idx), typ.clone())
                    })
                    .collect::<Vec<_>>();
                let mut ctx = ResolveContext::new(self, node_manager, over, arg_types, depth);
                let body = match body {
                    LambdaBody::Fixed(lambda) => lambda(&mut ctx, &params),
                    LambdaBody::Variadic(lambda) => {
                        let (prefix, tail) = params.split_at(signature.prefix_len());
                        lambda(&mut ctx, prefix, tail)
                    }
                };
                if let Some(message) = ctx.take_error() {
                    return Err(rejected(message));
                }
                let return_type = node_manager.output_type(body).cloned();
                Ok(FnDef::Lambda(LambdaDef {
                    params,
                    body,
                    return_type,
                }))
            }
            Payload::External(external) => Ok(FnDef::External(ExternalFnDef {
                name: overload.name().to_string(),
                symbol: external.symbol.clone(),
                fn_ptr: external.fn_ptr,
                return_type: external.return_type.required("return_type")?.clone(),
                arg_types: arg_types.to_vec(),
                variadic_pos: signature.variadic.as_ref().map(|_| signature.prefix_len()),
            })),
            Payload::CodeGen(codegen) => {
                let mut ctx = ResolveContext::new(self, node_manager, over, arg_types, depth);
                let return_type = (codegen.infer)(&mut ctx, arg_types);
                if let Some(message) = ctx.take_error() {
                    return Err(rejected(message));
                }
                Ok(FnDef::CodeGen(UdfByCodeGenDef {
                    name: overload.name().to_string(),
                    arg_types: arg_types.to_vec(),
                    return_type,
                    generator: codegen.generator.clone(),
                }))
            }
            Payload::UdafInstance(descriptor) => {
                let udaf = crate::udaf::instantiate(
                    self,
                    overload.name(),
                    descriptor,
                    node_manager,
                    depth,
                )?;
                Ok(FnDef::Udaf(Box::new(udaf)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::types::AnyArg;
    use crate::helpers::types;

    fn sealed(build: impl FnOnce(&mut UdfLibrary)) -> Result<SealedUdfLibrary> {
        let mut library = UdfLibrary::new();
        build(&mut library);
        library.seal()
    }

    #[test]
    fn sealed_library_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SealedUdfLibrary>();
    }

    #[test]
    fn overload_debug_names_its_kind() {
        let library = sealed(|library| {
            library
                .register_external("lower")
                .args::<(types::StringRef,)>("lower_utf8", NativeFnPtr::null())
                .returns::<types::StringRef>();
        })
        .unwrap();
        let overload = &library.overload_set("lower").unwrap().overloads()[0];
        let rendered = format!("{:?}", overload);
        assert!(rendered.starts_with("RegisteredOverload { name: \"lower\""));
        assert!(rendered.contains("kind: External"));
    }

    #[test]
    fn payload_sees_call_shape() {
        let library = sealed(|library| {
            library
                .register_expr_udf("inspect")
                .variadic_args::<(), AnyArg>(|ctx, _, tail| {
                    let observed = format!(
                        "windowed={} args={} knows_self={}",
                        ctx.is_windowed(),
                        ctx.arg_size(),
                        ctx.library().has_function("inspect")
                    );
                    ctx.set_error(observed);
                    ctx.set_error("second message");
                    assert!(ctx.has_error());
                    assert!(ctx.error().unwrap().starts_with("windowed="));
                    tail[0]
                });
        })
        .unwrap();
        let mut nm = NodeManager::new();
        let x = nm.make_expr_id("x");
        let y = nm.make_expr_id("y");
        let window = nm.make_window_def("w");

        let mut ctx = AnalysisContext::new(&mut nm);
        let err = library
            .transform("inspect", &[x, y], None, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, UdfError::LogicError { .. }));
        assert!(err
            .to_string()
            .contains("windowed=false args=2 knows_self=true"));

        let err = library
            .transform("inspect", &[x], Some(&window), &mut ctx)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("windowed=true args=1 knows_self=true"));
        assert!(!err.to_string().contains("second message"));
    }

    #[test]
    fn duplicate_signatures_fail_at_seal() {
        let result = sealed(|library| {
            library
                .register_external("add")
                .args::<(i32, i32)>("add_a", NativeFnPtr::null())
                .returns::<i32>()
                .args::<(i32, i32)>("add_b", NativeFnPtr::null())
                .returns::<i32>();
        });
        assert!(matches!(result, Err(UdfError::InvalidRegistration(_))));
    }

    #[test]
    fn external_requires_return_type() {
        let result = sealed(|library| {
            library
                .register_external("abs")
                .args::<(AnyArg,)>("abs_any", NativeFnPtr::null());
        });
        let err = result.err().unwrap();
        assert_eq!(
            err.to_string(),
            "Invalid registration: External overload abs(any) (abs_any) has no return type"
        );
    }

    #[test]
    fn aliases_resolve_to_their_target() {
        let library = sealed(|library| {
            library
                .register_external("substring")
                .doc("Returns part of a string")
                .args::<(types::StringRef, i32, i32)>("substring3", NativeFnPtr::null())
                .returns::<types::StringRef>();
            library.register_alias("substr", "substring");
        })
        .unwrap();
        assert!(library.has_function("substr"));
        assert_eq!(library.doc("substr"), Some("Returns part of a string"));
        assert_eq!(library.function_names(), vec!["substr", "substring"]);

        let mut nm = NodeManager::new();
        let args = vec![
            nm.make_typed_expr_id("s", Some(types::string())),
            nm.make_typed_expr_id("a", Some(types::int32())),
            nm.make_typed_expr_id("b", Some(types::int32())),
        ];
        let mut ctx = AnalysisContext::new(&mut nm);
        let call = library.transform("substr", &args, None, &mut ctx).unwrap();
        let def = nm.get(call).unwrap().fn_def().unwrap();
        assert_eq!(def.as_external().unwrap().symbol, "substring3");
        assert_eq!(def.as_external().unwrap().name, "substring");
    }

    #[test]
    fn dangling_alias_fails_at_seal() {
        let result = sealed(|library| {
            library.register_alias("len", "length");
        });
        assert!(matches!(result, Err(UdfError::InvalidRegistration(_))));
    }

    #[test]
    fn nested_resolution_is_bounded() {
        let mut library = UdfLibrary::with_params(LibraryParams {
            max_resolve_depth: 4,
            ..Default::default()
        });
        library
            .register_expr_udf("forever")
            .args::<(AnyArg,)>(|ctx, args| match ctx.transform("forever", args) {
                Ok(expr) => expr,
                Err(err) => {
                    ctx.set_error(err.to_string());
                    args[0]
                }
            });
        let library = library.seal().unwrap();
        let mut nm = NodeManager::new();
        let x = nm.make_expr_id("x");
        let mut ctx = AnalysisContext::new(&mut nm);
        let err = library.transform("forever", &[x], None, &mut ctx).unwrap_err();
        assert!(matches!(err, UdfError::LogicError { .. }));
        assert!(err.to_string().contains("nested deeper than 4 levels"));
    }
}
