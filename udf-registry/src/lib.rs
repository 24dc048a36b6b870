//! # UDF Registry
//!
//! This crate is the function catalog of a SQL engine.  It stores user defined
//! functions, registered under a name with one or more typed overloads, and
//! decides at compile time which overload a call site uses.
//!
//! ## What is Provided
//!
//! * A [library](crate::library::UdfLibrary) that bootstrap code fills with
//!   functions using fluent [builders](crate::builder)
//! * Four kinds of implementations: inlined expression templates, natively linked
//!   routines, code generation hooks and aggregates composed from other functions
//! * A resolution engine, [transform](crate::library::SealedUdfLibrary::transform),
//!   that picks the most specific overload for a call and produces its definition
//! * An attribute macro, [native_udf](crate::macros::native_udf), that registers
//!   an `extern "C"` function from its Rust signature
//!
//! ## Overview
//!
//! ```
//! use udf_registry::builder::types::AnyArg;
//! use udf_registry::context::AnalysisContext;
//! use udf_registry::fndef::{FnDefKind, NativeFnPtr};
//! use udf_registry::helpers::expr::NodeManager;
//! use udf_registry::helpers::types;
//! use udf_registry::UdfLibrary;
//!
//! let mut library = UdfLibrary::new();
//! library
//!     .register_external("add")
//!     .args::<(i32, i32)>("add_int32", NativeFnPtr::null())
//!     .returns::<i32>()
//!     .args::<(f64, f64)>("add_double", NativeFnPtr::null())
//!     .returns::<f64>();
//! library
//!     .register_expr_udf("twice")
//!     .args::<(AnyArg,)>(|ctx, args| {
//!         ctx.transform("add", &[args[0], args[0]])
//!             .unwrap_or(args[0])
//!     });
//! let library = library.seal().unwrap();
//!
//! let mut nm = NodeManager::new();
//! let x = nm.make_typed_expr_id("x", Some(types::int32()));
//! let mut ctx = AnalysisContext::new(&mut nm);
//! let call = library.transform("add", &[x, x], None, &mut ctx).unwrap();
//! let fn_def = nm.get(call).unwrap().fn_def().unwrap();
//! assert_eq!(fn_def.kind(), FnDefKind::ExternalFnDef);
//! assert_eq!(fn_def.as_external().unwrap().symbol, "add_int32");
//! ```
//!
//! ## Lifecycle
//!
//! A library has two phases.  While it is a [UdfLibrary] it can only be
//! registered into.  [UdfLibrary::seal] checks the registrations and returns a
//! [SealedUdfLibrary], which can only resolve.  A sealed library is `Send + Sync`
//! and is typically wrapped in an `Arc` and shared by every compilation.
//!
//! ## Resolution
//!
//! A call names a function, passes argument nodes (whose types may not be known
//! yet) and is either a plain projection or windowed.  Among the overloads that
//! allow the call's context and accept its arity, each argument position is
//! scored: a placeholder formal or an unknown actual scores 0, a match after
//! widening (e.g. int32 to double) scores 1 and an exact match scores 2.
//! A matching fixed signature always beats a variadic one.  Within that group
//! overloads that need no widening are preferred over ones that do and the
//! highest total wins.  Ties go to the overload with the longest run of known
//! leading positions, then (between variadic overloads) to the longer fixed
//! prefix and the earliest registration.  Anything still tied is ambiguous.
//!
//! Failures are reported as [UdfError](crate::error::UdfError): an unknown name,
//! no acceptable overload, an ambiguous call, or a call the selected overload's
//! payload rejected.
pub mod builder;
pub mod context;
pub mod error;
pub mod fndef;
pub mod helpers;
pub mod library;
mod resolve;
pub mod udaf;
pub(crate) mod util;

pub use library::{LibraryParams, SealedUdfLibrary, UdfLibrary};

pub use udf_registry_macros as macros;
