//! # Builders to register functions
//!
//! Every `register_*` method of [UdfLibrary](crate::UdfLibrary) returns a
//! builder bound to one function name.  The builder appends overloads with
//! `args` (fixed arity) or `variadic_args` (fixed prefix plus a repeated tail)
//! and adjusts the most recent overload with the remaining methods.
//!
//! ## Signatures
//!
//! Formal parameters are given as a tuple of Rust types.  Anything implementing
//! [TypeInfer](crate::helpers::types::TypeInfer) becomes a concrete formal and
//! [AnyArg](types::AnyArg) is a placeholder that accepts every type.
//!
//! ```
//! use udf_registry::builder::types::AnyArg;
//! use udf_registry::fndef::NativeFnPtr;
//! use udf_registry::helpers::types::StringRef;
//! use udf_registry::UdfLibrary;
//!
//! let mut library = UdfLibrary::new();
//! library
//!     .register_external("concat")
//!     .doc("Concatenates the string form of its arguments")
//!     .variadic_args::<(), AnyArg>("concat_any", NativeFnPtr::null())
//!     .returns::<StringRef>()
//!     .min_tail_args(1)
//!     .args::<(StringRef, StringRef)>("concat_str", NativeFnPtr::null())
//!     .returns::<StringRef>();
//! let library = library.seal().unwrap();
//! assert_eq!(library.overload_set("concat").unwrap().len(), 2);
//! ```
//!
//! ## Window and projection contexts
//!
//! Overloads are allowed in both contexts by default.  `allow_window(false)` or
//! `allow_project(false)` restricts the most recent overload and every overload
//! appended after it by the same builder.
//!
//! ## Aggregates
//!
//! Aggregates are registered as families with
//! [register_simple_udaf](crate::UdfLibrary::register_simple_udaf), see
//! [SimpleUdafBuilder](udaf::SimpleUdafBuilder).
pub mod functions;
pub mod types;
pub mod udaf;
