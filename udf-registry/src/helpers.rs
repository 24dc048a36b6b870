//! # The expression and type layer the registry works against
//!
//! The registry does not design the analyzer's AST.  It only needs to build
//! placeholder expressions, read and write an expression's inferred output
//! type, compare two types, and build a few constant and call nodes.  This
//! module holds a small arena of expression nodes ([expr](crate::helpers::expr)),
//! the [type descriptors](crate::helpers::types::DataType) and the typed
//! [literals](crate::helpers::literals::Literal) used to initialize aggregates.

pub mod expr;
pub mod literals;
pub mod types;
