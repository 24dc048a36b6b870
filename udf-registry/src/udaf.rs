//! Aggregate instantiation
//!
//! An aggregate family stores its building blocks by name only.  They are
//! looked up when a call selects one member of the family, so aggregates may
//! refer to functions registered after them.
use std::fmt::{self, Display};

use tracing::trace;

use crate::error::{Result, UdfError};
use crate::fndef::{FnDef, UdafDef};
use crate::helpers::expr::NodeManager;
use crate::helpers::literals::Literal;
use crate::helpers::types::DataType;
use crate::library::SealedUdfLibrary;

/// A reference to a function by name, resolved on first use
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionRef {
    pub name: String,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One member of an aggregate family
#[derive(Clone, Debug)]
pub struct UdafDescriptor {
    /// The type of the values being aggregated (T)
    pub element_type: DataType,
    /// The accumulator type (U)
    pub state_type: DataType,
    /// The result type (V)
    pub output_type: DataType,
    /// Already converted to the accumulator type
    pub init: Literal,
    /// Resolved as `update(U, T) -> U`
    pub update: FunctionRef,
    /// Resolved as `merge(U, U) -> U`
    pub merge: FunctionRef,
    /// Resolved as `output(U) -> V`
    pub output: FunctionRef,
}

/// Resolves the building blocks of `descriptor` into a definition
pub(crate) fn instantiate(
    library: &SealedUdfLibrary,
    name: &str,
    descriptor: &UdafDescriptor,
    node_manager: &mut NodeManager,
    depth: usize,
) -> Result<UdafDef> {
    let member = Member {
        library,
        name,
        list_type: DataType::List(Box::new(descriptor.element_type.clone())),
        depth,
    };
    let state = &descriptor.state_type;
    let update = member.resolve(
        node_manager,
        "update",
        &descriptor.update,
        &[state, &descriptor.element_type],
        state,
    )?;
    let merge = member.resolve(node_manager, "merge", &descriptor.merge, &[state, state], state)?;
    let output = member.resolve(
        node_manager,
        "output",
        &descriptor.output,
        &[state],
        &descriptor.output_type,
    )?;
    Ok(UdafDef {
        name: name.to_string(),
        element_type: descriptor.element_type.clone(),
        state_type: descriptor.state_type.clone(),
        output_type: descriptor.output_type.clone(),
        init: descriptor.init.clone(),
        update,
        merge,
        output,
    })
}

struct Member<'a> {
    library: &'a SealedUdfLibrary,
    name: &'a str,
    list_type: DataType,
    depth: usize,
}

impl<'a> Member<'a> {
    fn rejected(&self, message: String) -> UdfError {
        UdfError::logic_error(self.name, self.list_type.to_string(), message)
    }

    fn resolve(
        &self,
        node_manager: &mut NodeManager,
        role: &str,
        function: &FunctionRef,
        arg_types: &[&DataType],
        expected: &DataType,
    ) -> Result<FnDef> {
        trace!(udaf = self.name, role, function = %function, "resolving aggregate building block");
        let args = arg_types
            .iter()
            .enumerate()
            .map(|(idx, typ)| {
                node_manager.make_typed_expr_id(format!("{}_{}", role, idx), Some((*typ).clone()))
            })
            .collect::<Vec<_>>();
        let fn_def = self
            .library
            .resolve_definition(&function.name, &args, None, node_manager, self.depth + 1)
            .map_err(|err| {
                self.rejected(format!("the {} function failed to resolve: {}", role, err))
            })?;
        match fn_def.return_type() {
            Some(actual) if actual != expected => Err(self.rejected(format!(
                "the {} function {} returns {} but {} is required",
                role, function, actual, expected
            ))),
            _ => Ok(fn_def),
        }
    }
}
