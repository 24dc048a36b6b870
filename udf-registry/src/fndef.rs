//! # Resolved function definitions
//!
//! A successful resolution produces a call node whose [FnDef] says which
//! implementation the call site uses.  The code generation backend consumes
//! these definitions.  It is not part of this crate, the
//! [CodeGenContext] trait is the only piece of it the registry needs.
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, UdfError};
use crate::helpers::expr::ExprId;
use crate::helpers::literals::Literal;
use crate::helpers::types::DataType;
use crate::util::format_arg_types;

/// The address of a natively linked routine
///
/// This is only an address.  It is never dereferenced or called by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeFnPtr(usize);

impl NativeFnPtr {
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// A pointer for a routine the backend links later by symbol name
    pub const fn null() -> Self {
        Self(0)
    }

    pub fn addr(&self) -> usize {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A value produced by the code generation backend
#[derive(Clone, Debug, PartialEq)]
pub struct NativeValue {
    /// Backend defined handle (register, slot, ...)
    pub slot: u32,
    pub data_type: Option<DataType>,
}

/// The part of the code generation backend a code-gen UDF is lowered against
pub trait CodeGenContext {
    /// Allocate a new value of the given type
    fn new_value(&mut self, data_type: Option<&DataType>) -> NativeValue;
}

pub(crate) type GenFn =
    Arc<dyn Fn(&mut dyn CodeGenContext, &[NativeValue]) -> Result<NativeValue> + Send + Sync>;

/// The kind of a resolved definition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnDefKind {
    LambdaDef,
    ExternalFnDef,
    UdfByCodeGenDef,
    UdafDef,
}

/// An inlined expression template applied to the call's arguments
#[derive(Clone, Debug)]
pub struct LambdaDef {
    /// Placeholders standing for the call's arguments, in order
    pub params: Vec<ExprId>,
    pub body: ExprId,
    pub return_type: Option<DataType>,
}

/// A call to a natively linked routine
#[derive(Clone, Debug)]
pub struct ExternalFnDef {
    /// The registered (SQL facing) function name
    pub name: String,
    /// The native symbol the backend links against
    pub symbol: String,
    pub fn_ptr: NativeFnPtr,
    pub return_type: DataType,
    pub arg_types: Vec<Option<DataType>>,
    /// Zero-based position of the first variadic argument, for a variadic match
    pub variadic_pos: Option<usize>,
}

/// A call lowered by a code generation hook
#[derive(Clone)]
pub struct UdfByCodeGenDef {
    pub name: String,
    pub arg_types: Vec<Option<DataType>>,
    pub return_type: Option<DataType>,
    pub(crate) generator: GenFn,
}

impl UdfByCodeGenDef {
    /// Lower the call with the backend
    pub fn generate(
        &self,
        ctx: &mut dyn CodeGenContext,
        args: &[NativeValue],
    ) -> Result<NativeValue> {
        if args.len() != self.arg_types.len() {
            return Err(UdfError::logic_error(
                &self.name,
                format_arg_types(self.arg_types.iter().map(|typ| typ.as_ref())),
                format!(
                    "code generation expected {} values but received {}",
                    self.arg_types.len(),
                    args.len()
                ),
            ));
        }
        (self.generator)(ctx, args)
    }
}

impl fmt::Debug for UdfByCodeGenDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdfByCodeGenDef")
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// One instantiation of an aggregate, with its building blocks resolved
#[derive(Clone, Debug)]
pub struct UdafDef {
    pub name: String,
    pub element_type: DataType,
    pub state_type: DataType,
    pub output_type: DataType,
    /// Initial accumulator value, already of `state_type`
    pub init: Literal,
    pub update: FnDef,
    pub merge: FnDef,
    pub output: FnDef,
}

/// A resolved function definition
#[derive(Clone, Debug)]
pub enum FnDef {
    Lambda(LambdaDef),
    External(ExternalFnDef),
    CodeGen(UdfByCodeGenDef),
    Udaf(Box<UdafDef>),
}

impl FnDef {
    pub fn kind(&self) -> FnDefKind {
        match self {
            FnDef::Lambda(_) => FnDefKind::LambdaDef,
            FnDef::External(_) => FnDefKind::ExternalFnDef,
            FnDef::CodeGen(_) => FnDefKind::UdfByCodeGenDef,
            FnDef::Udaf(_) => FnDefKind::UdafDef,
        }
    }

    /// The type a call to this definition produces, if known
    pub fn return_type(&self) -> Option<&DataType> {
        match self {
            FnDef::Lambda(lambda) => lambda.return_type.as_ref(),
            FnDef::External(external) => Some(&external.return_type),
            FnDef::CodeGen(codegen) => codegen.return_type.as_ref(),
            FnDef::Udaf(udaf) => Some(&udaf.output_type),
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaDef> {
        match self {
            FnDef::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<&ExternalFnDef> {
        match self {
            FnDef::External(external) => Some(external),
            _ => None,
        }
    }

    pub fn as_codegen(&self) -> Option<&UdfByCodeGenDef> {
        match self {
            FnDef::CodeGen(codegen) => Some(codegen),
            _ => None,
        }
    }

    pub fn as_udaf(&self) -> Option<&UdafDef> {
        match self {
            FnDef::Udaf(udaf) => Some(udaf),
            _ => None,
        }
    }
}
