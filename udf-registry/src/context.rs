//! Contexts handed to the registry by the analyzer and to payloads by the registry
use crate::error::Result;
use crate::helpers::expr::{ExprId, NodeManager, WindowDef};
use crate::helpers::types::DataType;
use crate::library::SealedUdfLibrary;

/// The analyzer's per-compilation state that resolution writes into
///
/// New nodes produced by [transform](crate::library::SealedUdfLibrary::transform)
/// are allocated in this context's node manager.
pub struct AnalysisContext<'a> {
    node_manager: &'a mut NodeManager,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(node_manager: &'a mut NodeManager) -> Self {
        Self { node_manager }
    }

    pub fn node_manager(&mut self) -> &mut NodeManager {
        self.node_manager
    }
}

/// Everything an overload's payload may look at while it builds a definition
///
/// Payloads report a semantic rejection through [set_error](Self::set_error).
/// The registry then fails the call with a logic error instead of returning
/// the payload's result.
pub struct ResolveContext<'a> {
    library: &'a SealedUdfLibrary,
    node_manager: &'a mut NodeManager,
    over: Option<&'a WindowDef>,
    arg_types: &'a [Option<DataType>],
    depth: usize,
    error: Option<String>,
}

impl<'a> ResolveContext<'a> {
    pub(crate) fn new(
        library: &'a SealedUdfLibrary,
        node_manager: &'a mut NodeManager,
        over: Option<&'a WindowDef>,
        arg_types: &'a [Option<DataType>],
        depth: usize,
    ) -> Self {
        Self {
            library,
            node_manager,
            over,
            arg_types,
            depth,
            error: None,
        }
    }

    pub fn node_manager(&mut self) -> &mut NodeManager {
        self.node_manager
    }

    pub fn library(&self) -> &SealedUdfLibrary {
        self.library
    }

    /// The window of the call, None for a plain projection
    pub fn over(&self) -> Option<&WindowDef> {
        self.over
    }

    pub fn is_windowed(&self) -> bool {
        self.over.is_some()
    }

    pub fn arg_size(&self) -> usize {
        self.arg_types.len()
    }

    /// The actual type at `index`, None if it is unknown or out of range
    pub fn arg_type(&self, index: usize) -> Option<&DataType> {
        self.arg_types.get(index).and_then(|typ| typ.as_ref())
    }

    pub fn arg_types(&self) -> &[Option<DataType>] {
        self.arg_types
    }

    /// Reject the call.  Only the first message is kept.
    pub fn set_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Resolve a nested call through the same library, in the same window context
    pub fn transform(&mut self, name: &str, args: &[ExprId]) -> Result<ExprId> {
        self.library
            .transform_at_depth(name, args, self.over, self.node_manager, self.depth + 1)
    }
}
