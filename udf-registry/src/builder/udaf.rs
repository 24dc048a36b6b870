//! Registration builder for aggregate families
use std::sync::Arc;

use crate::builder::functions::OverloadCursor;
use crate::builder::types::{Signature, TypeSpecifier};
use crate::error::UdfError;
use crate::helpers::literals::{Literal, LiteralInference};
use crate::helpers::types::{DataType, TypeInfer};
use crate::library::{Payload, UdfLibrary};
use crate::udaf::{FunctionRef, UdafDescriptor};

/// A family member still being described
struct PendingMember {
    element_type: DataType,
    state_type: DataType,
    output_type: DataType,
    init: Option<Literal>,
    update: Option<FunctionRef>,
    merge: Option<FunctionRef>,
    output: Option<FunctionRef>,
}

impl PendingMember {
    fn label(&self, name: &str) -> String {
        format!(
            "{}<{}, {}, {}>",
            name, self.element_type, self.state_type, self.output_type
        )
    }

    fn complete(self, name: &str) -> Result<UdafDescriptor, UdfError> {
        let label = self.label(name);
        let missing = |piece: &str| {
            UdfError::invalid_registration(format!("The aggregate {} has no {}", label, piece))
        };
        let init = self.init.as_ref().ok_or_else(|| missing("const_init"))?;
        let init = init.widen_to(&self.state_type).ok_or_else(|| {
            UdfError::invalid_registration(format!(
                "The initial value of {} is a {} which cannot become the accumulator type {}",
                label,
                init.data_type(),
                self.state_type
            ))
        })?;
        Ok(UdafDescriptor {
            update: self.update.ok_or_else(|| missing("update function"))?,
            merge: self.merge.ok_or_else(|| missing("merge function"))?,
            output: self.output.ok_or_else(|| missing("output function"))?,
            element_type: self.element_type,
            state_type: self.state_type,
            output_type: self.output_type,
            init,
        })
    }
}

/// Registers an aggregate family, one member per element type
///
/// ```
/// # use udf_registry::UdfLibrary;
/// # use udf_registry::builder::types::AnyArg;
/// let mut library = UdfLibrary::new();
/// library
///     .register_expr_udf("identity")
///     .args::<(AnyArg,)>(|_, args| args[0]);
/// library
///     .register_simple_udaf("count")
///     .templates::<i32, i64, i64>()
///     .const_init(0_i64)
///     .update("inc")
///     .merge("add")
///     .output("identity")
///     .finalize();
/// // `inc` and `add` may be registered later, before the library is sealed
/// ```
///
/// A builder that is dropped without [finalize](Self::finalize) registers
/// nothing and makes [UdfLibrary::seal] fail.
pub struct SimpleUdafBuilder<'a> {
    library: &'a mut UdfLibrary,
    cursor: OverloadCursor,
    pending: Option<PendingMember>,
    members: Vec<UdafDescriptor>,
    finalized: bool,
}

impl<'a> SimpleUdafBuilder<'a> {
    pub(crate) fn new(library: &'a mut UdfLibrary, name: String) -> Self {
        Self {
            library,
            cursor: OverloadCursor::new(name),
            pending: None,
            members: Vec::new(),
            finalized: false,
        }
    }

    /// Start a member for element type `T`, accumulator `U` and result `V`
    pub fn templates<T: TypeInfer, U: TypeInfer, V: TypeInfer>(mut self) -> Self {
        self.close_pending();
        self.pending = Some(PendingMember {
            element_type: T::as_udf_type(),
            state_type: U::as_udf_type(),
            output_type: V::as_udf_type(),
            init: None,
            update: None,
            merge: None,
            output: None,
        });
        self
    }

    /// The accumulator's initial value.  It is widened to the accumulator type if needed.
    pub fn const_init(mut self, value: impl LiteralInference) -> Self {
        let value = value.to_literal();
        if let Some(pending) = self.pending_mut("const_init") {
            pending.init = Some(value);
        }
        self
    }

    pub fn update(mut self, function: impl Into<String>) -> Self {
        let function = FunctionRef::new(function);
        if let Some(pending) = self.pending_mut("update") {
            pending.update = Some(function);
        }
        self
    }

    pub fn merge(mut self, function: impl Into<String>) -> Self {
        let function = FunctionRef::new(function);
        if let Some(pending) = self.pending_mut("merge") {
            pending.merge = Some(function);
        }
        self
    }

    pub fn output(mut self, function: impl Into<String>) -> Self {
        let function = FunctionRef::new(function);
        if let Some(pending) = self.pending_mut("output") {
            pending.output = Some(function);
        }
        self
    }

    /// Applies to every member of the family
    pub fn allow_window(mut self, allow: bool) -> Self {
        self.cursor.set_allow_window(self.library, allow);
        self
    }

    /// Applies to every member of the family
    pub fn allow_project(mut self, allow: bool) -> Self {
        self.cursor.set_allow_project(self.library, allow);
        self
    }

    pub fn doc(self, doc: impl Into<String>) -> Self {
        self.library.set_doc(self.cursor.name(), doc.into());
        self
    }

    /// Close the family and register one overload per member
    ///
    /// Each overload takes a single list argument whose element type is the
    /// member's `T`.
    pub fn finalize(mut self) {
        self.finalized = true;
        self.close_pending();
        for descriptor in std::mem::take(&mut self.members) {
            let signature = Signature::fixed(vec![TypeSpecifier::Concrete(DataType::List(
                Box::new(descriptor.element_type.clone()),
            ))]);
            let payload = Payload::UdafInstance(Arc::new(descriptor));
            self.cursor.install(self.library, signature, payload);
        }
    }

    fn pending_mut(&mut self, piece: &str) -> Option<&mut PendingMember> {
        if self.pending.is_none() {
            self.library
                .record_error(UdfError::invalid_registration(format!(
                    "{} was set on the aggregate {} before templates",
                    piece,
                    self.cursor.name()
                )));
        }
        self.pending.as_mut()
    }

    fn close_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            match pending.complete(self.cursor.name()) {
                Ok(descriptor) => self.members.push(descriptor),
                Err(err) => self.library.record_error(err),
            }
        }
    }
}

impl Drop for SimpleUdafBuilder<'_> {
    fn drop(&mut self) {
        if !self.finalized {
            self.library
                .record_error(UdfError::invalid_registration(format!(
                    "The aggregate {} was never finalized",
                    self.cursor.name()
                )));
        }
    }
}
