use std::fmt::{self, Display};

use crate::helpers::types::{DataType, TypeInfer};

/// The type a formal parameter accepts
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeSpecifier {
    /// Accepts an actual of exactly this type (or one that widens to it)
    Concrete(DataType),
    /// Accepts any actual, including one whose type is not known yet
    Any,
}

impl Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpecifier::Concrete(typ) => write!(f, "{}", typ),
            TypeSpecifier::Any => write!(f, "any"),
        }
    }
}

/// The repeated tail of a variadic signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariadicTail {
    /// Every trailing argument is checked against this
    pub specifier: TypeSpecifier,
    /// The fewest trailing arguments the payload accepts
    ///
    /// Candidate selection ignores this.  It is checked when the selected
    /// overload's payload is invoked.
    pub min_count: usize,
}

/// The formal parameters of one overload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The fixed positions (the prefix, for a variadic signature)
    pub args: Vec<TypeSpecifier>,
    pub variadic: Option<VariadicTail>,
}

impl Signature {
    pub fn fixed(args: Vec<TypeSpecifier>) -> Self {
        Self {
            args,
            variadic: None,
        }
    }

    pub fn variadic(prefix: Vec<TypeSpecifier>, tail: TypeSpecifier) -> Self {
        Self {
            args: prefix,
            variadic: Some(VariadicTail {
                specifier: tail,
                min_count: 0,
            }),
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// The number of fixed positions
    pub fn prefix_len(&self) -> usize {
        self.args.len()
    }

    /// True if the two signatures accept the same argument shapes
    ///
    /// The minimum tail count is not part of a signature's identity.
    pub fn same_shape(&self, other: &Signature) -> bool {
        self.args == other.args
            && self.variadic.as_ref().map(|tail| &tail.specifier)
                == other.variadic.as_ref().map(|tail| &tail.specifier)
    }

    /// The formal specifier for the actual argument at `position`
    pub fn specifier_at(&self, position: usize) -> Option<&TypeSpecifier> {
        self.args
            .get(position)
            .or_else(|| self.variadic.as_ref().map(|tail| &tail.specifier))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = self.args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
        if let Some(tail) = &self.variadic {
            parts.push(format!("...{}", tail.specifier));
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// Placeholder used in a registration signature to accept any argument type
pub struct AnyArg;

/// A single formal parameter in a registration signature
///
/// Implemented for every [TypeInfer] type and for [AnyArg]
pub trait ArgType {
    fn specifier() -> TypeSpecifier;
}

impl<T: TypeInfer> ArgType for T {
    fn specifier() -> TypeSpecifier {
        TypeSpecifier::Concrete(T::as_udf_type())
    }
}

impl ArgType for AnyArg {
    fn specifier() -> TypeSpecifier {
        TypeSpecifier::Any
    }
}

/// A tuple of formal parameters, e.g. `(f64, AnyArg)`
pub trait ArgTypes {
    fn specifiers() -> Vec<TypeSpecifier>;
}

macro_rules! impl_arg_types {
    ($($name:ident),*) => {
        impl<$($name: ArgType),*> ArgTypes for ($($name,)*) {
            fn specifiers() -> Vec<TypeSpecifier> {
                vec![$($name::specifier()),*]
            }
        }
    };
}

impl_arg_types!();
impl_arg_types!(A);
impl_arg_types!(A, B);
impl_arg_types!(A, B, C);
impl_arg_types!(A, B, C, D);
impl_arg_types!(A, B, C, D, E);
impl_arg_types!(A, B, C, D, E, F);
impl_arg_types!(A, B, C, D, E, F, G);
impl_arg_types!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::types::{self, ListRef, StringRef};

    #[test]
    fn tuples_become_specifiers() {
        assert!(<() as ArgTypes>::specifiers().is_empty());
        assert_eq!(
            <(f64, AnyArg, ListRef<StringRef>) as ArgTypes>::specifiers(),
            vec![
                TypeSpecifier::Concrete(types::double()),
                TypeSpecifier::Any,
                TypeSpecifier::Concrete(types::list(types::string())),
            ]
        );
    }

    #[test]
    fn variadic_positions() {
        let sig = Signature::variadic(vec![TypeSpecifier::Concrete(types::int32())], TypeSpecifier::Any);
        assert_eq!(sig.specifier_at(0), Some(&TypeSpecifier::Concrete(types::int32())));
        assert_eq!(sig.specifier_at(5), Some(&TypeSpecifier::Any));
        assert_eq!(sig.to_string(), "(int32, ...any)");

        let fixed = Signature::fixed(vec![TypeSpecifier::Any]);
        assert_eq!(fixed.specifier_at(1), None);
        assert!(!fixed.same_shape(&sig));
    }

    #[test]
    fn min_count_is_not_identity() {
        let a = Signature::variadic(vec![], TypeSpecifier::Any);
        let mut b = a.clone();
        b.variadic.as_mut().unwrap().min_count = 3;
        assert!(a.same_shape(&b));
    }
}
