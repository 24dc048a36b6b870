//! Error handling utilities for the crate
use thiserror::Error;

/// All errors raised by this crate will be instances of UdfError
///
/// The first four variants are resolution failures.  An expression analyzer
/// is expected to treat them uniformly as "this call could not be resolved"
/// and report a diagnostic naming the function and its argument types.  None
/// of them leave a usable definition behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UdfError {
    /// No function (or alias) with this name was ever registered
    #[error("Function {name} is not registered")]
    NotFound { name: String },
    /// The function exists but none of its overloads accept this call
    #[error("No overload of {name} accepts the arguments ({args})")]
    NoMatch { name: String, args: String },
    /// Two or more overloads remain after every tie-break rule
    #[error("Call {name}({args}) is ambiguous between overloads {candidates}")]
    Ambiguous {
        name: String,
        args: String,
        candidates: String,
    },
    /// The selected overload rejected the call once the argument types were known
    #[error("Call {name}({args}) was rejected: {message}")]
    LogicError {
        name: String,
        args: String,
        message: String,
    },
    /// Library bootstrap code used the registration API incorrectly
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),
}

impl UdfError {
    /// Shortcut for creating InvalidRegistration from &str
    pub fn invalid_registration(message: impl Into<String>) -> Self {
        UdfError::InvalidRegistration(message.into())
    }

    /// Shortcut for creating NotFound from &str
    pub fn not_found(name: impl Into<String>) -> Self {
        UdfError::NotFound { name: name.into() }
    }

    /// Shortcut for creating LogicError
    pub fn logic_error(
        name: impl Into<String>,
        args: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        UdfError::LogicError {
            name: name.into(),
            args: args.into(),
            message: message.into(),
        }
    }

    /// True for the four kinds of failure a call site can produce
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, UdfError::InvalidRegistration(_))
    }
}

pub type Result<T> = std::result::Result<T, UdfError>;
