//! Runtime failure values.
//!
//! Runtime errors short-circuit the enclosing expression chain like an early
//! `return`, but travel on the `Result` error channel and cannot be caught
//! inside script code; the host's caller of `evaluate` observes them.
//! Internal invariant violations (a variable missing after successful
//! compilation, a collected object dereferenced) are panics, not values of
//! this type.

use std::fmt;

use crate::{
    gc::Root,
    number::NumberError,
    resource::ResourceError,
    types::Identifier,
    value::Value,
};

pub type RunResult<T> = Result<T, RunError>;

/// An external function call the evaluator suspended on. The host inspects
/// the name and arguments, computes a result, and resumes the session.
pub struct PendingCall {
    pub name: Identifier,
    pub args: Vec<Root<Value>>,
    /// Position of this call in the session's external-call order; used to
    /// correlate asynchronous completions with call sites.
    pub call_id: u32,
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("name", &self.name)
            .field("args", &self.args.len())
            .field("call_id", &self.call_id)
            .finish()
    }
}

/// A runtime failure propagating out of evaluation.
#[derive(Debug)]
pub enum RunError {
    DivisionByZero,
    /// Numeric conversion failure (non-integer truncation, overflow).
    Number(NumberError),
    /// Container or string access past the end.
    OutOfRange { index: i64, size: usize, what: String },
    /// `value` called on an empty optional.
    EmptyOptional,
    /// A native binding failed to map an argument or result.
    Native(String),
    /// Time parsing or formatting failure.
    Time(String),
    /// An explicit `Error(...)` raised by the script.
    Script(String),
    /// A resource limit was exceeded.
    Resource(ResourceError),
    /// An invariant the type system should have guaranteed did not hold at
    /// evaluation time (e.g. a variable with no value after a successful
    /// compilation).
    Internal(String),
    /// Evaluation suspended at an external function call; only surfaced to
    /// hosts that evaluate outside a resumable session.
    ExternalCall(PendingCall),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => f.write_str("division by zero"),
            Self::Number(error) => write!(f, "{error}"),
            Self::OutOfRange { index, size, what } => {
                write!(f, "{what}: index out of range {index} (size: {size})")
            }
            Self::EmptyOptional => f.write_str("optional value has no value"),
            Self::Native(message) => write!(f, "native callback failure: {message}"),
            Self::Time(message) => write!(f, "{message}"),
            Self::Script(message) => write!(f, "{message}"),
            Self::Resource(error) => write!(f, "{error}"),
            Self::Internal(message) => write!(f, "Unexpected: {message}"),
            Self::ExternalCall(call) => {
                write!(f, "evaluation suspended at external function: {}", call.name)
            }
        }
    }
}

impl std::error::Error for RunError {}

impl From<NumberError> for RunError {
    fn from(error: NumberError) -> Self {
        match error {
            NumberError::DivisionByZero => Self::DivisionByZero,
            other => Self::Number(other),
        }
    }
}

impl From<ResourceError> for RunError {
    fn from(error: ResourceError) -> Self {
        Self::Resource(error)
    }
}
