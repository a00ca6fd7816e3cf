//! # Runtime Contract
//!
//! The execution context being protected. TETHER never implements one; it
//! only mediates access to whatever engine implements [`Runtime`].

use std::fmt;

use crate::error::RuntimeResult;

/// A dynamically typed value crossing the runtime boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (always double precision).
    Number(f64),
    /// String.
    String(String),
}

impl Value {
    /// Returns whether this is `Undefined`.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the bool, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A stateful, single-threaded execution context.
///
/// Implementations need not be thread-safe: callers only ever reach a
/// runtime through an executor, which hands out exclusive access on the
/// owner thread. `Send` is required because that owner thread may lend the
/// runtime to a blocked caller for the duration of a synchronous call.
pub trait Runtime: Send {
    /// Human-readable engine description (name and version).
    fn description(&self) -> String;

    /// Reads a global binding.
    fn global(&self, name: &str) -> Option<Value>;

    /// Writes a global binding.
    fn set_global(&mut self, name: &str, value: Value);

    /// Evaluates `source`, attributing errors to `source_url`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RuntimeError::Evaluation`] when the engine reports a
    /// failure.
    fn evaluate(&mut self, source: &str, source_url: &str) -> RuntimeResult<Value>;

    /// Runs pending microtasks. Returns `true` once the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a microtask.
    fn drain_microtasks(&mut self) -> RuntimeResult<bool>;
}
