//! # Error Types
//!
//! The error taxonomy shared by every crate in the workspace, plus the leaf
//! errors raised by `ccl-core` itself.
//!
//! ## Design
//!
//! - Every error surfaced by a coordinator entry point maps to exactly one
//!   [`ErrorKind`]. Callers branch on the kind; logs carry the full variant.
//! - `Consistency` errors indicate a broken invariant between the coordinator
//!   and one of its collaborators. They are never retried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of every failure an entry point can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input: zero address, zero amount, unapproved asset combination,
    /// out-of-range parameter.
    Validation,
    /// Wrong caller for a requester-, authority-, or settlement-restricted
    /// operation.
    Authorization,
    /// Operation not permitted in the current lifecycle state, including
    /// re-entry while another entry point is executing.
    State,
    /// A collaborator returned something the coordinator cannot reconcile.
    Consistency,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "VALIDATION",
            Self::Authorization => "AUTHORIZATION",
            Self::State => "STATE",
            Self::Consistency => "CONSISTENCY",
        };
        f.write_str(s)
    }
}

/// Checked fixed-point arithmetic failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// An intermediate value exceeded the range of `Amount`.
    #[error("arithmetic overflow in {op}")]
    Overflow {
        /// The operation that overflowed.
        op: &'static str,
    },

    /// A divisor was zero (e.g. a zero strike).
    #[error("division by zero in {op}")]
    DivisionByZero {
        /// The operation that attempted the division.
        op: &'static str,
    },
}

/// Failure parsing a hex-encoded identifier (`Address`, `AssetConfigId`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexParseError {
    /// Missing `0x` prefix.
    #[error("expected 0x prefix: {0:?}")]
    MissingPrefix(String),

    /// Wrong number of hex digits.
    #[error("expected {expected} hex digits, got {got}")]
    WrongLength {
        /// Digits required.
        expected: usize,
        /// Digits supplied.
        got: usize,
    },

    /// A character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),
}
