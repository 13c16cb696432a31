//! Error types for the grainfs test harness.
//!
//! All harness failures are fatal configuration or runtime errors: a broken
//! catalog or invocation, not a transient condition. They surface as typed
//! values at the API boundary so the harness stays embeddable; the
//! `test_runner` binary maps any of them to a diagnostic and a non-zero
//! exit. Dynamic-filter rejection is deliberately *not* represented here;
//! it is reported on the operator stream and traversal continues.

use thiserror::Error;

/// Convenience alias used across the harness crates.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Fatal harness failure.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No resolver layer maps the named global parameter.
    #[error("undefined predefine {0}")]
    UnresolvedPredefine(&'static str),

    /// No resolver layer maps the named suite-scoped parameter.
    #[error("undefined define {0}")]
    UnresolvedDefine(String),

    /// An override argument was not of the form `name=value`.
    #[error("invalid define: {0}")]
    InvalidOverride(String),

    /// A numeric option value did not parse.
    #[error("invalid {option}: {value}")]
    InvalidNumber {
        /// Option the value was supplied for, e.g. `skip`.
        option: &'static str,
        /// The offending text.
        value: String,
    },

    /// An option that requires a value was given none.
    #[error("option {0} requires a value")]
    MissingValue(&'static str),

    /// An option the invocation surface does not know.
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// The positional test identifier did not parse.
    #[error("could not parse test identifier")]
    InvalidTestIdentifier,

    /// More than one positional test identifier was supplied.
    #[error("more than one test identifier")]
    ExtraTestIdentifier,

    /// Backend provisioning failed with the given status code.
    #[error("could not create block device: {0}")]
    BackendCreate(i32),

    /// Backend release failed with the given status code.
    #[error("could not destroy block device: {0}")]
    BackendDestroy(i32),

    /// The trace redirection target could not be opened.
    #[error("could not open for trace: {0}")]
    TraceOpen(i32),
}
