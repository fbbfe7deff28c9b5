// pipeline error types.

use std::fmt::{self, Debug, Display, Formatter};


// ==== base error types ====


/// Why a [`Context`](crate::Context) fired
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, thiserror::Error)]
pub enum CancelCause {
    /// The context, or one of its ancestors, was cancelled explicitly
    #[error("context cancelled")]
    Cancelled,
    /// The deadline of the context, or of one of its ancestors, elapsed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Error for trying to build a [`Ring`](crate::Ring) over an empty sequence
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, thiserror::Error)]
#[error("ring requires at least one element")]
pub struct EmptyRingError;


// ==== compound error types ====


/// Error carried through pipelines, either in a [`Result`] element or on an error channel
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pipeline's context fired
    #[error(transparent)]
    Cancelled(#[from] CancelCause),
    /// A transformation panicked and the panic was caught
    #[error("panic in transformation: {0}")]
    Panicked(String),
    /// A ring was requested over zero elements
    #[error(transparent)]
    EmptyRing(#[from] EmptyRingError),
    /// A caller-supplied function returned an error
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl Error {
    /// Wrap an error returned by a caller-supplied function
    pub fn failed<E: Into<anyhow::Error>>(error: E) -> Self {
        Error::Failed(error.into())
    }

    /// The cancellation cause, if this error represents cancellation
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            &Error::Cancelled(cause) => Some(cause),
            _ => None,
        }
    }

    /// Whether this error represents cancellation
    pub fn is_cancelled(&self) -> bool {
        self.cancel_cause().is_some()
    }
}

/// Value-or-error carrier used to send per-element failure through a single channel
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error for [`collect`](crate::collect) being interrupted by cancellation
///
/// Carries whatever had been collected, in arrival order, before the context fired.
#[derive(Clone, Eq, PartialEq)]
pub struct CollectError<T> {
    /// The elements collected before cancellation, including the initial elements
    pub collected: Vec<T>,
    /// Why the context fired
    pub cause: CancelCause,
}

impl<T> Debug for CollectError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("CollectError")
            .field("collected", &format_args!("[{} elements]", self.collected.len()))
            .field("cause", &self.cause)
            .finish()
    }
}

impl<T> Display for CollectError<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "collect interrupted after {} elements: {}", self.collected.len(), self.cause)
    }
}

impl<T> std::error::Error for CollectError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl<T> From<CollectError<T>> for Error {
    fn from(error: CollectError<T>) -> Self {
        Error::Cancelled(error.cause)
    }
}


// ==== tests ====
