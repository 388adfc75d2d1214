//! Composite lifecycle errors.

use thiserror::Error;

/// Misuse of the composite lifecycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeError {
    /// A composite is already mounted on this session and was not torn down.
    #[error("a composite is already mounted on this session")]
    SessionActive,
}
