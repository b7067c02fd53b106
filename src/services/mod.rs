//! Validation, pipeline, and accessor services.
//!
//! Nothing in this tree imports HTTP types; errors carry an
//! [`ErrorCategory`] and the boundary layer maps that to a status code.

pub mod content_type;
pub mod filename;
pub mod files;
pub mod keys;
pub mod metadata;
pub mod upload;

/// Framework-free classification of a failure, rich enough for the HTTP
/// boundary to pick a status without re-deriving the reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    NotFound,
    PayloadTooLarge,
    UnsupportedMediaType,
    Conflict,
    ServerError,
}
