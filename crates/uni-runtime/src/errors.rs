//! Runtime error taxonomy.
//!
//! Stale responses are deliberately absent: they are dropped, not
//! reported. Expression-resolution failures recover locally inside the
//! wiring layer and never reach this enum.

use crate::transport::TransportError;

/// Errors surfaced by the component runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal misconfiguration (unknown morpher, missing root, missing
    /// CSRF token). Thrown synchronously at setup time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `get_component` lookup with no key or name match.
    #[error("component \"{0}\" not found")]
    ComponentNotFound(String),

    /// `trigger` named an element no action binding matches.
    #[error("no action element matched key or id \"{0}\"")]
    ElementNotFound(String),

    /// Non-OK HTTP status or a JSON `error` field in an OK response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// DOM reconciliation failure.
    #[error(transparent)]
    Morph(#[from] uni_morph::MorphError),
}
