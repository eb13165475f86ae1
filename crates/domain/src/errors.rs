//! Domain error types.

use thiserror::Error;

/// A status change that the lifecycle of an entity does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot change {entity} status from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}
