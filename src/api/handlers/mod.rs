//! API request handlers.

/// Question answering.
pub mod ask;
/// Liveness and readiness.
pub mod health;
