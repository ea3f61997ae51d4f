//! Remote music-generation gateway.
//!
//! This module provides:
//! * [`GenerationGateway`]: async trait used by the song queue.
//! * [`SunoGateway`]: REST implementation with `api-key` header auth.
//! * [`GenerationRequest`]: prompt or title/tags request, also the jukebox
//!   wire format.
//! * [`RemoteStatus`]: typed view of a remote job's lifecycle.
//! * [`GatewayError`]: `Unavailable` vs `GenerationFailed`.

pub mod client;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{GatewayError, GenerationGateway, SunoGateway};
pub use types::{parse_feed, parse_submit, GenerationRequest, RemoteStatus};

#[cfg(test)]
pub use client::MockGateway;
