//! Runtime configuration re-exports.
//!
//! The validated config types live in `raffle-core::config`.

pub use raffle_core::config::{AdminConfig, DrawConfig, ServerConfig, SharedConfig};
