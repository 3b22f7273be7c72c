//! Wire types shared between the Raffle server and its clients.
//!
//! The optional `client` feature adds typed HTTP and WebSocket clients.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
