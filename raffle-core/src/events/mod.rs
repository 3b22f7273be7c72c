//! Progress and announcement channels for draws.
//!
//! # Event Flow
//!
//! 1. `DrawService` emits `DrawEvent`s for one requester through
//!    [`ProgressChannel::emit`]; each session registered for that requester
//!    receives them on its [`ProgressSubscription`].
//! 2. When a draw completes, the winner is pushed to every connected session
//!    through [`ProgressChannel::broadcast_winner`].
//!
//! Delivery is best-effort: a slow or closed session misses events rather
//! than stalling the draw.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_ANNOUNCEMENT_BUFFER, DEFAULT_PROGRESS_BUFFER, ProgressChannel, ProgressSubscription,
    WinnerAnnouncementReceiver,
};

pub use types::{DrawEvent, WinnerAnnouncement};
