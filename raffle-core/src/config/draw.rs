//! Draw configuration.

use crate::events::{DEFAULT_ANNOUNCEMENT_BUFFER, DEFAULT_PROGRESS_BUFFER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawConfig {
    /// Per-session buffer for progress events.
    pub progress_buffer: usize,
    /// Buffer of the winner announcement broadcast.
    pub announcement_buffer: usize,
    /// Used when a `select` message or stats query omits the flag.
    pub default_exclude_previous_winners: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            progress_buffer: DEFAULT_PROGRESS_BUFFER,
            announcement_buffer: DEFAULT_ANNOUNCEMENT_BUFFER,
            default_exclude_previous_winners: true,
        }
    }
}
