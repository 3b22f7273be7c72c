//! Event type definitions for draw sessions.

use raffle_sdk::objects::ws::WsServerMessage;
use raffle_sdk::objects::{DrawCompleted, DrawProgress, WinnerResponse};

/// Event delivered to the sessions of the requester that started a draw.
///
/// Exactly one terminal event (`Completed`, `Failed` or `Cancelled`) follows
/// `Started` for every accepted draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    Started { message: String },
    Progress(DrawProgress),
    Completed(DrawCompleted),
    Failed { reason: String },
    Cancelled { message: String },
}

impl DrawEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DrawEvent::Completed(_) | DrawEvent::Failed { .. } | DrawEvent::Cancelled { .. }
        )
    }
}

impl From<DrawEvent> for WsServerMessage {
    fn from(value: DrawEvent) -> Self {
        match value {
            DrawEvent::Started { message } => WsServerMessage::Started { message },
            DrawEvent::Progress(progress) => WsServerMessage::Progress(progress),
            DrawEvent::Completed(completed) => WsServerMessage::Completed(completed),
            DrawEvent::Failed { reason } => WsServerMessage::Error { reason },
            DrawEvent::Cancelled { message } => WsServerMessage::Cancelled { message },
        }
    }
}

/// A freshly recorded winner, pushed to every connected session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerAnnouncement {
    pub winner: WinnerResponse,
}

impl From<WinnerAnnouncement> for WsServerMessage {
    fn from(value: WinnerAnnouncement) -> Self {
        WsServerMessage::NewWinner {
            winner: value.winner,
        }
    }
}
