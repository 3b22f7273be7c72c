//! WebSocket message types for the draw session stream.
//!
//! The `GET /api/v1/draw/ws` endpoint upgrades to a WebSocket connection
//! bound to one requester.
//!
//! # Protocol
//!
//! 1. The client sends [`WsClientMessage::Select`] to start a draw. A
//!    requester may have at most one draw in flight; a second `select`
//!    while one is running is answered with [`WsServerMessage::Error`].
//! 2. The server answers with [`WsServerMessage::Started`], a sequence of
//!    [`WsServerMessage::Progress`] frames, and exactly one terminal frame:
//!    [`WsServerMessage::Completed`], [`WsServerMessage::Error`] or
//!    [`WsServerMessage::Cancelled`].
//! 3. [`WsClientMessage::Cancel`] abandons the in-flight draw if it has
//!    not yet been recorded.
//! 4. Every connection, not only the requester's, receives
//!    [`WsServerMessage::NewWinner`] whenever any draw completes.

use serde::{Deserialize, Serialize};

use super::draw::{DrawCompleted, DrawProgress};
use super::winners::WinnerResponse;

/// Client-to-server WebSocket message.
///
/// ```json
/// {"type":"select","excludePreviousWinners":true}
/// {"type":"cancel"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WsClientMessage {
    /// Start a draw. Omitting the flag leaves the choice to the server's
    /// configured default.
    Select {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclude_previous_winners: Option<bool>,
    },
    /// Cancel the in-flight draw.
    Cancel,
}

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// The draw was accepted and is running.
    Started { message: String },
    /// One intermediate step of the draw.
    Progress(DrawProgress),
    /// The draw finished and the winner is recorded.
    Completed(DrawCompleted),
    /// The draw (or the request) failed. Does not close the connection.
    Error { reason: String },
    /// The draw was cancelled before anything was recorded.
    Cancelled { message: String },
    /// Someone, possibly another requester, just won.
    NewWinner { winner: WinnerResponse },
}

/// Well-known WebSocket close codes used by the draw stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The upgrade request did not identify a requester.
    pub const MISSING_REQUESTER: u16 = 4001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let select: WsClientMessage =
            serde_json::from_str(r#"{"type":"select","excludePreviousWinners":false}"#).unwrap();
        assert_eq!(
            select,
            WsClientMessage::Select {
                exclude_previous_winners: Some(false)
            }
        );

        let select: WsClientMessage = serde_json::from_str(r#"{"type":"select"}"#).unwrap();
        assert_eq!(
            select,
            WsClientMessage::Select {
                exclude_previous_winners: None
            }
        );

        let cancel: WsClientMessage = serde_json::from_str(r#"{"type":"cancel"}"#).unwrap();
        assert_eq!(cancel, WsClientMessage::Cancel);
    }

    #[test]
    fn test_progress_frame_is_flattened() {
        let msg = WsServerMessage::Progress(DrawProgress {
            step: 3,
            total_steps: 6,
            message: "Region selected: Samarqand".into(),
            percent: 45,
            region: Some("Samarqand".into()),
            district: None,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 45);
        assert_eq!(json["region"], "Samarqand");
    }

    #[test]
    fn test_error_frame() {
        let msg = WsServerMessage::Error {
            reason: "a draw is already in progress".into(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"type":"error","reason":"a draw is already in progress"}"#
        );
    }
}
