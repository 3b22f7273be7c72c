pub mod admin;
pub mod draw;
pub mod winners;
pub mod ws;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use draw::{DrawCompleted, DrawProgress, DrawRequest, DrawStats, SelectionStatsResponse};
pub use winners::{WinnerPageResponse, WinnerResponse, WinnerStatsResponse};

/// Header carrying the requester identity on draw and winner endpoints.
pub const REQUESTER_HEADER: &str = "Raffle-Requester";

/// Header carrying the plaintext admin secret on admin endpoints.
pub const ADMIN_AUTH_HEADER: &str = "Raffle-Admin-Authorization";

/// Participant fields frozen into a winner record at draw time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    /// `None` only on records that predate participant ids.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub fio: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefon: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manzil: Option<String>,
}

/// Region or district fields frozen into a winner record at draw time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: Uuid,
    pub nomi: CompactString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soato: Option<CompactString>,
}
