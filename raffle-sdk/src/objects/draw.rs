//! Draw request, progress and completion payloads.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::winners::WinnerResponse;

/// Inbound request that triggers one draw for the calling requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    /// Skip participants that already have a winner record.
    #[serde(default = "default_exclude")]
    pub exclude_previous_winners: bool,
}

impl Default for DrawRequest {
    fn default() -> Self {
        Self {
            exclude_previous_winners: true,
        }
    }
}

fn default_exclude() -> bool {
    true
}

/// One step of an in-flight draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawProgress {
    pub step: u8,
    pub total_steps: u8,
    pub message: String,
    /// 0 to 100.
    pub percent: u8,
    /// Name of the selected region, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<CompactString>,
    /// Name of the selected district, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<CompactString>,
}

/// Population figures observed while drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStats {
    pub total_regions_considered: u64,
    pub total_districts_considered: u64,
    pub total_eligible_participants: u64,
}

/// Final payload of a successful draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawCompleted {
    pub winner: WinnerResponse,
    pub stats: DrawStats,
    /// `true` when the participant had already won and the existing record
    /// was returned instead of a new one.
    #[serde(default)]
    pub repeat: bool,
}

/// Query parameters for `GET /draw/stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStatsQuery {
    pub exclude_previous_winners: Option<bool>,
}

/// Active district count of one active region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDistrictCount {
    pub id: Uuid,
    pub nomi: CompactString,
    pub active_districts: u64,
}

/// Snapshot of the population a draw would run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStatsResponse {
    pub active_regions: u64,
    pub active_districts: u64,
    pub active_participants: u64,
    /// Active participants, minus previous winners when exclusion was requested.
    pub eligible_participants: u64,
    pub winners: u64,
    pub regions: Vec<RegionDistrictCount>,
}
