//! Winner record listing and statistics types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ParticipantSnapshot, UnitSnapshot};

/// A winner record as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    pub id: Uuid,
    pub participant: ParticipantSnapshot,
    pub district: UnitSnapshot,
    pub region: UnitSnapshot,
    #[serde(with = "time::serde::rfc3339")]
    pub selected_at: time::OffsetDateTime,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing winners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWinnersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub region_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
}

impl Default for ListWinnersQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            region_id: None,
            district_id: None,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}

/// One page of winners, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerPageResponse {
    pub items: Vec<WinnerResponse>,
    /// Number of records matching the filter, across all pages.
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Winner count grouped by region name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionWinnerCount {
    pub region: CompactString,
    pub count: u64,
}

/// Winner count grouped by region and district name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictWinnerCount {
    pub region: CompactString,
    pub district: CompactString,
    pub count: u64,
}

/// Aggregates over the snapshot names stored in winner records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStatsResponse {
    pub total: u64,
    pub by_region: Vec<RegionWinnerCount>,
    /// At most ten entries, highest count first.
    pub top_districts: Vec<DistrictWinnerCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_pagination() {
        assert_eq!(clamp_pagination(0, -5), (1, 0));
        assert_eq!(clamp_pagination(20, 40), (20, 40));
        assert_eq!(clamp_pagination(10_000, 1_000_000), (MAX_LIMIT, MAX_OFFSET));
    }

    #[test]
    fn test_winner_selected_at_is_rfc3339() {
        let winner = WinnerResponse {
            id: Uuid::nil(),
            participant: ParticipantSnapshot {
                id: Some(Uuid::nil()),
                fio: "Aliyev Vali".into(),
                telefon: None,
                manzil: None,
            },
            district: UnitSnapshot {
                id: Uuid::nil(),
                nomi: "Chilonzor".into(),
                soato: Some("1726294".into()),
            },
            region: UnitSnapshot {
                id: Uuid::nil(),
                nomi: "Toshkent".into(),
                soato: None,
            },
            selected_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&winner).unwrap();
        assert_eq!(json["selectedAt"], "1970-01-01T00:00:00Z");
        assert!(json["participant"].get("telefon").is_none());

        let back: WinnerResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, winner);
    }
}
