//! Durable winner records and their read model.

use async_trait::async_trait;
use compact_str::CompactString;
use raffle_sdk::objects::winners::{DistrictWinnerCount, RegionWinnerCount};
use raffle_sdk::objects::{WinnerPageResponse, WinnerResponse, WinnerStatsResponse};
use uuid::Uuid;

pub use crate::entities::winner::{NewWinner, WinnerRecord};

use crate::eligibility::{DistrictBucket, RegionBucket, StorageError};
use crate::entities::participant::Participant;

/// Maximum number of districts reported by [`WinnerQueries::winner_stats`].
pub const TOP_DISTRICTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("participant {0} already has a winner record")]
    DuplicateWinner(Uuid),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl NewWinner {
    /// Freeze the selected participant and its district and region.
    pub fn snapshot(
        participant: &Participant,
        district: &DistrictBucket,
        region: &RegionBucket,
    ) -> Self {
        NewWinner {
            participant_id: participant.id,
            participant_fio: participant.fio.clone(),
            participant_telefon: participant.telefon.clone(),
            participant_manzil: participant.manzil.clone(),
            district_id: district.id,
            district_nomi: district.nomi.clone(),
            district_soato: district.soato.clone(),
            region_id: region.id,
            region_nomi: region.nomi.clone(),
            region_soato: region.soato.clone(),
        }
    }
}

/// Writes winner records. The only component allowed to create them.
#[async_trait]
pub trait ResultRecorder: Send + Sync {
    /// Persist a winner. At most one record exists per participant id.
    async fn record(&self, winner: NewWinner) -> Result<WinnerRecord, RecordError>;

    /// Delete every winner record in one operation.
    async fn reset_all(&self) -> Result<u64, StorageError>;

    async fn find_by_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<Option<WinnerRecord>, StorageError>;
}

/// Filters for [`WinnerQueries::list_winners`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinnerFilter {
    pub region_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerPage {
    pub items: Vec<WinnerRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WinnerStats {
    pub total: u64,
    /// Highest count first.
    pub by_region: Vec<(CompactString, u64)>,
    /// `(region, district, count)`, highest count first, at most
    /// [`TOP_DISTRICTS`] entries.
    pub top_districts: Vec<(CompactString, CompactString, u64)>,
}

impl From<WinnerStats> for WinnerStatsResponse {
    fn from(value: WinnerStats) -> Self {
        WinnerStatsResponse {
            total: value.total,
            by_region: value
                .by_region
                .into_iter()
                .map(|(region, count)| RegionWinnerCount { region, count })
                .collect(),
            top_districts: value
                .top_districts
                .into_iter()
                .map(|(region, district, count)| DistrictWinnerCount {
                    region,
                    district,
                    count,
                })
                .collect(),
        }
    }
}

impl WinnerPage {
    pub fn into_response(self, limit: i64, offset: i64) -> WinnerPageResponse {
        WinnerPageResponse {
            items: self.items.into_iter().map(WinnerResponse::from).collect(),
            total: self.total,
            limit,
            offset,
        }
    }
}

/// Read model over winner records.
#[async_trait]
pub trait WinnerQueries: Send + Sync {
    /// One page of records, newest first, plus the filtered total.
    async fn list_winners(
        &self,
        filter: WinnerFilter,
        limit: i64,
        offset: i64,
    ) -> Result<WinnerPage, StorageError>;

    async fn latest_winner(&self) -> Result<Option<WinnerRecord>, StorageError>;

    async fn get_winner(&self, id: Uuid) -> Result<Option<WinnerRecord>, StorageError>;

    async fn winner_stats(&self) -> Result<WinnerStats, StorageError>;
}
