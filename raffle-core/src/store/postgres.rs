use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::eligibility::{
    DistrictBucket, EligibilityRepository, Exclusion, RegionBucket, RegionDistricts,
    SelectionStats, StorageError,
};
use crate::entities::district::CountEligibleByDistrict;
use crate::entities::participant::{Participant, SampleEligibleParticipant};
use crate::entities::region::{CountEligibleByRegion, CountPopulation, ListActiveDistrictCounts};
use crate::entities::winner::{
    CountWinners, CountWinnersByRegion, DeleteAllWinners, GetLatestWinner, GetWinnerById,
    GetWinnerByParticipant, InsertWinner, ListWinnerParticipantIds, ListWinners,
    TopWinnerDistricts,
};
use crate::framework::{DatabaseProcessor, is_unique_violation};
use crate::recorder::{
    NewWinner, RecordError, ResultRecorder, TOP_DISTRICTS, WinnerFilter, WinnerPage,
    WinnerQueries, WinnerRecord, WinnerStats,
};

/// PostgreSQL-backed draw store.
#[derive(Debug, Clone)]
pub struct PgDrawStore {
    processor: DatabaseProcessor,
}

impl PgDrawStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
        }
    }
}

fn to_u64(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[async_trait]
impl EligibilityRepository for PgDrawStore {
    async fn previous_winner_ids(&self) -> Result<Vec<Uuid>, StorageError> {
        Ok(self.processor.process(ListWinnerParticipantIds).await?)
    }

    async fn count_eligible_by_region(
        &self,
        exclusion: &Exclusion,
    ) -> Result<Vec<RegionBucket>, StorageError> {
        let rows = self
            .processor
            .process(CountEligibleByRegion {
                excluded: exclusion.to_vec(),
            })
            .await?;
        Ok(rows.into_iter().map(RegionBucket::from).collect())
    }

    async fn count_eligible_by_district(
        &self,
        region_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Vec<DistrictBucket>, StorageError> {
        let rows = self
            .processor
            .process(CountEligibleByDistrict {
                region_id,
                excluded: exclusion.to_vec(),
            })
            .await?;
        Ok(rows.into_iter().map(DistrictBucket::from).collect())
    }

    async fn sample_eligible_participant(
        &self,
        district_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Option<Participant>, StorageError> {
        Ok(self
            .processor
            .process(SampleEligibleParticipant {
                district_id,
                excluded: exclusion.to_vec(),
            })
            .await?)
    }

    async fn selection_stats(
        &self,
        exclude_previous_winners: bool,
    ) -> Result<SelectionStats, StorageError> {
        let excluded = if exclude_previous_winners {
            self.previous_winner_ids().await?
        } else {
            Vec::new()
        };
        let counts = self.processor.process(CountPopulation { excluded }).await?;
        let regions = self.processor.process(ListActiveDistrictCounts).await?;

        Ok(SelectionStats {
            active_regions: to_u64(counts.active_regions),
            active_districts: to_u64(counts.active_districts),
            active_participants: to_u64(counts.active_participants),
            eligible_participants: to_u64(counts.eligible_participants),
            winners: to_u64(counts.winners),
            regions: regions
                .into_iter()
                .map(|r| RegionDistricts {
                    id: r.id,
                    nomi: r.nomi,
                    active_districts: to_u64(r.active_districts),
                })
                .collect(),
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.processor.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultRecorder for PgDrawStore {
    async fn record(&self, winner: NewWinner) -> Result<WinnerRecord, RecordError> {
        let participant_id = winner.participant_id;
        match self
            .processor
            .process(InsertWinner {
                id: Uuid::now_v7(),
                winner,
            })
            .await
        {
            Ok(record) => Ok(record),
            Err(e) if is_unique_violation(&e) => Err(RecordError::DuplicateWinner(participant_id)),
            Err(e) => Err(RecordError::Storage(e.into())),
        }
    }

    async fn reset_all(&self) -> Result<u64, StorageError> {
        Ok(self.processor.process(DeleteAllWinners).await?)
    }

    async fn find_by_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<Option<WinnerRecord>, StorageError> {
        Ok(self
            .processor
            .process(GetWinnerByParticipant { participant_id })
            .await?)
    }
}

#[async_trait]
impl WinnerQueries for PgDrawStore {
    async fn list_winners(
        &self,
        filter: WinnerFilter,
        limit: i64,
        offset: i64,
    ) -> Result<WinnerPage, StorageError> {
        let items = self
            .processor
            .process(ListWinners {
                limit,
                offset,
                region_id: filter.region_id,
                district_id: filter.district_id,
            })
            .await?;
        let total = self
            .processor
            .process(CountWinners {
                region_id: filter.region_id,
                district_id: filter.district_id,
            })
            .await?;
        Ok(WinnerPage {
            items,
            total: to_u64(total),
        })
    }

    async fn latest_winner(&self) -> Result<Option<WinnerRecord>, StorageError> {
        Ok(self.processor.process(GetLatestWinner).await?)
    }

    async fn get_winner(&self, id: Uuid) -> Result<Option<WinnerRecord>, StorageError> {
        Ok(self.processor.process(GetWinnerById { id }).await?)
    }

    async fn winner_stats(&self) -> Result<WinnerStats, StorageError> {
        let by_region = self.processor.process(CountWinnersByRegion).await?;
        let top_districts = self
            .processor
            .process(TopWinnerDistricts {
                limit: TOP_DISTRICTS as i64,
            })
            .await?;
        let total = self
            .processor
            .process(CountWinners {
                region_id: None,
                district_id: None,
            })
            .await?;

        Ok(WinnerStats {
            total: to_u64(total),
            by_region: by_region
                .into_iter()
                .map(|r| (r.region, to_u64(r.count)))
                .collect(),
            top_districts: top_districts
                .into_iter()
                .map(|d| (d.region, d.district, to_u64(d.count)))
                .collect(),
        })
    }
}
