//! Read-only queries over the region → district → participant hierarchy.
//!
//! A participant is *eligible* when the participant, its district and its
//! region are all active and, if exclusion is enabled, it has no winner
//! record yet. Every count and sample here applies that predicate.

use std::collections::HashSet;

use async_trait::async_trait;
use compact_str::CompactString;
use raffle_sdk::objects::SelectionStatsResponse;
use raffle_sdk::objects::draw::RegionDistrictCount;
use uuid::Uuid;

use crate::entities::district::DistrictEligibleCount;
use crate::entities::participant::Participant;
use crate::entities::region::RegionEligibleCount;
use crate::sampler::Weighted;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Which previous winners a draw must skip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Exclusion {
    /// Previous winners may win again.
    #[default]
    Disabled,
    /// Skip these participant ids.
    Skip(HashSet<Uuid>),
}

impl Exclusion {
    pub fn from_ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Exclusion::Skip(ids.into_iter().collect())
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Exclusion::Skip(_))
    }

    pub fn excludes(&self, participant_id: &Uuid) -> bool {
        match self {
            Exclusion::Disabled => false,
            Exclusion::Skip(ids) => ids.contains(participant_id),
        }
    }

    /// The excluded ids as a bindable list.
    pub fn to_vec(&self) -> Vec<Uuid> {
        match self {
            Exclusion::Disabled => Vec::new(),
            Exclusion::Skip(ids) => ids.iter().copied().collect(),
        }
    }
}

/// A region with at least one eligible participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBucket {
    pub id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub count: u64,
}

/// A district with at least one eligible participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictBucket {
    pub id: Uuid,
    pub nomi: CompactString,
    pub soato: Option<CompactString>,
    pub count: u64,
}

impl Weighted for RegionBucket {
    fn weight(&self) -> u64 {
        self.count
    }
}

impl Weighted for DistrictBucket {
    fn weight(&self) -> u64 {
        self.count
    }
}

impl From<RegionEligibleCount> for RegionBucket {
    fn from(value: RegionEligibleCount) -> Self {
        RegionBucket {
            id: value.id,
            nomi: value.nomi,
            soato: value.soato,
            count: u64::try_from(value.eligible).unwrap_or(0),
        }
    }
}

impl From<DistrictEligibleCount> for DistrictBucket {
    fn from(value: DistrictEligibleCount) -> Self {
        DistrictBucket {
            id: value.id,
            nomi: value.nomi,
            soato: value.soato,
            count: u64::try_from(value.eligible).unwrap_or(0),
        }
    }
}

/// Population overview shown before a draw.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionStats {
    pub active_regions: u64,
    pub active_districts: u64,
    pub active_participants: u64,
    pub eligible_participants: u64,
    pub winners: u64,
    /// Active regions with their active district count, sorted by name.
    pub regions: Vec<RegionDistricts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDistricts {
    pub id: Uuid,
    pub nomi: CompactString,
    pub active_districts: u64,
}

impl From<SelectionStats> for SelectionStatsResponse {
    fn from(value: SelectionStats) -> Self {
        SelectionStatsResponse {
            active_regions: value.active_regions,
            active_districts: value.active_districts,
            active_participants: value.active_participants,
            eligible_participants: value.eligible_participants,
            winners: value.winners,
            regions: value
                .regions
                .into_iter()
                .map(|r| RegionDistrictCount {
                    id: r.id,
                    nomi: r.nomi,
                    active_districts: r.active_districts,
                })
                .collect(),
        }
    }
}

/// Read access to the reference data a draw runs against.
///
/// Empty results are not errors.
#[async_trait]
pub trait EligibilityRepository: Send + Sync {
    /// Participant ids that already have a winner record.
    async fn previous_winner_ids(&self) -> Result<Vec<Uuid>, StorageError>;

    /// Regions with at least one eligible participant.
    async fn count_eligible_by_region(
        &self,
        exclusion: &Exclusion,
    ) -> Result<Vec<RegionBucket>, StorageError>;

    /// Districts of `region_id` with at least one eligible participant.
    async fn count_eligible_by_district(
        &self,
        region_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Vec<DistrictBucket>, StorageError>;

    /// One eligible participant of `district_id`, chosen uniformly.
    async fn sample_eligible_participant(
        &self,
        district_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Option<Participant>, StorageError>;

    async fn selection_stats(
        &self,
        exclude_previous_winners: bool,
    ) -> Result<SelectionStats, StorageError>;

    /// Cheapest round trip that proves the backing store answers.
    async fn ping(&self) -> Result<(), StorageError>;
}
