use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use compact_str::CompactString;
use itertools::Itertools;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::eligibility::{
    DistrictBucket, EligibilityRepository, Exclusion, RegionBucket, RegionDistricts,
    SelectionStats, StorageError,
};
use crate::entities::district::District;
use crate::entities::participant::Participant;
use crate::entities::region::Region;
use crate::recorder::{
    NewWinner, RecordError, ResultRecorder, TOP_DISTRICTS, WinnerFilter, WinnerPage,
    WinnerQueries, WinnerRecord, WinnerStats,
};

/// In-process draw store with the same eligibility predicate and the same
/// one-record-per-participant guarantee as [`super::PgDrawStore`].
#[derive(Debug, Default)]
pub struct MemoryDrawStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

#[derive(Debug, Default)]
struct MemoryState {
    regions: Vec<Region>,
    districts: Vec<District>,
    participants: Vec<Participant>,
    winners: Vec<WinnerRecord>,
}

impl MemoryState {
    /// Every eligible participant with its (active) district and region.
    fn eligible<'a>(
        &'a self,
        exclusion: &'a Exclusion,
    ) -> impl Iterator<Item = (&'a Region, &'a District, &'a Participant)> + 'a {
        let regions: HashMap<Uuid, &Region> = self
            .regions
            .iter()
            .filter(|r| r.is_active)
            .map(|r| (r.id, r))
            .collect();
        let districts: HashMap<Uuid, &District> = self
            .districts
            .iter()
            .filter(|d| d.is_active)
            .map(|d| (d.id, d))
            .collect();

        self.participants
            .iter()
            .filter(move |p| p.is_active && !exclusion.excludes(&p.id))
            .filter_map(move |p| {
                let district = *districts.get(&p.district_id)?;
                let region = *regions.get(&district.region_id)?;
                Some((region, district, p))
            })
    }
}

impl MemoryDrawStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    pub async fn add_region(&self, nomi: &str, is_active: bool) -> Uuid {
        let id = Uuid::now_v7();
        self.state.write().await.regions.push(Region {
            id,
            nomi: nomi.into(),
            soato: None,
            is_active,
        });
        id
    }

    pub async fn add_district(&self, region_id: Uuid, nomi: &str, is_active: bool) -> Uuid {
        let id = Uuid::now_v7();
        self.state.write().await.districts.push(District {
            id,
            region_id,
            nomi: nomi.into(),
            soato: None,
            is_active,
        });
        id
    }

    pub async fn add_participant(&self, district_id: Uuid, fio: &str, is_active: bool) -> Uuid {
        let id = Uuid::now_v7();
        self.state.write().await.participants.push(Participant {
            id,
            district_id,
            fio: fio.into(),
            telefon: None,
            manzil: None,
            is_active,
        });
        id
    }

    pub async fn winner_count(&self) -> usize {
        self.state.read().await.winners.len()
    }
}

#[async_trait]
impl EligibilityRepository for MemoryDrawStore {
    async fn previous_winner_ids(&self) -> Result<Vec<Uuid>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .winners
            .iter()
            .filter_map(|w| w.participant_id)
            .collect())
    }

    async fn count_eligible_by_region(
        &self,
        exclusion: &Exclusion,
    ) -> Result<Vec<RegionBucket>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        let counts = state.eligible(exclusion).map(|(r, _, _)| r.id).counts();
        Ok(state
            .regions
            .iter()
            .filter_map(|r| {
                counts.get(&r.id).map(|&n| RegionBucket {
                    id: r.id,
                    nomi: r.nomi.clone(),
                    soato: r.soato.clone(),
                    count: n as u64,
                })
            })
            .sorted_by(|a, b| a.nomi.cmp(&b.nomi))
            .collect())
    }

    async fn count_eligible_by_district(
        &self,
        region_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Vec<DistrictBucket>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        let counts = state
            .eligible(exclusion)
            .filter(|(r, _, _)| r.id == region_id)
            .map(|(_, d, _)| d.id)
            .counts();
        Ok(state
            .districts
            .iter()
            .filter_map(|d| {
                counts.get(&d.id).map(|&n| DistrictBucket {
                    id: d.id,
                    nomi: d.nomi.clone(),
                    soato: d.soato.clone(),
                    count: n as u64,
                })
            })
            .sorted_by(|a, b| a.nomi.cmp(&b.nomi))
            .collect())
    }

    async fn sample_eligible_participant(
        &self,
        district_id: Uuid,
        exclusion: &Exclusion,
    ) -> Result<Option<Participant>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        let candidates: Vec<&Participant> = state
            .eligible(exclusion)
            .filter(|(_, d, _)| d.id == district_id)
            .map(|(_, _, p)| p)
            .collect();
        Ok(candidates.choose(&mut rand::rng()).map(|p| (*p).clone()))
    }

    async fn selection_stats(
        &self,
        exclude_previous_winners: bool,
    ) -> Result<SelectionStats, StorageError> {
        let exclusion = if exclude_previous_winners {
            Exclusion::from_ids(self.previous_winner_ids().await?)
        } else {
            Exclusion::Disabled
        };
        self.check_available()?;
        let state = self.state.read().await;

        let active_participants = state.participants.iter().filter(|p| p.is_active);
        let eligible_participants = active_participants
            .clone()
            .filter(|p| !exclusion.excludes(&p.id))
            .count();
        let district_counts = state
            .districts
            .iter()
            .filter(|d| d.is_active)
            .map(|d| d.region_id)
            .counts();

        Ok(SelectionStats {
            active_regions: state.regions.iter().filter(|r| r.is_active).count() as u64,
            active_districts: state.districts.iter().filter(|d| d.is_active).count() as u64,
            active_participants: active_participants.count() as u64,
            eligible_participants: eligible_participants as u64,
            winners: state.winners.len() as u64,
            regions: state
                .regions
                .iter()
                .filter(|r| r.is_active)
                .map(|r| RegionDistricts {
                    id: r.id,
                    nomi: r.nomi.clone(),
                    active_districts: district_counts.get(&r.id).copied().unwrap_or(0) as u64,
                })
                .sorted_by(|a, b| a.nomi.cmp(&b.nomi))
                .collect(),
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_available()
    }
}

#[async_trait]
impl ResultRecorder for MemoryDrawStore {
    async fn record(&self, winner: NewWinner) -> Result<WinnerRecord, RecordError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state
            .winners
            .iter()
            .any(|w| w.participant_id == Some(winner.participant_id))
        {
            return Err(RecordError::DuplicateWinner(winner.participant_id));
        }

        let record = WinnerRecord {
            id: Uuid::now_v7(),
            participant_id: Some(winner.participant_id),
            participant_fio: winner.participant_fio,
            participant_telefon: winner.participant_telefon,
            participant_manzil: winner.participant_manzil,
            district_id: winner.district_id,
            district_nomi: winner.district_nomi,
            district_soato: winner.district_soato,
            region_id: winner.region_id,
            region_nomi: winner.region_nomi,
            region_soato: winner.region_soato,
            selected_at: time::OffsetDateTime::now_utc(),
        };
        state.winners.push(record.clone());
        Ok(record)
    }

    async fn reset_all(&self) -> Result<u64, StorageError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let deleted = state.winners.len() as u64;
        state.winners.clear();
        Ok(deleted)
    }

    async fn find_by_participant(
        &self,
        participant_id: Uuid,
    ) -> Result<Option<WinnerRecord>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .winners
            .iter()
            .find(|w| w.participant_id == Some(participant_id))
            .cloned())
    }
}

fn newest_first(a: &&WinnerRecord, b: &&WinnerRecord) -> std::cmp::Ordering {
    b.selected_at
        .cmp(&a.selected_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl WinnerQueries for MemoryDrawStore {
    async fn list_winners(
        &self,
        filter: WinnerFilter,
        limit: i64,
        offset: i64,
    ) -> Result<WinnerPage, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        let matching: Vec<&WinnerRecord> = state
            .winners
            .iter()
            .filter(|w| filter.region_id.is_none_or(|id| w.region_id == id))
            .filter(|w| filter.district_id.is_none_or(|id| w.district_id == id))
            .sorted_by(newest_first)
            .collect();

        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(WinnerPage {
            total: matching.len() as u64,
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn latest_winner(&self) -> Result<Option<WinnerRecord>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.winners.iter().sorted_by(newest_first).next().cloned())
    }

    async fn get_winner(&self, id: Uuid) -> Result<Option<WinnerRecord>, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.winners.iter().find(|w| w.id == id).cloned())
    }

    async fn winner_stats(&self) -> Result<WinnerStats, StorageError> {
        self.check_available()?;
        let state = self.state.read().await;

        let by_region = state
            .winners
            .iter()
            .map(|w| w.region_nomi.clone())
            .counts()
            .into_iter()
            .map(|(region, n)| (region, n as u64))
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .collect();
        let top_districts = state
            .winners
            .iter()
            .map(|w| (w.region_nomi.clone(), w.district_nomi.clone()))
            .counts()
            .into_iter()
            .map(|((region, district), n)| (region, district, n as u64))
            .sorted_by(|a, b| {
                b.2.cmp(&a.2)
                    .then_with(|| a.0.cmp(&b.0))
                    .then_with(|| a.1.cmp(&b.1))
            })
            .take(TOP_DISTRICTS)
            .collect::<Vec<(CompactString, CompactString, u64)>>();

        Ok(WinnerStats {
            total: state.winners.len() as u64,
            by_region,
            top_districts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryDrawStore, Uuid, Uuid, Uuid) {
        let store = MemoryDrawStore::new();
        let region = store.add_region("Toshkent", true).await;
        let district = store.add_district(region, "Chilonzor", true).await;
        let participant = store.add_participant(district, "Aliyev Vali", true).await;
        (store, region, district, participant)
    }

    fn new_winner(participant_id: Uuid, district_id: Uuid, region_id: Uuid) -> NewWinner {
        NewWinner {
            participant_id,
            participant_fio: "Aliyev Vali".into(),
            participant_telefon: None,
            participant_manzil: None,
            district_id,
            district_nomi: "Chilonzor".into(),
            district_soato: None,
            region_id,
            region_nomi: "Toshkent".into(),
            region_soato: None,
        }
    }

    #[tokio::test]
    async fn test_inactive_levels_hide_participants() {
        let store = MemoryDrawStore::new();
        let active = store.add_region("A", true).await;
        let inactive = store.add_region("B", false).await;
        let d_active = store.add_district(active, "A1", true).await;
        let d_off = store.add_district(active, "A2", false).await;
        let d_in_b = store.add_district(inactive, "B1", true).await;
        store.add_participant(d_active, "p1", true).await;
        store.add_participant(d_active, "p2", false).await;
        store.add_participant(d_off, "p3", true).await;
        store.add_participant(d_in_b, "p4", true).await;

        let regions = store
            .count_eligible_by_region(&Exclusion::Disabled)
            .await
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, active);
        assert_eq!(regions[0].count, 1);

        let districts = store
            .count_eligible_by_district(inactive, &Exclusion::Disabled)
            .await
            .unwrap();
        assert!(districts.is_empty());
    }

    #[tokio::test]
    async fn test_record_is_unique_per_participant() {
        let (store, region, district, participant) = seeded().await;

        store
            .record(new_winner(participant, district, region))
            .await
            .unwrap();
        let err = store
            .record(new_winner(participant, district, region))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateWinner(id) if id == participant));
        assert_eq!(store.winner_count().await, 1);
    }

    #[tokio::test]
    async fn test_exclusion_hides_previous_winners() {
        let (store, region, district, participant) = seeded().await;
        store
            .record(new_winner(participant, district, region))
            .await
            .unwrap();

        let exclusion = Exclusion::from_ids(store.previous_winner_ids().await.unwrap());
        let sampled = store
            .sample_eligible_participant(district, &exclusion)
            .await
            .unwrap();
        assert!(sampled.is_none());

        let sampled = store
            .sample_eligible_participant(district, &Exclusion::Disabled)
            .await
            .unwrap();
        assert_eq!(sampled.map(|p| p.id), Some(participant));
    }

    #[tokio::test]
    async fn test_reset_twice() {
        let (store, region, district, participant) = seeded().await;
        store
            .record(new_winner(participant, district, region))
            .await
            .unwrap();

        assert_eq!(store.reset_all().await.unwrap(), 1);
        assert_eq!(store.reset_all().await.unwrap(), 0);
        assert!(store.previous_winner_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_selection_stats_counts() {
        let (store, region, district, participant) = seeded().await;
        store.add_participant(district, "Karimova Nodira", true).await;
        store.add_district(region, "Yunusobod", false).await;
        store
            .record(new_winner(participant, district, region))
            .await
            .unwrap();

        let stats = store.selection_stats(true).await.unwrap();
        assert_eq!(stats.active_regions, 1);
        assert_eq!(stats.active_districts, 1);
        assert_eq!(stats.active_participants, 2);
        assert_eq!(stats.eligible_participants, 1);
        assert_eq!(stats.winners, 1);
        assert_eq!(stats.regions[0].active_districts, 1);

        let stats = store.selection_stats(false).await.unwrap();
        assert_eq!(stats.eligible_participants, 2);
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let store = MemoryDrawStore::new();
        let region = store.add_region("Samarqand", true).await;
        let d1 = store.add_district(region, "Urgut", true).await;
        let d2 = store.add_district(region, "Payariq", true).await;
        let mut ids = Vec::new();
        for (i, d) in [d1, d1, d2].into_iter().enumerate() {
            let p = store.add_participant(d, &format!("p{i}"), true).await;
            let mut w = new_winner(p, d, region);
            w.region_nomi = "Samarqand".into();
            w.district_nomi = CompactString::from(if d == d1 { "Urgut" } else { "Payariq" });
            ids.push(store.record(w).await.unwrap().id);
        }

        let page = store
            .list_winners(WinnerFilter::default(), 2, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        let filtered = store
            .list_winners(
                WinnerFilter {
                    region_id: None,
                    district_id: Some(d2),
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);

        let latest = store.latest_winner().await.unwrap().unwrap();
        assert!(ids.contains(&latest.id));
        assert!(store.get_winner(ids[0]).await.unwrap().is_some());
        assert!(store.get_winner(Uuid::nil()).await.unwrap().is_none());

        let stats = store.winner_stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_region, vec![(CompactString::from("Samarqand"), 3u64)]);
        assert_eq!(
            stats.top_districts[0],
            (CompactString::from("Samarqand"), CompactString::from("Urgut"), 2u64)
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let (store, _, _, _) = seeded().await;
        store.set_unavailable(true);
        let err = store.previous_winner_ids().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
