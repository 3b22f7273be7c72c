//! The three-stage draw: region, then district, then participant.
//!
//! Region and district are picked with probability proportional to their
//! current eligible participant count, which makes the two-stage walk
//! equivalent to one uniform pick over every eligible participant.
//!
//! | step | percent | stage                                          |
//! |------|---------|------------------------------------------------|
//! | 1    | 5       | load previous winners                          |
//! | 2    | 15      | count eligible participants per region         |
//! | 3    | 35, 45  | pick a region                                  |
//! | 4    | 55, 70  | pick a district of that region                 |
//! | 5    | 85      | pick a participant of that district            |
//! | 6    | 95, 100 | record the winner                              |

use std::fmt;
use std::sync::Arc;

use raffle_sdk::objects::{DrawCompleted, DrawProgress, DrawRequest, DrawStats, WinnerResponse};
use tokio::sync::watch;

use crate::eligibility::{
    DistrictBucket, EligibilityRepository, Exclusion, RegionBucket, StorageError,
};
use crate::recorder::{NewWinner, RecordError, ResultRecorder, WinnerRecord};
use crate::sampler::{self, SamplerError};

pub const TOTAL_STEPS: u8 = 6;

/// Level of the hierarchy at which a draw ran out of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Region,
    District,
    Participant,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Region => write!(f, "region"),
            Stage::District => write!(f, "district"),
            Stage::Participant => write!(f, "participant"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("no eligible candidates at {0} stage")]
    NoEligibleCandidates(Stage),
    #[error("a draw is already in progress")]
    DrawInProgress,
    #[error("the selected participant was recorded by a concurrent draw twice in a row")]
    RaceLost,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("sampler error: {0}")]
    Sampler(#[from] SamplerError),
    #[error("draw cancelled")]
    Cancelled,
    #[error("draw task ended unexpectedly")]
    Aborted,
}

impl DrawError {
    /// Message shown to the requester.
    pub fn reason(&self) -> String {
        match self {
            DrawError::NoEligibleCandidates(Stage::Region) => "No eligible participants found. \
                When previous winners are excluded, every active participant may already have won."
                .to_owned(),
            DrawError::NoEligibleCandidates(Stage::District) => {
                "No active district with eligible participants in the selected region".to_owned()
            }
            DrawError::NoEligibleCandidates(Stage::Participant) => {
                "No eligible participant in the selected district".to_owned()
            }
            DrawError::DrawInProgress => "A draw is already in progress".to_owned(),
            DrawError::RaceLost => {
                "The selected participant was taken by a concurrent draw, please try again"
                    .to_owned()
            }
            DrawError::Cancelled => "Draw cancelled".to_owned(),
            DrawError::Storage(_) | DrawError::Sampler(_) | DrawError::Aborted => {
                "Internal error".to_owned()
            }
        }
    }
}

/// Receives the non-terminal progress of one draw.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, progress: DrawProgress);
}

/// Swallows the step updates of a retried selection so percent never goes
/// backwards.
struct Muted;

impl ProgressSink for Muted {
    fn progress(&self, _: DrawProgress) {}
}

/// Observes cancellation requested through a [`CancelHandle`].
///
/// Dropping every handle does not cancel the draw.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Requests cancellation of the draw holding the paired [`CancelSignal`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Create a linked cancel handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // The handle is gone and never fired.
            std::future::pending::<()>().await;
        }
    }
}

/// Result of a completed draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub record: WinnerRecord,
    pub stats: DrawStats,
    /// The participant already had a record, which is returned unchanged.
    pub repeat: bool,
}

impl From<DrawOutcome> for DrawCompleted {
    fn from(value: DrawOutcome) -> Self {
        DrawCompleted {
            winner: WinnerResponse::from(value.record),
            stats: value.stats,
            repeat: value.repeat,
        }
    }
}

struct Candidate {
    winner: NewWinner,
    stats: DrawStats,
}

fn progress(step: u8, percent: u8, message: impl Into<String>) -> DrawProgress {
    DrawProgress {
        step,
        total_steps: TOTAL_STEPS,
        message: message.into(),
        percent,
        region: None,
        district: None,
    }
}

/// Drives one draw from previous-winner lookup to the durable record.
pub struct SelectionOrchestrator {
    repository: Arc<dyn EligibilityRepository>,
    recorder: Arc<dyn ResultRecorder>,
}

impl SelectionOrchestrator {
    pub fn new(
        repository: Arc<dyn EligibilityRepository>,
        recorder: Arc<dyn ResultRecorder>,
    ) -> Self {
        Self {
            repository,
            recorder,
        }
    }

    /// Run a draw to completion.
    ///
    /// `cancel` is honored until the record step begins; once the winner is
    /// being written the draw runs to the end.
    pub async fn run(
        &self,
        request: DrawRequest,
        sink: &dyn ProgressSink,
        mut cancel: CancelSignal,
    ) -> Result<DrawOutcome, DrawError> {
        sink.progress(progress(1, 5, "Checking previous winners..."));
        let mut exclusion = self
            .load_exclusion(request.exclude_previous_winners, &mut cancel)
            .await?;
        let mut retried = false;

        loop {
            let steps: &dyn ProgressSink = if retried { &Muted } else { sink };
            let candidate = self.select_candidate(&exclusion, steps, &mut cancel).await?;
            if cancel.is_cancelled() {
                return Err(DrawError::Cancelled);
            }

            if !retried {
                sink.progress(progress(6, 95, "Saving result..."));
            }
            let participant_id = candidate.winner.participant_id;
            match self.recorder.record(candidate.winner).await {
                Ok(record) => {
                    sink.progress(progress(6, 100, "Winner selected!"));
                    return Ok(DrawOutcome {
                        record,
                        stats: candidate.stats,
                        repeat: false,
                    });
                }
                Err(RecordError::DuplicateWinner(_)) if !exclusion.is_enabled() => {
                    let record = self
                        .recorder
                        .find_by_participant(participant_id)
                        .await?
                        .ok_or(DrawError::RaceLost)?;
                    tracing::info!(participant = %participant_id, "participant won again");
                    sink.progress(progress(6, 100, "Winner selected!"));
                    return Ok(DrawOutcome {
                        record,
                        stats: candidate.stats,
                        repeat: true,
                    });
                }
                Err(RecordError::DuplicateWinner(_)) if !retried => {
                    tracing::warn!(
                        participant = %participant_id,
                        "participant recorded by a concurrent draw, retrying"
                    );
                    retried = true;
                    sink.progress(progress(
                        6,
                        95,
                        "Participant already selected, drawing again...",
                    ));
                    exclusion = self.load_exclusion(true, &mut cancel).await?;
                }
                Err(RecordError::DuplicateWinner(_)) => return Err(DrawError::RaceLost),
                Err(RecordError::Storage(e)) => return Err(e.into()),
            }
        }
    }

    async fn load_exclusion(
        &self,
        exclude_previous_winners: bool,
        cancel: &mut CancelSignal,
    ) -> Result<Exclusion, DrawError> {
        if !exclude_previous_winners {
            return Ok(Exclusion::Disabled);
        }
        let ids = checkpoint(cancel, self.repository.previous_winner_ids()).await?;
        tracing::debug!(excluded = ids.len(), "previous winners excluded");
        Ok(Exclusion::from_ids(ids))
    }

    async fn select_candidate(
        &self,
        exclusion: &Exclusion,
        sink: &dyn ProgressSink,
        cancel: &mut CancelSignal,
    ) -> Result<Candidate, DrawError> {
        sink.progress(progress(2, 15, "Finding regions..."));
        let regions =
            checkpoint(cancel, self.repository.count_eligible_by_region(exclusion)).await?;
        if regions.is_empty() {
            return Err(DrawError::NoEligibleCandidates(Stage::Region));
        }

        sink.progress(progress(3, 35, "Selecting region..."));
        let region: RegionBucket = pick(&regions, Stage::Region)?.clone();
        sink.progress(DrawProgress {
            region: Some(region.nomi.clone()),
            ..progress(3, 45, format!("Region selected: {}", region.nomi))
        });

        sink.progress(DrawProgress {
            region: Some(region.nomi.clone()),
            ..progress(4, 55, "Selecting district...")
        });
        let districts = checkpoint(
            cancel,
            self.repository
                .count_eligible_by_district(region.id, exclusion),
        )
        .await?;
        if districts.is_empty() {
            return Err(DrawError::NoEligibleCandidates(Stage::District));
        }
        let district: DistrictBucket = pick(&districts, Stage::District)?.clone();
        sink.progress(DrawProgress {
            region: Some(region.nomi.clone()),
            district: Some(district.nomi.clone()),
            ..progress(4, 70, format!("District selected: {}", district.nomi))
        });

        sink.progress(DrawProgress {
            region: Some(region.nomi.clone()),
            district: Some(district.nomi.clone()),
            ..progress(5, 85, "Selecting winner...")
        });
        let participant = checkpoint(
            cancel,
            self.repository
                .sample_eligible_participant(district.id, exclusion),
        )
        .await?
        .ok_or(DrawError::NoEligibleCandidates(Stage::Participant))?;

        tracing::debug!(
            region = %region.nomi,
            district = %district.nomi,
            participant = %participant.id,
            "draw candidate selected"
        );

        let stats = DrawStats {
            total_regions_considered: regions.len() as u64,
            total_districts_considered: districts.len() as u64,
            total_eligible_participants: regions
                .iter()
                .fold(0u64, |acc, r| acc.saturating_add(r.count)),
        };
        Ok(Candidate {
            winner: NewWinner::snapshot(&participant, &district, &region),
            stats,
        })
    }
}

fn pick<T: sampler::Weighted>(buckets: &[T], stage: Stage) -> Result<&T, DrawError> {
    sampler::pick(buckets).map_err(|e| match e {
        SamplerError::InvalidInput => DrawError::NoEligibleCandidates(stage),
        SamplerError::WeightOverflow => DrawError::Sampler(e),
    })
}

/// Await a repository call unless cancellation arrives first.
async fn checkpoint<T>(
    cancel: &mut CancelSignal,
    fut: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, DrawError> {
    if cancel.is_cancelled() {
        return Err(DrawError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DrawError::Cancelled),
        result = fut => result.map_err(DrawError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDrawStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<DrawProgress>>,
    }

    impl ProgressSink for RecordingSink {
        fn progress(&self, progress: DrawProgress) {
            self.events.lock().unwrap().push(progress);
        }
    }

    impl RecordingSink {
        fn percents(&self) -> Vec<u8> {
            self.events.lock().unwrap().iter().map(|p| p.percent).collect()
        }
    }

    fn orchestrator(store: &Arc<MemoryDrawStore>) -> SelectionOrchestrator {
        SelectionOrchestrator::new(store.clone(), store.clone())
    }

    const EXCLUDE: DrawRequest = DrawRequest {
        exclude_previous_winners: true,
    };
    const INCLUDE: DrawRequest = DrawRequest {
        exclude_previous_winners: false,
    };

    #[tokio::test]
    async fn test_happy_path_emits_every_step() {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Toshkent", true).await;
        let district = store.add_district(region, "Chilonzor", true).await;
        let participant = store.add_participant(district, "Aliyev Vali", true).await;

        let sink = RecordingSink::default();
        let outcome = orchestrator(&store)
            .run(EXCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome.record.participant_id, Some(participant));
        assert_eq!(outcome.record.region_nomi, "Toshkent");
        assert!(!outcome.repeat);
        assert_eq!(
            outcome.stats,
            DrawStats {
                total_regions_considered: 1,
                total_districts_considered: 1,
                total_eligible_participants: 1,
            }
        );
        assert_eq!(sink.percents(), vec![5, 15, 35, 45, 55, 70, 85, 95, 100]);

        let events = sink.events.lock().unwrap();
        assert!(events.iter().all(|p| p.total_steps == TOTAL_STEPS));
        assert_eq!(events[3].region.as_deref(), Some("Toshkent"));
        assert_eq!(events[5].district.as_deref(), Some("Chilonzor"));
    }

    #[tokio::test]
    async fn test_exclusion_never_repeats_a_winner() {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Farg'ona", true).await;
        let district = store.add_district(region, "Quva", true).await;
        for i in 0..5 {
            store.add_participant(district, &format!("p{i}"), true).await;
        }

        let orchestrator = orchestrator(&store);
        let sink = RecordingSink::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5 {
            let outcome = orchestrator
                .run(EXCLUDE, &sink, CancelSignal::never())
                .await
                .unwrap();
            assert!(seen.insert(outcome.record.participant_id));
        }

        let err = orchestrator
            .run(EXCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::NoEligibleCandidates(Stage::Region)));
        assert_eq!(store.winner_count().await, 5);
    }

    #[tokio::test]
    async fn test_without_exclusion_previous_winner_may_repeat() {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Xorazm", true).await;
        let district = store.add_district(region, "Urganch", true).await;
        let participant = store.add_participant(district, "Yusupov Bek", true).await;

        let orchestrator = orchestrator(&store);
        let sink = RecordingSink::default();
        let first = orchestrator
            .run(INCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap();
        let second = orchestrator
            .run(INCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(second.record.participant_id, Some(participant));
        assert!(second.repeat);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(store.winner_count().await, 1);
    }

    #[tokio::test]
    async fn test_inactive_region_is_never_selected() {
        let store = Arc::new(MemoryDrawStore::new());
        let a = store.add_region("A", true).await;
        let b = store.add_region("B", false).await;
        let da = store.add_district(a, "A1", true).await;
        let db = store.add_district(b, "B1", true).await;
        store.add_participant(da, "in A", true).await;
        for i in 0..50 {
            store.add_participant(db, &format!("in B {i}"), true).await;
        }

        let orchestrator = orchestrator(&store);
        let sink = RecordingSink::default();
        for _ in 0..20 {
            let outcome = orchestrator
                .run(INCLUDE, &sink, CancelSignal::never())
                .await
                .unwrap();
            assert_eq!(outcome.record.region_id, a);
        }
    }

    #[tokio::test]
    async fn test_empty_population_records_nothing() {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Navoiy", true).await;
        store.add_district(region, "Karmana", true).await;

        let sink = RecordingSink::default();
        let err = orchestrator(&store)
            .run(EXCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::NoEligibleCandidates(Stage::Region)));
        assert_eq!(store.winner_count().await, 0);
        assert_eq!(sink.percents(), vec![5, 15]);
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_retried() {
        let store = Arc::new(MemoryDrawStore::new());
        store.set_unavailable(true);

        let err = orchestrator(&store)
            .run(EXCLUDE, &RecordingSink::default(), CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::Storage(StorageError::Unavailable(_))));
        assert_eq!(err.reason(), "Internal error");
    }

    #[tokio::test]
    async fn test_cancel_before_start_records_nothing() {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Buxoro", true).await;
        let district = store.add_district(region, "G'ijduvon", true).await;
        store.add_participant(district, "Rahimov Olim", true).await;

        let (handle, signal) = cancel_pair();
        handle.cancel();
        let err = orchestrator(&store)
            .run(EXCLUDE, &RecordingSink::default(), signal)
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::Cancelled));
        assert_eq!(store.winner_count().await, 0);
    }

    /// Records the candidate on behalf of a "concurrent" draw before
    /// forwarding, for the first `races` calls.
    struct RacingRecorder {
        store: Arc<MemoryDrawStore>,
        races: AtomicUsize,
    }

    #[async_trait]
    impl ResultRecorder for RacingRecorder {
        async fn record(&self, winner: NewWinner) -> Result<WinnerRecord, RecordError> {
            if self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                self.store.record(winner.clone()).await?;
            }
            self.store.record(winner).await
        }

        async fn reset_all(&self) -> Result<u64, StorageError> {
            self.store.reset_all().await
        }

        async fn find_by_participant(
            &self,
            participant_id: Uuid,
        ) -> Result<Option<WinnerRecord>, StorageError> {
            self.store.find_by_participant(participant_id).await
        }
    }

    async fn two_participants() -> Arc<MemoryDrawStore> {
        let store = Arc::new(MemoryDrawStore::new());
        let region = store.add_region("Qashqadaryo", true).await;
        let district = store.add_district(region, "Shahrisabz", true).await;
        store.add_participant(district, "first", true).await;
        store.add_participant(district, "second", true).await;
        store
    }

    #[tokio::test]
    async fn test_commit_race_retries_once() {
        let store = two_participants().await;
        let recorder = Arc::new(RacingRecorder {
            store: store.clone(),
            races: AtomicUsize::new(1),
        });
        let orchestrator = SelectionOrchestrator::new(store.clone(), recorder);

        let sink = RecordingSink::default();
        let outcome = orchestrator
            .run(EXCLUDE, &sink, CancelSignal::never())
            .await
            .unwrap();
        // The racer took one participant; the retry must land on the other.
        assert!(!outcome.repeat);
        assert_eq!(store.winner_count().await, 2);
        assert_eq!(sink.percents(), vec![5, 15, 35, 45, 55, 70, 85, 95, 95, 100]);
        assert!(sink.percents().windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_second_commit_race_is_lost() {
        let store = two_participants().await;
        let recorder = Arc::new(RacingRecorder {
            store: store.clone(),
            races: AtomicUsize::new(2),
        });
        let orchestrator = SelectionOrchestrator::new(store.clone(), recorder);

        let err = orchestrator
            .run(EXCLUDE, &RecordingSink::default(), CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, DrawError::RaceLost));
    }

    #[test]
    fn test_reasons_hide_internals() {
        let err = DrawError::Storage(StorageError::Unavailable("pg down".into()));
        assert!(!err.reason().contains("pg down"));
        assert_eq!(
            DrawError::DrawInProgress.reason(),
            "A draw is already in progress"
        );
    }
}
