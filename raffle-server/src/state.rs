//! Application state shared across all request handlers.

use crate::config::runtime::SharedConfig;
use raffle_core::eligibility::EligibilityRepository;
use raffle_core::events::ProgressChannel;
use raffle_core::guard::DrawSessionGuard;
use raffle_core::orchestrator::SelectionOrchestrator;
use raffle_core::recorder::{ResultRecorder, WinnerQueries};
use raffle_core::service::DrawService;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Starts draws and routes their events.
    pub draws: DrawService,
    pub eligibility: Arc<dyn EligibilityRepository>,
    pub recorder: Arc<dyn ResultRecorder>,
    pub winners: Arc<dyn WinnerQueries>,
    /// Runtime configuration (admin and draw sections reload on SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    /// Wire the draw pipeline on top of one store.
    ///
    /// Channel buffers are fixed at startup; a reload only changes the
    /// default exclusion flag.
    pub async fn new<S>(store: Arc<S>, config: SharedConfig) -> Self
    where
        S: EligibilityRepository + ResultRecorder + WinnerQueries + 'static,
    {
        let (progress_buffer, announcement_buffer) = {
            let draw = config.draw().await;
            (draw.progress_buffer, draw.announcement_buffer)
        };

        let orchestrator = Arc::new(SelectionOrchestrator::new(store.clone(), store.clone()));
        let draws = DrawService::new(
            orchestrator,
            DrawSessionGuard::new(),
            ProgressChannel::new(progress_buffer, announcement_buffer),
        );

        Self {
            draws,
            eligibility: store.clone(),
            recorder: store.clone(),
            winners: store,
            config,
        }
    }

    /// Exclusion flag to use when a request leaves it out.
    pub async fn default_exclusion(&self) -> bool {
        self.config.draw().await.default_exclude_previous_winners
    }
}
