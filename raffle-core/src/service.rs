//! Runs guarded draws as background tasks and routes their events.

use std::sync::Arc;

use raffle_sdk::objects::{DrawCompleted, DrawProgress, DrawRequest, WinnerResponse};
use tokio::task::JoinHandle;

use crate::events::{DrawEvent, ProgressChannel, WinnerAnnouncement};
use crate::guard::{DrawId, DrawPermit, DrawSessionGuard, RequesterId};
use crate::orchestrator::{
    CancelHandle, CancelSignal, DrawError, DrawOutcome, ProgressSink, SelectionOrchestrator,
    cancel_pair,
};

/// Entry point for starting draws.
///
/// Cheap to clone; clones share the guard and the progress channel.
#[derive(Clone)]
pub struct DrawService {
    orchestrator: Arc<SelectionOrchestrator>,
    guard: DrawSessionGuard,
    channel: ProgressChannel,
}

/// A running draw.
///
/// Dropping the handle leaves the draw running.
#[derive(Debug)]
pub struct DrawHandle {
    requester: RequesterId,
    id: DrawId,
    cancel: CancelHandle,
    task: JoinHandle<Result<DrawOutcome, DrawError>>,
}

impl DrawHandle {
    pub fn requester(&self) -> &RequesterId {
        &self.requester
    }

    pub fn id(&self) -> DrawId {
        self.id
    }

    /// Ask the draw to stop. No effect once the winner is being recorded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the draw's result.
    pub async fn join(self) -> Result<DrawOutcome, DrawError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(requester = %self.requester, error = %e, "draw supervisor failed");
                Err(DrawError::Aborted)
            }
        }
    }
}

impl DrawService {
    pub fn new(
        orchestrator: Arc<SelectionOrchestrator>,
        guard: DrawSessionGuard,
        channel: ProgressChannel,
    ) -> Self {
        Self {
            orchestrator,
            guard,
            channel,
        }
    }

    pub fn guard(&self) -> &DrawSessionGuard {
        &self.guard
    }

    pub fn channel(&self) -> &ProgressChannel {
        &self.channel
    }

    /// Cancel the running draw of `requester`, whichever session started it.
    /// Returns `false` if there is none.
    pub fn cancel(&self, requester: &RequesterId) -> bool {
        self.guard.cancel(requester)
    }

    /// Cancel draw `id` only if it is still running for `requester`.
    pub fn cancel_draw(&self, requester: &RequesterId, id: DrawId) -> bool {
        self.guard.cancel_draw(requester, id)
    }

    /// Start a draw for `requester`.
    ///
    /// Fails immediately with [`DrawError::DrawInProgress`] if that requester
    /// already has one running. Progress and the terminal event go to the
    /// requester's registered sessions; a recorded winner is also broadcast
    /// to everyone.
    pub fn start(
        &self,
        requester: RequesterId,
        request: DrawRequest,
    ) -> Result<DrawHandle, DrawError> {
        let (cancel, signal) = cancel_pair();
        let permit = self
            .guard
            .try_acquire(&requester, cancel.clone())
            .ok_or(DrawError::DrawInProgress)?;
        let id = permit.id();

        tracing::info!(
            requester = %requester,
            draw = id,
            exclude_previous_winners = request.exclude_previous_winners,
            "draw started"
        );
        self.channel.emit(
            &requester,
            DrawEvent::Started {
                message: "Draw started".to_owned(),
            },
        );

        let draw = tokio::spawn(run_draw(
            Arc::clone(&self.orchestrator),
            self.channel.clone(),
            permit,
            request,
            signal,
        ));
        let task = tokio::spawn(supervise(draw, self.channel.clone(), requester.clone()));

        Ok(DrawHandle {
            requester,
            id,
            cancel,
            task,
        })
    }
}

/// Turn a panicked draw task into a terminal failure for its requester.
///
/// The permit lives inside the draw task and is released while it unwinds.
async fn supervise(
    draw: JoinHandle<Result<DrawOutcome, DrawError>>,
    channel: ProgressChannel,
    requester: RequesterId,
) -> Result<DrawOutcome, DrawError> {
    match draw.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(requester = %requester, error = %e, "draw task failed");
            channel.emit(
                &requester,
                DrawEvent::Failed {
                    reason: DrawError::Aborted.reason(),
                },
            );
            Err(DrawError::Aborted)
        }
    }
}

struct ChannelSink<'a> {
    channel: &'a ProgressChannel,
    requester: &'a RequesterId,
}

impl ProgressSink for ChannelSink<'_> {
    fn progress(&self, progress: DrawProgress) {
        self.channel
            .emit(self.requester, DrawEvent::Progress(progress));
    }
}

async fn run_draw(
    orchestrator: Arc<SelectionOrchestrator>,
    channel: ProgressChannel,
    permit: DrawPermit,
    request: DrawRequest,
    cancel: CancelSignal,
) -> Result<DrawOutcome, DrawError> {
    let requester = permit.requester().clone();
    let sink = ChannelSink {
        channel: &channel,
        requester: &requester,
    };
    let result = orchestrator.run(request, &sink, cancel).await;

    // Free the requester before the terminal event so a client reacting to it
    // can start the next draw right away.
    permit.release();

    match &result {
        Ok(outcome) => {
            tracing::info!(
                requester = %requester,
                winner = %outcome.record.id,
                repeat = outcome.repeat,
                "draw completed"
            );
            let completed = DrawCompleted::from(outcome.clone());
            let winner: WinnerResponse = completed.winner.clone();
            channel.emit(&requester, DrawEvent::Completed(completed));
            if !outcome.repeat {
                channel.broadcast_winner(WinnerAnnouncement { winner });
            }
        }
        Err(DrawError::Cancelled) => {
            tracing::info!(requester = %requester, "draw cancelled");
            channel.emit(
                &requester,
                DrawEvent::Cancelled {
                    message: "Draw cancelled".to_owned(),
                },
            );
        }
        Err(e @ (DrawError::Storage(_) | DrawError::Sampler(_) | DrawError::Aborted)) => {
            tracing::error!(requester = %requester, error = %e, "draw failed");
            channel.emit(&requester, DrawEvent::Failed { reason: e.reason() });
        }
        Err(e) => {
            tracing::warn!(requester = %requester, error = %e, "draw failed");
            channel.emit(&requester, DrawEvent::Failed { reason: e.reason() });
        }
    }
    result
}
