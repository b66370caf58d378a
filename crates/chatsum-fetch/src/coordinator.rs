//! Background fetch task.
//!
//! The UI stays responsive while a fetch runs: the fetch loop lives in its
//! own tokio task and the caller holds a [`FetchHandle`] carrying a progress
//! receiver, a one-shot result receiver, and a cancellation token.

use chatsum_core::Message;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::fetch_history;
use crate::plan::FetchPlan;
use crate::progress::{ProgressSink, ProgressUpdate, PROGRESS_CHANNEL_CAPACITY};
use crate::FetchError;

/// What a running fetch reports next.
#[derive(Debug)]
pub enum FetchEvent {
    Progress(ProgressUpdate),
    Done(Result<Vec<Message>, FetchError>),
}

/// Handle to a running fetch. Dropping it cancels the task.
pub struct FetchHandle {
    /// Advisory progress stream. Updates may be dropped under load.
    pub progress: mpsc::Receiver<ProgressUpdate>,
    result: oneshot::Receiver<Result<Vec<Message>, FetchError>>,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl FetchHandle {
    /// Request cancellation. The task notices at the next page boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the final result. Delivered exactly once.
    pub async fn result(mut self) -> Result<Vec<Message>, FetchError> {
        (&mut self.result).await.map_err(|_| FetchError::TaskFailed)?
    }

    /// Wait for the next progress update or the final result, whichever
    /// comes first. After `Done` the handle should be dropped.
    pub async fn next_event(&mut self) -> FetchEvent {
        tokio::select! {
            Some(update) = self.progress.recv() => FetchEvent::Progress(update),
            result = &mut self.result => {
                FetchEvent::Done(result.map_err(|_| FetchError::TaskFailed).and_then(|r| r))
            }
        }
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a fetch described by `plan` and return its handle.
pub fn start_fetch(plan: FetchPlan) -> FetchHandle {
    let (ptx, progress) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let (rtx, result) = oneshot::channel();
    let cancel = CancellationToken::new();

    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        let sink = ProgressSink::new(ptx);
        let outcome = fetch_history(
            plan.source.as_ref(),
            &plan.filter,
            &plan.options,
            &sink,
            &task_cancel,
        )
        .await;
        if rtx.send(outcome).is_err() {
            tracing::debug!("fetch result discarded, handle dropped");
        }
    });

    FetchHandle {
        progress,
        result,
        cancel,
        _task: task,
    }
}
