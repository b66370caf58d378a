//! Backward-paging history fetch.
//!
//! The engine walks a conversation's history newest-to-oldest in bounded
//! batches, applies a per-message accept/skip/stop filter, and reports
//! advisory progress while remaining cancellable between pages.

pub mod coordinator;
pub mod engine;
pub mod filter;
pub mod plan;
pub mod progress;

pub use coordinator::{start_fetch, FetchEvent, FetchHandle};
pub use engine::{fetch_history, FetchOptions};
pub use filter::{FilterDecision, MessageFilter};
pub use plan::{build_fetch_plan, FetchMode, FetchPlan};
pub use progress::{ProgressSink, ProgressUpdate, PROGRESS_CHANNEL_CAPACITY};

use chatsum_core::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("forum chat requires a topic selection")]
    TopicRequired,

    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch task ended without delivering a result")]
    TaskFailed,

    #[error(transparent)]
    Service(#[from] ServiceError),
}
