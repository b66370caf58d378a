//! Paged history fetch loop.
//!
//! Walks a [`HistorySource`] newest-first in fixed-size pages, applying a
//! [`MessageFilter`] to each message. The cursor for the next page is the
//! lowest message id seen in the current page, so every message is scanned
//! at most once even when the source returns overlapping ids.

use std::time::Duration;

use chatsum_core::{HistorySource, Message, PageCursor};
use tokio_util::sync::CancellationToken;

use crate::filter::{FilterDecision, MessageFilter};
use crate::progress::ProgressSink;
use crate::FetchError;

/// Default page size for history requests.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Tuning knobs for a single fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Messages requested per page.
    pub page_size: usize,
    /// Drop messages that belong to a named topic thread. Used when
    /// reading the general topic of a forum, whose messages live in the
    /// whole-conversation history alongside every other thread.
    pub skip_cross_topic: bool,
    /// Pause between page requests so a rate-limited service is not
    /// hammered. Zero disables pacing.
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            skip_cross_topic: false,
            page_delay: Duration::ZERO,
        }
    }
}

/// Fetch messages newest-first until the filter signals a stop, the source
/// runs out of history, or the token is cancelled.
///
/// Returned messages are in scan order (newest first); callers reverse
/// once before export.
pub async fn fetch_history(
    source: &dyn HistorySource,
    filter: &MessageFilter,
    options: &FetchOptions,
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> Result<Vec<Message>, FetchError> {
    let mut accepted = Vec::new();
    let mut cursor = PageCursor::default();
    let mut first_page = true;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        if first_page {
            if let MessageFilter::DateRange { until, .. } = filter {
                // Ask the source to open at the upper date bound instead of
                // paging down from the newest message.
                cursor.offset_date = Some(*until);
                progress.phase(format!("jumped to date {}", until.format("%Y-%m-%d")));
            }
            first_page = false;
        }

        let batch = source.page(cursor, options.page_size).await?;
        if batch.is_empty() {
            break;
        }

        let scanned = batch.len();
        let mut batch_accepted = 0usize;
        let mut lowest_id = cursor.offset_id;
        let mut stopped = false;

        for msg in &batch {
            // The cursor must advance past stopped and skipped messages too.
            lowest_id = msg.id;

            if options.skip_cross_topic {
                if let Some(reply) = &msg.reply_to {
                    if reply.top_id != 0 {
                        continue;
                    }
                }
            }

            match filter.decide(msg) {
                FilterDecision::Accept => {
                    accepted.push(msg.clone());
                    batch_accepted += 1;
                }
                FilterDecision::Skip => {}
                FilterDecision::Stop => {
                    stopped = true;
                    break;
                }
            }
        }

        progress.batch(batch_accepted, scanned);

        if stopped {
            break;
        }
        cursor = PageCursor::at(lowest_id);

        // A short page means the source is exhausted.
        if scanned < options.page_size {
            break;
        }

        if !options.page_delay.is_zero() {
            tokio::time::sleep(options.page_delay).await;
        }
    }

    tracing::debug!(accepted = accepted.len(), "fetch complete");
    Ok(accepted)
}
