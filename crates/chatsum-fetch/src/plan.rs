//! Fetch planning.
//!
//! Turns a chat selection plus an optional topic and mode into a concrete
//! [`FetchPlan`]: which history source to page, which filter to apply, and
//! the labels the UI and exporter show for the run.

use std::sync::Arc;

use chatsum_core::{Chat, ChatService, HistorySource, Topic, GENERAL_TOPIC_ID};
use chrono::{DateTime, Utc};

use crate::engine::FetchOptions;
use crate::filter::MessageFilter;
use crate::FetchError;

/// What slice of history a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Everything newer than the read watermark.
    Unread,
    /// Everything with `since <= date <= until`, read or not.
    DateRange {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

/// Everything a fetch task needs, resolved up front.
pub struct FetchPlan {
    /// Shown in the progress view, e.g. `Rust Lounge / help (unread)`.
    pub progress_label: String,
    /// Title used for the export header and filename.
    pub export_title: String,
    pub mode: FetchMode,
    pub source: Arc<dyn HistorySource>,
    pub filter: MessageFilter,
    pub options: FetchOptions,
}

/// Resolve the source, filter, and labels for a run.
///
/// Forums require a topic selection. The general topic has no thread of
/// its own, so it reads the whole-conversation history and drops messages
/// that belong to other threads.
pub fn build_fetch_plan(
    service: &dyn ChatService,
    chat: &Chat,
    topic: Option<&Topic>,
    mode: FetchMode,
    options: FetchOptions,
) -> Result<FetchPlan, FetchError> {
    if chat.is_forum && topic.is_none() {
        return Err(FetchError::TopicRequired);
    }

    let (source, skip_cross_topic) = match topic {
        Some(t) if t.id == GENERAL_TOPIC_ID => (service.history(chat.id), true),
        Some(t) => (service.topic_history(chat.id, t.id), false),
        None => (service.history(chat.id), false),
    };

    let last_read_id = topic.map_or(chat.last_read_id, |t| t.last_read_id);
    let filter = match mode {
        FetchMode::Unread => MessageFilter::Unread { last_read_id },
        FetchMode::DateRange { since, until } => MessageFilter::DateRange { since, until },
    };

    let scope = match topic {
        Some(t) => format!("{} / {}", chat.title, t.title),
        None => chat.title.clone(),
    };
    let progress_label = match mode {
        FetchMode::Unread => format!("{scope} (unread)"),
        FetchMode::DateRange { since, until } => format!(
            "{scope} ({} to {})",
            since.format("%Y-%m-%d"),
            until.format("%Y-%m-%d")
        ),
    };
    let export_title = match topic {
        Some(t) => format!("{} - {}", chat.title, t.title),
        None => chat.title.clone(),
    };

    Ok(FetchPlan {
        progress_label,
        export_title,
        mode,
        source,
        filter,
        options: FetchOptions {
            skip_cross_topic,
            ..options
        },
    })
}
