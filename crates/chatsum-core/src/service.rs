//! The boundary between chatsum and the remote messaging service.
//!
//! Everything protocol-specific (session persistence, authentication, the
//! wire format, peer lookup caches) lives behind these traits. The fetch
//! engine and the TUI only ever see [`ChatService`] and [`HistorySource`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Chat, Message, Topic};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("chat {0} not found")]
    ChatNotFound(i64),

    #[error("history request failed: {0}")]
    RequestFailed(String),

    #[error("failed to mark as read: {0}")]
    MarkReadFailed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Position in a conversation's history, counted backward from newest.
///
/// `offset_id` of 0 means "start at the newest message". `offset_date` is
/// honored only on the first page of a date-bounded fetch, letting the
/// service jump near the requested window instead of scanning from the top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub offset_id: i32,
    pub offset_date: Option<DateTime<Utc>>,
}

impl PageCursor {
    pub fn at(offset_id: i32) -> Self {
        Self {
            offset_id,
            offset_date: None,
        }
    }
}

/// "Give me up to `limit` messages older than the cursor", newest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn page(&self, cursor: PageCursor, limit: usize) -> Result<Vec<Message>, ServiceError>;
}

/// Full collaborator surface the tool needs from the service.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// List conversations, in service order.
    async fn dialogs(&self) -> Result<Vec<Chat>, ServiceError>;

    /// List the topics of a forum chat.
    async fn forum_topics(&self, chat_id: i64) -> Result<Vec<Topic>, ServiceError>;

    /// History of a whole conversation.
    fn history(&self, chat_id: i64) -> Arc<dyn HistorySource>;

    /// History scoped to one forum topic. Callers route the general topic
    /// through [`ChatService::history`] instead; see the fetch plan.
    fn topic_history(&self, chat_id: i64, topic_id: i32) -> Arc<dyn HistorySource>;

    /// Advance the read watermark of a conversation up to `max_id`.
    async fn mark_read(&self, chat_id: i64, max_id: i32) -> Result<(), ServiceError>;

    /// Advance the read watermark of one forum topic up to `max_id`.
    async fn mark_topic_read(
        &self,
        chat_id: i64,
        topic_id: i32,
        max_id: i32,
    ) -> Result<(), ServiceError>;
}
