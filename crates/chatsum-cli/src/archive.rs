//! Archive-backed chat service.
//!
//! Reads a JSON archive of chats and their messages and serves it through
//! the [`ChatService`] trait. Read watermarks advanced by mark-as-read are
//! written back to the archive file, so repeated unread exports pick up
//! where the previous one stopped.
//!
//! The archive is a single `chats.json`: an array of chat objects, each
//! carrying its messages newest or oldest in any order. Forum threads are
//! recovered from each message's `reply_to.top_id`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use async_trait::async_trait;
use chatsum_core::{
    Chat, ChatService, HistorySource, Message, PageCursor, ServiceError, Topic, GENERAL_TOPIC_ID,
};
use serde::{Deserialize, Serialize};

const ARCHIVE_FILE: &str = "chats.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchiveChat {
    #[serde(flatten)]
    chat: Chat,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    topics: Vec<Topic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    messages: Vec<Message>,
}

pub struct ArchiveService {
    path: PathBuf,
    chats: RwLock<Vec<ArchiveChat>>,
}

impl ArchiveService {
    /// Open an archive. `path` may be the JSON file itself or a directory
    /// containing `chats.json`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let path = if path.is_dir() {
            path.join(ARCHIVE_FILE)
        } else {
            path.to_path_buf()
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading archive {}", path.display()))?;
        let chats: Vec<ArchiveChat> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing archive {}", path.display()))?;
        tracing::info!(path = %path.display(), chats = chats.len(), "archive opened");
        Ok(Self {
            path,
            chats: RwLock::new(chats),
        })
    }

    fn persist(&self) -> Result<(), ServiceError> {
        let chats = self.chats.read().expect("archive lock");
        let json = serde_json::to_string_pretty(&*chats)
            .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn snapshot(&self, chat_id: i64) -> Option<Vec<Message>> {
        let chats = self.chats.read().expect("archive lock");
        chats
            .iter()
            .find(|c| c.chat.id == chat_id)
            .map(|c| c.messages.clone())
    }
}

#[async_trait]
impl ChatService for ArchiveService {
    async fn dialogs(&self) -> Result<Vec<Chat>, ServiceError> {
        let chats = self.chats.read().expect("archive lock");
        Ok(chats.iter().map(|c| c.chat.clone()).collect())
    }

    async fn forum_topics(&self, chat_id: i64) -> Result<Vec<Topic>, ServiceError> {
        let chats = self.chats.read().expect("archive lock");
        let chat = chats
            .iter()
            .find(|c| c.chat.id == chat_id)
            .ok_or(ServiceError::ChatNotFound(chat_id))?;
        Ok(chat.topics.clone())
    }

    fn history(&self, chat_id: i64) -> Arc<dyn HistorySource> {
        Arc::new(ArchiveSource::new(self.snapshot(chat_id), chat_id, None))
    }

    fn topic_history(&self, chat_id: i64, topic_id: i32) -> Arc<dyn HistorySource> {
        Arc::new(ArchiveSource::new(
            self.snapshot(chat_id),
            chat_id,
            Some(topic_id),
        ))
    }

    async fn mark_read(&self, chat_id: i64, max_id: i32) -> Result<(), ServiceError> {
        {
            let mut chats = self.chats.write().expect("archive lock");
            let chat = chats
                .iter_mut()
                .find(|c| c.chat.id == chat_id)
                .ok_or(ServiceError::ChatNotFound(chat_id))?;
            if max_id > chat.chat.last_read_id {
                chat.chat.last_read_id = max_id;
                chat.chat.unread_count = 0;
            }
        }
        self.persist()
            .map_err(|e| ServiceError::MarkReadFailed(e.to_string()))
    }

    async fn mark_topic_read(
        &self,
        chat_id: i64,
        topic_id: i32,
        max_id: i32,
    ) -> Result<(), ServiceError> {
        {
            let mut chats = self.chats.write().expect("archive lock");
            let chat = chats
                .iter_mut()
                .find(|c| c.chat.id == chat_id)
                .ok_or(ServiceError::ChatNotFound(chat_id))?;
            let topic = chat
                .topics
                .iter_mut()
                .find(|t| t.id == topic_id)
                .ok_or_else(|| {
                    ServiceError::MarkReadFailed(format!(
                        "topic {topic_id} not found in chat {chat_id}"
                    ))
                })?;
            if max_id > topic.last_read_id {
                topic.last_read_id = max_id;
                topic.unread_count = 0;
            }
        }
        self.persist()
            .map_err(|e| ServiceError::MarkReadFailed(e.to_string()))
    }
}

/// Immutable page view over one chat's messages, newest first.
struct ArchiveSource {
    messages: Option<Vec<Message>>,
    chat_id: i64,
}

impl ArchiveSource {
    fn new(snapshot: Option<Vec<Message>>, chat_id: i64, topic_id: Option<i32>) -> Self {
        let messages = snapshot.map(|mut messages| {
            if let Some(topic_id) = topic_id {
                messages.retain(|m| message_topic(m) == topic_id);
            }
            messages.sort_by(|a, b| b.id.cmp(&a.id));
            messages
        });
        Self { messages, chat_id }
    }
}

/// The thread a message belongs to. Messages outside any named thread
/// count as the general topic.
fn message_topic(msg: &Message) -> i32 {
    match &msg.reply_to {
        Some(reply) if reply.top_id != 0 => reply.top_id,
        _ => GENERAL_TOPIC_ID,
    }
}

#[async_trait]
impl HistorySource for ArchiveSource {
    async fn page(&self, cursor: PageCursor, limit: usize) -> Result<Vec<Message>, ServiceError> {
        let messages = self
            .messages
            .as_ref()
            .ok_or(ServiceError::ChatNotFound(self.chat_id))?;
        let page = messages
            .iter()
            .filter(|m| cursor.offset_id == 0 || m.id < cursor.offset_id)
            .filter(|m| cursor.offset_date.map_or(true, |cut| m.date <= cut))
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }
}
