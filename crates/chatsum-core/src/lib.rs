pub mod config;
pub mod service;
pub mod topic;
pub mod types;

pub use service::{ChatService, HistorySource, PageCursor, ServiceError};
pub use types::{normalize_chat_id, Chat, Message, Reaction, ReplyRef, Topic, GENERAL_TOPIC_ID};
