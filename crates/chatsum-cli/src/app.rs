//! Application state for the TUI.
//!
//! The TUI is a small state machine: load the chat list, pick a chat (and
//! a topic for forums), watch the fetch progress, then read the export
//! summary. Transient errors and empty results surface as a notice screen
//! that either returns to the chat list or exits.

use std::path::PathBuf;

use chatsum_core::{Chat, Topic};
use chatsum_export::DateWindow;
use chatsum_fetch::{FetchMode, ProgressUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    LoadingChats,
    ChatList,
    LoadingTopics,
    TopicList,
    Progress,
    Summary,
    Notice,
    Exit,
}

/// Where a dismissed notice leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeNext {
    Exit,
    /// Back to the chat list, reloading it.
    ChatList,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub footer: String,
    pub next: NoticeNext,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    pub label: String,
    pub phase: Option<String>,
    pub accepted: usize,
    pub scanned: usize,
    pub batches: u32,
}

#[derive(Debug, Clone)]
pub struct SummaryInfo {
    pub title: String,
    pub path: PathBuf,
    pub count: usize,
    pub mark_status: String,
}

pub struct App {
    pub view: View,
    /// Set when the run was started with a date range.
    pub window: Option<DateWindow>,
    pub loading_label: String,
    pub chats: Vec<Chat>,
    pub chat_index: usize,
    pub topics: Vec<Topic>,
    pub topic_index: usize,
    pub selected_chat: Option<Chat>,
    pub selected_topic: Option<Topic>,
    pub progress: ProgressState,
    pub summary: Option<SummaryInfo>,
    pub notice: Option<Notice>,
    pub should_quit: bool,
}

impl App {
    pub fn new(window: Option<DateWindow>) -> Self {
        Self {
            view: View::LoadingChats,
            window,
            loading_label: "Fetching chats...".to_string(),
            chats: Vec::new(),
            chat_index: 0,
            topics: Vec::new(),
            topic_index: 0,
            selected_chat: None,
            selected_topic: None,
            progress: ProgressState::default(),
            summary: None,
            notice: None,
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.view = View::Exit;
        self.should_quit = true;
    }

    pub fn mode(&self) -> FetchMode {
        match self.window {
            Some(w) => FetchMode::DateRange {
                since: w.since,
                until: w.until,
            },
            None => FetchMode::Unread,
        }
    }

    pub fn show_notice(&mut self, title: &str, body: String, next: NoticeNext) {
        let footer = match next {
            NoticeNext::Exit => "Press Enter to exit.",
            NoticeNext::ChatList => "Press Enter to return.",
        };
        self.notice = Some(Notice {
            title: title.to_string(),
            body,
            footer: footer.to_string(),
            next,
        });
        self.view = View::Notice;
    }

    /// Dismiss the active notice and return where to go next.
    pub fn dismiss_notice(&mut self) -> Option<NoticeNext> {
        let next = self.notice.take().map(|n| n.next);
        match next {
            Some(NoticeNext::Exit) => self.quit(),
            Some(NoticeNext::ChatList) => self.reload_chats(),
            None => {}
        }
        next
    }

    pub fn reload_chats(&mut self) {
        self.loading_label = "Fetching chats...".to_string();
        self.selected_chat = None;
        self.selected_topic = None;
        self.summary = None;
        self.view = View::LoadingChats;
    }

    pub fn chats_loaded(&mut self, mut chats: Vec<Chat>) {
        if chats.is_empty() {
            self.show_notice("", "No chats found.".to_string(), NoticeNext::Exit);
            return;
        }
        // Chats with a backlog first; stable, so ties keep service order.
        chats.sort_by(|a, b| b.unread_count.cmp(&a.unread_count));
        self.chat_index = self.chat_index.min(chats.len() - 1);
        self.chats = chats;
        self.view = View::ChatList;
    }

    pub fn topics_loaded(&mut self, topics: Vec<Topic>) {
        if topics.is_empty() {
            self.show_notice(
                "",
                "No topics found in forum.".to_string(),
                NoticeNext::ChatList,
            );
            return;
        }
        self.topics = topics;
        self.topic_index = 0;
        self.view = View::TopicList;
    }

    /// The chat the cursor is on, not yet confirmed.
    pub fn highlighted_chat(&self) -> Option<&Chat> {
        self.chats.get(self.chat_index)
    }

    /// The topic the cursor is on, not yet confirmed.
    pub fn highlighted_topic(&self) -> Option<&Topic> {
        self.topics.get(self.topic_index)
    }

    pub fn list_up(&mut self) {
        match self.view {
            View::ChatList => self.chat_index = self.chat_index.saturating_sub(1),
            View::TopicList => self.topic_index = self.topic_index.saturating_sub(1),
            _ => {}
        }
    }

    pub fn list_down(&mut self) {
        match self.view {
            View::ChatList if !self.chats.is_empty() => {
                self.chat_index = (self.chat_index + 1).min(self.chats.len() - 1);
            }
            View::TopicList if !self.topics.is_empty() => {
                self.topic_index = (self.topic_index + 1).min(self.topics.len() - 1);
            }
            _ => {}
        }
    }

    pub fn begin_loading_topics(&mut self, chat_title: &str) {
        self.loading_label = format!("Fetching topics for forum {chat_title}...");
        self.view = View::LoadingTopics;
    }

    pub fn begin_progress(&mut self, label: String) {
        self.progress = ProgressState {
            label,
            ..ProgressState::default()
        };
        self.view = View::Progress;
    }

    pub fn apply_progress(&mut self, update: ProgressUpdate) {
        self.progress.accepted += update.accepted;
        self.progress.scanned += update.scanned;
        self.progress.batches += update.batches;
        if update.phase.is_some() {
            self.progress.phase = update.phase;
        }
    }

    pub fn show_summary(&mut self, summary: SummaryInfo) {
        self.summary = Some(summary);
        self.view = View::Summary;
    }
}
