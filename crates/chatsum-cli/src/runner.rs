//! Batch (non-interactive) export and the shared post-fetch steps.

use std::sync::Arc;

use anyhow::bail;
use chatsum_core::topic::resolve_topic;
use chatsum_core::{normalize_chat_id, Chat, ChatService, Message, Topic};
use chatsum_export::{DateWindow, Exporter};
use chatsum_fetch::{build_fetch_plan, start_fetch, FetchEvent, FetchMode, FetchOptions};
use tracing::warn;

pub struct RunOptions {
    /// Chat id as typed, raw or in the -100-prefixed form.
    pub chat_id: i64,
    pub topic_id: i32,
    pub topic_title: String,
    pub window: Option<DateWindow>,
    pub format: String,
    pub fetch: FetchOptions,
}

/// Outcome of the mark-as-read step after an export.
pub enum MarkStatus {
    /// Date-range exports and empty results leave watermarks alone.
    Skipped,
    Marked,
    Failed(String),
}

impl MarkStatus {
    /// Human-readable line for the summary screen, empty when skipped.
    pub fn display_line(&self) -> String {
        match self {
            MarkStatus::Skipped => String::new(),
            MarkStatus::Marked => "Messages marked as read.".to_string(),
            MarkStatus::Failed(e) => {
                format!("Warning: failed to mark messages as read: {e}")
            }
        }
    }
}

/// Advance the read watermark past everything just exported.
///
/// Failures are reported, never fatal: the export already succeeded.
pub async fn mark_after_export(
    service: &dyn ChatService,
    chat: &Chat,
    topic: Option<&Topic>,
    messages: &[Message],
    date_range: bool,
) -> MarkStatus {
    let max_id = messages.iter().map(|m| m.id).max().unwrap_or(0);
    if max_id <= 0 || date_range {
        return MarkStatus::Skipped;
    }

    let result = match topic {
        Some(topic) => service.mark_topic_read(chat.id, topic.id, max_id).await,
        None => service.mark_read(chat.id, max_id).await,
    };
    match result {
        Ok(()) => MarkStatus::Marked,
        Err(e) => {
            warn!(chat = chat.id, error = %e, "mark as read failed");
            MarkStatus::Failed(e.to_string())
        }
    }
}

/// Run one export without the TUI: select by id/flags, fetch, write, mark.
pub async fn run(
    service: Arc<dyn ChatService>,
    exporter: &Exporter,
    opts: RunOptions,
) -> anyhow::Result<()> {
    println!("Fetching chats (this might take a moment)...");
    let chats = service.dialogs().await?;
    if chats.is_empty() {
        println!("No chats found.");
        return Ok(());
    }

    let wanted = normalize_chat_id(opts.chat_id);
    let Some(chat) = chats.into_iter().find(|c| c.id == wanted) else {
        bail!(
            "chat with id {} not found; accepts raw ID or -100... format",
            opts.chat_id
        );
    };

    let mut topic = None;
    if chat.is_forum {
        if opts.topic_id == 0 && opts.topic_title.trim().is_empty() {
            bail!("forum chat requires --topic-id or --topic");
        }
        println!("Fetching topics for forum {}...", chat.title);
        let topics = service.forum_topics(chat.id).await?;
        topic = Some(resolve_topic(&topics, opts.topic_id, &opts.topic_title)?.clone());
    }

    let mode = match opts.window {
        Some(w) => FetchMode::DateRange {
            since: w.since,
            until: w.until,
        },
        None => FetchMode::Unread,
    };
    let plan = build_fetch_plan(
        service.as_ref(),
        &chat,
        topic.as_ref(),
        mode,
        opts.fetch.clone(),
    )?;
    let export_title = plan.export_title.clone();
    println!("Fetching {}...", plan.progress_label);

    let mut handle = start_fetch(plan);
    let mut messages = loop {
        match handle.next_event().await {
            FetchEvent::Progress(update) => {
                if let Some(phase) = update.phase {
                    println!("  {phase}");
                }
            }
            FetchEvent::Done(result) => break result?,
        }
    };

    if messages.is_empty() {
        println!("No text messages found to export.");
        return Ok(());
    }

    // Fetched newest first; exports read top to bottom.
    messages.reverse();

    let path = exporter.export(&export_title, &messages, &opts.format, opts.window)?;
    println!(
        "Successfully exported {} messages to {}",
        messages.len(),
        path.display()
    );

    let status = mark_after_export(
        service.as_ref(),
        &chat,
        topic.as_ref(),
        &messages,
        opts.window.is_some(),
    )
    .await;
    let line = status.display_line();
    if !line.is_empty() {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveService;
    use chatsum_export::TemplateRegistry;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn write_archive(dir: &TempDir) -> std::path::PathBuf {
        let date = |day: u32, hh: u32| Utc.with_ymd_and_hms(2025, 1, day, hh, 30, 0).unwrap();
        let json = serde_json::json!([
            {
                "id": 42,
                "title": "Rust Lounge",
                "unread_count": 2,
                "last_read_id": 1,
                "top_message_id": 3,
                "messages": [
                    { "id": 1, "date": date(1, 9), "text": "read already", "sender_id": 5 },
                    { "id": 2, "date": date(2, 9), "text": "first unread", "sender_id": 5 },
                    { "id": 3, "date": date(2, 10), "text": "second unread", "sender_id": 6 },
                ],
            },
        ]);
        let path = dir.path().join("chats.json");
        std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();
        path
    }

    fn opts(chat_id: i64) -> RunOptions {
        RunOptions {
            chat_id,
            topic_id: 0,
            topic_title: String::new(),
            window: None,
            format: "text".to_string(),
            fetch: FetchOptions::default(),
        }
    }

    #[tokio::test]
    async fn exports_unread_and_advances_watermark() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir);
        let service = Arc::new(ArchiveService::open(&archive).unwrap());
        let exporter = Exporter::new(TemplateRegistry::with_defaults().unwrap())
            .with_export_dir(dir.path().join("exports"));

        run(service, &exporter, opts(42)).await.unwrap();

        let exports: Vec<_> = std::fs::read_dir(dir.path().join("exports"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(exports.len(), 1);
        let content = std::fs::read_to_string(&exports[0]).unwrap();
        assert!(content.contains("Chat Summary: Rust Lounge"));
        assert!(content.contains("Total Messages: 2"));
        // oldest first in the file
        let first = content.find("first unread").unwrap();
        let second = content.find("second unread").unwrap();
        assert!(first < second);

        let reopened = ArchiveService::open(&archive).unwrap();
        let chats = reopened.dialogs().await.unwrap();
        assert_eq!(chats[0].last_read_id, 3);
    }

    #[tokio::test]
    async fn date_range_leaves_watermark_alone() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir);
        let service = Arc::new(ArchiveService::open(&archive).unwrap());
        let exporter = Exporter::new(TemplateRegistry::with_defaults().unwrap())
            .with_export_dir(dir.path().join("exports"));

        let mut options = opts(42);
        options.window = Some(DateWindow {
            since: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2025, 1, 2, 23, 59, 59).unwrap(),
        });
        run(service, &exporter, options).await.unwrap();

        let reopened = ArchiveService::open(&archive).unwrap();
        let chats = reopened.dialogs().await.unwrap();
        assert_eq!(chats[0].last_read_id, 1);
    }

    #[tokio::test]
    async fn unknown_chat_is_an_error() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir);
        let service = Arc::new(ArchiveService::open(&archive).unwrap());
        let exporter = Exporter::new(TemplateRegistry::with_defaults().unwrap())
            .with_export_dir(dir.path().join("exports"));

        let err = run(service, &exporter, opts(999)).await.unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[tokio::test]
    async fn prefixed_chat_id_is_accepted() {
        let dir = TempDir::new().unwrap();
        let archive = write_archive(&dir);
        let service = Arc::new(ArchiveService::open(&archive).unwrap());
        let exporter = Exporter::new(TemplateRegistry::with_defaults().unwrap())
            .with_export_dir(dir.path().join("exports"));

        run(service, &exporter, opts(-1000000000042)).await.unwrap();
    }
}
