//! chatsum - export chat history summaries from a local message archive.
//!
//! Without flags this opens a TUI for picking a chat (and forum topic),
//! then fetches either the unread backlog or a date window and writes it
//! under `exports/`. With `--chat-id` it runs the same flow without a
//! terminal UI.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod app;
mod archive;
mod event;
mod runner;
mod ui;

use archive::ArchiveService;
use chatsum_core::config::Config;
use chatsum_core::{Chat, ChatService, Topic};
use chatsum_export::{DateWindow, Exporter, TemplateRegistry};
use chatsum_fetch::{build_fetch_plan, start_fetch, FetchEvent, FetchHandle, FetchOptions};

use app::{App, NoticeNext, SummaryInfo, View};
use event::{key_to_action, Event, EventHandler, KeyAction};

/// Export chat history summaries
#[derive(Parser)]
#[command(name = "chatsum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Start date (YYYY-MM-DD); enables date-range mode
    #[arg(long)]
    since: Option<String>,

    /// End date (YYYY-MM-DD), inclusive; defaults to now
    #[arg(long)]
    until: Option<String>,

    /// Export format: text, xml, or xml-compact
    #[arg(long)]
    format: Option<String>,

    /// Chat to export, raw id or -100-prefixed; skips the TUI
    #[arg(long)]
    chat_id: Option<i64>,

    /// Forum topic id (with --chat-id)
    #[arg(long, default_value_t = 0)]
    topic_id: i32,

    /// Forum topic title, exact or substring (with --chat-id)
    #[arg(long, default_value = "")]
    topic: String,

    /// Run without the TUI; requires --chat-id
    #[arg(long)]
    non_interactive: bool,

    /// Archive file or directory (overrides the config)
    #[arg(long)]
    archive: Option<PathBuf>,
}

fn parse_window(since: Option<&str>, until: Option<&str>) -> Result<Option<DateWindow>> {
    let Some(since) = since else {
        return Ok(None);
    };
    let since_day = NaiveDate::parse_from_str(since, "%Y-%m-%d")
        .with_context(|| format!("invalid --since date {since:?}, expected YYYY-MM-DD"))?;
    let since = since_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists")
        .and_utc();

    let until = match until {
        Some(until) => {
            let day = NaiveDate::parse_from_str(until, "%Y-%m-%d")
                .with_context(|| format!("invalid --until date {until:?}, expected YYYY-MM-DD"))?;
            // inclusive: the whole end day belongs to the window
            day.and_hms_opt(23, 59, 59)
                .expect("end of day exists")
                .and_utc()
        }
        None => Utc::now(),
    };
    if until < since {
        bail!("--until is before --since");
    }
    Ok(Some(DateWindow { since, until }))
}

fn init_logging(config: &Config) {
    let log_dir = Config::data_dir().unwrap_or_else(|_| std::env::temp_dir());
    let _ = std::fs::create_dir_all(&log_dir);
    let Ok(file) = std::fs::File::create(log_dir.join("chatsum.log")) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Results of the background service calls the TUI kicks off.
enum Loaded {
    Chats(Result<Vec<Chat>, chatsum_core::ServiceError>),
    Topics(Result<Vec<Topic>, chatsum_core::ServiceError>),
    MarkedRead(Result<(), chatsum_core::ServiceError>),
}

fn spawn_load_chats(service: Arc<dyn ChatService>, tx: mpsc::UnboundedSender<Loaded>) {
    tokio::spawn(async move {
        let _ = tx.send(Loaded::Chats(service.dialogs().await));
    });
}

fn spawn_load_topics(
    service: Arc<dyn ChatService>,
    chat_id: i64,
    tx: mpsc::UnboundedSender<Loaded>,
) {
    tokio::spawn(async move {
        let _ = tx.send(Loaded::Topics(service.forum_topics(chat_id).await));
    });
}

/// Mark a whole chat as read from the chat list. Forums need every topic
/// with a backlog marked individually.
fn spawn_mark_chat_read(
    service: Arc<dyn ChatService>,
    chat: Chat,
    tx: mpsc::UnboundedSender<Loaded>,
) {
    tokio::spawn(async move {
        let result = mark_whole_chat_read(service.as_ref(), &chat).await;
        let _ = tx.send(Loaded::MarkedRead(result));
    });
}

async fn mark_whole_chat_read(
    service: &dyn ChatService,
    chat: &Chat,
) -> Result<(), chatsum_core::ServiceError> {
    if chat.is_forum {
        let topics = service.forum_topics(chat.id).await?;
        for topic in topics {
            if topic.unread_count == 0 {
                continue;
            }
            if topic.top_message_id == 0 {
                return Err(chatsum_core::ServiceError::MarkReadFailed(format!(
                    "topic {:?} (id={}) has no top message id",
                    topic.title, topic.id
                )));
            }
            service
                .mark_topic_read(chat.id, topic.id, topic.top_message_id)
                .await?;
        }
        return Ok(());
    }
    if chat.top_message_id == 0 {
        return Err(chatsum_core::ServiceError::MarkReadFailed(
            "no top message id found".to_string(),
        ));
    }
    service.mark_read(chat.id, chat.top_message_id).await
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    service: Arc<dyn ChatService>,
    exporter: &Exporter,
    format: &str,
    fetch_options: &FetchOptions,
) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));
    let (task_tx, mut task_rx) = mpsc::unbounded_channel();
    let mut fetch: Option<FetchHandle> = None;

    spawn_load_chats(service.clone(), task_tx.clone());

    loop {
        if app.should_quit {
            break;
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            biased;

            event = events.next() => {
                let Some(event) = event else { break };
                handle_terminal_event(
                    &mut app,
                    &mut fetch,
                    event,
                    &service,
                    fetch_options,
                    &task_tx,
                );
            }

            Some(loaded) = task_rx.recv() => {
                handle_loaded(&mut app, loaded);
            }

            fetch_event = next_fetch_event(&mut fetch), if fetch.is_some() => {
                match fetch_event {
                    FetchEvent::Progress(update) => app.apply_progress(update),
                    FetchEvent::Done(result) => {
                        fetch = None;
                        finish_fetch(&mut app, result, &service, exporter, format).await;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn next_fetch_event(fetch: &mut Option<FetchHandle>) -> FetchEvent {
    fetch
        .as_mut()
        .expect("guarded by fetch.is_some()")
        .next_event()
        .await
}

fn handle_terminal_event(
    app: &mut App,
    fetch: &mut Option<FetchHandle>,
    event: Event,
    service: &Arc<dyn ChatService>,
    fetch_options: &FetchOptions,
    task_tx: &mpsc::UnboundedSender<Loaded>,
) {
    let Event::Key(key) = event else { return };
    match key_to_action(key) {
        KeyAction::Quit => {
            *fetch = None;
            app.quit();
        }
        KeyAction::Up => app.list_up(),
        KeyAction::Down => app.list_down(),
        KeyAction::Select => match app.view {
            View::ChatList => {
                let Some(chat) = app.highlighted_chat().cloned() else {
                    return;
                };
                app.selected_chat = Some(chat.clone());
                app.selected_topic = None;
                if chat.is_forum {
                    app.begin_loading_topics(&chat.title);
                    spawn_load_topics(service.clone(), chat.id, task_tx.clone());
                } else {
                    begin_fetch(app, fetch, service, fetch_options);
                }
            }
            View::TopicList => {
                let Some(topic) = app.highlighted_topic().cloned() else {
                    return;
                };
                app.selected_topic = Some(topic);
                begin_fetch(app, fetch, service, fetch_options);
            }
            View::Summary => {
                app.reload_chats();
                spawn_load_chats(service.clone(), task_tx.clone());
            }
            View::Notice => {
                if app.dismiss_notice() == Some(NoticeNext::ChatList) {
                    spawn_load_chats(service.clone(), task_tx.clone());
                }
            }
            _ => {}
        },
        KeyAction::Back => match app.view {
            View::TopicList => {
                app.selected_topic = None;
                app.view = View::ChatList;
            }
            View::Progress => {
                // Cancel the running fetch and go back to the list.
                *fetch = None;
                app.view = View::ChatList;
            }
            View::ChatList => app.quit(),
            _ => {}
        },
        KeyAction::MarkRead => {
            if app.view == View::ChatList {
                if let Some(chat) = app.highlighted_chat().cloned() {
                    spawn_mark_chat_read(service.clone(), chat, task_tx.clone());
                }
            }
        }
        KeyAction::None => {}
    }
}

fn handle_loaded(app: &mut App, loaded: Loaded) {
    match loaded {
        Loaded::Chats(Ok(chats)) => app.chats_loaded(chats),
        Loaded::Chats(Err(e)) => app.show_notice("Error", e.to_string(), NoticeNext::Exit),
        Loaded::Topics(Ok(topics)) => app.topics_loaded(topics),
        Loaded::Topics(Err(e)) => app.show_notice("Error", e.to_string(), NoticeNext::Exit),
        Loaded::MarkedRead(Ok(())) => {
            app.show_notice(
                "",
                "Chat marked as read.".to_string(),
                NoticeNext::ChatList,
            );
        }
        Loaded::MarkedRead(Err(e)) => {
            warn!(error = %e, "mark as read failed");
            app.show_notice(
                "",
                format!("Warning: failed to mark as read: {e}"),
                NoticeNext::ChatList,
            );
        }
    }
}

fn begin_fetch(
    app: &mut App,
    fetch: &mut Option<FetchHandle>,
    service: &Arc<dyn ChatService>,
    fetch_options: &FetchOptions,
) {
    let Some(chat) = app.selected_chat.clone() else {
        return;
    };
    match build_fetch_plan(
        service.as_ref(),
        &chat,
        app.selected_topic.as_ref(),
        app.mode(),
        fetch_options.clone(),
    ) {
        Ok(plan) => {
            app.begin_progress(plan.progress_label.clone());
            *fetch = Some(start_fetch(plan));
        }
        Err(e) => app.show_notice("Error", e.to_string(), NoticeNext::Exit),
    }
}

async fn finish_fetch(
    app: &mut App,
    result: Result<Vec<chatsum_core::Message>, chatsum_fetch::FetchError>,
    service: &Arc<dyn ChatService>,
    exporter: &Exporter,
    format: &str,
) {
    let mut messages = match result {
        Ok(messages) => messages,
        Err(chatsum_fetch::FetchError::Cancelled) => {
            app.view = View::ChatList;
            return;
        }
        Err(e) => {
            app.show_notice("Error", e.to_string(), NoticeNext::Exit);
            return;
        }
    };
    if messages.is_empty() {
        app.show_notice(
            "",
            "No text messages found to export.".to_string(),
            NoticeNext::ChatList,
        );
        return;
    }
    messages.reverse();

    let Some(chat) = app.selected_chat.clone() else {
        return;
    };
    let export_title = match &app.selected_topic {
        Some(topic) => format!("{} - {}", chat.title, topic.title),
        None => chat.title.clone(),
    };

    let path = match exporter.export(&export_title, &messages, format, app.window) {
        Ok(path) => path,
        Err(e) => {
            app.show_notice("Error", e.to_string(), NoticeNext::Exit);
            return;
        }
    };

    let status = runner::mark_after_export(
        service.as_ref(),
        &chat,
        app.selected_topic.as_ref(),
        &messages,
        app.window.is_some(),
    )
    .await;

    app.show_summary(SummaryInfo {
        title: export_title,
        path,
        count: messages.len(),
        mark_status: status.display_line(),
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_default();
    init_logging(&config);
    info!("chatsum starting, version {}", env!("CARGO_PKG_VERSION"));

    let window = parse_window(cli.since.as_deref(), cli.until.as_deref())?;
    let format = cli
        .format
        .clone()
        .unwrap_or_else(|| config.export.format.clone());
    let fetch_options = FetchOptions {
        page_size: config.fetch.page_size,
        page_delay: Duration::from_millis(config.fetch.rate_limit_ms),
        ..FetchOptions::default()
    };

    let archive_path = cli
        .archive
        .clone()
        .or_else(|| config.archive.path.clone())
        .context("no archive configured; pass --archive <path> or set archive.path in config")?;
    let service: Arc<dyn ChatService> = Arc::new(ArchiveService::open(&archive_path)?);
    let exporter =
        Exporter::new(TemplateRegistry::with_defaults().context("registering export templates")?)
            .with_export_dir(&config.export.dir);

    let non_interactive = cli.non_interactive || cli.chat_id.is_some();
    if non_interactive {
        let Some(chat_id) = cli.chat_id else {
            bail!("--non-interactive requires --chat-id");
        };
        return runner::run(
            service,
            &exporter,
            runner::RunOptions {
                chat_id,
                topic_id: cli.topic_id,
                topic_title: cli.topic,
                window,
                format,
                fetch: fetch_options,
            },
        )
        .await;
    }

    let app = App::new(window);
    let mut terminal = setup_terminal()?;
    let result = run_app(
        &mut terminal,
        app,
        service,
        &exporter,
        &format,
        &fetch_options,
    )
    .await;
    restore_terminal(&mut terminal)?;

    if let Err(e) = result {
        eprintln!("Application error: {e}");
        return Err(e);
    }
    info!("chatsum exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn window_requires_since() {
        assert!(parse_window(None, Some("2025-01-31")).unwrap().is_none());
    }

    #[test]
    fn until_covers_the_whole_end_day() {
        let window = parse_window(Some("2025-01-01"), Some("2025-01-31"))
            .unwrap()
            .unwrap();
        assert_eq!(
            window.since,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window.until,
            Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn until_defaults_to_now() {
        let window = parse_window(Some("2020-06-01"), None).unwrap().unwrap();
        assert_eq!(window.since.year(), 2020);
        assert!(window.until > window.since);
    }

    #[test]
    fn rejects_malformed_and_inverted_dates() {
        assert!(parse_window(Some("01-02-2025"), None).is_err());
        assert!(parse_window(Some("2025-02-01"), Some("2025-01-01")).is_err());
    }
}
