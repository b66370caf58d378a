//! Rendering for each TUI view.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use chatsum_core::{Chat, Topic};

use crate::app::{App, View};

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    match app.view {
        View::LoadingChats | View::LoadingTopics => render_loading(frame, area, app),
        View::ChatList => render_chat_list(frame, area, app),
        View::TopicList => render_topic_list(frame, area, app),
        View::Progress => render_progress(frame, area, app),
        View::Summary => render_summary(frame, area, app),
        View::Notice => render_notice(frame, area, app),
        View::Exit => {}
    }
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

fn render_loading(frame: &mut Frame, area: Rect, app: &App) {
    let body = Paragraph::new(app.loading_label.as_str())
        .block(titled_block("chatsum"))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn chat_item(chat: &Chat) -> ListItem<'_> {
    let mut spans = vec![Span::raw(chat.title.as_str())];
    if chat.is_forum {
        spans.push(Span::styled(
            " [forum]",
            Style::default().fg(Color::Magenta),
        ));
    }
    if chat.unread_count > 0 {
        spans.push(Span::styled(
            format!(" ({} unread)", chat.unread_count),
            Style::default().fg(Color::Yellow),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn topic_item(topic: &Topic) -> ListItem<'_> {
    let mut spans = vec![Span::raw(topic.title.as_str())];
    if topic.unread_count > 0 {
        spans.push(Span::styled(
            format!(" ({} unread)", topic.unread_count),
            Style::default().fg(Color::Yellow),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem<'_>>,
    index: usize,
    footer: &str,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let list = List::new(items)
        .block(titled_block(title))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(index));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[1]);
}

fn render_chat_list(frame: &mut Frame, area: Rect, app: &App) {
    let title = match &app.window {
        Some(w) => format!(
            "Select a chat ({} to {})",
            w.since.format("%Y-%m-%d"),
            w.until.format("%Y-%m-%d")
        ),
        None => "Select a chat".to_string(),
    };
    render_list(
        frame,
        area,
        &title,
        app.chats.iter().map(chat_item).collect(),
        app.chat_index,
        " j/k move · Enter export · m mark read · q quit",
    );
}

fn render_topic_list(frame: &mut Frame, area: Rect, app: &App) {
    render_list(
        frame,
        area,
        "Select a topic",
        app.topics.iter().map(topic_item).collect(),
        app.topic_index,
        " j/k move · Enter export · Esc back · q quit",
    );
}

fn render_progress(frame: &mut Frame, area: Rect, app: &App) {
    let p = &app.progress;
    let mut lines = vec![
        Line::from(Span::styled(
            p.label.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];
    if let Some(phase) = &p.phase {
        lines.push(Line::from(Span::styled(
            phase.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::raw(format!(
        "Kept {} of {} scanned messages ({} batches)",
        p.accepted, p.scanned, p.batches
    )));
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Esc cancels.",
        Style::default().fg(Color::DarkGray),
    )));

    let body = Paragraph::new(lines)
        .block(titled_block("Fetching"))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn render_summary(frame: &mut Frame, area: Rect, app: &App) {
    let Some(summary) = &app.summary else {
        return;
    };
    let mut lines = vec![
        Line::from(Span::styled(
            "Export complete",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw(format!("Chat: {}", summary.title)),
        Line::raw(format!("Messages: {}", summary.count)),
        Line::raw(format!("File: {}", summary.path.display())),
    ];
    if !summary.mark_status.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::raw(summary.mark_status.clone()));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Press Enter to return to chat list.",
        Style::default().fg(Color::DarkGray),
    )));

    let body = Paragraph::new(lines)
        .block(titled_block("chatsum"))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn render_notice(frame: &mut Frame, area: Rect, app: &App) {
    let Some(notice) = &app.notice else {
        return;
    };
    let title = if notice.title.is_empty() {
        "chatsum"
    } else {
        notice.title.as_str()
    };
    let lines = vec![
        Line::raw(notice.body.clone()),
        Line::raw(""),
        Line::from(Span::styled(
            notice.footer.clone(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let style = if notice.title == "Error" {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let body = Paragraph::new(lines)
        .style(style)
        .block(titled_block(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}
