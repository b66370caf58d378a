//! Line normalization and sender-run grouping for the text template.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::template::TemplateMessage;
use crate::ExportError;

/// A run of consecutive messages from one sender, flattened to lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    pub sender_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub lines: Vec<String>,
}

/// Split text into trimmed, non-empty lines. CRLF and bare CR both count
/// as line breaks. Whitespace-only text yields no lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merge consecutive messages from the same sender into blocks. Messages
/// whose text normalizes to nothing produce no block and never split one.
pub fn build_blocks(messages: &[TemplateMessage]) -> Vec<MessageBlock> {
    let mut blocks: Vec<MessageBlock> = Vec::new();
    for msg in messages {
        let lines = normalize_lines(&msg.text);
        if lines.is_empty() {
            continue;
        }
        match blocks.last_mut() {
            Some(last) if last.sender_id == msg.sender_id => {
                last.end = msg.date;
                last.lines.extend(lines);
            }
            _ => blocks.push(MessageBlock {
                sender_id: msg.sender_id,
                start: msg.date,
                end: msg.date,
                lines,
            }),
        }
    }
    blocks
}

fn sender_label(id: i64) -> String {
    if id <= 0 {
        "id=unknown".to_string()
    } else {
        format!("id={id}")
    }
}

/// Write blocks as `[HH:MM-HH:MM] id=N:` headers with indented lines.
/// A block that starts and ends in the same minute shows a single time.
pub fn write_blocks(out: &mut dyn Write, blocks: &[MessageBlock]) -> Result<(), ExportError> {
    for block in blocks {
        let start = block.start.format("%H:%M").to_string();
        let end = block.end.format("%H:%M").to_string();
        let time_label = if start == end {
            start
        } else {
            format!("{start}-{end}")
        };
        writeln!(out, "[{time_label}] {}:", sender_label(block.sender_id))?;
        for line in &block.lines {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: i32, sender_id: i64, hh: u32, mm: u32, text: &str) -> TemplateMessage {
        TemplateMessage {
            id,
            date: Utc.with_ymd_and_hms(2025, 1, 2, hh, mm, 5).unwrap(),
            text: text.to_string(),
            sender_id,
            sender_name: None,
            reply_to: None,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn normalize_handles_mixed_line_endings() {
        assert_eq!(
            normalize_lines("  a\r\n\r\nb \rc  "),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(normalize_lines("   \r\n \n").is_empty());
    }

    #[test]
    fn consecutive_same_sender_merges() {
        let blocks = build_blocks(&[
            msg(10, 7, 3, 4, "hello"),
            msg(11, 7, 3, 5, "world"),
            msg(12, 8, 3, 6, "other"),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec!["hello", "world"]);
        assert_eq!(blocks[0].start.format("%H:%M").to_string(), "03:04");
        assert_eq!(blocks[0].end.format("%H:%M").to_string(), "03:05");
        assert_eq!(blocks[1].sender_id, 8);
    }

    #[test]
    fn empty_text_does_not_split_a_run() {
        let blocks = build_blocks(&[
            msg(1, 7, 3, 4, "a"),
            msg(2, 9, 3, 5, "   "),
            msg(3, 7, 3, 6, "b"),
        ]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec!["a", "b"]);
    }

    #[test]
    fn renders_time_range_and_indent() {
        let blocks = build_blocks(&[msg(10, 7, 3, 4, "hello"), msg(11, 7, 3, 5, "world")]);
        let mut out = Vec::new();
        write_blocks(&mut out, &blocks).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[03:04-03:05] id=7:\n  hello\n  world\n"
        );
    }

    #[test]
    fn single_minute_block_shows_one_time() {
        let blocks = build_blocks(&[msg(10, 7, 3, 4, "hi")]);
        let mut out = Vec::new();
        write_blocks(&mut out, &blocks).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[03:04] id=7:\n  hi\n");
    }

    #[test]
    fn nonpositive_sender_is_unknown() {
        let blocks = build_blocks(&[msg(10, 0, 3, 4, "anon")]);
        let mut out = Vec::new();
        write_blocks(&mut out, &blocks).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[03:04] id=unknown:\n  anon\n");
    }
}
