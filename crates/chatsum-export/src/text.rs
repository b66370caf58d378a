//! Plain-text template: a short header followed by sender-grouped blocks.

use std::io::Write;

use crate::block::{build_blocks, write_blocks};
use crate::template::{Template, TemplateInput};
use crate::ExportError;

pub struct TextTemplate;

impl Template for TextTemplate {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, out: &mut dyn Write, input: &TemplateInput) -> Result<(), ExportError> {
        writeln!(out, "Chat Summary: {}", input.export_title)?;
        writeln!(
            out,
            "Export Date: {}",
            input.export_date.format("%a, %d %b %Y %H:%M:%S %Z")
        )?;
        writeln!(out, "Total Messages: {}\n", input.total_messages)?;

        let blocks = build_blocks(&input.messages);
        write_blocks(out, &blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateMessage;
    use chrono::{TimeZone, Utc};

    #[test]
    fn renders_header_and_blocks() {
        let date = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let input = TemplateInput {
            export_title: "My Chat".into(),
            export_date: date,
            total_messages: 2,
            messages: vec![
                TemplateMessage {
                    id: 10,
                    date,
                    text: "hello".into(),
                    sender_id: 7,
                    sender_name: None,
                    reply_to: None,
                    reactions: Vec::new(),
                },
                TemplateMessage {
                    id: 11,
                    date: Utc.with_ymd_and_hms(2025, 1, 2, 3, 5, 0).unwrap(),
                    text: "world".into(),
                    sender_id: 7,
                    sender_name: None,
                    reply_to: None,
                    reactions: Vec::new(),
                },
            ],
            window: None,
        };

        let mut out = Vec::new();
        TextTemplate.render(&mut out, &input).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Chat Summary: My Chat\n\
             Export Date: Thu, 02 Jan 2025 03:04:05 UTC\n\
             Total Messages: 2\n\
             \n\
             [03:04-03:05] id=7:\n  hello\n  world\n"
        );
    }

    #[test]
    fn empty_history_renders_header_only() {
        let input = TemplateInput {
            export_title: "Quiet".into(),
            export_date: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            total_messages: 0,
            messages: Vec::new(),
            window: None,
        };
        let mut out = Vec::new();
        TextTemplate.render(&mut out, &input).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("Total Messages: 0\n\n"));
    }
}
