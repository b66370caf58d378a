//! File export: format lookup, filename derivation, and rendering.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use chatsum_core::Message;
use chrono::{DateTime, Utc};

use crate::template::{
    DateWindow, TemplateInput, TemplateMessage, TemplateReaction, TemplateRegistry, TemplateReply,
};
use crate::ExportError;

/// Writes rendered exports into a directory, `exports/` by default.
///
/// Filenames are `<title>_<YYYY-MM-DD>.<ext>` for watermark exports and
/// `<title>_<since>_to_<until>.<ext>` for date ranges, with filesystem
/// metacharacters in the title replaced by underscores.
pub struct Exporter {
    templates: TemplateRegistry,
    export_dir: PathBuf,
    now: fn() -> DateTime<Utc>,
}

impl Exporter {
    pub fn new(templates: TemplateRegistry) -> Self {
        Self {
            templates,
            export_dir: PathBuf::from("exports"),
            now: Utc::now,
        }
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    #[cfg(test)]
    fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Render `messages` (oldest first) with the named format and write the
    /// file, returning its path. An unknown format name is an error listing
    /// the available ones; a blank name falls back to `text`.
    pub fn export(
        &self,
        export_title: &str,
        messages: &[Message],
        format: &str,
        window: Option<DateWindow>,
    ) -> Result<PathBuf, ExportError> {
        let format = format.trim().to_ascii_lowercase();
        let format = if format.is_empty() { "text" } else { &format };
        let template = self
            .templates
            .get(format)
            .ok_or_else(|| ExportError::UnknownFormat {
                requested: format.to_string(),
                available: self.templates.names().join(", "),
            })?;

        let export_date = (self.now)();
        let suffix = match &window {
            Some(w) => format!(
                "{}_to_{}",
                w.since.format("%Y-%m-%d"),
                w.until.format("%Y-%m-%d")
            ),
            None => export_date.format("%Y-%m-%d").to_string(),
        };
        let filename = format!(
            "{}_{}.{}",
            sanitize_filename(export_title),
            suffix,
            template.extension()
        );

        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(filename);

        let input = TemplateInput {
            export_title: export_title.to_string(),
            export_date,
            total_messages: messages.len(),
            messages: messages.iter().map(template_message).collect(),
            window,
        };

        let mut out = BufWriter::new(File::create(&path)?);
        template.render(&mut out, &input)?;

        tracing::info!(path = %path.display(), count = messages.len(), "export written");
        Ok(path)
    }
}

fn template_message(msg: &Message) -> TemplateMessage {
    TemplateMessage {
        id: msg.id,
        date: msg.date,
        text: msg.text.clone(),
        sender_id: msg.sender_id,
        sender_name: msg.sender_name.clone(),
        reply_to: msg.reply_to.as_ref().map(|reply| TemplateReply {
            message_id: reply.message_id,
            sender_id: reply.sender_id,
            sender_name: reply.sender_name.clone(),
            text: reply.text.clone().unwrap_or_default(),
        }),
        reactions: msg
            .reactions
            .iter()
            .map(|r| TemplateReaction {
                emoji: r.emoji.clone(),
                count: r.count,
            })
            .collect(),
    }
}

/// Replace characters that are unsafe in filenames on any platform.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn msg(id: i32, text: &str) -> Message {
        Message {
            id,
            date: fixed_now(),
            text: text.to_string(),
            sender_id: 7,
            sender_name: None,
            outgoing: false,
            reply_to: None,
            reactions: Vec::new(),
        }
    }

    fn exporter(dir: &TempDir) -> Exporter {
        Exporter::new(TemplateRegistry::with_defaults().unwrap())
            .with_export_dir(dir.path().join("exports"))
            .with_clock(fixed_now)
    }

    #[test]
    fn writes_text_export_with_dated_filename() {
        let dir = TempDir::new().unwrap();
        let path = exporter(&dir)
            .export("My Chat", &[msg(10, "hello")], "text", None)
            .unwrap();

        assert_eq!(
            path,
            dir.path().join("exports").join("My Chat_2025-01-02.txt")
        );
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Chat Summary: My Chat\n"));
        assert!(content.contains("Export Date: Thu, 02 Jan 2025 03:04:05 UTC\n"));
        assert!(content.contains("[03:04] id=7:\n  hello\n"));
    }

    #[test]
    fn date_range_exports_use_range_suffix() {
        let dir = TempDir::new().unwrap();
        let window = DateWindow {
            since: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
        };
        let path = exporter(&dir)
            .export("My Chat", &[msg(10, "hi")], "xml", Some(window))
            .unwrap();

        assert!(path.ends_with("exports/My Chat_2025-01-01_to_2025-01-31.xml"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("<since>2025-01-01T00:00:00Z</since>"));
    }

    #[test]
    fn title_metacharacters_become_underscores() {
        let dir = TempDir::new().unwrap();
        let path = exporter(&dir)
            .export(" a/b:c? ", &[], "text", None)
            .unwrap();
        assert!(path.ends_with("exports/a_b_c__2025-01-02.txt"));
    }

    #[test]
    fn unknown_format_lists_available() {
        let dir = TempDir::new().unwrap();
        let err = exporter(&dir)
            .export("Chat", &[], "yaml", None)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("\"yaml\""));
        assert!(text.contains("text, xml, xml-compact"));
    }

    #[test]
    fn blank_format_defaults_to_text() {
        let dir = TempDir::new().unwrap();
        let path = exporter(&dir).export("Chat", &[], "  ", None).unwrap();
        assert!(path.to_string_lossy().ends_with(".txt"));
    }
}
