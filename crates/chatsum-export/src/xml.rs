//! XML templates.
//!
//! `xml` is the readable form with one element per field. `xml-compact`
//! collapses everything into single-letter element and attribute names to
//! keep large exports small, at the cost of a schema you have to know.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::template::{Template, TemplateInput, TemplateMessage};
use crate::ExportError;

fn rfc3339(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Messages whose text normalizes to nothing are left out of both forms.
fn renderable(msg: &TemplateMessage) -> Option<String> {
    let lines = crate::block::normalize_lines(&msg.text);
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), ExportError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

pub struct XmlTemplate;

impl Template for XmlTemplate {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn extension(&self) -> &'static str {
        "xml"
    }

    fn render(&self, out: &mut dyn Write, input: &TemplateInput) -> Result<(), ExportError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);

        let mut chat = BytesStart::new("chat");
        chat.push_attribute(("title", input.export_title.as_str()));
        writer.write_event(Event::Start(chat))?;

        text_element(&mut writer, "export_date", &rfc3339(&input.export_date))?;
        text_element(
            &mut writer,
            "total_messages",
            &input.total_messages.to_string(),
        )?;
        if let Some(window) = &input.window {
            text_element(&mut writer, "since", &rfc3339(&window.since))?;
            text_element(&mut writer, "until", &rfc3339(&window.until))?;
        }

        for msg in &input.messages {
            let Some(text) = renderable(msg) else {
                continue;
            };
            writer.write_event(Event::Start(BytesStart::new("message")))?;

            write_sender(&mut writer, msg.sender_id, msg.sender_name.as_deref())?;
            text_element(&mut writer, "time", &rfc3339(&msg.date))?;
            text_element(&mut writer, "text", &text)?;

            if let Some(reply) = &msg.reply_to {
                let mut el = BytesStart::new("reply");
                if reply.message_id != 0 {
                    el.push_attribute(("message_id", reply.message_id.to_string().as_str()));
                }
                writer.write_event(Event::Start(el))?;
                write_sender(&mut writer, reply.sender_id, reply.sender_name.as_deref())?;
                if !reply.text.is_empty() {
                    text_element(&mut writer, "text", &reply.text)?;
                }
                writer.write_event(Event::End(BytesEnd::new("reply")))?;
            }

            if !msg.reactions.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("reactions")))?;
                for reaction in &msg.reactions {
                    let mut el = BytesStart::new("reaction");
                    el.push_attribute(("emoji", reaction.emoji.as_str()));
                    el.push_attribute(("count", reaction.count.to_string().as_str()));
                    writer.write_event(Event::Empty(el))?;
                }
                writer.write_event(Event::End(BytesEnd::new("reactions")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("message")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("chat")))?;
        Ok(())
    }
}

fn write_sender<W: Write>(
    writer: &mut Writer<W>,
    id: i64,
    name: Option<&str>,
) -> Result<(), ExportError> {
    let mut el = BytesStart::new("sender");
    el.push_attribute(("id", id.to_string().as_str()));
    match name.filter(|n| !n.is_empty()) {
        Some(name) => {
            writer.write_event(Event::Start(el))?;
            text_element(writer, "name", name)?;
            writer.write_event(Event::End(BytesEnd::new("sender")))?;
        }
        None => writer.write_event(Event::Empty(el))?,
    }
    Ok(())
}

pub struct XmlCompactTemplate;

impl Template for XmlCompactTemplate {
    fn name(&self) -> &'static str {
        "xml-compact"
    }

    fn extension(&self) -> &'static str {
        "xml"
    }

    fn render(&self, out: &mut dyn Write, input: &TemplateInput) -> Result<(), ExportError> {
        let mut writer = Writer::new(out);

        let mut root = BytesStart::new("c");
        root.push_attribute(("t", input.export_title.as_str()));
        root.push_attribute(("d", rfc3339(&input.export_date).as_str()));
        root.push_attribute(("n", input.total_messages.to_string().as_str()));
        if let Some(window) = &input.window {
            root.push_attribute(("s", rfc3339(&window.since).as_str()));
            root.push_attribute(("u", rfc3339(&window.until).as_str()));
        }
        writer.write_event(Event::Start(root))?;

        for msg in &input.messages {
            let Some(text) = renderable(msg) else {
                continue;
            };
            let mut el = BytesStart::new("m");
            el.push_attribute(("t", rfc3339(&msg.date).as_str()));
            el.push_attribute(("s", msg.sender_id.to_string().as_str()));
            if let Some(name) = msg.sender_name.as_deref().filter(|n| !n.is_empty()) {
                el.push_attribute(("n", name));
            }
            writer.write_event(Event::Start(el))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;

            if let Some(reply) = &msg.reply_to {
                let mut r = BytesStart::new("r");
                if reply.message_id != 0 {
                    r.push_attribute(("i", reply.message_id.to_string().as_str()));
                }
                r.push_attribute(("s", reply.sender_id.to_string().as_str()));
                if let Some(name) = reply.sender_name.as_deref().filter(|n| !n.is_empty()) {
                    r.push_attribute(("n", name));
                }
                if reply.text.is_empty() {
                    writer.write_event(Event::Empty(r))?;
                } else {
                    writer.write_event(Event::Start(r))?;
                    writer.write_event(Event::Text(BytesText::new(&reply.text)))?;
                    writer.write_event(Event::End(BytesEnd::new("r")))?;
                }
            }

            if !msg.reactions.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("rx")))?;
                for reaction in &msg.reactions {
                    let mut x = BytesStart::new("x");
                    x.push_attribute(("e", reaction.emoji.as_str()));
                    x.push_attribute(("c", reaction.count.to_string().as_str()));
                    writer.write_event(Event::Empty(x))?;
                }
                writer.write_event(Event::End(BytesEnd::new("rx")))?;
            }

            writer.write_event(Event::End(BytesEnd::new("m")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("c")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{DateWindow, TemplateReaction, TemplateReply};
    use chrono::TimeZone;
    use quick_xml::events::Event as ReadEvent;
    use quick_xml::Reader;

    fn sample_input() -> TemplateInput {
        let date = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        TemplateInput {
            export_title: "Rust & Friends".into(),
            export_date: date,
            total_messages: 2,
            messages: vec![
                TemplateMessage {
                    id: 10,
                    date,
                    text: "1 < 2".into(),
                    sender_id: 7,
                    sender_name: Some("alice".into()),
                    reply_to: Some(TemplateReply {
                        message_id: 5,
                        sender_id: 3,
                        sender_name: Some("bob".into()),
                        text: "original".into(),
                    }),
                    reactions: vec![TemplateReaction {
                        emoji: "👍".into(),
                        count: 2,
                    }],
                },
                TemplateMessage {
                    id: 11,
                    date,
                    text: "   ".into(),
                    sender_id: 7,
                    sender_name: None,
                    reply_to: None,
                    reactions: Vec::new(),
                },
            ],
            window: Some(DateWindow {
                since: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                until: Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
            }),
        }
    }

    fn render(template: &dyn Template) -> String {
        let mut out = Vec::new();
        template.render(&mut out, &sample_input()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn verbose_escapes_and_skips_blank_messages() {
        let xml = render(&XmlTemplate);
        assert!(xml.contains(r#"<chat title="Rust &amp; Friends">"#));
        assert!(xml.contains("<text>1 &lt; 2</text>"));
        assert!(xml.contains("<since>2025-01-01T00:00:00Z</since>"));
        assert!(xml.contains(r#"<reaction emoji="👍" count="2"/>"#));
        assert!(xml.contains(r#"<reply message_id="5">"#));
        // The whitespace-only message is dropped entirely.
        assert_eq!(xml.matches("<message>").count(), 1);
    }

    #[test]
    fn compact_uses_short_names_and_chardata() {
        let xml = render(&XmlCompactTemplate);
        assert!(xml.starts_with(r#"<c t="Rust &amp; Friends" d="2025-01-02T03:04:05Z" n="2""#));
        assert!(xml.contains(r#"s="2025-01-01T00:00:00Z""#));
        assert!(xml.contains(r#"<m t="2025-01-02T03:04:05Z" s="7" n="alice">1 &lt; 2"#));
        assert!(xml.contains(r#"<r i="5" s="3" n="bob">original</r>"#));
        assert!(xml.contains(r#"<rx><x e="👍" c="2"/></rx>"#));
        assert_eq!(xml.matches("<m ").count(), 1);
    }

    #[test]
    fn verbose_output_parses_back() {
        let xml = render(&XmlTemplate);
        let mut reader = Reader::from_str(&xml);
        let mut messages = 0;
        let mut title = None;
        loop {
            match reader.read_event().unwrap() {
                ReadEvent::Start(e) if e.name().as_ref() == b"chat" => {
                    let attr = e.try_get_attribute("title").unwrap().unwrap();
                    title = Some(attr.unescape_value().unwrap().into_owned());
                }
                ReadEvent::Start(e) if e.name().as_ref() == b"message" => messages += 1,
                ReadEvent::Eof => break,
                _ => {}
            }
        }
        assert_eq!(title.as_deref(), Some("Rust & Friends"));
        assert_eq!(messages, 1);
    }
}
