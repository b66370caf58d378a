//! Template registry and the render-time view of a message.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::text::TextTemplate;
use crate::xml::{XmlCompactTemplate, XmlTemplate};
use crate::ExportError;

/// Inclusive date bounds of a date-range export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Everything a template may render.
#[derive(Debug, Clone)]
pub struct TemplateInput {
    pub export_title: String,
    pub export_date: DateTime<Utc>,
    pub total_messages: usize,
    /// Oldest first.
    pub messages: Vec<TemplateMessage>,
    /// Present only for date-range exports.
    pub window: Option<DateWindow>,
}

#[derive(Debug, Clone)]
pub struct TemplateMessage {
    pub id: i32,
    pub date: DateTime<Utc>,
    pub text: String,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub reply_to: Option<TemplateReply>,
    pub reactions: Vec<TemplateReaction>,
}

#[derive(Debug, Clone)]
pub struct TemplateReply {
    pub message_id: i32,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TemplateReaction {
    pub emoji: String,
    pub count: u32,
}

pub trait Template: Send + Sync {
    fn name(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn render(&self, out: &mut dyn Write, input: &TemplateInput) -> Result<(), ExportError>;
}

/// Named templates, looked up by the export format flag.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Box<dyn Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in set: `text`, `xml`, and `xml-compact`.
    pub fn with_defaults() -> Result<Self, ExportError> {
        let mut registry = Self::new();
        registry.register(Box::new(TextTemplate))?;
        registry.register(Box::new(XmlTemplate))?;
        registry.register(Box::new(XmlCompactTemplate))?;
        Ok(registry)
    }

    /// Register a template. Blank names and duplicates are rejected.
    pub fn register(&mut self, template: Box<dyn Template>) -> Result<(), ExportError> {
        let name = template.name().trim();
        if name.is_empty() {
            return Err(ExportError::BlankTemplateName);
        }
        if self.templates.contains_key(name) {
            return Err(ExportError::DuplicateTemplate(name.to_string()));
        }
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Template> {
        self.templates.get(name).map(Box::as_ref)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}
