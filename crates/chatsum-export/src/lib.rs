//! Rendering fetched history to files.
//!
//! Messages arrive oldest-first, get rendered through a named template
//! (`text`, `xml`, `xml-compact`), and land under an `exports/` directory
//! with a filename derived from the chat title and export date.

pub mod block;
pub mod exporter;
pub mod template;
pub mod text;
pub mod xml;

pub use block::{build_blocks, normalize_lines, write_blocks, MessageBlock};
pub use exporter::Exporter;
pub use template::{
    DateWindow, Template, TemplateInput, TemplateMessage, TemplateReaction, TemplateRegistry,
    TemplateReply,
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("template name is empty")]
    BlankTemplateName,

    #[error("template {0:?} already registered")]
    DuplicateTemplate(String),

    #[error("unknown export format {requested:?} (available: {available})")]
    UnknownFormat { requested: String, available: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("xml rendering failed: {0}")]
    Xml(#[from] quick_xml::Error),
}
