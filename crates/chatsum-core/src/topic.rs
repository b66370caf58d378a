//! Non-interactive forum topic resolution.

use crate::types::Topic;

#[derive(Debug, thiserror::Error)]
pub enum TopicSelectError {
    #[error("forum topic id {0} not found")]
    IdNotFound(i32),

    #[error("forum chat requires a topic id or title")]
    TitleMissing,

    #[error("forum topic title {title:?} matched multiple topics: {candidates}")]
    Ambiguous { title: String, candidates: String },

    #[error("forum topic title {0:?} not found")]
    TitleNotFound(String),
}

/// Resolve a user-supplied topic selection against the forum's topic list.
///
/// A non-zero `id` wins and must match exactly. Otherwise the title is
/// matched case-insensitively in two passes: exact first, substring second,
/// so an exact name is never shadowed by a longer topic it happens to be a
/// substring of. Multiple matches in either pass are an error; identically
/// titled topics are never resolved by an arbitrary pick.
pub fn resolve_topic<'a>(
    topics: &'a [Topic],
    id: i32,
    title: &str,
) -> Result<&'a Topic, TopicSelectError> {
    if id != 0 {
        return topics
            .iter()
            .find(|t| t.id == id)
            .ok_or(TopicSelectError::IdNotFound(id));
    }

    let title = title.trim();
    if title.is_empty() {
        return Err(TopicSelectError::TitleMissing);
    }
    let lower = title.to_lowercase();

    let exact: Vec<&Topic> = topics
        .iter()
        .filter(|t| t.title.to_lowercase() == lower)
        .collect();
    match exact.len() {
        1 => return Ok(exact[0]),
        n if n > 1 => {
            return Err(TopicSelectError::Ambiguous {
                title: title.to_string(),
                candidates: format_candidates(&exact),
            });
        }
        _ => {}
    }

    let contains: Vec<&Topic> = topics
        .iter()
        .filter(|t| t.title.to_lowercase().contains(&lower))
        .collect();
    match contains.len() {
        1 => Ok(contains[0]),
        0 => Err(TopicSelectError::TitleNotFound(title.to_string())),
        _ => Err(TopicSelectError::Ambiguous {
            title: title.to_string(),
            candidates: format_candidates(&contains),
        }),
    }
}

fn format_candidates(topics: &[&Topic]) -> String {
    topics
        .iter()
        .map(|t| format!("id={} title={:?}", t.id, t.title))
        .collect::<Vec<_>>()
        .join(", ")
}
