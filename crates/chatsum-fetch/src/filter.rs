//! Per-message accept/skip/stop strategies, one per fetch mode.

use chrono::{DateTime, Utc};

use chatsum_core::Message;

/// Decision for one scanned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Keep the message.
    Accept,
    /// Drop the message but keep scanning.
    Skip,
    /// The window is exhausted; terminate the fetch at this message.
    Stop,
}

/// Filter strategy carrying its own bound state, chosen once per fetch plan.
///
/// Messages arrive newest first, so both variants treat "went past the lower
/// bound" as the stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFilter {
    /// Everything newer than the read watermark.
    Unread { last_read_id: i32 },
    /// Everything inside a closed date window.
    DateRange {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

impl MessageFilter {
    pub fn decide(&self, msg: &Message) -> FilterDecision {
        match self {
            MessageFilter::Unread { last_read_id } => {
                if msg.id <= *last_read_id {
                    FilterDecision::Stop
                } else if !msg.is_eligible() {
                    FilterDecision::Skip
                } else {
                    FilterDecision::Accept
                }
            }
            MessageFilter::DateRange { since, until } => {
                if msg.date < *since {
                    FilterDecision::Stop
                } else if msg.date > *until || !msg.is_eligible() {
                    FilterDecision::Skip
                } else {
                    FilterDecision::Accept
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: i32, date: DateTime<Utc>, text: &str, outgoing: bool) -> Message {
        Message {
            id,
            date,
            text: text.to_string(),
            sender_id: 1,
            sender_name: None,
            outgoing,
            reply_to: None,
            reactions: Vec::new(),
        }
    }

    #[test]
    fn unread_stops_at_watermark() {
        let filter = MessageFilter::Unread { last_read_id: 100 };
        let date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            filter.decide(&msg(101, date, "new", false)),
            FilterDecision::Accept
        );
        assert_eq!(
            filter.decide(&msg(100, date, "read", false)),
            FilterDecision::Stop
        );
        assert_eq!(
            filter.decide(&msg(99, date, "older", false)),
            FilterDecision::Stop
        );
    }

    #[test]
    fn unread_skips_ineligible() {
        let filter = MessageFilter::Unread { last_read_id: 0 };
        let date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            filter.decide(&msg(5, date, "", false)),
            FilterDecision::Skip
        );
        assert_eq!(
            filter.decide(&msg(5, date, "mine", true)),
            FilterDecision::Skip
        );
    }

    #[test]
    fn date_range_bounds() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let filter = MessageFilter::DateRange { since, until };

        let inside = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            filter.decide(&msg(1, inside, "in window", false)),
            FilterDecision::Accept
        );

        // too new: arrived after the window closed, keep scanning backward
        let too_new = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            filter.decide(&msg(2, too_new, "later", false)),
            FilterDecision::Skip
        );

        // too old: we have paged past the window
        let too_old = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            filter.decide(&msg(3, too_old, "earlier", false)),
            FilterDecision::Stop
        );
    }
}
