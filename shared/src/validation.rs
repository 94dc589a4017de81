//! Submission checks shared by the service and the client.

use crate::topics;
use crate::{RuleError, Side, Topic, MAX_BATTLE_CONTENT, MAX_COMMENT_CONTENT};

fn bounded(field: &'static str, value: &str, max: usize) -> Result<(), RuleError> {
    if value.trim().is_empty() {
        return Err(RuleError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(RuleError::TooLong { field, max });
    }
    Ok(())
}

pub fn battle_content(soup: &str, anti: &str) -> Result<(), RuleError> {
    bounded("soup content", soup, MAX_BATTLE_CONTENT)?;
    bounded("anti content", anti, MAX_BATTLE_CONTENT)
}

/// Returns the trimmed topic name when it may be used for a new battle.
pub fn submission_topic(known: &[Topic], name: &str) -> Result<String, RuleError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RuleError::Empty { field: "topic" });
    }
    if topics::is_disabled(known, trimmed) {
        return Err(RuleError::TopicDisabled(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn comment_content(content: &str) -> Result<(), RuleError> {
    bounded("comment", content, MAX_COMMENT_CONTENT)
}

/// A comment must speak for the side the author voted for this session.
pub fn comment(content: &str, side: Side, session_vote: Option<Side>) -> Result<(), RuleError> {
    let voted = session_vote.ok_or(RuleError::NotVoted)?;
    if voted != side {
        return Err(RuleError::SideMismatch { voted });
    }
    comment_content(content)
}
