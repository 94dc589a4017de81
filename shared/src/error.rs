use thiserror::Error;

use crate::{BattleStatus, CommentStatus, Side};

/// A business rule refused the request. Messages are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("topic \"{0}\" is disabled")]
    TopicDisabled(String),

    #[error("cannot {action} a {status} battle")]
    ForbiddenTransition {
        action: &'static str,
        status: BattleStatus,
    },

    #[error("comment is already {0}")]
    CommentSettled(CommentStatus),

    #[error("comment status can only move to approved or rejected")]
    InvalidCommentTarget,

    #[error("vote on this battle before commenting")]
    NotVoted,

    #[error("comment side must match your vote ({voted})")]
    SideMismatch { voted: Side },

    #[error("daily generation limit of {limit} reached")]
    QuotaExhausted { limit: u32 },
}
