//! Admin actions on battles and comments.
//!
//! Battle permissions by status:
//!
//! | action        | pending      | approved            | rejected     |
//! |---------------|--------------|---------------------|--------------|
//! | edit content  | yes          | no                  | no           |
//! | edit expiry   | yes          | yes                 | no           |
//! | toggle shelf  | → approved   | → pending           | no           |
//! | toggle pin    | no           | yes                 | no           |
//! | end now       | no           | yes, while active   | no           |
//! | trash         | yes          | yes                 | no           |
//! | restore       | no           | no                  | → pending    |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation;
use crate::{Battle, BattleStatus, BattleUpdate, CommentStatus, RuleError, Topic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BattleAction {
    EditContent {
        #[serde(default)]
        topic: Option<String>,
        soup_content: String,
        anti_content: String,
    },
    EditExpiry {
        expires_at: DateTime<Utc>,
    },
    ToggleShelf,
    TogglePin,
    EndNow,
    Trash,
    Restore,
}

impl BattleAction {
    pub fn name(&self) -> &'static str {
        match self {
            BattleAction::EditContent { .. } => "edit content of",
            BattleAction::EditExpiry { .. } => "edit expiry of",
            BattleAction::ToggleShelf => "shelve",
            BattleAction::TogglePin => "pin",
            BattleAction::EndNow => "end",
            BattleAction::Trash => "trash",
            BattleAction::Restore => "restore",
        }
    }
}

/// Whether `action` is offered for `battle` at `now`.
pub fn permitted(battle: &Battle, action: &BattleAction, now: DateTime<Utc>) -> bool {
    use BattleStatus::*;

    match (action, battle.status) {
        (BattleAction::EditContent { .. }, Pending) => true,
        (BattleAction::EditExpiry { .. }, Pending | Approved) => true,
        (BattleAction::ToggleShelf, Pending | Approved) => true,
        (BattleAction::TogglePin, Approved) => true,
        (BattleAction::EndNow, Approved) => battle.expires_at > now,
        (BattleAction::Trash, Pending | Approved) => true,
        (BattleAction::Restore, Rejected) => true,
        _ => false,
    }
}

/// Resolves `action` against `battle` into the patch to persist.
///
/// `known_topics` is consulted when an edit renames the topic; a disabled
/// topic cannot be assigned.
pub fn plan(
    battle: &Battle,
    action: &BattleAction,
    known_topics: &[Topic],
    now: DateTime<Utc>,
) -> Result<BattleUpdate, RuleError> {
    if !permitted(battle, action, now) {
        return Err(RuleError::ForbiddenTransition {
            action: action.name(),
            status: battle.status,
        });
    }

    let update = match action {
        BattleAction::EditContent {
            topic,
            soup_content,
            anti_content,
        } => {
            validation::battle_content(soup_content, anti_content)?;
            let topic = topic
                .as_deref()
                .map(|t| validation::submission_topic(known_topics, t))
                .transpose()?;
            BattleUpdate {
                topic,
                soup_content: Some(soup_content.clone()),
                anti_content: Some(anti_content.clone()),
                ..Default::default()
            }
        }
        BattleAction::EditExpiry { expires_at } => BattleUpdate {
            expires_at: Some(*expires_at),
            ..Default::default()
        },
        BattleAction::ToggleShelf => BattleUpdate {
            status: Some(match battle.status {
                BattleStatus::Approved => BattleStatus::Pending,
                _ => BattleStatus::Approved,
            }),
            ..Default::default()
        },
        BattleAction::TogglePin => BattleUpdate {
            is_pinned: Some(!battle.is_pinned),
            ..Default::default()
        },
        BattleAction::EndNow => BattleUpdate {
            expires_at: Some(now),
            ..Default::default()
        },
        BattleAction::Trash => BattleUpdate {
            status: Some(BattleStatus::Rejected),
            ..Default::default()
        },
        // Trash is soft: a restored battle re-enters review.
        BattleAction::Restore => BattleUpdate {
            status: Some(BattleStatus::Pending),
            ..Default::default()
        },
    };
    Ok(update)
}

/// Comments leave `pending` exactly once.
pub fn review_comment(
    current: CommentStatus,
    target: CommentStatus,
) -> Result<CommentStatus, RuleError> {
    if current != CommentStatus::Pending {
        return Err(RuleError::CommentSettled(current));
    }
    match target {
        CommentStatus::Approved | CommentStatus::Rejected => Ok(target),
        CommentStatus::Pending => Err(RuleError::InvalidCommentTarget),
    }
}
