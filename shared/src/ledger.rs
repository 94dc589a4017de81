//! Vote tallies and the append-only reaction log.

use crate::{Battle, ReactionKind, ReactionRecord, Side, User, VoteSplit, ANONYMOUS_REACTOR};

/// Adds one vote to `side`. Counters only ever grow.
pub fn apply_vote(battle: &mut Battle, side: Side) {
    match side {
        Side::Soup => battle.soup_votes = battle.soup_votes.saturating_add(1),
        Side::Anti => battle.anti_votes = battle.anti_votes.saturating_add(1),
    }
}

pub fn apply_reaction(battle: &mut Battle, kind: ReactionKind) {
    battle.reaction_counts.bump(kind);
}

/// Percentages summing to 100; an empty battle splits evenly.
/// The anti side is rounded half-up and soup takes the remainder.
pub fn split(soup_votes: u32, anti_votes: u32) -> VoteSplit {
    let total = u64::from(soup_votes) + u64::from(anti_votes);
    if total == 0 {
        return VoteSplit {
            soup_percent: 50,
            anti_percent: 50,
        };
    }
    let anti = (u64::from(anti_votes) * 200 + total) / (2 * total);
    let anti_percent = anti as u8;
    VoteSplit {
        soup_percent: 100 - anti_percent,
        anti_percent,
    }
}

/// Who a reaction is attributed to. Every anonymous visitor shares one id.
pub fn reactor_id(user: Option<&User>) -> &str {
    user.map(|u| u.id.as_str()).unwrap_or(ANONYMOUS_REACTOR)
}

/// Latest reaction of `user_id` on `battle_id`; `records` is in append order.
pub fn current_reaction(
    records: &[ReactionRecord],
    battle_id: &str,
    user_id: &str,
) -> Option<ReactionKind> {
    records
        .iter()
        .rev()
        .find(|r| r.battle_id == battle_id && r.user_id == user_id)
        .map(|r| r.kind)
}
