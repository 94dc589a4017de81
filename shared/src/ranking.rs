//! Display order for public listings and the admin console buckets.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, Utc};

use crate::{Battle, BattleStatus, Comment, CommentStatus};

/// Pinned first, then still-running before expired, then newest first.
pub fn display_order(a: &Battle, b: &Battle, now: DateTime<Utc>) -> Ordering {
    let key = |x: &Battle| (!x.is_pinned, x.is_expired(now), Reverse(x.created_at));
    key(a).cmp(&key(b))
}

/// Approved battles in display order. Ties keep their input order.
pub fn rank(battles: &[Battle], now: DateTime<Utc>) -> Vec<&Battle> {
    let mut listed: Vec<&Battle> = battles
        .iter()
        .filter(|b| b.status == BattleStatus::Approved)
        .collect();
    listed.sort_by(|a, b| display_order(a, b, now));
    listed
}

pub fn rank_owned(battles: Vec<Battle>, now: DateTime<Utc>) -> Vec<Battle> {
    let mut listed: Vec<Battle> = battles
        .into_iter()
        .filter(|b| b.status == BattleStatus::Approved)
        .collect();
    listed.sort_by(|a, b| display_order(a, b, now));
    listed
}

#[derive(Debug, Default)]
pub struct AdminBuckets<'a> {
    pub active: Vec<&'a Battle>,
    pub ended: Vec<&'a Battle>,
    pub pending: Vec<&'a Battle>,
    pub trash: Vec<&'a Battle>,
}

/// Splits the full collection the way the moderation console lists it.
pub fn admin_buckets(battles: &[Battle], now: DateTime<Utc>) -> AdminBuckets<'_> {
    let mut buckets = AdminBuckets::default();
    for battle in battles {
        match battle.status {
            BattleStatus::Pending => buckets.pending.push(battle),
            BattleStatus::Rejected => buckets.trash.push(battle),
            BattleStatus::Approved if battle.expires_at > now => buckets.active.push(battle),
            BattleStatus::Approved => buckets.ended.push(battle),
        }
    }
    buckets
}

/// Approved comments on one battle, newest first.
pub fn detail_comments<'a>(comments: &'a [Comment], battle_id: &str) -> Vec<&'a Comment> {
    let mut visible: Vec<&Comment> = comments
        .iter()
        .filter(|c| c.battle_id == battle_id && c.status == CommentStatus::Approved)
        .collect();
    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{seed, ReactionCounts, Side};
    use chrono::Duration;

    fn battle(id: &str, pinned: bool, expired: bool, age_hours: i64, now: DateTime<Utc>) -> Battle {
        Battle {
            id: id.into(),
            topic: "工作".into(),
            topic_id: None,
            soup_content: "soup".into(),
            soup_votes: 1,
            anti_content: "anti".into(),
            anti_votes: 1,
            reaction_counts: ReactionCounts::default(),
            author_id: "u_system".into(),
            created_at: now - Duration::hours(age_hours),
            expires_at: if expired {
                now - Duration::minutes(1)
            } else {
                now + Duration::days(1)
            },
            is_pinned: pinned,
            status: BattleStatus::Approved,
        }
    }

    fn ids(list: &[&Battle]) -> Vec<String> {
        list.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn pinned_then_active_then_newest() {
        let now = Utc::now();
        let battles = vec![
            battle("old_active", false, false, 10, now),
            battle("new_expired", false, true, 1, now),
            battle("pinned_expired", true, true, 50, now),
            battle("new_active", false, false, 2, now),
            battle("pinned_active", true, false, 60, now),
        ];
        let ranked = rank(&battles, now);
        assert_eq!(
            ids(&ranked),
            vec!["pinned_active", "pinned_expired", "new_active", "old_active", "new_expired"]
        );
    }

    #[test]
    fn ranking_invariant_holds_for_seed_data() {
        let now = Utc::now();
        let battles = seed::battles(now);
        let ranked = rank(&battles, now);
        for pair in ranked.windows(2) {
            assert_ne!(display_order(pair[0], pair[1], now), Ordering::Greater);
        }
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let now = Utc::now();
        let a = battle("a", false, false, 3, now);
        let mut b = a.clone();
        b.id = "b".into();
        let battles = vec![a, b];
        assert_eq!(ids(&rank(&battles, now)), vec!["a", "b"]);
    }

    #[test]
    fn only_approved_battles_are_listed() {
        let now = Utc::now();
        let mut pending = battle("pending", true, false, 1, now);
        pending.status = BattleStatus::Pending;
        let mut rejected = battle("rejected", true, false, 1, now);
        rejected.status = BattleStatus::Rejected;
        let battles = vec![pending, rejected, battle("ok", false, false, 1, now)];
        assert_eq!(ids(&rank(&battles, now)), vec!["ok"]);
        assert_eq!(rank_owned(battles, now).len(), 1);
    }

    #[test]
    fn ended_battles_stay_approved_in_their_own_bucket() {
        let now = Utc::now();
        let mut pending = battle("p", false, false, 1, now);
        pending.status = BattleStatus::Pending;
        let mut trashed = battle("t", false, false, 1, now);
        trashed.status = BattleStatus::Rejected;
        let mut boundary = battle("edge", false, false, 1, now);
        boundary.expires_at = now;
        let battles = vec![
            battle("a", false, false, 1, now),
            battle("e", false, true, 1, now),
            boundary,
            pending,
            trashed,
        ];
        let buckets = admin_buckets(&battles, now);
        assert_eq!(ids(&buckets.active), vec!["a"]);
        assert_eq!(ids(&buckets.ended), vec!["e", "edge"]);
        assert_eq!(ids(&buckets.pending), vec!["p"]);
        assert_eq!(ids(&buckets.trash), vec!["t"]);
    }

    #[test]
    fn detail_shows_only_approved_newest_first() {
        let now = Utc::now();
        let mut comments = seed::comments(now);
        comments.push(Comment {
            id: "c_hidden".into(),
            battle_id: "b_1".into(),
            user_id: "u_9".into(),
            user_name: "n".into(),
            user_avatar: String::new(),
            content: "pending".into(),
            side: Side::Soup,
            created_at: now,
            status: CommentStatus::Pending,
        });
        let visible = detail_comments(&comments, "b_1");
        let ids: Vec<&str> = visible.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c_3", "c_1", "c_2"]);
    }
}
