//! Derived topic counts and topic suggestions.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Battle, Topic, TopicStatus};

/// Suggestions shown next to the generator.
pub const SUGGESTION_COUNT: usize = 12;

/// Returns `topics` with `battle_count` recomputed from `battles`.
///
/// Matching is by name, across every status. The result is a fresh copy;
/// the counts are display-only.
pub fn aggregate(topics: &[Topic], battles: &[Battle]) -> Vec<Topic> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for battle in battles {
        if !battle.topic.is_empty() {
            *counts.entry(battle.topic.as_str()).or_default() += 1;
        }
    }
    topics
        .iter()
        .map(|t| Topic {
            battle_count: counts.get(t.name.as_str()).copied().unwrap_or(0),
            ..t.clone()
        })
        .collect()
}

/// Case-insensitive, whitespace-trimmed name lookup.
pub fn find_by_name<'a>(topics: &'a [Topic], name: &str) -> Option<&'a Topic> {
    let wanted = name.trim().to_lowercase();
    topics.iter().find(|t| t.name.to_lowercase() == wanted)
}

pub fn is_disabled(topics: &[Topic], name: &str) -> bool {
    find_by_name(topics, name).is_some_and(|t| t.status == TopicStatus::Disabled)
}

/// Active topics eligible for suggestion.
///
/// With more than 20 active topics only those that already have battles
/// qualify, unless that leaves fewer than 10.
pub fn suggestion_pool(topics: &[Topic]) -> Vec<&Topic> {
    let active: Vec<&Topic> = topics
        .iter()
        .filter(|t| t.status != TopicStatus::Disabled)
        .collect();
    if active.len() <= 20 {
        return active;
    }
    let used: Vec<&Topic> = active.iter().copied().filter(|t| t.battle_count > 0).collect();
    if used.len() < 10 {
        active
    } else {
        used
    }
}

pub fn suggest<'a, R: Rng + ?Sized>(topics: &'a [Topic], rng: &mut R) -> Vec<&'a Topic> {
    let mut pool = suggestion_pool(topics);
    pool.shuffle(rng);
    pool.truncate(SUGGESTION_COUNT);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn topic(n: usize, count: u32) -> Topic {
        Topic {
            id: format!("t_{n}"),
            name: format!("topic {n}"),
            battle_count: count,
            is_trending: None,
            status: TopicStatus::Active,
        }
    }

    #[test]
    fn aggregation_counts_every_status_and_is_idempotent() {
        let now = Utc::now();
        let mut battles = seed::battles(now);
        battles[0].status = crate::BattleStatus::Rejected;
        let topics = seed::topics();

        let once = aggregate(&topics, &battles);
        let twice = aggregate(&once, &battles);
        assert_eq!(once, twice);

        let work = once.iter().find(|t| t.name == "工作").unwrap();
        let expected = battles.iter().filter(|b| b.topic == "工作").count() as u32;
        assert_eq!(work.battle_count, expected);
        assert!(work.battle_count >= 1);
    }

    #[test]
    fn unmatched_topics_count_zero() {
        let topics = vec![topic(1, 7)];
        let out = aggregate(&topics, &[]);
        assert_eq!(out[0].battle_count, 0);
    }

    #[test]
    fn disabled_lookup_ignores_case_and_whitespace() {
        let mut topics = vec![topic(1, 0)];
        topics[0].name = "Money".into();
        topics[0].status = TopicStatus::Disabled;
        assert!(is_disabled(&topics, "  money "));
        assert!(!is_disabled(&topics, "love"));
    }

    #[test]
    fn small_catalogs_suggest_every_active_topic() {
        let mut topics: Vec<Topic> = (0..5).map(|n| topic(n, 0)).collect();
        topics[0].status = TopicStatus::Disabled;
        assert_eq!(suggestion_pool(&topics).len(), 4);
    }

    #[test]
    fn large_catalogs_prefer_used_topics() {
        let topics: Vec<Topic> = (0..30).map(|n| topic(n, if n < 12 { 1 } else { 0 })).collect();
        let pool = suggestion_pool(&topics);
        assert_eq!(pool.len(), 12);
        assert!(pool.iter().all(|t| t.battle_count > 0));
    }

    #[test]
    fn large_catalogs_fall_back_when_few_are_used() {
        let topics: Vec<Topic> = (0..30).map(|n| topic(n, if n < 3 { 1 } else { 0 })).collect();
        assert_eq!(suggestion_pool(&topics).len(), 30);
    }

    #[test]
    fn suggestions_are_capped() {
        let topics: Vec<Topic> = (0..18).map(|n| topic(n, 0)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = suggest(&topics, &mut rng);
        assert_eq!(picked.len(), SUGGESTION_COUNT);
    }
}
