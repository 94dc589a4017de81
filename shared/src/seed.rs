//! Starter data: the service seeds its database from it and the client's
//! offline mirror starts from it.

use chrono::{DateTime, Duration, Utc};

use crate::{
    AuthProvider, Battle, BattleStatus, Comment, CommentStatus, ReactionCounts, Role, Side,
    SystemConfig, Topic, TopicStatus, User, BATTLE_LIFETIME_DAYS,
};

pub const SYSTEM_AUTHOR: &str = "u_system";
/// Id of the built-in root account.
pub const ROOT_ID: &str = "u_super_root";

const TOPIC_NAMES: [&str; 15] = [
    "工作", "爱情", "失败", "旅行", "梦想", "金钱", "孤独", "社交", "婚姻", "职场", "减肥", "内卷",
    "相亲", "买房", "考研",
];

const FILLER_TOPICS: [&str; 10] = [
    "梦想", "努力", "青春", "孤独", "金钱", "快乐", "成长", "社交", "职场", "婚姻",
];

const FILLER_SOUP: [&str; 5] = [
    "只要心里有阳光，到哪都是晴天。",
    "你现在的气质里，藏着你读过的书。",
    "不要因为走得太远，而忘记为什么出发。",
    "生活不止眼前的苟且，还有诗和远方。",
    "努力不一定成功，但放弃一定失败。",
];

const FILLER_ANTI: [&str; 5] = [
    "只要心里有阳光，就会发现还是晒得慌。",
    "你现在的气质里，藏着你吃过的麻辣烫。",
    "不要因为走得太远，就忘了还没还钱。",
    "生活不止眼前的苟且，还有读不懂的诗和到不了的远方。",
    "努力不一定成功，但是不努力真的很舒服。",
];

/// Highest id used by [`battles`].
pub const LAST_SEED_BATTLE: usize = 250;

pub fn config() -> SystemConfig {
    SystemConfig::default()
}

pub fn topics() -> Vec<Topic> {
    TOPIC_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| Topic {
            id: format!("t_{}", i + 1),
            name: (*name).to_string(),
            battle_count: 0,
            is_trending: None,
            status: TopicStatus::Active,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn battle(
    id: String,
    topic: &str,
    soup: String,
    soup_votes: u32,
    anti: String,
    anti_votes: u32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_pinned: bool,
    reaction_counts: ReactionCounts,
) -> Battle {
    Battle {
        id,
        topic: topic.to_string(),
        topic_id: None,
        soup_content: soup,
        soup_votes,
        anti_content: anti,
        anti_votes,
        reaction_counts,
        author_id: SYSTEM_AUTHOR.to_string(),
        created_at,
        expires_at,
        is_pinned,
        status: BattleStatus::Approved,
    }
}

fn counts(like: u32, clap: u32, disagree: u32, shock: u32, neutral: u32) -> ReactionCounts {
    ReactionCounts {
        like,
        clap,
        disagree,
        shock,
        neutral,
    }
}

/// Four curated battles (the first pinned, the third expired) followed by
/// generated filler for the history listing.
pub fn battles(now: DateTime<Utc>) -> Vec<Battle> {
    let lifetime = Duration::days(BATTLE_LIFETIME_DAYS);
    let mut out = vec![
        battle(
            "b_1".into(),
            "工作",
            "把公司当成家，你的付出老板都看在眼里。".into(),
            124,
            "把公司当家，这周房租你给免了吗？".into(),
            892,
            now - Duration::days(1),
            now + lifetime,
            true,
            counts(120, 45, 12, 89, 5),
        ),
        battle(
            "b_2".into(),
            "爱情",
            "你是我的唯一，没有你我活不下去。".into(),
            45,
            "地球离了谁都转，没有你我活得更好，甚至省了一笔钱。".into(),
            567,
            now - Duration::days(2),
            now + lifetime,
            false,
            counts(56, 12, 4, 33, 2),
        ),
        battle(
            "b_3".into(),
            "失败",
            "失败是成功之母，每一次跌倒都是为了飞得更高。".into(),
            89,
            "失败是成功之母，但你这母亲好像有点不孕不育。".into(),
            734,
            now - Duration::seconds(250_000),
            now - Duration::seconds(100),
            false,
            counts(20, 5, 1, 10, 0),
        ),
        battle(
            "b_4".into(),
            "旅行",
            "来一场说走就走的旅行，洗涤心灵。".into(),
            230,
            "说走就走是因为没工作，洗涤心灵回来还得面对空空如也的银行卡。".into(),
            612,
            now - Duration::seconds(300_000),
            now + lifetime,
            false,
            counts(88, 23, 9, 45, 12),
        ),
    ];

    for i in 5..=LAST_SEED_BATTLE {
        let n = i as u32;
        let expires_at = if i % 5 == 0 {
            now - Duration::seconds(10)
        } else {
            now + lifetime
        };
        out.push(battle(
            format!("b_{i}"),
            FILLER_TOPICS[i % FILLER_TOPICS.len()],
            format!("{} (#{i})", FILLER_SOUP[i % FILLER_SOUP.len()]),
            (n * 37) % 500,
            format!("{} (#{i})", FILLER_ANTI[i % FILLER_ANTI.len()]),
            (n * 113) % 2000,
            now - Duration::hours(12 * i as i64),
            expires_at,
            false,
            counts((n * 7) % 50, (n * 3) % 20, n % 10, n % 5, (n + 2) % 5),
        ));
    }
    out
}

pub fn comments(now: DateTime<Utc>) -> Vec<Comment> {
    let comment = |id: &str, user: &str, name: &str, avatar: &str, content: &str, side, ago| Comment {
        id: id.into(),
        battle_id: "b_1".into(),
        user_id: user.into(),
        user_name: name.into(),
        user_avatar: avatar.into(),
        content: content.into(),
        side,
        created_at: now - ago,
        status: CommentStatus::Approved,
    };
    vec![
        comment(
            "c_1",
            "u_1",
            "人间清醒",
            "https://picsum.photos/seed/u1/100/100",
            "这话说的太对了，老板的饼画得再大也填不饱肚子。",
            Side::Anti,
            Duration::hours(1),
        ),
        comment(
            "c_2",
            "u_2",
            "毒舌大师",
            "https://picsum.photos/seed/u2/100/100",
            "公司是家？那我可以穿睡衣上班吗？",
            Side::Anti,
            Duration::hours(2),
        ),
        comment(
            "c_3",
            "u_3",
            "奋斗逼",
            "https://picsum.photos/seed/u3/100/100",
            "虽然但是，努力工作还是为了自己积累经验吧。",
            Side::Soup,
            Duration::minutes(20),
        ),
    ]
}

/// Demo moderator for the offline mirror. The service never seeds it.
pub fn admins(now: DateTime<Utc>) -> Vec<User> {
    vec![User {
        id: "u_admin1".into(),
        name: "内容管理员".into(),
        avatar: avatar_for("Admin"),
        email: "mod@antisoup.com".into(),
        provider: AuthProvider::Google,
        role: Role::Admin,
        created_at: now,
        daily_generations: 0,
        last_generation_date: None,
    }]
}

/// The built-in root account.
pub fn super_admin(email: &str, now: DateTime<Utc>) -> User {
    User {
        id: ROOT_ID.into(),
        name: "系统主宰 (Root)".into(),
        avatar: "https://ui-avatars.com/api/?name=Root&background=000&color=fff".into(),
        email: email.to_string(),
        provider: AuthProvider::System,
        role: Role::SuperAdmin,
        created_at: now,
        daily_generations: 0,
        last_generation_date: None,
    }
}

/// Generated avatar URL for a display name.
pub fn avatar_for(name: &str) -> String {
    format!("https://ui-avatars.com/api/?name={name}&background=random")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_battles_have_unique_ids() {
        let battles = battles(Utc::now());
        let mut ids: Vec<&str> = battles.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), LAST_SEED_BATTLE);
    }

    #[test]
    fn curated_battles_cover_pinned_and_expired() {
        let now = Utc::now();
        let battles = battles(now);
        assert!(battles[0].is_pinned);
        assert!(battles[2].is_expired(now));
        assert!(!battles[1].is_expired(now));
    }
}
