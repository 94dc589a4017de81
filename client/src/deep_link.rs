//! Query parameters the app is opened with: `?battleId=` links straight to
//! a battle, `?token=` carries a login link.

use antisoup_shared::Battle;

pub const BATTLE_PARAM: &str = "battleId";
pub const TOKEN_PARAM: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    /// The battle is loaded; show its detail view.
    Open(String),
    /// The id names nothing we know. Holds the query to show instead.
    Clear(String),
    None,
}

fn pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")))
}

/// The decoded value of `name`, if the query carries a non-empty one.
pub fn param(query: &str, name: &str) -> Option<String> {
    let (_, raw) = pairs(query).find(|(k, _)| *k == name)?;
    let value = urlencoding::decode(raw).map(|v| v.into_owned()).ok()?;
    (!value.is_empty()).then_some(value)
}

pub fn battle_param(query: &str) -> Option<String> {
    param(query, BATTLE_PARAM)
}

pub fn token_param(query: &str) -> Option<String> {
    param(query, TOKEN_PARAM)
}

pub fn resolve(query: &str, battles: &[Battle]) -> DeepLink {
    match battle_param(query) {
        Some(id) if battles.iter().any(|b| b.id == id) => DeepLink::Open(id),
        Some(_) => DeepLink::Clear(strip_param(query, BATTLE_PARAM)),
        None => DeepLink::None,
    }
}

/// Query string with `name` removed, `?` included only when something is
/// left.
pub fn strip_param(query: &str, name: &str) -> String {
    let rest: Vec<String> = pairs(query)
        .filter(|(k, _)| *k != name)
        .map(|(k, v)| if v.is_empty() { k.to_string() } else { format!("{k}={v}") })
        .collect();
    if rest.is_empty() {
        String::new()
    } else {
        format!("?{}", rest.join("&"))
    }
}
