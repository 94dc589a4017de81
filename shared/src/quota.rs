//! Daily generation quota.
//!
//! The counter lives on the user record and is advanced on publish, while
//! the check runs before generating. Generating without publishing never
//! spends quota, so this is a courtesy limit rather than a guarantee.

use chrono::NaiveDate;

use crate::{RuleError, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Unlimited,
    Limited(u32),
}

impl Remaining {
    pub fn allows_generation(self) -> bool {
        !matches!(self, Remaining::Limited(0))
    }

    pub fn as_option(self) -> Option<u32> {
        match self {
            Remaining::Unlimited => None,
            Remaining::Limited(n) => Some(n),
        }
    }
}

pub fn remaining(user: &User, limit: u32, today: NaiveDate) -> Remaining {
    if user.is_admin() {
        return Remaining::Unlimited;
    }
    if user.last_generation_date == Some(today) {
        Remaining::Limited(limit.saturating_sub(user.daily_generations))
    } else {
        Remaining::Limited(limit)
    }
}

pub fn ensure_available(user: &User, limit: u32, today: NaiveDate) -> Result<Remaining, RuleError> {
    let left = remaining(user, limit, today);
    if left.allows_generation() {
        Ok(left)
    } else {
        Err(RuleError::QuotaExhausted { limit })
    }
}

/// Spends one generation; a new day restarts the count at 1.
pub fn consume(user: &mut User, today: NaiveDate) {
    user.daily_generations = if user.last_generation_date == Some(today) {
        user.daily_generations.saturating_add(1)
    } else {
        1
    };
    user.last_generation_date = Some(today);
}
