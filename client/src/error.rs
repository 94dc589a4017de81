use antisoup_shared::RuleError;
use thiserror::Error;

/// Failure talking to the service. Reads and writes absorb it in the data
/// provider; only sign-in calls pass it on.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why the store refused an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("sign in first")]
    NotSignedIn,

    #[error("admin role required")]
    NotAdmin,

    #[error("super admin role required")]
    NotSuperAdmin,

    #[error("already voted on this battle")]
    AlreadyVoted,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("topic {0:?} already exists")]
    DuplicateTopic(String),

    #[error("super admins cannot be revoked")]
    ProtectedAccount,

    #[error("sign-in failed: {0}")]
    SignIn(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("session data: {0}")]
    Json(#[from] serde_json::Error),
}
