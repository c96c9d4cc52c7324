//! One-shot notices carried in the session across a redirect.
//!
//! Notices are pushed before a redirect and drained by the next page render.
//! Session failures here are logged and swallowed: a lost notice never fails
//! the request that produced it.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Notice category, mapped to a CSS class by the templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

impl Level {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Error => "flash-error",
        }
    }
}

/// A single flashed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

/// Queue a notice for the next rendered page.
pub async fn push(session: &Session, level: Level, message: impl Into<String>) {
    let mut notices = session
        .get::<Vec<Notice>>(session_keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    notices.push(Notice {
        level,
        message: message.into(),
    });

    if let Err(e) = session.insert(session_keys::FLASHES, notices).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Remove and return all queued notices, oldest first.
pub async fn take(session: &Session) -> Vec<Notice> {
    match session.remove::<Vec<Notice>>(session_keys::FLASHES).await {
        Ok(notices) => notices.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
