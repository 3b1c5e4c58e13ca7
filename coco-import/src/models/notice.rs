//! Dismissible user-facing banner

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Success or error banner with an auto-dismiss timer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl Notice {
    pub fn success(message: impl Into<String>, ttl: Duration) -> Self {
        Self::raise(NoticeKind::Success, message.into(), ttl)
    }

    pub fn error(message: impl Into<String>, ttl: Duration) -> Self {
        Self::raise(NoticeKind::Error, message.into(), ttl)
    }

    fn raise(kind: NoticeKind, message: String, ttl: Duration) -> Self {
        Self {
            kind,
            message,
            raised_at: Utc::now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = i64::try_from(self.ttl_ms).unwrap_or(i64::MAX);
        self.raised_at
            .checked_add_signed(chrono::Duration::milliseconds(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
