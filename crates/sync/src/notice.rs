use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::ApiError;

/// How long a transient warning stays visible before clearing itself.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
}

/// A transient, auto-dismissing message for the user. Expiry needs no user
/// action; expired entries are pruned whenever the board is read.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub posted_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Notice {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Shared board of transient notices; clones observe the same entries.
#[derive(Clone)]
pub struct NoticeBoard {
    entries: Arc<RwLock<Vec<Notice>>>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_NOTICE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            ttl,
        }
    }

    pub async fn post(&self, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice {
            kind,
            message: message.into(),
            posted_at: Utc::now(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.push(notice);
    }

    pub async fn post_warning(&self, message: impl Into<String>) {
        self.post(NoticeKind::Warning, message).await;
    }

    pub async fn post_info(&self, message: impl Into<String>) {
        self.post(NoticeKind::Info, message).await;
    }

    /// Currently visible notices, oldest first. Pruning happens here so a
    /// board nobody reads costs nothing.
    pub async fn active(&self) -> Vec<Notice> {
        let mut entries = self.entries.write().await;
        entries.retain(|n| !n.is_expired());
        entries.clone()
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// User-facing message for a failed completion push. The category changes
/// the remediation, so each status gets its own wording; the optimistic
/// local state stands in every case.
pub fn sync_failure_message(error: &ApiError) -> String {
    match error {
        ApiError::NotFound(_) => "enrollment not found, saved locally only".to_string(),
        ApiError::Forbidden(_) | ApiError::Unauthorized(_) => {
            "permission denied, saved locally only".to_string()
        }
        ApiError::Server { .. } => "saved locally, please refresh to sync".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notices_expire_without_user_action() {
        let board = NoticeBoard::with_ttl(Duration::from_millis(20));
        board.post_warning("saved locally").await;
        assert_eq!(board.active().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(board.active().await.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_same_board() {
        let board = NoticeBoard::new();
        let clone = board.clone();
        clone.post_info("topic pending sync").await;
        assert_eq!(board.active().await.len(), 1);
    }

    #[test]
    fn failure_messages_follow_the_status_category() {
        assert_eq!(
            sync_failure_message(&ApiError::NotFound("Enrollment not found".into())),
            "enrollment not found, saved locally only"
        );
        assert_eq!(
            sync_failure_message(&ApiError::Forbidden("no".into())),
            "permission denied, saved locally only"
        );
        assert_eq!(
            sync_failure_message(&ApiError::Server {
                status: 500,
                message: "boom".into()
            }),
            "saved locally, please refresh to sync"
        );
        assert!(
            sync_failure_message(&ApiError::Network("connection reset".into()))
                .contains("connection reset")
        );
    }
}
