//! Reply session manager: per-admin state binding a captured reply text to
//! the sender it is meant for.
//!
//! At most one session is open per admin. All transitions go through one
//! mutex over the session map, so a cancel and an incoming reply text racing
//! each other resolve deterministically: the first to acquire consumes the
//! session, the second observes no session and is dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::types::RenderedMessage,
};

/// A moderator's open reply prompt, bound to the suggestion it came from.
#[derive(Clone, Debug)]
pub struct ReplySession {
    pub admin: UserId,
    pub target: UserId,
    pub moderation_chat: ChatId,
    /// The prompt artifact rendered when the session opened.
    pub prompt: MessageRef,
    /// The forwarded suggestion the reply action was invoked on.
    pub origin: RenderedMessage,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ReplySessionManager {
    sessions: Mutex<HashMap<i64, ReplySession>>,
}

impl ReplySessionManager {
    /// Open a session for `session.admin`.
    ///
    /// Policy: a new reply action supersedes any session the admin already
    /// holds; the superseded session is returned so the caller can remove
    /// its orphaned prompt. Two sessions for one admin never coexist.
    pub async fn open(&self, session: ReplySession) -> Option<ReplySession> {
        self.sessions.lock().await.insert(session.admin.0, session)
    }

    pub async fn has_open(&self, admin: UserId) -> bool {
        self.sessions.lock().await.contains_key(&admin.0)
    }

    /// Atomically consume `admin`'s session, but only if it was opened from
    /// `chat`. Ownership is implicit in the key; the chat check rejects
    /// events arriving from a different destination than the session
    /// records. Returns `None` without side effects otherwise.
    pub async fn consume(&self, admin: UserId, chat: ChatId) -> Option<ReplySession> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&admin.0) {
            Some(s) if s.moderation_chat == chat => sessions.remove(&admin.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageId;

    fn session(admin: i64, target: i64, chat: i64) -> ReplySession {
        ReplySession {
            admin: UserId(admin),
            target: UserId(target),
            moderation_chat: ChatId(chat),
            prompt: MessageRef {
                chat_id: ChatId(chat),
                message_id: MessageId(10),
            },
            origin: RenderedMessage {
                msg: MessageRef {
                    chat_id: ChatId(chat),
                    message_id: MessageId(1),
                },
                body: "body".to_string(),
                has_media: false,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn consume_is_scoped_to_owner_and_chat() {
        let mgr = ReplySessionManager::default();
        mgr.open(session(1, 222, -100)).await;

        // Another admin cannot consume it, even in the right chat.
        assert!(mgr.consume(UserId(2), ChatId(-100)).await.is_none());
        // The owner cannot consume it from a different chat.
        assert!(mgr.consume(UserId(1), ChatId(-200)).await.is_none());
        assert!(mgr.has_open(UserId(1)).await);

        let consumed = mgr.consume(UserId(1), ChatId(-100)).await.unwrap();
        assert_eq!(consumed.target, UserId(222));
        assert!(!mgr.has_open(UserId(1)).await);
    }

    #[tokio::test]
    async fn second_consume_observes_idle() {
        let mgr = ReplySessionManager::default();
        mgr.open(session(1, 222, -100)).await;

        assert!(mgr.consume(UserId(1), ChatId(-100)).await.is_some());
        assert!(mgr.consume(UserId(1), ChatId(-100)).await.is_none());
    }

    #[tokio::test]
    async fn reopening_supersedes_and_returns_the_old_session() {
        let mgr = ReplySessionManager::default();
        mgr.open(session(1, 222, -100)).await;

        let old = mgr.open(session(1, 333, -100)).await.unwrap();
        assert_eq!(old.target, UserId(222));

        let current = mgr.consume(UserId(1), ChatId(-100)).await.unwrap();
        assert_eq!(current.target, UserId(333));
    }

    #[tokio::test]
    async fn sessions_are_independent_across_admins() {
        let mgr = ReplySessionManager::default();
        mgr.open(session(1, 222, -100)).await;
        mgr.open(session(2, 333, -100)).await;

        assert!(mgr.consume(UserId(1), ChatId(-100)).await.is_some());
        assert!(mgr.has_open(UserId(2)).await);
    }
}
