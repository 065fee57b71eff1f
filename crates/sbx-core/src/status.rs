//! Status updater: the single owner of the status-suffix format.
//!
//! A forwarded suggestion's rendered body is always `pristine content`
//! optionally followed by `SEPARATOR + status line`. Every transition strips
//! any previous suffix before appending the new one, so repeated transitions
//! never stack and never lose the original text.

use std::sync::Arc;

use tracing::warn;

use crate::{
    action,
    domain::UserId,
    formatting::escape_html,
    messaging::{
        port::MessagingPort,
        types::{InlineKeyboard, RenderedMessage},
    },
    Result,
};

/// Separator between the pristine body and the appended status line.
pub const STATUS_SEPARATOR: &str = "\n\n---\n";

/// Moderation outcome reflected in a forwarded message's status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Blocked,
    Unblocked,
    Replied,
    ReplyFailed,
    Cancelled,
}

impl StatusKind {
    fn line(&self, actor: &str) -> String {
        match self {
            StatusKind::Blocked => format!("🚫 User blocked by {actor}"),
            StatusKind::Unblocked => format!("🟢 User unblocked by {actor}"),
            StatusKind::Replied => format!("✅ Replied by {actor}"),
            StatusKind::ReplyFailed => format!("⚠️ Reply failed by {actor}"),
            StatusKind::Cancelled => format!("❌ Reply cancelled by {actor}"),
        }
    }

    /// Control set appropriate to the new status.
    fn controls(&self, target: UserId) -> InlineKeyboard {
        match self {
            StatusKind::Blocked => action::unban_controls(target),
            _ => action::default_controls(target),
        }
    }
}

/// Strip a previously appended status suffix, returning the pristine body.
pub fn strip_status(body: &str) -> &str {
    match body.find(STATUS_SEPARATOR) {
        Some(idx) => &body[..idx],
        None => body,
    }
}

/// Append a status line to a pristine body.
pub fn append_status(body: &str, line: &str) -> String {
    format!("{body}{STATUS_SEPARATOR}{line}")
}

/// Rewrites forwarded messages in place as moderation actions occur.
pub struct StatusUpdater {
    messenger: Arc<dyn MessagingPort>,
}

impl StatusUpdater {
    pub fn new(messenger: Arc<dyn MessagingPort>) -> Self {
        Self { messenger }
    }

    /// Rewrite `rendered` to reflect `status`, preserving the original body.
    ///
    /// Idempotent under repeated application with the same inputs. A failed
    /// edit (message deleted, permission lost) is surfaced as an error for
    /// the caller to log; it never rolls back the logical action.
    pub async fn rewrite(
        &self,
        rendered: &RenderedMessage,
        status: StatusKind,
        actor: &str,
        target: UserId,
    ) -> Result<()> {
        // `rendered.body` is plain text as the transport reports it back, so
        // it is re-escaped for HTML-mode rendering on every rewrite.
        let pristine = strip_status(&rendered.body);
        let body = append_status(&escape_html(pristine), &status.line(&escape_html(actor)));

        self.messenger
            .edit_rendered(
                rendered.msg,
                &body,
                rendered.has_media,
                Some(status.controls(target)),
            )
            .await
    }

    /// Like `rewrite`, but downgrade failure to a warning. Used where the
    /// logical action already completed and the visual update is best-effort.
    pub async fn rewrite_or_warn(
        &self,
        rendered: &RenderedMessage,
        status: StatusKind,
        actor: &str,
        target: UserId,
    ) {
        if let Err(e) = self.rewrite(rendered, status, actor, target).await {
            warn!(
                chat = rendered.msg.chat_id.0,
                message = rendered.msg.message_id.0,
                "could not rewrite status ({status:?}): {e}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_append_round_trip_is_lossless() {
        let pristine = "📝 New suggestion from: Alice\nID: 111\n\nAdd dark mode";
        for status in [
            StatusKind::Blocked,
            StatusKind::Unblocked,
            StatusKind::Replied,
            StatusKind::ReplyFailed,
            StatusKind::Cancelled,
        ] {
            let with_status = append_status(pristine, &status.line("Bob"));
            assert_eq!(strip_status(&with_status), pristine);
        }
    }

    #[test]
    fn repeated_transitions_do_not_stack_suffixes() {
        let pristine = "body";
        let once = append_status(strip_status(pristine), &StatusKind::Blocked.line("Bob"));
        let twice = append_status(strip_status(&once), &StatusKind::Blocked.line("Bob"));
        assert_eq!(once, twice);

        // A later transition replaces, not appends.
        let unblocked = append_status(strip_status(&twice), &StatusKind::Unblocked.line("Bob"));
        assert_eq!(unblocked.matches(STATUS_SEPARATOR).count(), 1);
        assert!(unblocked.contains("🟢 User unblocked by Bob"));
        assert!(!unblocked.contains("🚫"));
    }

    #[test]
    fn body_containing_a_plain_dash_line_is_not_clipped() {
        // Only the exact separator splits; a lone "---" inside user content
        // that lacks the surrounding blank line survives.
        let body = "first\n---\nsecond";
        assert_eq!(strip_status(body), body);
    }
}
