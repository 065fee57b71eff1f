//! Suggestion forwarder: renders an inbound sender message into the
//! moderation chat with sender metadata and the default action controls.

use std::sync::Arc;

use crate::{
    action,
    domain::{ChatId, MessageRef, Sender},
    errors::Error,
    formatting::escape_html,
    messaging::{port::MessagingPort, types::InboundMessage},
    Result,
};

pub struct SuggestionForwarder {
    messenger: Arc<dyn MessagingPort>,
    moderation_chat: ChatId,
}

impl SuggestionForwarder {
    pub fn new(messenger: Arc<dyn MessagingPort>, moderation_chat: ChatId) -> Self {
        Self {
            messenger,
            moderation_chat,
        }
    }

    /// Header carrying the sender's display name, optional handle and id.
    ///
    /// The id line doubles as the recovery marker for token-less flows, so
    /// its shape is owned by the action codec (`action::ID_MARKER`).
    pub fn header(sender: &Sender) -> String {
        let mut header = format!("📝 New suggestion from: {}", escape_html(&sender.full_name));
        if let Some(username) = &sender.username {
            header.push_str(&format!(" (@{})", escape_html(username)));
        }
        header.push_str(&format!(
            "\n{}<code>{}</code>",
            action::ID_MARKER,
            sender.id.0
        ));
        header
    }

    /// Deliver header + original content + `{Reply, Block}` controls to the
    /// moderation chat as one rendered unit. No state is mutated on failure.
    pub async fn forward(&self, inbound: &InboundMessage) -> Result<MessageRef> {
        let controls = action::default_controls(inbound.sender.id);
        let header = Self::header(&inbound.sender);

        if inbound.has_media {
            let caption = match inbound.caption.as_deref() {
                Some(c) if !c.trim().is_empty() => format!("{header}\n\n{}", escape_html(c)),
                _ => header,
            };
            return self
                .messenger
                .copy_rendered(inbound.msg, self.moderation_chat, &caption, Some(controls))
                .await;
        }

        let text = inbound.text.as_deref().unwrap_or_default();
        let body = format!("{header}\n\n{}", escape_html(text));
        self.messenger
            .send_rendered(self.moderation_chat, &body, Some(controls))
            .await
    }
}

/// User-visible apology for a failed forward, distinguishing a destination
/// configuration problem from a transient transport error.
pub fn forward_apology(err: &Error) -> &'static str {
    match err {
        Error::Delivery(reason) if is_destination_problem(reason) => {
            "Sorry, could not send your suggestion. There might be an issue with the moderation group."
        }
        _ => "Sorry, a technical error occurred while sending your suggestion. Please try again later.",
    }
}

fn is_destination_problem(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    reason.contains("chat not found")
        || reason.contains("bot was kicked")
        || reason.contains("not enough rights")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn sender(id: i64, name: &str, username: Option<&str>) -> Sender {
        Sender {
            id: UserId(id),
            full_name: name.to_string(),
            username: username.map(|s| s.to_string()),
        }
    }

    #[test]
    fn header_includes_name_handle_and_id() {
        let h = SuggestionForwarder::header(&sender(111, "Alice", Some("alice")));
        assert_eq!(
            h,
            "📝 New suggestion from: Alice (@alice)\nID: <code>111</code>"
        );
    }

    #[test]
    fn header_omits_missing_handle_and_escapes_name() {
        let h = SuggestionForwarder::header(&sender(5, "Bob <admin>", None));
        assert_eq!(
            h,
            "📝 New suggestion from: Bob &lt;admin&gt;\nID: <code>5</code>"
        );
    }

    #[test]
    fn apology_distinguishes_configuration_from_transient_failures() {
        let config = Error::Delivery("Bad Request: chat not found".to_string());
        let transient = Error::Delivery("Gateway Timeout".to_string());
        assert!(forward_apology(&config).contains("moderation group"));
        assert!(forward_apology(&transient).contains("try again later"));
    }
}
