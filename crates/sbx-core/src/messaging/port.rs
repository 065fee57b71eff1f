use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::InlineKeyboard,
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is designed so another
/// adapter (Slack/Discord) can fit behind the same interface. Bodies are
/// HTML-escaped by the caller; the adapter renders them in HTML mode.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a rendered body, optionally with action controls attached.
    async fn send_rendered(
        &self,
        chat_id: ChatId,
        body: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef>;

    /// Re-deliver a media message into another chat with a new caption.
    async fn copy_rendered(
        &self,
        src: MessageRef,
        dest: ChatId,
        caption: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef>;

    /// Rewrite a previously rendered message body and its controls.
    /// `is_caption` selects caption editing for media messages.
    async fn edit_rendered(
        &self,
        msg: MessageRef,
        body: &str,
        is_caption: bool,
        controls: Option<InlineKeyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    /// Answer a control interaction; `alert` requests a modal popup.
    async fn answer_interaction(
        &self,
        interaction_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<()>;
}
