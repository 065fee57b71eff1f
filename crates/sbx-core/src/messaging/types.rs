use crate::domain::{MessageRef, Sender};

/// One inbound message, mapped from the transport's update shape.
///
/// Transport-specific fields stay in the adapter; the router only needs the
/// sender, the body and enough message identity to reply, delete or quote.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub msg: MessageRef,
    pub sender: Sender,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub has_media: bool,
    /// The message this one replies to, when the transport carries that.
    pub reply_to: Option<RenderedMessage>,
}

/// An interaction with an action control (inline-keyboard button press).
#[derive(Clone, Debug)]
pub struct ControlInteraction {
    /// Transport handle used to answer the interaction.
    pub interaction_id: String,
    pub from: Sender,
    /// Opaque token produced by the action codec.
    pub token: String,
    /// Snapshot of the rendered message the control was attached to.
    pub message: Option<RenderedMessage>,
}

/// Snapshot of a rendered message: identity plus the body as currently
/// displayed (plain text, as the transport reports it back).
#[derive(Clone, Debug)]
pub struct RenderedMessage {
    pub msg: MessageRef,
    pub body: String,
    pub has_media: bool,
}

/// Inline keyboard attached to a rendered message.
#[derive(Clone, Debug, Default)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}
