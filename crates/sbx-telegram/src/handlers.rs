//! Telegram update handlers.
//!
//! Each handler maps the teloxide update into the core event model and hands
//! it to the moderation router. Only text and photo messages are relayed;
//! everything else is ignored at this layer.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use sbx_core::{
    domain::{ChatId, MessageId, MessageRef, Sender, UserId},
    messaging::types::{ControlInteraction, InboundMessage, RenderedMessage},
};

use crate::router::AppState;

fn msg_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}

fn map_user(user: &teloxide::types::User) -> Sender {
    Sender {
        id: UserId(user.id.0 as i64),
        full_name: user.full_name(),
        username: user.username.clone(),
    }
}

/// Snapshot of a message body as Telegram reports it back (plain text,
/// entities stripped).
fn rendered_snapshot(msg: &Message) -> RenderedMessage {
    RenderedMessage {
        msg: msg_ref(msg),
        body: msg
            .text()
            .or_else(|| msg.caption())
            .unwrap_or_default()
            .to_string(),
        has_media: msg.photo().is_some(),
    }
}

fn map_inbound(msg: &Message) -> Option<InboundMessage> {
    let from = msg.from()?;
    Some(InboundMessage {
        msg: msg_ref(msg),
        sender: map_user(from),
        text: msg.text().map(|s| s.to_string()),
        caption: msg.caption().map(|s| s.to_string()),
        has_media: msg.photo().is_some(),
        reply_to: msg.reply_to_message().map(rendered_snapshot),
    })
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.text().is_none() && msg.photo().is_none() {
        return Ok(());
    }
    let Some(inbound) = map_inbound(&msg) else {
        return Ok(());
    };

    // Suggestions are ordered per sender chat. Moderation-chat traffic is
    // serialized by the session manager instead, so it skips the lock.
    if msg.chat.id.0 == state.cfg.moderation_chat_id.0 {
        if let Err(e) = state.router.handle_message(inbound).await {
            warn!(chat = msg.chat.id.0, "message handling failed: {e}");
        }
        return Ok(());
    }

    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
    if let Err(e) = state.router.handle_message(inbound).await {
        warn!(chat = msg.chat.id.0, "message handling failed: {e}");
    }
    Ok(())
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    let data = q.data.clone().unwrap_or_default();
    if data.is_empty() {
        // Always answer, or the client keeps its spinner.
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    }

    let interaction = ControlInteraction {
        interaction_id: q.id.clone(),
        from: map_user(&q.from),
        token: data,
        message: q.message.as_ref().map(rendered_snapshot),
    };

    if let Err(e) = state.router.handle_interaction(interaction).await {
        warn!(user = q.from.id.0, "callback handling failed: {e}");
    }
    Ok(())
}
