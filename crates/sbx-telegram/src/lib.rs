//! Telegram adapter (teloxide).
//!
//! This crate implements the `sbx-core` MessagingPort over the Telegram Bot
//! API and maps teloxide updates into the core event model.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use sbx_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::InlineKeyboard},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(e.to_string())
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

fn to_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_rendered(
        &self,
        chat_id: ChatId,
        body: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        let markup = controls.map(to_markup);
        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_message(Self::tg_chat(chat_id), body.to_string())
                    .parse_mode(ParseMode::Html);
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn copy_rendered(
        &self,
        src: MessageRef,
        dest: ChatId,
        caption: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        let markup = controls.map(to_markup);
        let copied = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .copy_message(
                        Self::tg_chat(dest),
                        Self::tg_chat(src.chat_id),
                        Self::tg_msg_id(src.message_id),
                    )
                    .caption(caption.to_string())
                    .parse_mode(ParseMode::Html);
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;

        Ok(MessageRef {
            chat_id: dest,
            message_id: MessageId(copied.0),
        })
    }

    async fn edit_rendered(
        &self,
        msg: MessageRef,
        body: &str,
        is_caption: bool,
        controls: Option<InlineKeyboard>,
    ) -> Result<()> {
        let markup = controls.map(to_markup);

        if is_caption {
            self.with_retry(|| {
                let mut req = self
                    .bot
                    .edit_message_caption(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
                    .caption(body.to_string())
                    .parse_mode(ParseMode::Html);
                if let Some(m) = markup.clone() {
                    req = req.reply_markup(m);
                }
                req
            })
            .await?;
            return Ok(());
        }

        self.with_retry(|| {
            let mut req = self
                .bot
                .edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    body.to_string(),
                )
                .parse_mode(ParseMode::Html);
            if let Some(m) = markup.clone() {
                req = req.reply_markup(m);
            }
            req
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn answer_interaction(
        &self,
        interaction_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(interaction_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            if alert {
                req = req.show_alert(true);
            }
            req
        })
        .await?;
        Ok(())
    }
}
