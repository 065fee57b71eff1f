//! Shared test doubles for core tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, MessageId, MessageRef, Sender, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{InboundMessage, InlineKeyboard, RenderedMessage},
    },
    Result,
};

/// Everything a test needs to assert about outbound transport traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Send {
        chat: i64,
        body: String,
        controls: Vec<String>,
    },
    Copy {
        src_chat: i64,
        src_message: i32,
        dest: i64,
        caption: String,
        controls: Vec<String>,
    },
    Edit {
        chat: i64,
        message: i32,
        body: String,
        is_caption: bool,
        controls: Vec<String>,
    },
    Delete {
        chat: i64,
        message: i32,
    },
    Answer {
        interaction_id: String,
        text: Option<String>,
        alert: bool,
    },
}

/// Recording messenger; optionally fails sends into configured chats.
#[derive(Default)]
pub struct FakeMessenger {
    pub calls: Mutex<Vec<Call>>,
    fail_chats: Mutex<HashSet<i64>>,
    next_message_id: AtomicI32,
}

impl FakeMessenger {
    pub async fn fail_sends_to(&self, chat: ChatId) {
        self.fail_chats.lock().await.insert(chat.0);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn check_chat(&self, chat: ChatId) -> Result<()> {
        if self.fail_chats.lock().await.contains(&chat.0) {
            return Err(Error::Delivery("Bad Request: chat not found".to_string()));
        }
        Ok(())
    }

    fn next_ref(&self, chat: ChatId) -> MessageRef {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 100;
        MessageRef {
            chat_id: chat,
            message_id: MessageId(id),
        }
    }
}

fn tokens(controls: &Option<InlineKeyboard>) -> Vec<String> {
    controls
        .iter()
        .flat_map(|k| k.rows.iter())
        .flat_map(|row| row.iter())
        .map(|b| b.callback_data.clone())
        .collect()
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send_rendered(
        &self,
        chat_id: ChatId,
        body: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.check_chat(chat_id).await?;
        self.calls.lock().await.push(Call::Send {
            chat: chat_id.0,
            body: body.to_string(),
            controls: tokens(&controls),
        });
        Ok(self.next_ref(chat_id))
    }

    async fn copy_rendered(
        &self,
        src: MessageRef,
        dest: ChatId,
        caption: &str,
        controls: Option<InlineKeyboard>,
    ) -> Result<MessageRef> {
        self.check_chat(dest).await?;
        self.calls.lock().await.push(Call::Copy {
            src_chat: src.chat_id.0,
            src_message: src.message_id.0,
            dest: dest.0,
            caption: caption.to_string(),
            controls: tokens(&controls),
        });
        Ok(self.next_ref(dest))
    }

    async fn edit_rendered(
        &self,
        msg: MessageRef,
        body: &str,
        is_caption: bool,
        controls: Option<InlineKeyboard>,
    ) -> Result<()> {
        self.check_chat(msg.chat_id).await?;
        self.calls.lock().await.push(Call::Edit {
            chat: msg.chat_id.0,
            message: msg.message_id.0,
            body: body.to_string(),
            is_caption,
            controls: tokens(&controls),
        });
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.calls.lock().await.push(Call::Delete {
            chat: msg.chat_id.0,
            message: msg.message_id.0,
        });
        Ok(())
    }

    async fn answer_interaction(
        &self,
        interaction_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<()> {
        self.calls.lock().await.push(Call::Answer {
            interaction_id: interaction_id.to_string(),
            text: text.map(|s| s.to_string()),
            alert,
        });
        Ok(())
    }
}

pub fn sender(id: i64, name: &str, username: Option<&str>) -> Sender {
    Sender {
        id: UserId(id),
        full_name: name.to_string(),
        username: username.map(|s| s.to_string()),
    }
}

pub fn text_message(chat: i64, message_id: i32, from: Sender, text: &str) -> InboundMessage {
    InboundMessage {
        msg: MessageRef {
            chat_id: ChatId(chat),
            message_id: MessageId(message_id),
        },
        sender: from,
        text: Some(text.to_string()),
        caption: None,
        has_media: false,
        reply_to: None,
    }
}

pub fn rendered(chat: i64, message_id: i32, body: &str) -> RenderedMessage {
    RenderedMessage {
        msg: MessageRef {
            chat_id: ChatId(chat),
            message_id: MessageId(message_id),
        },
        body: body.to_string(),
        has_media: false,
    }
}
