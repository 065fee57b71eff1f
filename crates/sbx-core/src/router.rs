//! Router: decides where each inbound event goes, exactly once.
//!
//! Dispatch order for messages: blocked-sender short-circuit, then commands,
//! then session-bound admin text, then the default suggestion path. Control
//! interactions arrive separately and dispatch on the decoded action.
//!
//! Policy: admins do not submit suggestions. Admin free text with no open
//! reply session is dropped; unknown slash commands from ordinary senders
//! are treated as suggestion text.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    action::{self, Action},
    blocklist::BlockStore,
    config::Config,
    domain::{ChatId, UserId},
    formatting::escape_html,
    forward::{forward_apology, SuggestionForwarder},
    messaging::{
        port::MessagingPort,
        types::{ControlInteraction, InboundMessage},
    },
    reply::{ReplySession, ReplySessionManager},
    status::{StatusKind, StatusUpdater},
    Result,
};

const BLOCKED_NOTICE: &str = "Sorry, you have been blocked and cannot send suggestions.";
const FORWARD_ACK: &str = "Thank you! Your suggestion has been sent to the administration.";
const ADMIN_ONLY: &str = "This action is only available to administrators.";
const REPLY_PREFIX: &str = "ℹ️ Reply from Administration:";

/// Closed classification of an inbound message, decided once per event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
    Command { name: String, args: String },
    SessionReply,
    Suggestion,
    Dropped,
}

/// Telegram may send `/cmd@botname arg1 ...`.
fn parse_command(text: &str) -> (String, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub fn classify(is_admin: bool, has_session: bool, text: Option<&str>) -> InboundKind {
    if let Some(text) = text {
        let trimmed = text.trim();
        if trimmed.starts_with('/') {
            let (name, args) = parse_command(trimmed);
            let admin_command = matches!(name.as_str(), "cancel" | "unban");
            if name == "start" || (is_admin && admin_command) {
                return InboundKind::Command { name, args };
            }
            // Unknown slash text: dropped for admins, ordinary suggestion
            // content for everyone else.
            if is_admin {
                return InboundKind::Dropped;
            }
            return InboundKind::Suggestion;
        }

        if is_admin {
            if has_session {
                return InboundKind::SessionReply;
            }
            return InboundKind::Dropped;
        }
        return InboundKind::Suggestion;
    }

    // Non-text content (media): a reply body must be text, so an admin's
    // media never binds to a session.
    if is_admin {
        InboundKind::Dropped
    } else {
        InboundKind::Suggestion
    }
}

pub struct ModerationRouter {
    cfg: Arc<Config>,
    store: Arc<dyn BlockStore>,
    messenger: Arc<dyn MessagingPort>,
    forwarder: SuggestionForwarder,
    sessions: ReplySessionManager,
    status: StatusUpdater,
}

impl ModerationRouter {
    pub fn new(
        cfg: Arc<Config>,
        store: Arc<dyn BlockStore>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let forwarder = SuggestionForwarder::new(messenger.clone(), cfg.moderation_chat_id);
        let status = StatusUpdater::new(messenger.clone());
        Self {
            cfg,
            store,
            messenger,
            forwarder,
            sessions: ReplySessionManager::default(),
            status,
        }
    }

    pub async fn handle_message(&self, inbound: InboundMessage) -> Result<()> {
        let sender = inbound.sender.clone();
        let is_admin = self.cfg.is_admin(sender.id);

        // Blocked-sender short-circuit for any non-admin inbound content.
        if !is_admin {
            match self.store.is_blocked(sender.id).await {
                Ok(true) => {
                    let _ = self
                        .messenger
                        .send_rendered(inbound.msg.chat_id, BLOCKED_NOTICE, None)
                        .await;
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(user = sender.id.0, "block lookup failed: {e}");
                    let _ = self
                        .messenger
                        .send_rendered(inbound.msg.chat_id, forward_apology(&e), None)
                        .await;
                    return Ok(());
                }
            }
        }

        let has_session = self.sessions.has_open(sender.id).await;
        match classify(is_admin, has_session, inbound.text.as_deref()) {
            InboundKind::Command { name, args } => {
                self.handle_command(&name, &args, &inbound, is_admin).await
            }
            InboundKind::SessionReply => self.handle_session_reply(inbound).await,
            InboundKind::Suggestion => self.handle_suggestion(inbound).await,
            InboundKind::Dropped => {
                debug!(user = sender.id.0, "dropping admin content with no open session");
                Ok(())
            }
        }
    }

    pub async fn handle_interaction(&self, interaction: ControlInteraction) -> Result<()> {
        let actor = interaction.from.clone();
        if !self.cfg.is_admin(actor.id) {
            let _ = self
                .messenger
                .answer_interaction(&interaction.interaction_id, Some(ADMIN_ONLY), true)
                .await;
            return Ok(());
        }

        let action = match Action::decode(&interaction.token) {
            Ok(a) => a,
            Err(e) => {
                warn!(admin = actor.id.0, "undecodable action control: {e}");
                let _ = self
                    .messenger
                    .answer_interaction(
                        &interaction.interaction_id,
                        Some("Error: malformed action control."),
                        true,
                    )
                    .await;
                return Ok(());
            }
        };

        match action {
            Action::Block { target } => self.handle_block_control(&interaction, target).await,
            Action::Unban { target } => self.handle_unban_control(&interaction, target).await,
            Action::Reply { target } => self.handle_reply_control(&interaction, target).await,
            Action::CancelPrompt { admin } => self.handle_cancel_control(&interaction, admin).await,
        }
    }

    async fn handle_command(
        &self,
        name: &str,
        args: &str,
        inbound: &InboundMessage,
        is_admin: bool,
    ) -> Result<()> {
        match name {
            "start" => self.handle_start(inbound, is_admin).await,
            "cancel" => self.handle_cancel_command(inbound).await,
            "unban" => self.handle_unban_command(args, inbound).await,
            _ => Ok(()),
        }
    }

    async fn handle_start(&self, inbound: &InboundMessage, is_admin: bool) -> Result<()> {
        let greeting = if is_admin {
            "Hello, Admin! 👋\nYou can manage suggestions.\nUse /unban <code>user_id</code> to unblock a user."
        } else {
            "Hello! 👋\nSend your suggestion as text. You can also attach one screenshot (send a photo with a caption)."
        };
        let _ = self
            .messenger
            .send_rendered(inbound.msg.chat_id, greeting, None)
            .await;
        Ok(())
    }

    async fn handle_cancel_command(&self, inbound: &InboundMessage) -> Result<()> {
        let cancelled = self
            .cancel_open_session(
                inbound.sender.id,
                inbound.msg.chat_id,
                &inbound.sender.full_name,
            )
            .await;

        let notice = if cancelled {
            "Action cancelled. You are no longer in reply mode."
        } else {
            "Nothing to cancel: no reply prompt is open."
        };
        let _ = self
            .messenger
            .send_rendered(inbound.msg.chat_id, notice, None)
            .await;
        Ok(())
    }

    async fn handle_unban_command(&self, args: &str, inbound: &InboundMessage) -> Result<()> {
        let chat = inbound.msg.chat_id;

        let target = if !args.is_empty() {
            match args.parse::<i64>() {
                Ok(id) => UserId(id),
                Err(_) => {
                    let _ = self
                        .messenger
                        .send_rendered(chat, "Invalid user id. Please provide a number.", None)
                        .await;
                    return Ok(());
                }
            }
        } else if let Some(replied) = &inbound.reply_to {
            // Token-less recovery: pull the id out of the rendered header.
            match action::recover_sender_id(&replied.body) {
                Some(id) => id,
                None => {
                    let _ = self
                        .messenger
                        .send_rendered(
                            chat,
                            "Could not find a sender id in the replied-to message.",
                            None,
                        )
                        .await;
                    return Ok(());
                }
            }
        } else {
            let _ = self
                .messenger
                .send_rendered(
                    chat,
                    "Usage: /unban <code>user_id</code>, or reply to a forwarded suggestion with /unban.",
                    None,
                )
                .await;
            return Ok(());
        };

        match self.store.unblock(target).await {
            Ok(true) => {
                info!(
                    admin = inbound.sender.id.0,
                    user = target.0,
                    "user unblocked via command"
                );
                let _ = self
                    .messenger
                    .send_rendered(
                        chat,
                        &format!("✅ User <code>{}</code> has been unblocked.", target.0),
                        None,
                    )
                    .await;
            }
            Ok(false) => {
                let _ = self
                    .messenger
                    .send_rendered(
                        chat,
                        &format!(
                            "⚠️ User <code>{}</code> was not found in the block list.",
                            target.0
                        ),
                        None,
                    )
                    .await;
            }
            Err(e) => {
                warn!(user = target.0, "unblock failed: {e}");
                let _ = self
                    .messenger
                    .send_rendered(
                        chat,
                        &format!(
                            "⚠️ Could not unblock user <code>{}</code>: storage error.",
                            target.0
                        ),
                        None,
                    )
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_suggestion(&self, inbound: InboundMessage) -> Result<()> {
        if inbound.text.is_none() && !inbound.has_media {
            debug!(user = inbound.sender.id.0, "ignoring unsupported content kind");
            return Ok(());
        }

        match self.forwarder.forward(&inbound).await {
            Ok(forwarded) => {
                info!(
                    user = inbound.sender.id.0,
                    chat = forwarded.chat_id.0,
                    "suggestion forwarded"
                );
                if let Err(e) = self
                    .messenger
                    .send_rendered(inbound.msg.chat_id, FORWARD_ACK, None)
                    .await
                {
                    warn!(user = inbound.sender.id.0, "could not acknowledge suggestion: {e}");
                }
            }
            Err(e) => {
                warn!(user = inbound.sender.id.0, "forward failed: {e}");
                let _ = self
                    .messenger
                    .send_rendered(inbound.msg.chat_id, forward_apology(&e), None)
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_session_reply(&self, inbound: InboundMessage) -> Result<()> {
        let admin = inbound.sender.clone();

        // Clear-before-send: once consumed, a racing cancel or a second
        // reply text observes no session and is dropped.
        let Some(session) = self.sessions.consume(admin.id, inbound.msg.chat_id).await else {
            debug!(admin = admin.id.0, "reply text outside the session chat; ignored");
            return Ok(());
        };

        let text = inbound.text.as_deref().unwrap_or_default();
        let body = format!("{REPLY_PREFIX}\n\n{}", escape_html(text));
        let outcome = self
            .messenger
            .send_rendered(ChatId(session.target.0), &body, None)
            .await;

        // The prompt and the triggering admin message are transient
        // artifacts; remove them whichever way delivery went.
        let _ = self.messenger.delete_message(session.prompt).await;
        let _ = self.messenger.delete_message(inbound.msg).await;

        match outcome {
            Ok(_) => {
                info!(admin = admin.id.0, user = session.target.0, "reply delivered");
                self.status
                    .rewrite_or_warn(
                        &session.origin,
                        StatusKind::Replied,
                        &admin.full_name,
                        session.target,
                    )
                    .await;
            }
            Err(e) => {
                warn!(
                    admin = admin.id.0,
                    user = session.target.0,
                    "reply delivery failed: {e}"
                );
                self.status
                    .rewrite_or_warn(
                        &session.origin,
                        StatusKind::ReplyFailed,
                        &admin.full_name,
                        session.target,
                    )
                    .await;
                let notice = format!(
                    "⚠️ Could not send the reply to user <code>{}</code>. They might have blocked the bot.\nDetails: {}",
                    session.target.0,
                    escape_html(&e.to_string())
                );
                let _ = self
                    .messenger
                    .send_rendered(session.moderation_chat, &notice, None)
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_block_control(
        &self,
        interaction: &ControlInteraction,
        target: UserId,
    ) -> Result<()> {
        let actor = &interaction.from;

        if let Err(e) = self.store.block(target).await {
            warn!(user = target.0, "block failed: {e}");
            let _ = self
                .messenger
                .answer_interaction(
                    &interaction.interaction_id,
                    Some("Storage error: user was not blocked."),
                    true,
                )
                .await;
            return Ok(());
        }

        info!(admin = actor.id.0, user = target.0, "user blocked");
        let _ = self
            .messenger
            .answer_interaction(
                &interaction.interaction_id,
                Some(&format!("User {} blocked.", target.0)),
                true,
            )
            .await;

        // The block already holds even when the visual update cannot happen.
        match &interaction.message {
            Some(rendered) => {
                self.status
                    .rewrite_or_warn(rendered, StatusKind::Blocked, &actor.full_name, target)
                    .await;
            }
            None => warn!(user = target.0, "no rendered message to rewrite after block"),
        }
        Ok(())
    }

    async fn handle_unban_control(
        &self,
        interaction: &ControlInteraction,
        target: UserId,
    ) -> Result<()> {
        let actor = &interaction.from;

        match self.store.unblock(target).await {
            Ok(true) => {
                info!(admin = actor.id.0, user = target.0, "user unblocked");
                let _ = self
                    .messenger
                    .answer_interaction(
                        &interaction.interaction_id,
                        Some(&format!("User {} has been unblocked.", target.0)),
                        true,
                    )
                    .await;
                if let Some(rendered) = &interaction.message {
                    self.status
                        .rewrite_or_warn(rendered, StatusKind::Unblocked, &actor.full_name, target)
                        .await;
                }
            }
            Ok(false) => {
                let _ = self
                    .messenger
                    .answer_interaction(
                        &interaction.interaction_id,
                        Some(&format!(
                            "User {} was not found in the block list.",
                            target.0
                        )),
                        true,
                    )
                    .await;
            }
            Err(e) => {
                warn!(user = target.0, "unblock failed: {e}");
                let _ = self
                    .messenger
                    .answer_interaction(
                        &interaction.interaction_id,
                        Some("Storage error: user was not unblocked."),
                        true,
                    )
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_reply_control(
        &self,
        interaction: &ControlInteraction,
        target: UserId,
    ) -> Result<()> {
        let actor = &interaction.from;

        let Some(origin) = interaction.message.clone() else {
            let _ = self
                .messenger
                .answer_interaction(
                    &interaction.interaction_id,
                    Some("Error: the original suggestion is no longer available."),
                    true,
                )
                .await;
            return Ok(());
        };

        let chat = origin.msg.chat_id;
        let prompt_body = format!(
            "✍️ {}, enter your reply for user <code>{}</code> in this chat.\nSend /cancel to abort.",
            escape_html(&actor.full_name),
            target.0
        );
        let prompt = match self
            .messenger
            .send_rendered(chat, &prompt_body, Some(action::cancel_controls(actor.id)))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(admin = actor.id.0, "could not render reply prompt: {e}");
                let _ = self
                    .messenger
                    .answer_interaction(
                        &interaction.interaction_id,
                        Some("Error: could not start the reply prompt."),
                        true,
                    )
                    .await;
                return Ok(());
            }
        };

        let superseded = self
            .sessions
            .open(ReplySession {
                admin: actor.id,
                target,
                moderation_chat: chat,
                prompt,
                origin,
                created_at: Utc::now(),
            })
            .await;

        if let Some(old) = superseded {
            debug!(
                admin = actor.id.0,
                old_target = old.target.0,
                "superseding open reply session"
            );
            let _ = self.messenger.delete_message(old.prompt).await;
        }

        let _ = self
            .messenger
            .answer_interaction(&interaction.interaction_id, Some("Enter the reply text:"), false)
            .await;
        Ok(())
    }

    async fn handle_cancel_control(
        &self,
        interaction: &ControlInteraction,
        owner: UserId,
    ) -> Result<()> {
        let actor = &interaction.from;
        if actor.id != owner {
            // Not this admin's prompt: acknowledge the press without
            // leaking whether a session exists.
            let _ = self
                .messenger
                .answer_interaction(&interaction.interaction_id, None, false)
                .await;
            return Ok(());
        }

        let chat = interaction
            .message
            .as_ref()
            .map(|m| m.msg.chat_id)
            .unwrap_or(self.cfg.moderation_chat_id);

        if self.cancel_open_session(owner, chat, &actor.full_name).await {
            let _ = self
                .messenger
                .answer_interaction(&interaction.interaction_id, Some("Reply cancelled."), false)
                .await;
        } else {
            let _ = self
                .messenger
                .answer_interaction(
                    &interaction.interaction_id,
                    Some("No reply prompt is open."),
                    true,
                )
                .await;
        }
        Ok(())
    }

    /// Shared cancel transition: consume, remove the prompt artifact and
    /// rewrite the origin's status. Returns whether a session was open.
    async fn cancel_open_session(&self, admin: UserId, chat: ChatId, actor: &str) -> bool {
        let Some(session) = self.sessions.consume(admin, chat).await else {
            return false;
        };
        let _ = self.messenger.delete_message(session.prompt).await;
        self.status
            .rewrite_or_warn(&session.origin, StatusKind::Cancelled, actor, session.target)
            .await;
        true
    }
}
