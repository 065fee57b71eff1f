//! Action codec: moderation actions <-> compact callback tokens.
//!
//! Tokens ride in inline-keyboard callback data, which Telegram caps at 64
//! bytes, so the encoding is a bare `kind:id` pair. Decoding failures are
//! reported as `Error::MalformedAction`; the router answers the interaction
//! with a visible error and drops the event.

use crate::{
    domain::UserId,
    errors::Error,
    messaging::types::{InlineButton, InlineKeyboard},
    Result,
};

/// A moderation action request carried by an action control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Reply { target: UserId },
    Block { target: UserId },
    Unban { target: UserId },
    /// Cancels the issuing admin's own open reply prompt.
    CancelPrompt { admin: UserId },
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Reply { target } => format!("reply:{}", target.0),
            Action::Block { target } => format!("block:{}", target.0),
            Action::Unban { target } => format!("unban:{}", target.0),
            Action::CancelPrompt { admin } => format!("cancel:{}", admin.0),
        }
    }

    pub fn decode(token: &str) -> Result<Self> {
        let Some((kind, id)) = token.split_once(':') else {
            return Err(Error::MalformedAction(format!(
                "token without separator: {token:?}"
            )));
        };

        let id = id
            .parse::<i64>()
            .map_err(|_| Error::MalformedAction(format!("non-numeric id in token: {token:?}")))?;

        match kind {
            "reply" => Ok(Action::Reply {
                target: UserId(id),
            }),
            "block" => Ok(Action::Block {
                target: UserId(id),
            }),
            "unban" => Ok(Action::Unban {
                target: UserId(id),
            }),
            "cancel" => Ok(Action::CancelPrompt { admin: UserId(id) }),
            other => Err(Error::MalformedAction(format!(
                "unknown action kind: {other:?}"
            ))),
        }
    }
}

/// Default control set attached to a forwarded suggestion.
pub fn default_controls(target: UserId) -> InlineKeyboard {
    InlineKeyboard::row(vec![
        InlineButton::new("✅ Reply", Action::Reply { target }.encode()),
        InlineButton::new("🚫 Block", Action::Block { target }.encode()),
    ])
}

/// Control set shown after a block action.
pub fn unban_controls(target: UserId) -> InlineKeyboard {
    InlineKeyboard::row(vec![InlineButton::new(
        "🟢 Unban User",
        Action::Unban { target }.encode(),
    )])
}

/// Cancel control attached to a reply prompt.
pub fn cancel_controls(admin: UserId) -> InlineKeyboard {
    InlineKeyboard::row(vec![InlineButton::new(
        "❌ Cancel",
        Action::CancelPrompt { admin }.encode(),
    )])
}

/// Marker preceding the sender id in a rendered suggestion header.
pub const ID_MARKER: &str = "ID: ";

/// Recover a sender id from previously rendered header text.
///
/// Fallback for flows where no token is at hand (e.g. `/unban` issued as a
/// reply to a forwarded suggestion). Soft path: an absent or malformed
/// marker yields `None`, never an error.
pub fn recover_sender_id(text: &str) -> Option<UserId> {
    for line in text.lines() {
        let Some(rest) = line.trim().strip_prefix(ID_MARKER) else {
            continue;
        };
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        if let Ok(id) = digits.parse::<i64>() {
            return Some(UserId(id));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let actions = [
            Action::Reply {
                target: UserId(111),
            },
            Action::Block {
                target: UserId(-100200),
            },
            Action::Unban {
                target: UserId(222),
            },
            Action::CancelPrompt { admin: UserId(7) },
        ];
        for action in actions {
            let token = action.encode();
            assert!(token.len() <= 64, "token too long for callback data");
            assert_eq!(Action::decode(&token).unwrap(), action);
        }
    }

    #[test]
    fn decode_rejects_malformed_tokens() {
        for token in ["", "reply", "reply:", "reply:abc", "nuke:5", "reply 5"] {
            let err = Action::decode(token).unwrap_err();
            assert!(matches!(err, Error::MalformedAction(_)), "token {token:?}");
        }
    }

    #[test]
    fn recovers_sender_id_from_header_text() {
        let body = "📝 New suggestion from: Alice (@alice)\nID: 111\n\nAdd dark mode";
        assert_eq!(recover_sender_id(body), Some(UserId(111)));
    }

    #[test]
    fn recovery_fails_softly_without_a_marker() {
        assert_eq!(recover_sender_id("no marker here"), None);
        assert_eq!(recover_sender_id("ID: not-a-number"), None);
        assert_eq!(recover_sender_id(""), None);
    }
}
