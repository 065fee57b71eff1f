use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    domain::{ChatId, UserId},
    errors::Error,
    Result,
};

/// Typed configuration, constructed once at startup and passed explicitly.
///
/// Missing or invalid required values abort startup; nothing degrades
/// silently mid-operation.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub admin_ids: Vec<i64>,
    pub moderation_chat_id: ChatId,
    pub db_path: PathBuf,

    // Webhook mode is selected by the presence of `public_url`; otherwise
    // the bot long-polls.
    pub public_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub bind_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("SBX_BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("SBX_BOT_TOKEN environment variable is required".to_string())
        })?;

        let admin_ids = parse_csv_i64(env_str("SBX_ADMIN_IDS"));
        if admin_ids.is_empty() {
            return Err(Error::Config(
                "SBX_ADMIN_IDS must contain at least one comma-separated numeric id".to_string(),
            ));
        }

        let moderation_chat_id = env_str("SBX_MODERATION_CHAT_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(ChatId)
            .ok_or_else(|| {
                Error::Config("SBX_MODERATION_CHAT_ID must be set to a numeric chat id".to_string())
            })?;

        let db_path = env_str("SBX_DB_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("suggestions.db"));
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let public_url = env_str("SBX_PUBLIC_URL").and_then(non_empty);
        let webhook_secret = env_str("SBX_WEBHOOK_SECRET").and_then(non_empty);
        let bind_port = env_str("PORT")
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Self {
            bot_token,
            admin_ids,
            moderation_chat_id,
            db_path,
            public_url,
            webhook_secret,
            bind_port,
        })
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin_ids.contains(&user.0)
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_ids_tolerating_whitespace_and_blanks() {
        let ids = parse_csv_i64(Some(" 12, 34 ,,x,56 ".to_string()));
        assert_eq!(ids, vec![12, 34, 56]);
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn admin_membership_checks_the_configured_set() {
        let cfg = Config {
            bot_token: "t".to_string(),
            admin_ids: vec![7, 8],
            moderation_chat_id: ChatId(-100),
            db_path: PathBuf::from("/tmp/x.db"),
            public_url: None,
            webhook_secret: None,
            bind_port: 8080,
        };
        assert!(cfg.is_admin(UserId(7)));
        assert!(!cfg.is_admin(UserId(9)));
    }
}
