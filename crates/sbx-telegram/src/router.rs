use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*,
    update_listeners::webhooks,
};
use url::Url;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use sbx_core::{
    blocklist::BlockStore, config::Config, messaging::port::MessagingPort,
    router::ModerationRouter,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub router: Arc<ModerationRouter>,
    pub chat_locks: Arc<ChatLocks>,
}

/// Per-chat locks so one sender's suggestions forward in the order received.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run(cfg: Arc<Config>, store: Arc<dyn BlockStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("sbx started: @{}", me.username());
    }
    info!(
        admins = cfg.admin_ids.len(),
        moderation_chat = cfg.moderation_chat_id.0,
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let router = Arc::new(ModerationRouter::new(
        cfg.clone(),
        store,
        messenger.clone(),
    ));

    // Startup notification (best-effort).
    if let Err(e) = messenger
        .send_rendered(
            cfg.moderation_chat_id,
            "🤖 Bot started and ready to receive suggestions.",
            None,
        )
        .await
    {
        warn!("could not send startup notification: {e}");
    }

    // Farewell on ctrl-c; bounded so shutdown can never hang on it.
    {
        let messenger = messenger.clone();
        let chat = cfg.moderation_chat_id;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tokio::time::timeout(
                    Duration::from_secs(5),
                    messenger.send_rendered(chat, "💤 Bot is stopping...", None),
                )
                .await;
            }
        });
    }

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        router,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    match &cfg.public_url {
        Some(base) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], cfg.bind_port));
            let url: Url = format!("{}/webhook", base.trim_end_matches('/'))
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid SBX_PUBLIC_URL: {e}"))?;

            let mut options = webhooks::Options::new(addr, url);
            if let Some(secret) = &cfg.webhook_secret {
                options = options.secret_token(secret.clone());
            }

            let listener = webhooks::axum(bot, options).await?;
            info!(port = cfg.bind_port, "listening for webhook updates");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("update listener error"),
                )
                .await;
        }
        None => {
            info!("long polling for updates");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
