//! Inline keyboard demo: answers the callback, edits the keyboard message and counts choices in
//! the session.

use std::sync::Arc;

use anyhow::Result;
use bot_runtime::Bot;
use handler_chain::{handler_fn, Context};
use tbot_api::{
    init_tracing, AnswerCallbackQuery, ApiConfig, EditMessageText, InlineKeyboardMarkup,
    SendMessage,
};
use tbot_middleware::{
    callbacks, command_fn, logging, recover, session, MemorySessionStore, Routes,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

async fn choose_color(ctx: Context, color: String) -> Result<()> {
    let Some(query) = ctx.update().callback_query() else {
        return Ok(());
    };
    let changes = match ctx.session() {
        Some(session) => {
            let changes = session.get::<u64>("changes").unwrap_or(0) + 1;
            session.set("changes", changes)?;
            changes
        }
        None => 1,
    };

    ctx.api()
        .answer_callback_query(&AnswerCallbackQuery::new(
            query.id.clone(),
            "Your settings changed",
        ))
        .await?;

    if let Some(message) = &query.message {
        let text = format!("Your color: {} (changed {} times)", color, changes);
        ctx.api()
            .edit_message_text(&EditMessageText::new(
                message.chat.id,
                message.message_id,
                text,
            ))
            .await?;
    }
    Ok(())
}

async fn ask_color(ctx: Context) -> Result<()> {
    let Some(chat) = ctx.chat() else {
        return Ok(());
    };
    let keyboard = InlineKeyboardMarkup::vertical("color:", &[("Red", "red"), ("Blue", "blue")]);
    ctx.api()
        .send_message(&SendMessage::new(chat.id, "Your color:").reply_markup(keyboard))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env(None)?;
    init_tracing(&config.log_file)?;

    let bot = Bot::from_config(&config)
        .use_middleware(recover())
        .use_middleware(logging())
        .use_middleware(session(Arc::new(MemorySessionStore::new())))
        .use_middleware(callbacks(
            Routes::new()
                .on("color", Arc::new(command_fn(choose_color)))
                .into_map(),
        ))
        .handle(Arc::new(handler_fn(ask_color)));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    info!("Callback Bot starting");
    match bot.serve(cancel).await {
        Err(e) if !e.is_cancelled() => {
            error!(error = %e, "Callback Bot stopped");
            Err(e.into())
        }
        _ => Ok(()),
    }
}
