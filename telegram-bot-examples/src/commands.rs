use std::sync::Arc;

use anyhow::Result;
use bot_runtime::Bot;
use handler_chain::Context;
use tbot_api::{init_tracing, ApiConfig};
use tbot_middleware::{command_fn, commands, logging, recover, Routes};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env(None)?;
    init_tracing(&config.log_file)?;

    let routes = Routes::new()
        .on(
            "start",
            Arc::new(command_fn(|ctx: Context, arg: String| async move {
                ctx.reply(format!("received start with arg {}", arg)).await?;
                Ok(())
            })),
        )
        .on(
            "panic",
            Arc::new(command_fn(|_ctx: Context, arg: String| async move {
                panic!("asked to panic with {:?}", arg);
            })),
        )
        .fallback(Arc::new(command_fn(|ctx: Context, arg: String| async move {
            let command = ctx
                .message()
                .and_then(|m| m.command())
                .map(|(command, _)| command.to_string())
                .unwrap_or_default();
            ctx.reply(format!(
                "received unrecognized command {} with arg {}",
                command, arg
            ))
            .await?;
            Ok(())
        })));

    let bot = Bot::from_config(&config)
        .use_middleware(recover())
        .use_middleware(logging())
        .use_middleware(commands(routes.into_map()));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    info!("Commands Bot starting");
    match bot.serve(cancel).await {
        Err(e) if !e.is_cancelled() => {
            error!(error = %e, "Commands Bot stopped");
            Err(e.into())
        }
        _ => Ok(()),
    }
}
