use std::sync::Arc;

use anyhow::Result;
use bot_runtime::Bot;
use chrono::Local;
use handler_chain::{handler_fn, Context};
use tbot_api::{init_tracing, ApiConfig};
use tbot_middleware::{logging, recover};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env(None)?;
    init_tracing(&config.log_file)?;

    let bot = Bot::from_config(&config)
        .use_middleware(recover())
        .use_middleware(logging())
        .handle(Arc::new(handler_fn(|ctx: Context| async move {
            let Some(text) = ctx.message().and_then(|m| m.text.clone()) else {
                return Ok(());
            };
            ctx.reply(format!("Echo: {}", text)).await?;
            Ok(())
        })));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                cancel.cancel();
            }
        }
    });

    info!(start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"), log_file = %config.log_file, "Echo Bot starting");
    match bot.serve(cancel).await {
        Err(e) if !e.is_cancelled() => {
            error!(error = %e, "Echo Bot stopped");
            Err(e.into())
        }
        _ => Ok(()),
    }
}
