use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use handler_chain::{middleware, Context, Handler, Middleware};
use tracing::{info, instrument, warn};

/// Logs every update on the way in and its outcome with the elapsed time on the way out.
pub fn logging() -> Middleware {
    middleware(|next| Arc::new(LoggingHandler { next }) as Arc<dyn Handler>)
}

struct LoggingHandler {
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for LoggingHandler {
    #[instrument(skip(self, ctx), fields(update_id = ctx.update().update_id, trace_id = %ctx.trace_id()))]
    async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
        let update = ctx.update();
        info!(
            kind = update.kind.name(),
            user_id = ?update.from().map(|u| u.id),
            chat_id = ?update.chat().map(|c| c.id),
            via_webhook = ctx.via_webhook(),
            "Received update"
        );

        let started = Instant::now();
        let result = self.next.handle(ctx.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(elapsed_ms, "Processed update"),
            Err(e) => warn!(elapsed_ms, error = %e, "Update handling failed"),
        }
        result
    }
}
