use std::sync::Arc;

use handler_chain::{Context, Handler};
use tbot_api::{Invoker, Update};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Receives every error a dispatched chain returns. Errors never stop dispatching.
pub type ErrorSink = Arc<dyn Fn(&Context, &anyhow::Error) + Send + Sync>;

/// Logs the error with the update id and trace id.
pub fn default_error_sink() -> ErrorSink {
    Arc::new(|ctx: &Context, err: &anyhow::Error| {
        error!(
            update_id = ctx.update().update_id,
            trace_id = %ctx.trace_id(),
            via_webhook = ctx.via_webhook(),
            error = %format!("{:#}", err),
            "Handler chain failed"
        );
    })
}

/// Runs a built chain for single updates.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn Invoker>,
    handler: Arc<dyn Handler>,
    on_error: ErrorSink,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Dispatcher running `handler` for every update, with the default error sink.
    pub fn new(api: Arc<dyn Invoker>, handler: Arc<dyn Handler>) -> Self {
        Self {
            api,
            handler,
            on_error: default_error_sink(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the sink that receives handler errors.
    pub fn with_error_sink(mut self, on_error: ErrorSink) -> Self {
        self.on_error = on_error;
        self
    }

    /// Token handed to every context; handlers can watch it for shutdown.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds the context for `update` and runs the chain. Errors go to the sink.
    #[instrument(skip(self, update), fields(update_id = update.update_id, kind = update.kind.name()))]
    pub async fn dispatch(&self, update: Update, via_webhook: bool) {
        let ctx = Context::new(self.api.clone(), update)
            .with_via_webhook(via_webhook)
            .with_cancellation(self.cancel.clone());
        debug!(trace_id = %ctx.trace_id(), "dispatching update");

        if let Err(e) = self.handler.handle(ctx.clone()).await {
            (self.on_error)(&ctx, &e);
        }
    }

    /// Dispatches updates from `updates` one at a time until the channel closes or `cancel` fires.
    pub async fn drain(
        &self,
        mut updates: mpsc::Receiver<Update>,
        via_webhook: bool,
        cancel: CancellationToken,
    ) {
        loop {
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(via_webhook, "dispatch loop cancelled");
                    break;
                }
                update = updates.recv() => match update {
                    Some(update) => update,
                    None => {
                        info!(via_webhook, "update channel closed");
                        break;
                    }
                },
            };
            self.dispatch(update, via_webhook).await;
        }
    }
}
