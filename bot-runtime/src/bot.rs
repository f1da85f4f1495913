use std::sync::{Arc, OnceLock};
use std::time::Duration;

use handler_chain::{Handler, HandlerChain, Middleware};
use tbot_api::{
    ApiClient, ApiConfig, Error, GetUpdates, Invoker, Poller, Result, User, DEFAULT_RETRY_BACKOFF,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::dispatcher::{default_error_sink, Dispatcher, ErrorSink};
use crate::webhook::{self, WebhookState};

/// Slots in the queue between the poller (or webhook) and the dispatch loop.
pub const DEFAULT_UPDATE_BUFFER: usize = 100;

/// Bot runtime: middleware, terminal handler, error sink and polling settings.
///
/// Build it with the chained setters, then run [`Bot::serve`] (long polling) or mount
/// [`Bot::webhook_router`] in an axum server.
pub struct Bot {
    api: Arc<dyn Invoker>,
    chain: HandlerChain,
    on_error: ErrorSink,
    poll: GetUpdates,
    backoff: Duration,
    buffer: usize,
    me: OnceLock<User>,
}

impl Bot {
    /// Bot over `api` with no middleware, the default error sink and polling from offset 0.
    pub fn new(api: Arc<dyn Invoker>) -> Self {
        Self {
            api,
            chain: HandlerChain::new(),
            on_error: default_error_sink(),
            poll: GetUpdates::new(0),
            backoff: DEFAULT_RETRY_BACKOFF,
            buffer: DEFAULT_UPDATE_BUFFER,
            me: OnceLock::new(),
        }
    }

    /// Bot with an [`ApiClient`] and poll settings taken from `config`.
    pub fn from_config(config: &ApiConfig) -> Self {
        let client: ApiClient = config.api_client();
        Self::new(Arc::new(client)).with_poll_config(config.get_updates(0))
    }

    /// Shared handle to the transport.
    pub fn api(&self) -> Arc<dyn Invoker> {
        self.api.clone()
    }

    /// Appends a middleware. The first one added is the outermost.
    pub fn use_middleware(mut self, middleware: Middleware) -> Self {
        self.chain = self.chain.add_middleware(middleware);
        self
    }

    /// Sets the terminal handler.
    pub fn handle(mut self, handler: Arc<dyn Handler>) -> Self {
        self.chain = self.chain.handler(handler);
        self
    }

    /// Replaces the sink that receives handler errors.
    pub fn on_error(mut self, on_error: ErrorSink) -> Self {
        self.on_error = on_error;
        self
    }

    /// Starting cursor, page limit and long-poll timeout.
    pub fn with_poll_config(mut self, poll: GetUpdates) -> Self {
        self.poll = poll;
        self
    }

    /// Delay before re-polling after a retryable getUpdates failure.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Capacity of the channel between the poller and the dispatcher; at least 1.
    pub fn with_update_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// The bot's own user, known once [`Bot::serve`] or [`Bot::serve_webhook`] has started.
    pub fn me(&self) -> Option<&User> {
        self.me.get()
    }

    /// Dispatcher over the chain as configured now.
    pub fn dispatcher(&self, cancel: CancellationToken) -> Dispatcher {
        Dispatcher::new(self.api.clone(), self.chain.build())
            .with_error_sink(self.on_error.clone())
            .with_cancellation(cancel)
    }

    async fn identify(&self, cancel: &CancellationToken) -> Result<()> {
        let me = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            me = self.api.get_me() => me?,
        };
        info!(
            bot_id = me.id,
            username = %me.username.as_deref().unwrap_or("unknown"),
            "Bot identity confirmed"
        );
        // a second serve keeps the first identity
        let _ = self.me.set(me);
        Ok(())
    }

    /// Long-polls and dispatches every update in order until cancelled or polling fails.
    ///
    /// Calls `getMe` first and returns its error without polling. Otherwise returns the poller's
    /// terminal error: [`Error::Cancelled`] after `cancel` fires, or a permanent rejection.
    #[instrument(skip_all)]
    pub async fn serve(&self, cancel: CancellationToken) -> Result<()> {
        self.identify(&cancel).await?;

        let dispatcher = self.dispatcher(cancel.clone());
        let poller = Poller::new(self.api.clone(), self.poll.clone()).with_backoff(self.backoff);
        let (updates, poll_task) = poller.spawn(self.buffer, cancel.clone());
        info!(offset = self.poll.offset, "Bot started");

        dispatcher.drain(updates, false, cancel.clone()).await;

        let result = match poll_task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Fault(e.to_string())),
        };
        match &result {
            Err(e) if !e.is_cancelled() => error!(error = %e, "Polling stopped"),
            _ => info!("Bot stopped"),
        }
        result
    }

    /// Router accepting updates POSTed to `path`.
    ///
    /// Spawns the dispatch task that serves the router's updates one at a time, so it must be
    /// called inside a Tokio runtime. The task stops when `cancel` fires or the router and all its
    /// clones are dropped.
    pub fn webhook_router(&self, path: &str, cancel: CancellationToken) -> axum::Router {
        let (tx, rx) = mpsc::channel(self.buffer);
        let dispatcher = self.dispatcher(cancel.clone());
        tokio::spawn(async move {
            dispatcher.drain(rx, true, cancel).await;
        });
        webhook::router(path, WebhookState { tx })
    }

    /// Confirms the bot identity, then serves the webhook on `listener` until `cancel` fires.
    ///
    /// Registering the public URL with `setWebhook` is left to the caller.
    #[instrument(skip_all, fields(path = path))]
    pub async fn serve_webhook(
        &self,
        listener: TcpListener,
        path: &str,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        self.identify(&cancel).await?;
        let app = self.webhook_router(path, cancel.clone());
        info!(addr = ?listener.local_addr().ok(), "Webhook listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        info!("Webhook stopped");
        Ok(())
    }
}
