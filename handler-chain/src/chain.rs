use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::handler::{handler_fn, EmptyHandler, Handler};

/// Decorator over the next handler.
pub type Middleware = Arc<dyn Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync>;

/// Wraps a plain decorator function as a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Middleware from an async closure that gets the context and the next handler.
///
/// ```ignore
/// let timing = around(|ctx, next| async move {
///     let started = std::time::Instant::now();
///     let result = next.handle(ctx).await;
///     tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "handled");
///     result
/// });
/// ```
pub fn around<F, Fut>(f: F) -> Middleware
where
    F: Fn(Context, Arc<dyn Handler>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Arc<dyn Handler>| {
        let f = f.clone();
        Arc::new(handler_fn(move |ctx| f(ctx, next.clone()))) as Arc<dyn Handler>
    })
}

/// Ordered middleware plus an optional terminal handler.
///
/// `build` composes `m[0](m[1](...m[n-1](handler)))`: the first-registered middleware runs first on
/// the way in and last on the way out.
#[derive(Clone, Default)]
pub struct HandlerChain {
    middleware: Vec<Middleware>,
    handler: Option<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Empty chain: no middleware, no terminal handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it wraps every middleware added after it.
    pub fn add_middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Sets the terminal handler, replacing any previous one.
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Number of middleware registered.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Composes the chain. Without a terminal handler the innermost link is [`EmptyHandler`].
    pub fn build(&self) -> Arc<dyn Handler> {
        let terminal = self
            .handler
            .clone()
            .unwrap_or_else(|| Arc::new(EmptyHandler));
        debug!(
            middleware = self.middleware.len(),
            has_handler = self.handler.is_some(),
            "building handler chain"
        );
        self.middleware
            .iter()
            .rev()
            .fold(terminal, |next, mw| mw(next))
    }
}
