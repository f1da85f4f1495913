use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;

/// One link of the chain. Errors are application errors of any type; the dispatcher reports them
/// to its error sink.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: Context) -> anyhow::Result<()>;
}

/// Handler that does nothing. Terminal handler of a chain built without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHandler;

#[async_trait]
impl Handler for EmptyHandler {
    async fn handle(&self, _ctx: Context) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Adapts an async closure to [`Handler`]. Built by [`handler_fn`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}
