//! Command and callback routers.
//!
//! Both look up a handler by key and pass it the rest of the payload. The empty key `""` is the
//! default entry used for unknown keys. A key mapped to `None` passes the update on to the next
//! handler unchanged, as does an update the router has nothing to say about.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use handler_chain::{middleware, Context, Handler, Middleware};
use tracing::debug;

/// Handles a routed command or callback with its argument.
#[async_trait]
pub trait Commander: Send + Sync {
    async fn command(&self, ctx: Context, arg: String) -> anyhow::Result<()>;
}

/// Adapts an async closure to [`Commander`]. Built by [`command_fn`].
pub struct CommandFn<F>(F);

pub fn command_fn<F, Fut>(f: F) -> CommandFn<F>
where
    F: Fn(Context, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    CommandFn(f)
}

#[async_trait]
impl<F, Fut> Commander for CommandFn<F>
where
    F: Fn(Context, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn command(&self, ctx: Context, arg: String) -> anyhow::Result<()> {
        (self.0)(ctx, arg).await
    }
}

/// Command name (without `/` and `@bot` suffix) to handler.
pub type CommandMap = HashMap<String, Option<Arc<dyn Commander>>>;
/// Callback data prefix (before the first `:`) to handler.
pub type CallbackMap = HashMap<String, Option<Arc<dyn Commander>>>;

/// Builder for a [`CommandMap`] or [`CallbackMap`].
#[derive(Default, Clone)]
pub struct Routes {
    map: HashMap<String, Option<Arc<dyn Commander>>>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, key: impl Into<String>, commander: Arc<dyn Commander>) -> Self {
        self.map.insert(key.into(), Some(commander));
        self
    }

    /// Handler for keys without their own entry.
    pub fn fallback(self, commander: Arc<dyn Commander>) -> Self {
        self.on("", commander)
    }

    /// Lets `key` through to the next handler, even when a fallback is set.
    pub fn pass(mut self, key: impl Into<String>) -> Self {
        self.map.insert(key.into(), None);
        self
    }

    pub fn into_map(self) -> HashMap<String, Option<Arc<dyn Commander>>> {
        self.map
    }
}

fn resolve<'a>(
    map: &'a HashMap<String, Option<Arc<dyn Commander>>>,
    key: &str,
) -> Option<&'a Arc<dyn Commander>> {
    match map.get(key) {
        Some(entry) => entry.as_ref(),
        None => map.get("").and_then(Option::as_ref),
    }
}

#[derive(Clone, Copy, Debug)]
enum Source {
    Command,
    Callback,
}

struct Router {
    source: Source,
    routes: Arc<HashMap<String, Option<Arc<dyn Commander>>>>,
    next: Arc<dyn Handler>,
}

impl Router {
    /// Routing key and argument for this update, if the router applies to it.
    fn key_and_arg(&self, ctx: &Context) -> Option<(String, String)> {
        match self.source {
            Source::Command => {
                let (command, arg) = ctx.update().message()?.command()?;
                Some((command.to_string(), arg.to_string()))
            }
            Source::Callback => {
                let query = ctx.update().callback_query()?;
                if query.data.is_empty() {
                    return None;
                }
                let (prefix, arg) = query.prefix_and_arg();
                Some((prefix.to_string(), arg.to_string()))
            }
        }
    }
}

#[async_trait]
impl Handler for Router {
    async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
        let Some((key, arg)) = self.key_and_arg(&ctx) else {
            return self.next.handle(ctx).await;
        };
        match resolve(&self.routes, &key) {
            Some(commander) => {
                debug!(source = ?self.source, key = %key, "routing update");
                commander.command(ctx, arg).await
            }
            None => self.next.handle(ctx).await,
        }
    }
}

fn router(source: Source, routes: HashMap<String, Option<Arc<dyn Commander>>>) -> Middleware {
    let routes = Arc::new(routes);
    middleware(move |next| {
        Arc::new(Router {
            source,
            routes: routes.clone(),
            next,
        }) as Arc<dyn Handler>
    })
}

/// Routes messages that start with a bot command.
///
/// `"/start hello world"` calls the `"start"` entry with `"hello world"`; `"/start@my_bot"` is the
/// same command with an empty argument. Only the first token is inspected.
pub fn commands(routes: CommandMap) -> Middleware {
    router(Source::Command, routes)
}

/// Routes callback queries by the data prefix: `"vote:yes"` calls the `"vote"` entry with `"yes"`.
/// Data without a colon is all prefix and the argument is empty.
pub fn callbacks(routes: CallbackMap) -> Middleware {
    router(Source::Callback, routes)
}
