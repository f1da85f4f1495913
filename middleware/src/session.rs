//! Session middleware.
//!
//! Before the inner chain runs, the store's bytes for this update are decoded into a
//! [`Session`] reachable through [`Context::session`]. Afterwards the session is encoded again
//! and saved only when the encoding changed. Load and decode errors stop the update; save errors
//! are logged.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use handler_chain::{middleware, Context, Handler, Middleware, Session, SessionData};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Where session bytes live.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored bytes for the update in `ctx`; `None` when there is no session yet.
    async fn load(&self, ctx: &Context) -> anyhow::Result<Option<Vec<u8>>>;

    /// Called after the chain when the encoded session differs from what was loaded.
    async fn save(&self, ctx: &Context, data: Vec<u8>) -> anyhow::Result<()>;
}

pub type EncodeFn = Arc<dyn Fn(&SessionData) -> anyhow::Result<Vec<u8>> + Send + Sync>;
pub type DecodeFn = Arc<dyn Fn(&[u8]) -> anyhow::Result<SessionData> + Send + Sync>;

#[derive(Clone)]
pub struct SessionConfig {
    pub store: Arc<dyn SessionStore>,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl SessionConfig {
    /// JSON encoding over `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            encode: Arc::new(|data: &SessionData| -> anyhow::Result<Vec<u8>> {
                Ok(serde_json::to_vec(data)?)
            }),
            decode: Arc::new(|bytes: &[u8]| -> anyhow::Result<SessionData> {
                Ok(serde_json::from_slice(bytes)?)
            }),
        }
    }

    pub fn with_codec(mut self, encode: EncodeFn, decode: DecodeFn) -> Self {
        self.encode = encode;
        self.decode = decode;
        self
    }
}

pub fn session(store: Arc<dyn SessionStore>) -> Middleware {
    session_with_config(SessionConfig::new(store))
}

pub fn session_with_config(cfg: SessionConfig) -> Middleware {
    let cfg = Arc::new(cfg);
    middleware(move |next| {
        Arc::new(SessionHandler {
            next,
            cfg: cfg.clone(),
        }) as Arc<dyn Handler>
    })
}

struct SessionHandler {
    next: Arc<dyn Handler>,
    cfg: Arc<SessionConfig>,
}

#[async_trait]
impl Handler for SessionHandler {
    async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
        let loaded = self.cfg.store.load(&ctx).await?.unwrap_or_default();
        let data = if loaded.is_empty() {
            SessionData::new()
        } else {
            (self.cfg.decode)(&loaded)?
        };

        let session = Arc::new(Session::new(data));
        let result = self.next.handle(ctx.with_session(session.clone())).await;

        match (self.cfg.encode)(&session.snapshot()) {
            Ok(encoded) if encoded != loaded => {
                debug!(update_id = ctx.update().update_id, len = encoded.len(), "saving session");
                if let Err(e) = self.cfg.store.save(&ctx, encoded).await {
                    error!(update_id = ctx.update().update_id, error = %e, "Session save failed");
                }
            }
            Ok(_) => {}
            Err(e) => error!(update_id = ctx.update().update_id, error = %e, "Session encode failed"),
        }
        result
    }
}

/// In-process [`SessionStore`] keyed by the sender's user id, or the chat id when there is no
/// sender. Updates with neither get a fresh session that is never saved.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<i64, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(ctx: &Context) -> Option<i64> {
        ctx.from().map(|u| u.id).or_else(|| ctx.chat().map(|c| c.id))
    }

    /// Raw bytes stored for `key`.
    pub async fn get(&self, key: i64) -> Option<Vec<u8>> {
        self.sessions.read().await.get(&key).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, ctx: &Context) -> anyhow::Result<Option<Vec<u8>>> {
        match Self::key(ctx) {
            Some(key) => Ok(self.get(key).await),
            None => Ok(None),
        }
    }

    async fn save(&self, ctx: &Context, data: Vec<u8>) -> anyhow::Result<()> {
        if let Some(key) = Self::key(ctx) {
            self.sessions.write().await.insert(key, data);
        }
        Ok(())
    }
}
