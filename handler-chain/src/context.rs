//! Request-scoped context threaded through the chain.

use std::sync::Arc;

use tbot_api::{Chat, Error, Invoker, Message, SendMessage, Update, User};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::session::Session;

/// Everything one update's processing needs: the invoker, the update, a trace id and a few flags.
///
/// A context is never mutated. Middleware that wants to pass something new inward derives a copy
/// with one of the `with_*` methods; cloning is cheap.
#[derive(Clone)]
pub struct Context {
    api: Arc<dyn Invoker>,
    update: Arc<Update>,
    trace_id: Arc<str>,
    via_webhook: bool,
    session: Option<Arc<Session>>,
    cancel: CancellationToken,
}

impl Context {
    /// Context for one update with a fresh trace id.
    pub fn new(api: Arc<dyn Invoker>, update: Update) -> Self {
        Self {
            api,
            update: Arc::new(update),
            trace_id: Uuid::new_v4().to_string().into(),
            via_webhook: false,
            session: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn api(&self) -> &dyn Invoker {
        self.api.as_ref()
    }

    /// Shared handle to the invoker, for work that outlives the handler call.
    pub fn api_handle(&self) -> Arc<dyn Invoker> {
        self.api.clone()
    }

    pub fn update(&self) -> &Update {
        &self.update
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// True when the update arrived through the webhook instead of long polling.
    pub fn via_webhook(&self) -> bool {
        self.via_webhook
    }

    /// Session installed by the session middleware, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    /// Cancelled when the bot shuts down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn message(&self) -> Option<&Message> {
        self.update.message()
    }

    pub fn from(&self) -> Option<&User> {
        self.update.from()
    }

    pub fn chat(&self) -> Option<&Chat> {
        self.update.chat()
    }

    /// Derived context; the fields not named in a `with_*` call are shared with `self`.
    pub fn with_via_webhook(&self, via_webhook: bool) -> Self {
        Self {
            via_webhook,
            ..self.clone()
        }
    }

    /// Attaches the per-sender session loaded by the session middleware.
    pub fn with_session(&self, session: Arc<Session>) -> Self {
        Self {
            session: Some(session),
            ..self.clone()
        }
    }

    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    /// Replaces the generated trace id, e.g. with one propagated from an upstream request.
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into().into(),
            ..self.clone()
        }
    }

    /// Sends `text` to the chat the update came from, split into several messages when it exceeds
    /// the text limit.
    pub async fn reply(&self, text: impl Into<String>) -> tbot_api::Result<Vec<Message>> {
        let chat = self.chat().ok_or_else(|| Error::required(&["ChatID"]))?;
        self.api()
            .send_long_message(&SendMessage::new(chat.id, text))
            .await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update_id", &self.update.update_id)
            .field("kind", &self.update.kind.name())
            .field("trace_id", &self.trace_id)
            .field("via_webhook", &self.via_webhook)
            .field("session", &self.session.is_some())
            .finish()
    }
}
