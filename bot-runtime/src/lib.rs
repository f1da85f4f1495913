//! # bot-runtime
//!
//! The [`Bot`] ties an [`Invoker`](tbot_api::Invoker), the long-poll [`Poller`](tbot_api::Poller)
//! and a [`HandlerChain`](handler_chain::HandlerChain) together. Updates from polling and from the
//! webhook go through the same [`Dispatcher`]: one context per update, handled strictly in
//! arrival order, errors reported to the [`ErrorSink`] and never fatal.

mod bot;
mod dispatcher;
mod webhook;

pub use bot::{Bot, DEFAULT_UPDATE_BUFFER};
pub use dispatcher::{default_error_sink, Dispatcher, ErrorSink};
pub use webhook::WebhookState;
