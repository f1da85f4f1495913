//! # Handler chain
//!
//! Composes middleware around one terminal [`Handler`]. A middleware is a decorator: it receives the
//! next handler and returns a handler wrapping it, free to run code before and after `next`, to
//! derive a new [`Context`] for it, or to not call it at all. The first-registered middleware is
//! the outermost one.

pub mod chain;
pub mod context;
pub mod handler;
pub mod session;

pub use chain::{around, middleware, HandlerChain, Middleware};
pub use context::Context;
pub use handler::{handler_fn, EmptyHandler, Handler, HandlerFn};
pub use session::{Session, SessionData};
