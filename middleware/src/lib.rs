//! # tbot-middleware
//!
//! Ready-made middleware for [`handler_chain`]: command and callback routing, panic recovery,
//! update logging and sessions.

mod logging;
mod recover;
mod router;
mod session;

pub use logging::logging;
pub use recover::{recover, recover_with_config, RecoverConfig, RecoverLogFn, DEFAULT_STACK_SIZE};
pub use router::{
    callbacks, command_fn, commands, CallbackMap, CommandFn, CommandMap, Commander, Routes,
};
pub use session::{
    session, session_with_config, DecodeFn, EncodeFn, MemorySessionStore, SessionConfig,
    SessionStore,
};

#[cfg(test)]
mod test;
