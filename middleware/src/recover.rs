//! Panic recovery.
//!
//! A panic anywhere inside the wrapped chain is caught, turned into an [`Error::Fault`] and handed
//! to the log function together with the backtrace of the panicking thread. The wrapped call then
//! returns `Ok(())`, so one bad update never takes the dispatch loop down.
//!
//! The backtrace is recorded by a process-wide panic hook, installed on first use, that only acts
//! while a recover-wrapped future is being polled on the current thread. Panics elsewhere still
//! reach the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Once};
use std::task::{Context as TaskContext, Poll};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use handler_chain::{middleware, Context, Handler, Middleware};
use tbot_api::Error;
use tracing::error;

pub const DEFAULT_STACK_SIZE: usize = 4 << 10;

/// Receives the recovered fault and, unless disabled, the captured stack. The stack slice is a
/// pooled buffer: copy it if it must outlive the call.
pub type RecoverLogFn = Arc<dyn Fn(&Context, &anyhow::Error, Option<&[u8]>) + Send + Sync>;

/// Only the panicking thread's backtrace is captured; other tasks' stacks are not walked.
#[derive(Clone)]
pub struct RecoverConfig {
    /// Bytes of backtrace kept; `0` means [`DEFAULT_STACK_SIZE`].
    pub stack_size: usize,
    pub disable_print_stack: bool,
    /// `None` logs through `tracing` at error level.
    pub log_fn: Option<RecoverLogFn>,
}

impl Default for RecoverConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            disable_print_stack: false,
            log_fn: None,
        }
    }
}

/// Recover middleware with the default config.
pub fn recover() -> Middleware {
    recover_with_config(RecoverConfig::default())
}

pub fn recover_with_config(cfg: RecoverConfig) -> Middleware {
    let stack_size = if cfg.stack_size == 0 {
        DEFAULT_STACK_SIZE
    } else {
        cfg.stack_size
    };
    let shared = Arc::new(Shared {
        stack_size,
        print_stack: !cfg.disable_print_stack,
        log_fn: cfg.log_fn.unwrap_or_else(default_log_fn),
        pool: Mutex::new(Vec::new()),
    });
    middleware(move |next| {
        Arc::new(Recover {
            next,
            shared: shared.clone(),
        }) as Arc<dyn Handler>
    })
}

fn default_log_fn() -> RecoverLogFn {
    Arc::new(|ctx: &Context, cause: &anyhow::Error, stack: Option<&[u8]>| {
        error!(
            update_id = ctx.update().update_id,
            trace_id = %ctx.trace_id(),
            cause = %cause,
            stack = %stack.map(String::from_utf8_lossy).unwrap_or_default(),
            "PANIC RECOVER"
        );
    })
}

struct Shared {
    stack_size: usize,
    print_stack: bool,
    log_fn: RecoverLogFn,
    pool: Mutex<Vec<Vec<u8>>>,
}

impl Shared {
    fn get_buffer(&self) -> Vec<u8> {
        self.pool
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_else(|| Vec::with_capacity(self.stack_size))
    }

    fn put_buffer(&self, mut buf: Vec<u8>) {
        buf.clear();
        if let Ok(mut pool) = self.pool.lock() {
            pool.push(buf);
        }
    }

    fn report(&self, ctx: &Context, cause: &anyhow::Error, trace: Option<String>) {
        if !self.print_stack {
            (self.log_fn)(ctx, cause, None);
            return;
        }
        let mut buf = self.get_buffer();
        if let Some(trace) = trace {
            let bytes = trace.as_bytes();
            buf.extend_from_slice(&bytes[..bytes.len().min(self.stack_size)]);
        }
        (self.log_fn)(ctx, cause, Some(&buf));
        self.put_buffer(buf);
    }
}

struct Recover {
    next: Arc<dyn Handler>,
    shared: Arc<Shared>,
}

#[async_trait]
impl Handler for Recover {
    async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
        install_panic_hook();
        let outcome = AssertUnwindSafe(Armed(self.next.handle(ctx.clone())))
            .catch_unwind()
            .await;
        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let trace = CAPTURED.with(|c| c.borrow_mut().take());
                let cause = anyhow::Error::new(Error::Fault(panic_message(payload.as_ref())));
                self.shared.report(&ctx, &cause, trace);
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<anyhow::Error>() {
        format!("{:#}", e)
    } else {
        "panic with a non-string payload".to_string()
    }
}

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if ARMED.with(Cell::get) > 0 {
                let trace = format!("{}\n{}", info, Backtrace::force_capture());
                CAPTURED.with(|c| *c.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Marks the current thread as inside a recover boundary for the duration of each poll.
struct Armed<'a>(BoxFuture<'a, anyhow::Result<()>>);

struct ArmGuard;

impl ArmGuard {
    fn new() -> Self {
        ARMED.with(|a| a.set(a.get() + 1));
        ArmGuard
    }
}

impl Drop for ArmGuard {
    fn drop(&mut self) {
        ARMED.with(|a| a.set(a.get().saturating_sub(1)));
    }
}

impl Future for Armed<'_> {
    type Output = anyhow::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let _guard = ArmGuard::new();
        self.0.as_mut().poll(cx)
    }
}
