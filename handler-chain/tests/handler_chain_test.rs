//! Integration tests for [`handler_chain::HandlerChain`].
//!
//! Covers: nested enter/exit order, the empty chain, short-circuiting middleware, derived contexts
//! reaching inner links, and error propagation to the caller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use handler_chain::{around, handler_fn, middleware, Context, Handler, HandlerChain, Middleware};
use serde_json::Value;
use tbot_api::{Chat, Invoker, Message, Params, Update, UpdateKind};

struct NullInvoker;

#[async_trait]
impl Invoker for NullInvoker {
    async fn call(&self, _method: &'static str, _params: Params) -> tbot_api::Result<Value> {
        Ok(Value::Null)
    }
}

fn create_test_context(text: &str) -> Context {
    let message = Message::text(1, Chat::private(456), text);
    Context::new(Arc::new(NullInvoker), Update::new(10, UpdateKind::Message(message)))
}

type Log = Arc<Mutex<Vec<String>>>;

fn recording(name: &'static str, log: Log) -> Middleware {
    around(move |ctx, next| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(format!("{}-enter", name));
            let result = next.handle(ctx).await;
            log.lock().unwrap().push(format!("{}-exit", name));
            result
        }
    })
}

fn recording_handler(log: Log) -> Arc<dyn Handler> {
    Arc::new(handler_fn(move |_ctx| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push("H".to_string());
            Ok(())
        }
    }))
}

/// **Test: middleware [A, B] around H run as A-enter, B-enter, H, B-exit, A-exit.**
#[tokio::test]
async fn test_nested_order() {
    let log: Log = Arc::default();
    let chain = HandlerChain::new()
        .add_middleware(recording("A", log.clone()))
        .add_middleware(recording("B", log.clone()))
        .handler(recording_handler(log.clone()));

    chain.build().handle(create_test_context("hi")).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["A-enter", "B-enter", "H", "B-exit", "A-exit"]
    );
}

/// **Test: a chain without a handler is a no-op that succeeds, with or without middleware.**
#[tokio::test]
async fn test_empty_chain_is_noop() {
    let handler = HandlerChain::new().build();
    assert!(handler.handle(create_test_context("hi")).await.is_ok());

    let log: Log = Arc::default();
    let chain = HandlerChain::new().add_middleware(recording("A", log.clone()));
    assert_eq!(chain.len(), 1);
    chain.build().handle(create_test_context("hi")).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A-enter", "A-exit"]);
}

/// **Test: middleware that does not call next stops the chain.**
#[tokio::test]
async fn test_middleware_short_circuits() {
    let log: Log = Arc::default();
    let gate = around(|ctx: Context, next: Arc<dyn Handler>| async move {
        if ctx.message().and_then(|m| m.text.as_deref()) == Some("blocked") {
            return Ok(());
        }
        next.handle(ctx).await
    });
    let handler = HandlerChain::new()
        .add_middleware(gate)
        .handler(recording_handler(log.clone()))
        .build();

    handler.handle(create_test_context("blocked")).await.unwrap();
    assert!(log.lock().unwrap().is_empty());

    handler.handle(create_test_context("open")).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["H"]);
}

/// **Test: a derived context reaches inner links; the outer context is unchanged.**
#[tokio::test]
async fn test_derived_context_reaches_inner_links() {
    let seen: Arc<Mutex<Option<(bool, String)>>> = Arc::default();
    let seen_clone = seen.clone();

    let flagging = around(|ctx: Context, next: Arc<dyn Handler>| async move {
        let derived = ctx.with_via_webhook(true).with_trace_id("trace-1");
        next.handle(derived).await?;
        assert!(!ctx.via_webhook());
        assert_ne!(ctx.trace_id(), "trace-1");
        Ok(())
    });
    let handler = HandlerChain::new()
        .add_middleware(flagging)
        .handler(Arc::new(handler_fn(move |ctx: Context| {
            let seen = seen_clone.clone();
            async move {
                *seen.lock().unwrap() = Some((ctx.via_webhook(), ctx.trace_id().to_string()));
                Ok(())
            }
        })))
        .build();

    handler.handle(create_test_context("hi")).await.unwrap();
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some((true, "trace-1".to_string()))
    );
}

/// **Test: errors from the handler propagate through every middleware to the caller.**
#[tokio::test]
async fn test_handler_error_propagates() {
    let log: Log = Arc::default();
    let handler = HandlerChain::new()
        .add_middleware(recording("A", log.clone()))
        .handler(Arc::new(handler_fn(|_ctx| async {
            Err(anyhow::anyhow!("handler failed"))
        })))
        .build();

    let err = handler.handle(create_test_context("hi")).await.unwrap_err();
    assert_eq!(err.to_string(), "handler failed");
    assert_eq!(*log.lock().unwrap(), vec!["A-enter", "A-exit"]);
}

/// **Test: a plain decorator function works as middleware.**
#[tokio::test]
async fn test_plain_decorator_middleware() {
    struct Tagged {
        next: Arc<dyn Handler>,
        log: Log,
    }

    #[async_trait]
    impl Handler for Tagged {
        async fn handle(&self, ctx: Context) -> anyhow::Result<()> {
            self.log.lock().unwrap().push("tag".to_string());
            self.next.handle(ctx).await
        }
    }

    let log: Log = Arc::default();
    let log_mw = log.clone();
    let handler = HandlerChain::new()
        .add_middleware(middleware(move |next| {
            Arc::new(Tagged {
                next,
                log: log_mw.clone(),
            }) as Arc<dyn Handler>
        }))
        .handler(recording_handler(log.clone()))
        .build();

    handler.handle(create_test_context("hi")).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["tag", "H"]);
}

#[test]
fn test_context_accessors() {
    let ctx = create_test_context("hello");
    assert_eq!(ctx.update().update_id, 10);
    assert_eq!(ctx.chat().map(|c| c.id), Some(456));
    assert!(!ctx.via_webhook());
    assert!(ctx.session().is_none());
    assert_eq!(ctx.trace_id().len(), 36);
    assert_ne!(create_test_context("x").trace_id(), ctx.trace_id());
}
