//! Unit tests for the recover middleware.

use std::sync::{Arc, Mutex};

use handler_chain::{handler_fn, Context, HandlerChain};
use tbot_api::Error;

use super::{message_context, next_recorder, Calls};
use crate::{recover, recover_with_config, RecoverConfig, RecoverLogFn};

type Reports = Arc<Mutex<Vec<(String, Option<String>)>>>;

fn capturing_log_fn(reports: Reports) -> RecoverLogFn {
    Arc::new(move |_ctx: &Context, cause: &anyhow::Error, stack: Option<&[u8]>| {
        let stack = stack.map(|s| String::from_utf8_lossy(s).into_owned());
        reports.lock().unwrap().push((cause.to_string(), stack));
    })
}

fn panicking_chain(cfg: RecoverConfig) -> Arc<dyn handler_chain::Handler> {
    HandlerChain::new()
        .add_middleware(recover_with_config(cfg))
        .handler(Arc::new(handler_fn(|_ctx| async {
            panic!("whatever");
        })))
        .build()
}

#[tokio::test]
async fn test_panic_is_absorbed_and_logged_once() {
    let reports: Reports = Arc::default();
    let handler = panicking_chain(RecoverConfig {
        log_fn: Some(capturing_log_fn(reports.clone())),
        ..Default::default()
    });

    let result = handler.handle(message_context(1, "hi")).await;
    assert!(result.is_ok());

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    let (cause, stack) = &reports[0];
    assert_eq!(cause, "panic: whatever");
    let stack = stack.as_deref().expect("stack captured");
    assert!(stack.contains("whatever"));
    assert!(stack.len() <= crate::DEFAULT_STACK_SIZE);
}

#[tokio::test]
async fn test_stack_is_bounded_and_optional() {
    let reports: Reports = Arc::default();
    let handler = panicking_chain(RecoverConfig {
        stack_size: 16,
        log_fn: Some(capturing_log_fn(reports.clone())),
        ..Default::default()
    });
    handler.handle(message_context(1, "hi")).await.unwrap();
    handler.handle(message_context(1, "again")).await.unwrap();

    let handler = panicking_chain(RecoverConfig {
        disable_print_stack: true,
        log_fn: Some(capturing_log_fn(reports.clone())),
        ..Default::default()
    });
    handler.handle(message_context(1, "hi")).await.unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports[0].1.as_ref().is_some_and(|s| s.len() <= 16));
    assert!(reports[1].1.as_ref().is_some_and(|s| s.len() <= 16));
    assert!(reports[2].1.is_none());
}

#[tokio::test]
async fn test_errors_pass_through_untouched() {
    let reports: Reports = Arc::default();
    let handler = HandlerChain::new()
        .add_middleware(recover_with_config(RecoverConfig {
            log_fn: Some(capturing_log_fn(reports.clone())),
            ..Default::default()
        }))
        .handler(Arc::new(handler_fn(|_ctx| async {
            Err(Error::Forbidden.into())
        })))
        .build();

    let err = handler.handle(message_context(1, "hi")).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Forbidden)));
    assert!(reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_no_panic_runs_next_normally() {
    let calls = Calls::default();
    let handler = HandlerChain::new()
        .add_middleware(recover())
        .handler(next_recorder(calls.clone()))
        .build();

    handler.handle(message_context(1, "hi")).await.unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["next"]);
}

#[tokio::test]
async fn test_panic_after_await_point_is_caught() {
    let reports: Reports = Arc::default();
    let handler = HandlerChain::new()
        .add_middleware(recover_with_config(RecoverConfig {
            log_fn: Some(capturing_log_fn(reports.clone())),
            ..Default::default()
        }))
        .handler(Arc::new(handler_fn(|_ctx| async {
            tokio::task::yield_now().await;
            let owned = String::from("owned message");
            std::panic::panic_any(owned);
        })))
        .build();

    handler.handle(message_context(1, "hi")).await.unwrap();
    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "panic: owned message");
}
