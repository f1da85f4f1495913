//! Unit test module
//!
//! Middleware unit tests live here, separate from source files.
//! Tests build chains through the public API and drive them with fixed updates.

mod recover_test;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use handler_chain::{handler_fn, Context, Handler};
use serde_json::{json, Value};
use tbot_api::{Chat, Invoker, Message, Params, Update, UpdateKind, User};

pub(crate) struct NullInvoker;

#[async_trait]
impl Invoker for NullInvoker {
    async fn call(&self, _method: &'static str, _params: Params) -> tbot_api::Result<Value> {
        Ok(Value::Null)
    }
}

pub(crate) fn sample_user(id: i64) -> User {
    serde_json::from_value(json!({"id": id, "is_bot": false, "first_name": "Test"})).unwrap()
}

pub(crate) fn message_context(user_id: i64, text: &str) -> Context {
    let mut message = Message::text(1, Chat::private(123), text);
    message.from = Some(sample_user(user_id));
    Context::new(
        Arc::new(NullInvoker),
        Update::new(1, UpdateKind::Message(message)),
    )
}

pub(crate) fn callback_context(data: &str) -> Context {
    let query = serde_json::from_value(json!({
        "id": "cb-1",
        "from": {"id": 7, "is_bot": false, "first_name": "Test"},
        "data": data
    }))
    .unwrap();
    Context::new(
        Arc::new(NullInvoker),
        Update::new(2, UpdateKind::CallbackQuery(query)),
    )
}

pub(crate) type Calls = Arc<Mutex<Vec<String>>>;

/// Terminal handler that records "next".
pub(crate) fn next_recorder(calls: Calls) -> Arc<dyn Handler> {
    Arc::new(handler_fn(move |_ctx| {
        let calls = calls.clone();
        async move {
            calls.lock().unwrap().push("next".to_string());
            Ok(())
        }
    }))
}
