//! Scripted [`Invoker`] used by the poller tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tbot_api::{Error, Invoker, Params, Result};

pub enum Step {
    Respond(Value),
    Fail(Error),
}

/// Answers calls from a queue of steps; once the queue is empty every call hangs forever,
/// like a long poll with no new updates.
#[derive(Default)]
pub struct ScriptedInvoker {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl ScriptedInvoker {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    /// `offset` param of every call so far; `None` where it was omitted.
    pub fn offsets(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .map(|(_, params)| {
                params
                    .into_iter()
                    .find(|(k, _)| *k == "offset")
                    .map(|(_, v)| v)
            })
            .collect()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.calls.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("expected call count not reached");
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn call(&self, method: &'static str, params: Params) -> Result<Value> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(value)) => Ok(value),
            Some(Step::Fail(e)) => Err(e),
            None => std::future::pending().await,
        }
    }
}

/// A getUpdates result with one text message per id.
pub fn updates(ids: &[i64]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| {
                json!({
                    "update_id": id,
                    "message": {
                        "message_id": id,
                        "date": 0,
                        "chat": {"id": 1, "type": "private"},
                        "text": format!("message {}", id)
                    }
                })
            })
            .collect(),
    )
}

/// An update populating both `message` and `callback_query`, which does not decode.
pub fn conflicting_update(id: i64) -> Value {
    json!({
        "update_id": id,
        "message": {"message_id": id, "date": 0, "chat": {"id": 1, "type": "private"}},
        "callback_query": {
            "id": "q", "from": {"id": 1, "is_bot": false, "first_name": "A"}, "data": "x"
        }
    })
}

/// A page holding `before`, then the given raw entry, then `after`.
pub fn page_with(before: &[i64], raw: Value, after: &[i64]) -> Value {
    let mut entries = Vec::new();
    if let Value::Array(items) = updates(before) {
        entries.extend(items);
    }
    entries.push(raw);
    if let Value::Array(items) = updates(after) {
        entries.extend(items);
    }
    Value::Array(entries)
}

pub fn rate_limited(secs: u64) -> Error {
    Error::Api {
        description: "Too Many Requests".to_string(),
        error_code: 429,
        retry_after: Some(secs),
    }
}

pub fn api_error(code: i64) -> Error {
    Error::Api {
        description: "Internal Server Error".to_string(),
        error_code: code,
        retry_after: None,
    }
}
