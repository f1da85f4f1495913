//! Transport: the [`Invoker`] abstraction and its reqwest implementation [`ApiClient`].
//!
//! The poller, the dispatcher and every handler talk to the remote API through `dyn Invoker`,
//! so tests can substitute a scripted implementation.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::methods::{
    AnswerCallbackQuery, EditMessageText, GetFile, GetMe, GetUpdates, Method, Params, SendMessage,
    SetWebhook,
};
use crate::split::{split_message, MAX_MESSAGE_LENGTH};
use crate::types::{ApiResponse, EditResult, File, Message, PageEntry, User};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Sends one named method with its params and returns the raw `result` of a successful envelope.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn call(&self, method: &'static str, params: Params) -> Result<Value>;
}

impl dyn Invoker + '_ {
    /// Validates `method`, sends it and decodes the result into the method's response type.
    pub async fn invoke<M: Method>(&self, method: &M) -> Result<M::Response> {
        let params = method.params()?;
        let value = self.call(method.name(), params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_me(&self) -> Result<User> {
        self.invoke(&GetMe).await
    }

    /// One page of updates, decoded entry by entry.
    ///
    /// An entry that fails to decode comes back as `Err` in its slot so the caller can still
    /// step over its id; a page that is not a list at all fails the whole call.
    pub async fn get_updates(&self, cfg: &GetUpdates) -> Result<Vec<PageEntry>> {
        let page = self.invoke(cfg).await?;
        Ok(page.into_iter().map(PageEntry::decode).collect())
    }

    pub async fn send_message(&self, cfg: &SendMessage) -> Result<Message> {
        self.invoke(cfg).await
    }

    /// Sends `cfg.text` as consecutive messages no larger than the API's text limit.
    ///
    /// Every chunk reuses the other fields of `cfg`. Stops at the first failed send.
    pub async fn send_long_message(&self, cfg: &SendMessage) -> Result<Vec<Message>> {
        let mut sent = Vec::new();
        for chunk in split_message(&cfg.text, MAX_MESSAGE_LENGTH) {
            let part = SendMessage {
                text: chunk.to_string(),
                ..cfg.clone()
            };
            sent.push(self.invoke(&part).await?);
        }
        Ok(sent)
    }

    pub async fn answer_callback_query(&self, cfg: &AnswerCallbackQuery) -> Result<bool> {
        self.invoke(cfg).await
    }

    pub async fn edit_message_text(&self, cfg: &EditMessageText) -> Result<EditResult> {
        self.invoke(cfg).await
    }

    pub async fn set_webhook(&self, cfg: &SetWebhook) -> Result<bool> {
        self.invoke(cfg).await
    }

    pub async fn get_file(&self, cfg: &GetFile) -> Result<File> {
        self.invoke(cfg).await
    }
}

/// reqwest-based [`Invoker`].
#[derive(Clone)]
pub struct ApiClient {
    token: String,
    client: reqwest::Client,
    api_url: String,
}

impl ApiClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_client(token, reqwest::Client::new())
    }

    /// Uses a caller-configured client (proxy, timeouts, TLS).
    pub fn with_client(token: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            token: token.into(),
            client,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Points the client at another server (local Bot API server, mock server in tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Download link for a file returned by `getFile`; `None` when the file has no path yet.
    pub fn file_url(&self, file: &File) -> Option<String> {
        file.file_path
            .as_ref()
            .map(|path| format!("{}/file/bot{}/{}", self.api_url, self.token, path))
    }

    fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 11 {
            return "***".to_string();
        }
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[async_trait]
impl Invoker for ApiClient {
    #[instrument(skip(self, params), fields(token = %self.masked_token()))]
    async fn call(&self, method: &'static str, params: Params) -> Result<Value> {
        debug!(
            method = method,
            params = ?params.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            "request"
        );
        let response = self
            .client
            .post(self.method_url(method))
            .form(&params)
            .send()
            .await
            .map_err(Error::transport)?;

        let status = response.status();
        debug!(method = method, status_code = status.as_u16(), "response");
        if status == StatusCode::FORBIDDEN {
            return Err(Error::Forbidden);
        }

        let body = response.bytes().await.map_err(Error::transport)?;
        let envelope: ApiResponse = serde_json::from_slice(&body)?;
        if !envelope.ok {
            let error_code = envelope.error_code.unwrap_or_default();
            debug!(
                method = method,
                error_code = error_code,
                description = ?envelope.description,
                "api rejected request"
            );
            if error_code == 401 {
                return Err(Error::Unauthorized);
            }
            return Err(Error::Api {
                description: envelope.description.unwrap_or_default(),
                error_code,
                retry_after: envelope.parameters.and_then(|p| p.retry_after),
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}
