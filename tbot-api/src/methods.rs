//! Method contract and the concrete methods this library ships.
//!
//! Every method is `POST {api}/bot<token>/<name>` with its params form-encoded. Params are built
//! and validated locally, so a malformed request fails with `Required` / `Validation` before any
//! network traffic.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::types::{EditResult, File, InlineKeyboardMarkup, Message, User};

/// Form values of one request, in insertion order.
pub type Params = Vec<(&'static str, String)>;

/// A remote method: its name, its params and the type its `result` decodes into.
pub trait Method: Send + Sync {
    type Response: DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    fn params(&self) -> Result<Params>;
}

/// Target chat: numeric id or `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl ChatTarget {
    fn push(&self, params: &mut Params) -> Result<()> {
        match self {
            ChatTarget::Username(name) if !name.is_empty() => {
                params.push(("chat_id", name.clone()));
            }
            ChatTarget::Id(id) if *id != 0 => {
                params.push(("chat_id", id.to_string()));
            }
            _ => return Err(Error::required(&["ID", "ChannelUsername"])),
        }
        Ok(())
    }
}

impl From<i64> for ChatTarget {
    fn from(id: i64) -> Self {
        ChatTarget::Id(id)
    }
}

impl From<&str> for ChatTarget {
    fn from(username: &str) -> Self {
        ChatTarget::Username(username.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetMe;

impl Method for GetMe {
    type Response = User;

    fn name(&self) -> &'static str {
        "getMe"
    }

    fn params(&self) -> Result<Params> {
        Ok(Params::new())
    }
}

/// Long-poll page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUpdates {
    /// First update to return. Negative values replay `-offset` updates from the end of the queue.
    pub offset: i64,
    /// 1..=100; 0 leaves it to the server (100).
    pub limit: u32,
    /// Long-poll timeout in seconds; 0 is short polling.
    pub timeout: u32,
}

impl GetUpdates {
    /// Updates from `offset` with a 30 second long-poll timeout.
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            limit: 0,
            timeout: 30,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit > 100 {
            return Err(Error::validation("limit", "should be between 1 and 100"));
        }
        Ok(())
    }
}

impl Method for GetUpdates {
    /// Entries stay raw so one malformed update cannot fail the page.
    type Response = Vec<serde_json::Value>;

    fn name(&self) -> &'static str {
        "getUpdates"
    }

    /// Zero-valued fields are omitted.
    fn params(&self) -> Result<Params> {
        self.validate()?;
        let mut params = Params::new();
        if self.offset != 0 {
            params.push(("offset", self.offset.to_string()));
        }
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        if self.timeout > 0 {
            params.push(("timeout", self.timeout.to_string()));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
    Html,
}

impl ParseMode {
    fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
            ParseMode::Html => "HTML",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendMessage {
    pub chat: ChatTarget,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: bool,
    pub disable_notification: bool,
    pub reply_to_message_id: Option<i64>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    pub fn new(chat: impl Into<ChatTarget>, text: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            text: text.into(),
            parse_mode: None,
            disable_web_page_preview: false,
            disable_notification: false,
            reply_to_message_id: None,
            reply_markup: None,
        }
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn reply_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }

    pub fn disable_web_page_preview(mut self) -> Self {
        self.disable_web_page_preview = true;
        self
    }

    pub fn disable_notification(mut self) -> Self {
        self.disable_notification = true;
        self
    }
}

impl Method for SendMessage {
    type Response = Message;

    fn name(&self) -> &'static str {
        "sendMessage"
    }

    fn params(&self) -> Result<Params> {
        let mut params = Params::new();
        self.chat.push(&mut params)?;
        if let Some(id) = self.reply_to_message_id {
            params.push(("reply_to_message_id", id.to_string()));
        }
        if let Some(markup) = &self.reply_markup {
            params.push(("reply_markup", serde_json::to_string(markup)?));
        }
        if self.disable_notification {
            params.push(("disable_notification", "true".to_string()));
        }
        if self.text.is_empty() {
            return Err(Error::required(&["Text"]));
        }
        params.push(("text", self.text.clone()));
        if self.disable_web_page_preview {
            params.push(("disable_web_page_preview", "true".to_string()));
        }
        if let Some(mode) = self.parse_mode {
            params.push(("parse_mode", mode.as_str().to_string()));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone)]
pub struct ForwardMessage {
    pub chat: ChatTarget,
    pub from_chat: ChatTarget,
    pub message_id: i64,
    pub disable_notification: bool,
}

impl ForwardMessage {
    pub fn new(chat: impl Into<ChatTarget>, from_chat: impl Into<ChatTarget>, message_id: i64) -> Self {
        Self {
            chat: chat.into(),
            from_chat: from_chat.into(),
            message_id,
            disable_notification: false,
        }
    }
}

impl Method for ForwardMessage {
    type Response = Message;

    fn name(&self) -> &'static str {
        "forwardMessage"
    }

    fn params(&self) -> Result<Params> {
        let mut params = Params::new();
        self.chat.push(&mut params)?;
        let mut from = Params::new();
        self.from_chat.push(&mut from)?;
        params.extend(from.into_iter().map(|(_, v)| ("from_chat_id", v)));
        if self.message_id == 0 {
            return Err(Error::required(&["MessageID"]));
        }
        params.push(("message_id", self.message_id.to_string()));
        if self.disable_notification {
            params.push(("disable_notification", "true".to_string()));
        }
        Ok(params)
    }
}

/// Chat actions shown to the user while the bot works ("typing", "upload_photo", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordAudio,
    UploadAudio,
    UploadDocument,
    FindLocation,
}

impl ChatAction {
    fn as_str(&self) -> &'static str {
        match self {
            ChatAction::Typing => "typing",
            ChatAction::UploadPhoto => "upload_photo",
            ChatAction::RecordVideo => "record_video",
            ChatAction::UploadVideo => "upload_video",
            ChatAction::RecordAudio => "record_audio",
            ChatAction::UploadAudio => "upload_audio",
            ChatAction::UploadDocument => "upload_document",
            ChatAction::FindLocation => "find_location",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendChatAction {
    pub chat: ChatTarget,
    pub action: ChatAction,
}

impl SendChatAction {
    pub fn new(chat: impl Into<ChatTarget>, action: ChatAction) -> Self {
        Self {
            chat: chat.into(),
            action,
        }
    }
}

impl Method for SendChatAction {
    type Response = bool;

    fn name(&self) -> &'static str {
        "sendChatAction"
    }

    fn params(&self) -> Result<Params> {
        let mut params = Params::new();
        self.chat.push(&mut params)?;
        params.push(("action", self.action.as_str().to_string()));
        Ok(params)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
    pub text: Option<String>,
    pub show_alert: bool,
}

impl AnswerCallbackQuery {
    pub fn new(callback_query_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            callback_query_id: callback_query_id.into(),
            text: Some(text.into()),
            show_alert: false,
        }
    }

    pub fn with_alert(mut self) -> Self {
        self.show_alert = true;
        self
    }
}

impl Method for AnswerCallbackQuery {
    type Response = bool;

    fn name(&self) -> &'static str {
        "answerCallbackQuery"
    }

    fn params(&self) -> Result<Params> {
        if self.callback_query_id.is_empty() {
            return Err(Error::required(&["CallbackQueryID"]));
        }
        let mut params = vec![("callback_query_id", self.callback_query_id.clone())];
        if let Some(text) = self.text.as_ref().filter(|t| !t.is_empty()) {
            params.push(("text", text.clone()));
        }
        if self.show_alert {
            params.push(("show_alert", "true".to_string()));
        }
        Ok(params)
    }
}

/// Message to edit: one sent to a chat, or one sent via inline mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Chat { chat_id: i64, message_id: i64 },
    Inline { inline_message_id: String },
}

impl EditTarget {
    fn push(&self, params: &mut Params) -> Result<()> {
        match self {
            EditTarget::Chat {
                chat_id,
                message_id,
            } => {
                if *chat_id == 0 || *message_id == 0 {
                    return Err(Error::required(&["ChatID", "MessageID"]));
                }
                params.push(("chat_id", chat_id.to_string()));
                params.push(("message_id", message_id.to_string()));
            }
            EditTarget::Inline { inline_message_id } => {
                if inline_message_id.is_empty() {
                    return Err(Error::required(&["InlineMessageID"]));
                }
                params.push(("inline_message_id", inline_message_id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EditMessageText {
    pub target: EditTarget,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl EditMessageText {
    pub fn new(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            target: EditTarget::Chat {
                chat_id,
                message_id,
            },
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    pub fn inline(inline_message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: EditTarget::Inline {
                inline_message_id: inline_message_id.into(),
            },
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }
}

impl Method for EditMessageText {
    type Response = EditResult;

    fn name(&self) -> &'static str {
        "editMessageText"
    }

    fn params(&self) -> Result<Params> {
        let mut params = Params::new();
        self.target.push(&mut params)?;
        if self.text.is_empty() {
            return Err(Error::required(&["Text"]));
        }
        params.push(("text", self.text.clone()));
        if let Some(mode) = self.parse_mode {
            params.push(("parse_mode", mode.as_str().to_string()));
        }
        if let Some(markup) = &self.reply_markup {
            params.push(("reply_markup", serde_json::to_string(markup)?));
        }
        Ok(params)
    }
}

/// Registers (or, with an empty url, removes) the webhook.
#[derive(Debug, Clone, Default)]
pub struct SetWebhook {
    pub url: String,
}

impl SetWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Method for SetWebhook {
    type Response = bool;

    fn name(&self) -> &'static str {
        "setWebhook"
    }

    fn params(&self) -> Result<Params> {
        if !self.url.is_empty() && reqwest::Url::parse(&self.url).is_err() {
            return Err(Error::validation("url", "should be an absolute URL"));
        }
        Ok(vec![("url", self.url.clone())])
    }
}

#[derive(Debug, Clone)]
pub struct GetFile {
    pub file_id: String,
}

impl GetFile {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

impl Method for GetFile {
    type Response = File;

    fn name(&self) -> &'static str {
        "getFile"
    }

    fn params(&self) -> Result<Params> {
        if self.file_id.is_empty() {
            return Err(Error::required(&["FileID"]));
        }
        Ok(vec![("file_id", self.file_id.clone())])
    }
}
