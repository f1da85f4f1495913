//! # tbot-api
//!
//! Client side of the bot HTTP API: update and message types, the [`Method`] contract, the
//! [`Invoker`] transport with its reqwest implementation, the long-poll [`Poller`], and the
//! [`split_message`] splitter for oversized texts. Used by handler-chain and bot-runtime.

pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod methods;
pub mod poller;
pub mod split;
pub mod types;
pub mod utils;

pub use client::{ApiClient, Invoker, DEFAULT_API_URL};
pub use config::ApiConfig;
pub use error::{Error, Result};
pub use logger::{init_stdout_tracing, init_tracing, DEFAULT_LOG_FILTER};
pub use methods::{
    AnswerCallbackQuery, ChatAction, ChatTarget, EditMessageText, EditTarget, ForwardMessage,
    GetFile, GetMe, GetUpdates, Method, Params, ParseMode, SendChatAction, SendMessage,
    SetWebhook,
};
pub use poller::{ErrorObserver, Poller, DEFAULT_RETRY_BACKOFF};
pub use split::{split_message, SplitMessage, MAX_MESSAGE_LENGTH};
pub use types::{
    ApiResponse, CallbackQuery, Chat, ChosenInlineResult, EditResult, File, InlineKeyboardButton,
    InlineKeyboardMarkup, InlineQuery, Location, Message, MessageEntity, PageEntry,
    ResponseParameters, Update, UpdateKind, User,
};
pub use utils::is_valid_token;
