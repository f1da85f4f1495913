//! Wire types: updates, messages, users, chats, callback queries and the response envelope.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope; `result` is kept raw and decoded by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// One incoming event. Identifiers increase strictly within a bot's feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUpdate", into = "RawUpdate")]
pub struct Update {
    pub update_id: i64,
    pub kind: UpdateKind,
}

/// One slot of a getUpdates page.
#[derive(Debug)]
pub enum PageEntry {
    Update(Update),
    /// An entry that failed to decode. `update_id` is kept when it could still be read.
    Invalid {
        update_id: Option<i64>,
        error: serde_json::Error,
    },
}

impl PageEntry {
    pub fn decode(value: serde_json::Value) -> Self {
        let update_id = value.get("update_id").and_then(serde_json::Value::as_i64);
        match serde_json::from_value(value) {
            Ok(update) => PageEntry::Update(update),
            Err(error) => PageEntry::Invalid { update_id, error },
        }
    }

    pub fn update_id(&self) -> Option<i64> {
        match self {
            PageEntry::Update(update) => Some(update.update_id),
            PageEntry::Invalid { update_id, .. } => *update_id,
        }
    }

    pub fn update(&self) -> Option<&Update> {
        match self {
            PageEntry::Update(update) => Some(update),
            PageEntry::Invalid { .. } => None,
        }
    }
}

/// Exactly one populated variant per update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    Message(Message),
    EditedMessage(Message),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    CallbackQuery(CallbackQuery),
    /// An update type this library does not model (e.g. channel posts).
    Unknown,
}

impl UpdateKind {
    pub fn name(&self) -> &'static str {
        match self {
            UpdateKind::Message(_) => "message",
            UpdateKind::EditedMessage(_) => "edited_message",
            UpdateKind::InlineQuery(_) => "inline_query",
            UpdateKind::ChosenInlineResult(_) => "chosen_inline_result",
            UpdateKind::CallbackQuery(_) => "callback_query",
            UpdateKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_query: Option<InlineQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chosen_inline_result: Option<ChosenInlineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    callback_query: Option<CallbackQuery>,
}

impl TryFrom<RawUpdate> for Update {
    type Error = String;

    fn try_from(raw: RawUpdate) -> Result<Self, Self::Error> {
        let mut kinds = Vec::with_capacity(1);
        if let Some(m) = raw.message {
            kinds.push(UpdateKind::Message(m));
        }
        if let Some(m) = raw.edited_message {
            kinds.push(UpdateKind::EditedMessage(m));
        }
        if let Some(q) = raw.inline_query {
            kinds.push(UpdateKind::InlineQuery(q));
        }
        if let Some(r) = raw.chosen_inline_result {
            kinds.push(UpdateKind::ChosenInlineResult(r));
        }
        if let Some(q) = raw.callback_query {
            kinds.push(UpdateKind::CallbackQuery(q));
        }
        if kinds.len() > 1 {
            return Err(format!(
                "update {} populates {} variants, expected one",
                raw.update_id,
                kinds.len()
            ));
        }
        Ok(Update {
            update_id: raw.update_id,
            kind: kinds.pop().unwrap_or(UpdateKind::Unknown),
        })
    }
}

impl From<Update> for RawUpdate {
    fn from(update: Update) -> Self {
        let mut raw = RawUpdate {
            update_id: update.update_id,
            ..Default::default()
        };
        match update.kind {
            UpdateKind::Message(m) => raw.message = Some(m),
            UpdateKind::EditedMessage(m) => raw.edited_message = Some(m),
            UpdateKind::InlineQuery(q) => raw.inline_query = Some(q),
            UpdateKind::ChosenInlineResult(r) => raw.chosen_inline_result = Some(r),
            UpdateKind::CallbackQuery(q) => raw.callback_query = Some(q),
            UpdateKind::Unknown => {}
        }
        raw
    }
}

impl Update {
    pub fn new(update_id: i64, kind: UpdateKind) -> Self {
        Self { update_id, kind }
    }

    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn edited_message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::EditedMessage(m) => Some(m),
            _ => None,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::CallbackQuery(q) => Some(q),
            _ => None,
        }
    }

    pub fn inline_query(&self) -> Option<&InlineQuery> {
        match &self.kind {
            UpdateKind::InlineQuery(q) => Some(q),
            _ => None,
        }
    }

    /// Sender of whatever the update carries.
    pub fn from(&self) -> Option<&User> {
        match &self.kind {
            UpdateKind::Message(m) | UpdateKind::EditedMessage(m) => m.from.as_ref(),
            UpdateKind::CallbackQuery(q) => Some(&q.from),
            UpdateKind::InlineQuery(q) => Some(&q.from),
            UpdateKind::ChosenInlineResult(r) => Some(&r.from),
            UpdateKind::Unknown => None,
        }
    }

    /// Chat of the message, or of the message a callback button was attached to.
    pub fn chat(&self) -> Option<&Chat> {
        match &self.kind {
            UpdateKind::Message(m) | UpdateKind::EditedMessage(m) => Some(&m.chat),
            UpdateKind::CallbackQuery(q) => q.message.as_ref().map(|m| &m.chat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Chat {
    pub fn private(id: i64) -> Self {
        Self {
            id,
            chat_type: "private".to_string(),
            title: None,
            username: None,
            first_name: None,
            last_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub offset: i64,
    pub length: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix time.
    #[serde(default)]
    pub date: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Message {
    /// A text message in `chat`; the other fields stay empty.
    pub fn text(message_id: i64, chat: Chat, text: &str) -> Self {
        Self {
            message_id,
            from: None,
            date: 0,
            chat,
            reply_to_message: None,
            edit_date: None,
            text: Some(text.to_string()),
            entities: Vec::new(),
            caption: None,
        }
    }

    pub fn is_command(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.starts_with('/'))
    }

    /// Splits `/command@bot argument` into `("command", "argument")`.
    ///
    /// The argument is everything after the first whitespace; a `@botname` suffix is dropped
    /// from the command. Only the first token is inspected. `None` when the command name is
    /// empty (`"/ hi"`, `"/@bot"`).
    pub fn command(&self) -> Option<(&str, &str)> {
        let text = self.text.as_deref()?;
        let rest = text.strip_prefix('/')?;
        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg),
            None => (rest, ""),
        };
        let command = match command.find('@') {
            Some(i) => &command[..i],
            None => command,
        };
        if command.is_empty() {
            return None;
        }
        Some((command, arg))
    }

    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date, 0).single()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub data: String,
}

impl CallbackQuery {
    /// `"sex:female"` -> `("sex", "female")`; data without a colon is all prefix.
    pub fn prefix_and_arg(&self) -> (&str, &str) {
        match self.data.split_once(':') {
            Some((prefix, arg)) => (prefix, arg),
            None => (self.data.as_str(), ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Edit methods return either the edited message or `true` (inline messages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditResult {
    Message(Box<Message>),
    Ok(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row; callback data is `prefix` + the matching `data` entry.
    pub fn vertical(prefix: &str, buttons: &[(&str, &str)]) -> Self {
        Self {
            inline_keyboard: buttons
                .iter()
                .map(|(text, data)| {
                    vec![InlineKeyboardButton {
                        text: text.to_string(),
                        url: None,
                        callback_data: Some(format!("{}{}", prefix, data)),
                    }]
                })
                .collect(),
        }
    }

    /// All buttons in a single row.
    pub fn horizontal(prefix: &str, buttons: &[(&str, &str)]) -> Self {
        Self {
            inline_keyboard: vec![buttons
                .iter()
                .map(|(text, data)| InlineKeyboardButton {
                    text: text.to_string(),
                    url: None,
                    callback_data: Some(format!("{}{}", prefix, data)),
                })
                .collect()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(text: &str) -> Message {
        Message::text(1, Chat::private(10), text)
    }

    #[test]
    fn test_command_with_argument() {
        let msg = text_message("/start hello world");
        assert_eq!(msg.command(), Some(("start", "hello world")));
        assert!(msg.is_command());
    }

    #[test]
    fn test_command_without_argument() {
        assert_eq!(text_message("/start").command(), Some(("start", "")));
    }

    #[test]
    fn test_command_strips_bot_name() {
        let msg = text_message("/help@my_bot topics");
        assert_eq!(msg.command(), Some(("help", "topics")));
    }

    #[test]
    fn test_command_splits_on_any_whitespace() {
        let msg = text_message("/echo\nsecond line");
        assert_eq!(msg.command(), Some(("echo", "second line")));
    }

    #[test]
    fn test_empty_command_name() {
        assert_eq!(text_message("/ hello").command(), None);
        assert_eq!(text_message("/@other_bot x").command(), None);
        assert_eq!(text_message("/").command(), None);
    }

    #[test]
    fn test_not_a_command() {
        let msg = text_message("hello /start");
        assert_eq!(msg.command(), None);
        assert!(!msg.is_command());
    }

    #[test]
    fn test_callback_prefix_and_arg() {
        let query = CallbackQuery {
            id: "q".to_string(),
            from: User {
                id: 1,
                is_bot: false,
                first_name: "A".to_string(),
                last_name: None,
                username: None,
            },
            message: None,
            inline_message_id: None,
            data: "sex:female".to_string(),
        };
        assert_eq!(query.prefix_and_arg(), ("sex", "female"));

        let query = CallbackQuery {
            data: "refresh".to_string(),
            ..query
        };
        assert_eq!(query.prefix_and_arg(), ("refresh", ""));
    }

    #[test]
    fn test_decode_message_update() {
        let json = r#"{
            "update_id": 42,
            "message": {
                "message_id": 7,
                "from": {"id": 5, "is_bot": false, "first_name": "Ann"},
                "date": 1700000000,
                "chat": {"id": 5, "type": "private"},
                "text": "hi"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 42);
        let msg = update.message().unwrap();
        assert_eq!(msg.text.as_deref(), Some("hi"));
        assert_eq!(update.from().unwrap().first_name, "Ann");
        assert_eq!(update.chat().unwrap().id, 5);
        assert!(msg.date_time().is_some());
    }

    #[test]
    fn test_decode_unmodelled_update_is_unknown() {
        let json = r#"{"update_id": 3, "channel_post": {"message_id": 1}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.kind, UpdateKind::Unknown);
        assert!(update.from().is_none());
    }

    #[test]
    fn test_decode_rejects_two_variants() {
        let json = r#"{
            "update_id": 3,
            "message": {"message_id": 1, "date": 0, "chat": {"id": 1, "type": "private"}},
            "edited_message": {"message_id": 1, "date": 0, "chat": {"id": 1, "type": "private"}}
        }"#;
        assert!(serde_json::from_str::<Update>(json).is_err());
    }

    #[test]
    fn test_page_entry_keeps_id_of_bad_update() {
        let bad = serde_json::json!({
            "update_id": 10,
            "message": {"message_id": 1, "date": 0, "chat": {"id": 1, "type": "private"}},
            "callback_query": {"id": "q", "from": {"id": 1, "is_bot": false, "first_name": "A"}}
        });
        let entry = PageEntry::decode(bad);
        assert!(matches!(entry, PageEntry::Invalid { update_id: Some(10), .. }));
        assert!(entry.update().is_none());

        let entry = PageEntry::decode(serde_json::json!({"message": "no id"}));
        assert_eq!(entry.update_id(), None);

        let entry = PageEntry::decode(serde_json::json!({"update_id": 11}));
        assert_eq!(entry.update().map(|u| u.update_id), Some(11));
    }

    #[test]
    fn test_encode_keeps_single_variant_key() {
        let update = Update::new(9, UpdateKind::Message(text_message("x")));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["update_id"], 9);
        assert!(value.get("message").is_some());
        assert!(value.get("callback_query").is_none());
    }

    #[test]
    fn test_edit_result_bool_or_message() {
        let ok: EditResult = serde_json::from_str("true").unwrap();
        assert_eq!(ok, EditResult::Ok(true));
        let msg: EditResult = serde_json::from_str(
            r#"{"message_id": 3, "date": 0, "chat": {"id": 1, "type": "private"}, "text": "new"}"#,
        )
        .unwrap();
        assert!(matches!(msg, EditResult::Message(m) if m.text.as_deref() == Some("new")));
    }

    #[test]
    fn test_vertical_keyboard_prefixes_data() {
        let kb = InlineKeyboardMarkup::vertical("sex:", &[("Female", "female"), ("Male", "male")]);
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(
            kb.inline_keyboard[1][0].callback_data.as_deref(),
            Some("sex:male")
        );
    }
}
