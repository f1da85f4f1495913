use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3,11}:[\w-]{35}$").expect("token pattern is valid"));

/// Checks the shape of a bot token, e.g. `110201543:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq`.
pub fn is_valid_token(token: &str) -> bool {
    TOKEN_RE.is_match(token)
}
