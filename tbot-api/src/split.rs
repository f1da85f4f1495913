//! Message splitter: cuts oversized text into chunks that fit the API's text limit.
//!
//! Chunk size is measured in UTF-8 bytes. A chunk grows by alternating runs of whitespace and
//! non-whitespace; the cut goes after the last complete word that fit (the checkpoint). When not even
//! one word fits, the word is cut at the byte limit on a char boundary.

/// Maximum length of a text message, in bytes.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Splits `text` into chunks of at most `max_chunk_size` bytes.
///
/// Leading whitespace of every chunk and trailing whitespace of the text are dropped; the
/// whitespace run a cut lands on is consumed. All-whitespace input yields nothing. A single
/// character wider than `max_chunk_size` is emitted on its own.
pub fn split_message(text: &str, max_chunk_size: usize) -> SplitMessage<'_> {
    SplitMessage {
        text,
        max: max_chunk_size,
        pos: 0,
    }
}

/// Lazy iterator returned by [`split_message`].
#[derive(Debug)]
pub struct SplitMessage<'a> {
    text: &'a str,
    max: usize,
    pos: usize,
}

impl<'a> SplitMessage<'a> {
    /// Advances `cur` over chars matching `pred`. Returns true when the scan must stop: the next
    /// char would overflow the chunk started at `start`, or the text ended.
    fn walk(&self, start: usize, cur: &mut usize, pred: impl Fn(char) -> bool) -> bool {
        for c in self.text[*cur..].chars() {
            if !pred(c) {
                break;
            }
            if *cur + c.len_utf8() - start > self.max {
                return true;
            }
            *cur += c.len_utf8();
        }
        *cur >= self.text.len()
    }
}

impl<'a> Iterator for SplitMessage<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
        if self.pos >= self.text.len() {
            return None;
        }

        let start = self.pos;
        let mut cur = start;
        let mut checkpoint = start;
        loop {
            if self.walk(start, &mut cur, char::is_whitespace) {
                break;
            }
            if self.walk(start, &mut cur, |c| !c.is_whitespace()) {
                break;
            }
            checkpoint = cur;
        }

        let end = if checkpoint == start {
            // no word boundary within the limit: hard cut, at least one char
            if cur == start {
                start + self.text[start..].chars().next().map_or(0, char::len_utf8)
            } else {
                cur
            }
        } else if cur >= self.text.len() {
            self.text.len()
        } else {
            checkpoint
        };

        self.pos = end;
        Some(self.text[start..end].trim_end())
    }
}
