//! Quote and parenthesis aware scanning helpers shared by the statement
//! parsers.
//!
//! Single and double quotes suspend the meaning of commas, spaces,
//! parentheses and keywords until the matching quote closes.

/// Tracks whether a scan position is inside a quoted literal.
#[derive(Debug, Default, Clone, Copy)]
struct QuoteState {
    single: bool,
    double: bool,
}

impl QuoteState {
    /// Feeds one character, returning `true` if it toggled a quote.
    fn feed(&mut self, c: char) -> bool {
        match c {
            '\'' if !self.double => {
                self.single = !self.single;
                true
            }
            '"' if !self.single => {
                self.double = !self.double;
                true
            }
            _ => false,
        }
    }

    fn quoted(&self) -> bool {
        self.single || self.double
    }
}

/// Splits on top-level commas, trimming every part. A trailing empty part is
/// dropped.
pub fn split_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteState::default();
    let mut depth = 0usize;

    for c in s.chars() {
        if quotes.feed(c) || quotes.quoted() {
            current.push(c);
            continue;
        }

        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    let last = current.trim();
    if !last.is_empty() {
        parts.push(last.to_string());
    }
    parts
}

/// Splits on whitespace outside quotes.
pub fn split_whitespace(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteState::default();

    for c in s.chars() {
        if !quotes.feed(c) && !quotes.quoted() && c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Byte range `(open, close)` of the first top-level parenthesized group.
///
/// Returns `None` when there is no group or the parentheses are unbalanced.
pub fn top_level_parens(s: &str) -> Option<(usize, usize)> {
    let mut quotes = QuoteState::default();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in s.char_indices() {
        if quotes.feed(c) || quotes.quoted() {
            continue;
        }

        match c {
            '(' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    return start.map(|open| (open, i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether every parenthesis outside quotes is matched and every quote is
/// closed.
pub fn is_balanced(s: &str) -> bool {
    let mut quotes = QuoteState::default();
    let mut depth = 0isize;

    for c in s.chars() {
        if quotes.feed(c) || quotes.quoted() {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !quotes.quoted()
}

/// Byte offset of the first occurrence of `needle` at or after `from` that is
/// outside quotes. Matching is ASCII case-insensitive.
pub fn find_unquoted(s: &str, needle: &str, from: usize) -> Option<usize> {
    let mut quotes = QuoteState::default();
    let haystack = s.as_bytes();
    let needle = needle.as_bytes();

    for (i, c) in s.char_indices() {
        if quotes.feed(c) || quotes.quoted() {
            continue;
        }
        if i >= from
            && haystack.len() - i >= needle.len()
            && haystack[i..i + needle.len()].eq_ignore_ascii_case(needle)
        {
            return Some(i);
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Like [`find_unquoted`], but only matches `keyword` as a whole word so that
/// identifiers such as `created_from` don't end a clause early.
pub fn find_keyword(s: &str, keyword: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut at = from;

    while let Some(pos) = find_unquoted(s, keyword, at) {
        let end = pos + keyword.len();
        let before = pos == 0 || !is_word_byte(bytes[pos - 1]);
        let after = end >= bytes.len() || !is_word_byte(bytes[end]);
        if before && after {
            return Some(pos);
        }
        at = pos + 1;
    }
    None
}

/// Finds a multi-word keyword such as `group by`, allowing any run of
/// whitespace between the words. Returns `(start, end)` byte offsets.
pub fn find_phrase(s: &str, words: &[&str], from: usize) -> Option<(usize, usize)> {
    let (first, rest) = words.split_first()?;
    let mut at = from;

    'search: while let Some(start) = find_keyword(s, first, at) {
        let mut end = start + first.len();
        for word in rest {
            let gap = s[end..].len() - s[end..].trim_start().len();
            if gap == 0 || find_keyword(s, word, end + gap) != Some(end + gap) {
                at = start + 1;
                continue 'search;
            }
            end += gap + word.len();
        }
        return Some((start, end));
    }
    None
}

/// Strips one layer of matching single or double quotes.
///
/// Returns `None` if `s` isn't quote-delimited.
pub fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    let first = s.chars().next()?;
    if (first == '\'' || first == '"') && s.len() >= 2 && s.ends_with(first) {
        return Some(&s[1..s.len() - 1]);
    }
    None
}

/// Removes surrounding whitespace and a single trailing `;`.
pub fn strip_terminator(s: &str) -> &str {
    let s = s.trim();
    s.strip_suffix(';').unwrap_or(s).trim_end()
}
