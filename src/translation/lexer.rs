/// Where the placeholder scanner currently sits.
#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// ASCII digits starting at `start`, with the offset one past the last digit.
pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let len = bytes
        .get(start..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len == 0 {
        return None;
    }
    std::str::from_utf8(&bytes[start..start + len])
        .ok()
        .map(|digits| (start + len, digits))
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"--".as_slice())
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"/*".as_slice())
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx..idx + 2) == Some(b"*/".as_slice())
}

/// Opening `$tag$` at `start`; returns the tag and the offset of its closing `$`.
///
/// Tags never start with a digit, so `$1$` stays a placeholder.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if bytes.get(start + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let tag_len = bytes
        .get(start + 1..)?
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    let close = start + 1 + tag_len;
    if bytes.get(close) != Some(&b'$') {
        return None;
    }
    let tag = String::from_utf8(bytes[start + 1..close].to_vec()).ok()?;
    Some((tag, close))
}

/// Closing `$tag$` at `idx`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}
