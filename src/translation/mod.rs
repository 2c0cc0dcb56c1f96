use std::borrow::Cow;

mod lexer;

use lexer::{
    State, is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    scan_digits, try_start_dollar_quote,
};

/// Placeholder style of the target backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    /// Render the placeholder for 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Postgres => format!("${index}"),
            PlaceholderStyle::Sqlite => format!("?{index}"),
        }
    }

    /// Most bound parameters one statement may carry on this backend.
    #[must_use]
    pub fn max_params(self) -> usize {
        match self {
            PlaceholderStyle::Postgres => 65_535,
            PlaceholderStyle::Sqlite => 32_766,
        }
    }
}

/// A raw SQL fragment rewritten for splicing into a larger statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renumbered<'a> {
    pub sql: Cow<'a, str>,
    /// Highest parameter index the fragment referenced, before shifting.
    pub max_index: usize,
}

/// Rewrite the placeholders of a raw fragment so it can be spliced after
/// `offset` already-bound parameters.
///
/// Accepts `$N`, `?N` and bare `?` (numbered left to right); emits `target`
/// style shifted by `offset`. Placeholders inside quoted strings, comments and
/// dollar-quoted blocks are left alone. Returns a borrowed `Cow` when nothing
/// changes.
///
/// ```rust
/// use sql_accessor::translation::{PlaceholderStyle, renumber_placeholders};
///
/// let out = renumber_placeholders("lower(name) = $1 or code = $2", PlaceholderStyle::Sqlite, 3);
/// assert_eq!(out.sql, "lower(name) = ?4 or code = ?5");
/// assert_eq!(out.max_index, 2);
/// ```
#[must_use]
pub fn renumber_placeholders(sql: &str, target: PlaceholderStyle, offset: usize) -> Renumbered<'_> {
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let mut max_index = 0;
    let mut next_bare = 1;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => state = State::BlockComment(1),
                b'$' | b'?' => {
                    if b == b'$'
                        && let Some((tag, advance)) = try_start_dollar_quote(bytes, idx)
                    {
                        state = State::DollarQuoted(tag);
                        idx = advance + 1;
                        continue;
                    }
                    if let Some((end, n)) = placeholder_at(bytes, idx, next_bare) {
                        next_bare = n + 1;
                        max_index = max_index.max(n);
                        let rendered = target.placeholder(n + offset);
                        if sql[idx..end] != rendered {
                            let buf = out.get_or_insert_with(String::new);
                            buf.push_str(&sql[copied..idx]);
                            buf.push_str(&rendered);
                            copied = end;
                        }
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    Renumbered { sql, max_index }
}

/// Recognise `$N`, `?N` or a bare `?` at `idx`; returns the end offset and index.
fn placeholder_at(bytes: &[u8], idx: usize, next_bare: usize) -> Option<(usize, usize)> {
    match scan_digits(bytes, idx + 1) {
        Some((end, digits)) => digits.parse().ok().map(|n| (end, n)),
        None if bytes[idx] == b'?' => Some((idx + 1, next_bare)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumbers_postgres_fragment_for_sqlite() {
        let res = renumber_placeholders("a = $1 and b = $2", PlaceholderStyle::Sqlite, 0);
        assert_eq!(res.sql, "a = ?1 and b = ?2");
        assert_eq!(res.max_index, 2);
    }

    #[test]
    fn shifts_by_offset_in_same_style() {
        let res = renumber_placeholders("a = $1 or a = $1", PlaceholderStyle::Postgres, 4);
        assert_eq!(res.sql, "a = $5 or a = $5");
        assert_eq!(res.max_index, 1);
    }

    #[test]
    fn numbers_bare_question_marks() {
        let res = renumber_placeholders("a between ? and ?", PlaceholderStyle::Postgres, 1);
        assert_eq!(res.sql, "a between $2 and $3");
        assert_eq!(res.max_index, 2);
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "x = '?1' and y = $1 -- $2\n/* ?3 */ and z = 'it''s'";
        let res = renumber_placeholders(sql, PlaceholderStyle::Sqlite, 0);
        assert_eq!(res.sql, "x = '?1' and y = ?1 -- $2\n/* ?3 */ and z = 'it''s'");
        assert_eq!(res.max_index, 1);
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ $1 $foo$ = $1";
        let res = renumber_placeholders(sql, PlaceholderStyle::Sqlite, 0);
        assert_eq!(res.sql, "$foo$ $1 $foo$ = ?1");
    }

    #[test]
    fn borrows_when_nothing_changes() {
        let sql = "a = $1";
        let res = renumber_placeholders(sql, PlaceholderStyle::Postgres, 0);
        assert!(matches!(res.sql, Cow::Borrowed(_)));
        assert_eq!(res.max_index, 1);
    }
}
