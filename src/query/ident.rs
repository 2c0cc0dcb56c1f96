use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlAccessorError;

static CONTROL_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]").expect("control character regex"));

/// Quote a possibly schema-qualified identifier: `users` → `"users"`,
/// `app.users` → `"app"."users"`.
///
/// Any name is accepted as long as no dot-separated part is empty or holds a
/// control character; embedded `"` is doubled.
///
/// # Errors
/// Returns `SqlAccessorError::InvalidIdentifier` for empty parts or control characters.
pub fn quote_ident(name: &str) -> Result<String, SqlAccessorError> {
    let mut quoted = String::with_capacity(name.len() + 4);
    for (i, part) in name.split('.').enumerate() {
        if part.is_empty() || CONTROL_CHAR.is_match(part) {
            return Err(SqlAccessorError::InvalidIdentifier(name.to_owned()));
        }
        if i > 0 {
            quoted.push('.');
        }
        quoted.push('"');
        quoted.push_str(&part.replace('"', "\"\""));
        quoted.push('"');
    }
    Ok(quoted)
}

/// Like [`quote_ident`], but also accepts `*` and `table.*` projections.
pub(crate) fn quote_column(name: &str) -> Result<String, SqlAccessorError> {
    if name == "*" {
        return Ok("*".to_owned());
    }
    match name.strip_suffix(".*") {
        Some(table) => Ok(format!("{}.*", quote_ident(table)?)),
        None => quote_ident(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_and_qualified_names() {
        assert_eq!(quote_ident("users").unwrap(), r#""users""#);
        assert_eq!(quote_ident("app.users").unwrap(), r#""app"."users""#);
        assert_eq!(quote_column("u.*").unwrap(), r#""u".*"#);
        assert_eq!(quote_column("*").unwrap(), "*");
    }

    #[test]
    fn quotes_unicode_and_punctuated_names() {
        assert_eq!(quote_ident("名称").unwrap(), "\"名称\"");
        assert_eq!(quote_ident("first-name").unwrap(), r#""first-name""#);
        assert_eq!(quote_ident("order by").unwrap(), r#""order by""#);
        assert_eq!(
            quote_ident(r#"name"; drop table x; --"#).unwrap(),
            r#""name""; drop table x; --""#
        );
    }

    #[test]
    fn rejects_empty_parts_and_control_characters() {
        for bad in ["", "a..b", "a.*.b", ".users", "tab\tname", "line\nbreak"] {
            assert!(
                matches!(quote_column(bad), Err(SqlAccessorError::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
