//! Output helpers linked into every rendered program.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static HTML_SPECIAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[&<>"']"#).unwrap());

/// Escapes the characters that are significant in HTML text and attribute values
pub fn escape_html(text: &str) -> Cow<'_, str> {
    HTML_SPECIAL.replace_all(text, |captures: &Captures| match &captures[0] {
        "&" => "&amp;",
        "<" => "&lt;",
        ">" => "&gt;",
        "\"" => "&quot;",
        _ => "&#39;",
    })
}

/// Converts a value to the text written to the output.
///
/// `null` writes nothing, strings are written verbatim, arrays write their elements
/// separated by `,` and objects write compact JSON.
pub fn to_output(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(items) => Cow::Owned(
            items
                .iter()
                .map(to_output)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Cow::Owned(value.to_string()),
    }
}
