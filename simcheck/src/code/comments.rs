//! Pattern-based comment removal.
//!
//! The patterns know nothing about string literals: a `#`, `//` or `/* */` inside a
//! string is stripped like a real comment, e.g. `url = "http://host"` loses
//! everything from `//`, and so does Python's floor division `a // b`.
//! This is an accepted heuristic, not a parser.
use std::sync::LazyLock;

use regex::Regex;

static SLASH_LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*").expect("valid regex"));
static HASH_LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\n]*").expect("valid regex"));
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// Removes `//` line comments, then `#` line comments, then `/* */` block comments.
///
/// Line breaks are kept, so line structure survives. Since line comments go first,
/// a `//` inside a block comment cuts that line, and an unterminated block
/// comment is left as is.
pub fn strip_comments(code: &str) -> String {
    let code = SLASH_LINE_COMMENT.replace_all(code, "");
    let code = HASH_LINE_COMMENT.replace_all(&code, "");
    BLOCK_COMMENT.replace_all(&code, "").into_owned()
}
