//! Lexical analysis of code into token strings.

/// Splits code into tokens.
pub trait CodeLexer: Send + Sync {
    /// Lexes `code`, returning the text of every token in order.
    fn lex(&self, code: &str) -> Vec<String>;
}

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "==", "!=", "<=", ">=", "**", "//", "<<", ">>", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "->", ":=", "&&", "||", "::", "=>", "++",
    "--",
];

/// Lexer for Python-like and C-like scripting code.
///
/// Produces identifiers and keywords, numeric literals, whole string literals
/// (single, double and triple quoted), operators by longest match and any other
/// character as a single token. Whitespace separates tokens and is not emitted.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptLexer;

impl CodeLexer for ScriptLexer {
    fn lex(&self, code: &str) -> Vec<String> {
        let mut tokens = vec![];
        let mut rest = code;
        while let Some(c) = rest.chars().next() {
            let len = if c.is_whitespace() {
                rest = &rest[c.len_utf8()..];
                continue;
            } else if c.is_alphabetic() || c == '_' {
                take_while(rest, |c| c.is_alphanumeric() || c == '_')
            } else if c.is_ascii_digit() {
                take_while(rest, |c| c.is_alphanumeric() || c == '_' || c == '.')
            } else if c == '"' || c == '\'' {
                string_len(rest, c)
            } else {
                operator_len(rest)
            };
            tokens.push(rest[..len].to_string());
            rest = &rest[len..];
        }
        tokens
    }
}

fn take_while<P>(s: &str, pred: P) -> usize
where
    P: Fn(char) -> bool,
{
    s.char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(s.len(), |(i, _)| i)
}

/// Length of the string literal at the head of `s`. An unterminated single-quoted
/// literal ends at the line break, an unterminated triple-quoted one at the end.
fn string_len(s: &str, quote: char) -> usize {
    let triple: String = [quote; 3].iter().collect();
    let (delim, multiline) = if s.starts_with(&triple) {
        (triple.as_str(), true)
    } else {
        (&s[..quote.len_utf8()], false)
    };
    let mut iter = s.char_indices().skip(delim.chars().count());
    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            iter.next();
        } else if s[i..].starts_with(delim) {
            return i + delim.len();
        } else if c == '\n' && !multiline {
            return i;
        }
    }
    s.len()
}

fn operator_len(s: &str) -> usize {
    OPERATORS
        .iter()
        .find(|op| s.starts_with(*op))
        .map_or_else(|| s.chars().next().map_or(0, char::len_utf8), |op| op.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(code: &str) -> Vec<String> {
        ScriptLexer.lex(code)
    }

    #[test]
    fn test_python_function() {
        assert_eq!(
            lex("def add(a,b): return a+b"),
            vec!["def", "add", "(", "a", ",", "b", ")", ":", "return", "a", "+", "b"]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(lex("x **= 2"), vec!["x", "**=", "2"]);
        assert_eq!(lex("a<=b!=c"), vec!["a", "<=", "b", "!=", "c"]);
        assert_eq!(lex("f() -> None"), vec!["f", "(", ")", "->", "None"]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex("3.14 + 0xFF + 1_000"), vec!["3.14", "+", "0xFF", "+", "1_000"]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(lex(r#"s = "a b" + 'c'"#), vec!["s", "=", "\"a b\"", "+", "'c'"]);
        assert_eq!(lex(r#""esc\"aped""#), vec![r#""esc\"aped""#]);
        assert_eq!(
            lex("x = \"\"\"multi\nline\"\"\""),
            vec!["x", "=", "\"\"\"multi\nline\"\"\""]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(lex("s = 'abc\nt"), vec!["s", "=", "'abc", "t"]);
        assert_eq!(lex("\"\"\"open"), vec!["\"\"\"open"]);
    }

    #[test]
    fn test_unicode() {
        assert_eq!(lex("变量 = «x»"), vec!["变量", "=", "«", "x", "»"]);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(lex(" \n\t ").is_empty());
    }
}
