//! Line-local syntax colouring for Python source.
//!
//! Each line is classified on its own; multi-line strings are not tracked.

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Builtin,
    Comment,
    String,
    /// Name following `def`.
    Definition,
    /// Name following `class`.
    Class,
}

/// A classified byte range of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield", "match", "case",
];

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bin", "bool", "bytes", "callable", "chr", "dict", "dir", "divmod",
    "enumerate", "eval", "exec", "filter", "float", "format", "getattr", "hasattr", "hash", "hex",
    "id", "input", "int", "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min",
    "next", "object", "open", "ord", "pow", "print", "range", "repr", "reversed", "round", "set",
    "setattr", "slice", "sorted", "str", "sum", "super", "tuple", "type", "zip",
];

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(
        r#"(?P<comment>#.*)|(?P<string>(?i:[rbuf]{0,2})(?:"(?:[^"\\]|\\.)*"?|'(?:[^'\\]|\\.)*'?))|(?P<word>[A-Za-z_][A-Za-z0-9_]*)"#
    )
    .expect("token regex is valid");
}

pub fn highlight_line(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pending: Option<TokenKind> = None;

    for caps in TOKEN_RE.captures_iter(line) {
        if let Some(m) = caps.name("comment") {
            spans.push(span(m, TokenKind::Comment));
            pending = None;
        } else if let Some(m) = caps.name("string") {
            spans.push(span(m, TokenKind::String));
            pending = None;
        } else if let Some(m) = caps.name("word") {
            let word = m.as_str();
            if let Some(kind) = pending.take() {
                spans.push(span(m, kind));
            } else if KEYWORDS.contains(&word) {
                spans.push(span(m, TokenKind::Keyword));
                pending = match word {
                    "def" => Some(TokenKind::Definition),
                    "class" => Some(TokenKind::Class),
                    _ => None,
                };
            } else if BUILTINS.contains(&word) {
                spans.push(span(m, TokenKind::Builtin));
            }
        }
    }
    spans
}

fn span(m: regex::Match<'_>, kind: TokenKind) -> Span {
    Span {
        start: m.start(),
        end: m.end(),
        kind,
    }
}
