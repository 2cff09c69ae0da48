//! Chunk decoder: recover a record list from heterogeneously encoded content.
//!
//! # Strategies
//! Chunk files arrive in one of three shapes, and the decoder tries a
//! hypothesis for each, in a fixed priority order, stopping at the first that
//! yields a JSON array:
//!
//! | Order | Strategy | Accepts |
//! |-------|----------|---------|
//! | 1 | `Direct` | `[ {...}, ... ]` |
//! | 2 | `QuotedString` | `"[{\"drugName\": ...}]"`, a JSON string whose value is an array |
//! | 3 | `ManualUnescape` | slightly malformed quoted content (raw control characters, bad escapes) |
//!
//! `ManualUnescape` only reverses `\"`, `\n` and `\\`.  Any other escape
//! sequence passes through verbatim, so this path is best-effort and may
//! mis-decode content with escaped control characters or surrogate pairs.
//!
//! # Failure
//! When nothing yields an array the decoder distinguishes a well-formed value
//! of the wrong shape ([`DecodeError::NotASequence`]) from text nothing could
//! parse ([`DecodeError::UnparseableText`]).  Only the latter is worth handing
//! to the recovery extractor.

use serde_json::Value;
use thiserror::Error;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A strategy parsed a structured value, but it was not an array.
    #[error("Parsed content is not a list: found {found}")]
    NotASequence { found: &'static str },
    /// No strategy produced any structured value.
    #[error("Unparseable content: {message}")]
    UnparseableText { message: String },
}

impl DecodeError {
    /// True when the content is worth scanning for partial records.
    pub fn wants_recovery(&self) -> bool {
        matches!(self, DecodeError::UnparseableText { .. })
    }
}

// ── Strategies ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Direct,
    QuotedString,
    ManualUnescape,
}

impl DecodeStrategy {
    pub fn name(self) -> &'static str {
        match self {
            DecodeStrategy::Direct         => "direct JSON array",
            DecodeStrategy::QuotedString   => "JSON-encoded string",
            DecodeStrategy::ManualUnescape => "manually unescaped",
        }
    }
}

/// Outcome of one strategy against one piece of content.
#[derive(Debug)]
enum Attempt {
    Decoded(Vec<Value>),
    /// Precondition not met, or the value is a wrapper a later strategy owns.
    Skipped,
    WrongShape(&'static str),
    Invalid(String),
}

type AttemptFn = fn(&str) -> Attempt;

/// Evaluation order.  Earlier entries win.
const STRATEGIES: [(DecodeStrategy, AttemptFn); 3] = [
    (DecodeStrategy::Direct,         attempt_direct),
    (DecodeStrategy::QuotedString,   attempt_quoted),
    (DecodeStrategy::ManualUnescape, attempt_unescaped),
];

fn attempt_direct(content: &str) -> Attempt {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(records)) => Attempt::Decoded(records),
        // Double-encoded payload; the quoted-string strategy unwraps it.
        Ok(Value::String(_))      => Attempt::Skipped,
        Ok(other)                 => Attempt::WrongShape(kind_of(&other)),
        Err(e)                    => Attempt::Invalid(e.to_string()),
    }
}

fn attempt_quoted(content: &str) -> Attempt {
    if !is_quoted(content) {
        return Attempt::Skipped;
    }
    match serde_json::from_str::<String>(content) {
        Ok(inner) => parse_sequence(&inner),
        Err(e)    => Attempt::Invalid(e.to_string()),
    }
}

fn attempt_unescaped(content: &str) -> Attempt {
    if !is_quoted(content) {
        return Attempt::Skipped;
    }
    parse_sequence(&unescape_minimal(&content[1..content.len() - 1]))
}

fn parse_sequence(text: &str) -> Attempt {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(records)) => Attempt::Decoded(records),
        Ok(other)                 => Attempt::WrongShape(kind_of(&other)),
        Err(e)                    => Attempt::Invalid(e.to_string()),
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// A successful decode together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub records:  Vec<Value>,
    pub strategy: DecodeStrategy,
}

/// Decode `content` into a record list, trying each strategy in order.
pub fn decode(content: &str) -> Result<Vec<Value>, DecodeError> {
    decode_with_strategy(content).map(|d| d.records)
}

/// Like [`decode`], but also reports which strategy succeeded.
pub fn decode_with_strategy(content: &str) -> Result<Decoded, DecodeError> {
    let content = content.trim();
    let mut wrong_shape: Option<&'static str> = None;
    let mut first_error: Option<String>       = None;

    for (strategy, attempt) in STRATEGIES {
        match attempt(content) {
            Attempt::Decoded(records) => return Ok(Decoded { records, strategy }),
            Attempt::Skipped          => {}
            Attempt::WrongShape(kind) => { wrong_shape.get_or_insert(kind); }
            Attempt::Invalid(msg)     => { first_error.get_or_insert(msg); }
        }
    }

    Err(match wrong_shape {
        Some(found) => DecodeError::NotASequence { found },
        None => DecodeError::UnparseableText {
            message: first_error.unwrap_or_else(|| "no decoding strategy applied".into()),
        },
    })
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn is_quoted(content: &str) -> bool {
    content.len() >= 2 && content.starts_with('"') && content.ends_with('"')
}

/// Reverse `\"`, `\n` and `\\` in a single left-to-right pass.
fn unescape_minimal(s: &str) -> String {
    let mut out   = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"')   => out.push('"'),
            Some('n')   => out.push('\n'),
            Some('\\')  => out.push('\\'),
            Some(other) => { out.push('\\'); out.push(other); }
            None        => out.push('\\'),
        }
    }
    out
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}
