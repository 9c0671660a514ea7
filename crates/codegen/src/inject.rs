//! Wiring the native loader into a generated header class.
//!
//! jextract's output is never parsed as a whole. A small tokenizer that
//! understands comments, string/char literals and text blocks is enough to
//! locate the top-level class body, list its static initializers and find
//! the position of its closing brace. The file is then edited textually, so
//! everything else in it stays byte-for-byte identical.

use jextract_core::{Error, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::loader::LOAD_METHOD;

/// Result of an injection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The static initializer was added
    Injected,
    /// An existing static initializer already calls the loader
    AlreadyPresent,
}

/// Adds `static { <Loader>.load(); }` to a header class.
#[derive(Debug, Clone)]
pub struct LoaderInjector {
    target: PathBuf,
    header_class: String,
    loader_class: String,
    method: String,
}

impl LoaderInjector {
    /// Injector calling `loader_class.load()` from `header_class` in `target`.
    pub fn new(
        target: impl Into<PathBuf>,
        header_class: impl Into<String>,
        loader_class: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            header_class: header_class.into(),
            loader_class: loader_class.into(),
            method: LOAD_METHOD.to_string(),
        }
    }

    /// Call a different static method on the loader.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Source text of the call, e.g. `config_h_NativeLibraryLoader.load()`.
    #[must_use]
    pub fn call_text(&self) -> String {
        format!("{}.{}()", self.loader_class, self.method)
    }

    /// Inject the initializer unless one already calls the loader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetArtifactMissing`] when the file does not exist,
    /// [`Error::TargetClassNotFound`] when it declares no such top-level
    /// class and [`Error::MalformedSource`] when it cannot be tokenized.
    pub fn inject(&self) -> Result<InjectOutcome> {
        if !self.target.is_file() {
            return Err(Error::TargetArtifactMissing {
                path: self.target.clone(),
            });
        }
        let source = std::fs::read_to_string(&self.target)
            .map_err(|e| Error::io(e, &self.target, "read"))?;

        match self.inject_source(&source)? {
            None => {
                info!(
                    "Loader is already injected in {}, skipping",
                    self.target.display()
                );
                Ok(InjectOutcome::AlreadyPresent)
            }
            Some(updated) => {
                std::fs::write(&self.target, updated)
                    .map_err(|e| Error::io(e, &self.target, "write"))?;
                info!("Injected {} into {}", self.call_text(), self.target.display());
                Ok(InjectOutcome::Injected)
            }
        }
    }

    /// Compute the injected source, or `None` when the call is already present.
    ///
    /// # Errors
    ///
    /// Same as [`inject`](Self::inject), minus the existence check.
    pub fn inject_source(&self, source: &str) -> Result<Option<String>> {
        let tokens = tokenize(source).map_err(|message| Error::MalformedSource {
            path: self.target.clone(),
            message,
        })?;

        let body = find_class_body(&tokens, source, &self.header_class).ok_or_else(|| {
            Error::TargetClassNotFound {
                class: self.header_class.clone(),
                path: self.target.clone(),
            }
        })?;

        for init in static_initializers(&tokens, source, &body) {
            if contains_call(&tokens[init.clone()], source, &self.loader_class, &self.method) {
                debug!(class = %self.header_class, "Found existing loader call");
                return Ok(None);
            }
        }

        let close = tokens[body.end].span.start;
        Ok(Some(insert_before_close(source, close, &self.initializer_block())))
    }

    fn initializer_block(&self) -> String {
        format!(
            "    static {{\n        try {{\n            {call};\n        }} catch (Exception exception) {{\n            throw new RuntimeException(exception);\n        }}\n    }}\n",
            call = self.call_text()
        )
    }
}

/// Inject `loader_class.load()` into `header_class` declared in `target`.
///
/// # Errors
///
/// See [`LoaderInjector::inject`].
pub fn inject_loader(target: &Path, header_class: &str, loader_class: &str) -> Result<InjectOutcome> {
    LoaderInjector::new(target, header_class, loader_class).inject()
}

/// Insert `block` on its own lines just before the brace at `close`,
/// separated from the preceding member by a blank line.
fn insert_before_close(source: &str, close: usize, block: &str) -> String {
    let line_start = source[..close].rfind('\n').map_or(0, |idx| idx + 1);
    let brace_on_own_line = source[line_start..close].trim().is_empty();

    let mut out = String::with_capacity(source.len() + block.len() + 2);
    if brace_on_own_line {
        out.push_str(&source[..line_start]);
        out.push('\n');
        out.push_str(block);
        out.push_str(&source[line_start..]);
    } else {
        out.push_str(source[..close].trim_end());
        out.push_str("\n\n");
        out.push_str(block);
        out.push_str(&source[close..]);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ident,
    Punct(char),
    Literal,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    span: Range<usize>,
}

impl Token {
    fn is_ident(&self, source: &str, text: &str) -> bool {
        self.kind == Kind::Ident && &source[self.span.clone()] == text
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split Java source into identifiers, punctuation and literals.
///
/// Comments and whitespace are dropped. Errors describe the unterminated
/// construct and its byte offset.
fn tokenize(source: &str) -> std::result::Result<Vec<Token>, String> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        let rest = &source[start..];
        if rest.starts_with("//") {
            let end = rest.find('\n').map_or(source.len(), |idx| start + idx);
            skip_to(&mut chars, end);
            continue;
        }
        if rest.starts_with("/*") {
            let end = rest[2..]
                .find("*/")
                .map(|idx| start + 2 + idx + 2)
                .ok_or_else(|| format!("unterminated comment at byte {start}"))?;
            skip_to(&mut chars, end);
            continue;
        }
        if rest.starts_with("\"\"\"") {
            let end = find_closing(source, start + 3, "\"\"\"")
                .ok_or_else(|| format!("unterminated text block at byte {start}"))?;
            skip_to(&mut chars, end);
            tokens.push(Token {
                kind: Kind::Literal,
                span: start..end,
            });
            continue;
        }
        if c == '"' || c == '\'' {
            let mut end = None;
            let mut idx = start + 1;
            while idx < bytes.len() {
                match bytes[idx] {
                    b'\\' => idx += 2,
                    b'\n' => break,
                    b if b == c as u8 => {
                        end = Some(idx + 1);
                        break;
                    }
                    _ => idx += 1,
                }
            }
            let end = end.ok_or_else(|| format!("unterminated literal at byte {start}"))?;
            skip_to(&mut chars, end);
            tokens.push(Token {
                kind: Kind::Literal,
                span: start..end,
            });
            continue;
        }
        if is_ident_start(c) || c.is_ascii_digit() {
            let mut end = start + c.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !is_ident_part(next) {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }
            let kind = if c.is_ascii_digit() {
                Kind::Literal
            } else {
                Kind::Ident
            };
            tokens.push(Token {
                kind,
                span: start..end,
            });
            continue;
        }

        tokens.push(Token {
            kind: Kind::Punct(c),
            span: start..start + c.len_utf8(),
        });
    }

    Ok(tokens)
}

fn skip_to(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, end: usize) {
    while chars.peek().is_some_and(|&(idx, _)| idx < end) {
        chars.next();
    }
}

/// Byte offset just past the first unescaped `delimiter` at or after `from`.
fn find_closing(source: &str, from: usize, delimiter: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut idx = from;
    while idx < bytes.len() {
        if bytes[idx] == b'\\' {
            idx += 2;
            continue;
        }
        if bytes[idx..].starts_with(delimiter.as_bytes()) {
            return Some(idx + delimiter.len());
        }
        idx += 1;
    }
    None
}

/// Index of the brace matching the `{` at `open`.
fn matching_brace(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            Kind::Punct('{') => depth += 1,
            Kind::Punct('}') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Token indices `open..close` of the body braces of top-level class `name`.
fn find_class_body(tokens: &[Token], source: &str, name: &str) -> Option<Range<usize>> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            Kind::Punct('{') => depth += 1,
            Kind::Punct('}') => depth = depth.saturating_sub(1),
            Kind::Ident
                if depth == 0
                    && token.is_ident(source, "class")
                    && tokens.get(idx + 1).is_some_and(|t| t.is_ident(source, name)) =>
            {
                let open = tokens
                    .iter()
                    .enumerate()
                    .skip(idx + 2)
                    .find(|(_, t)| t.kind == Kind::Punct('{'))
                    .map(|(i, _)| i)?;
                let close = matching_brace(tokens, open)?;
                return Some(open..close);
            }
            _ => {}
        }
    }
    None
}

/// Token ranges (braces included) of `static { ... }` blocks directly inside `body`.
fn static_initializers(tokens: &[Token], source: &str, body: &Range<usize>) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut idx = body.start + 1;
    while idx < body.end {
        let token = &tokens[idx];
        if token.kind == Kind::Punct('{') {
            let Some(close) = matching_brace(tokens, idx) else {
                break;
            };
            if idx > 0 && tokens[idx - 1].is_ident(source, "static") {
                found.push(idx..close + 1);
            }
            idx = close + 1;
        } else {
            idx += 1;
        }
    }
    found
}

/// Whether `tokens` contain `<loader>.<method>()`, qualified or not.
fn contains_call(tokens: &[Token], source: &str, loader: &str, method: &str) -> bool {
    tokens.windows(5).any(|w| {
        w[0].is_ident(source, loader)
            && w[1].kind == Kind::Punct('.')
            && w[2].is_ident(source, method)
            && w[3].kind == Kind::Punct('(')
            && w[4].kind == Kind::Punct(')')
    })
}
