use std::rc::Rc;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::syntax::nodes::{AtRule, Comment, Decl, Node, Raws, Rule, Span, Stylesheet};

/// Malformed stylesheet syntax. Always fatal
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(css_module_linker::parse))]
pub struct ParseError {
    pub message: String,
    /// Byte offset of the problem
    pub offset: usize,
    #[source_code]
    src: String,
    #[label("here")]
    span: SourceSpan,
}

/// Parse stylesheet text into a [Stylesheet] which prints back to exactly `input`
pub fn parse(input: &str) -> Result<Stylesheet, ParseError> {
    let mut parser = Parser { input, bytes: input.as_bytes(), pos: 0 };
    let block = parser.parse_block(None)?;
    Ok(Stylesheet {
        nodes: block.nodes,
        after: block.after,
        semicolon: block.semicolon,
        input: Rc::from(input),
    })
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

struct Block {
    nodes: Vec<Node>,
    after: String,
    semicolon: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Semicolon,
    OpenBrace,
    CloseBrace,
    Eof,
}

impl<'a> Parser<'a> {
    /// Parse nodes until the matching `}` (when `opened_at` is the offset of the owning node) or
    /// until the end of input (at the root)
    fn parse_block(&mut self, opened_at: Option<usize>) -> Result<Block, ParseError> {
        let mut nodes = Vec::new();
        let mut last_statement_semicolon = false;
        loop {
            let before_start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace() || b == b';') {
                self.pos += 1;
            }
            let before = self.input[before_start..self.pos].to_string();
            let semicolon = last_statement_semicolon && nodes.last().is_some_and(Node::is_statement);
            match self.peek() {
                None => {
                    return match opened_at {
                        Some(offset) => Err(self.error("Unclosed block", offset)),
                        None => Ok(Block { nodes, after: before, semicolon })
                    }
                }
                Some(b'}') => {
                    return match opened_at {
                        Some(_) => {
                            self.pos += 1;
                            Ok(Block { nodes, after: before, semicolon })
                        }
                        None => Err(self.error("Unexpected }", self.pos))
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    nodes.push(self.parse_comment(before)?);
                }
                Some(_) => {
                    let (node, had_semicolon) = self.parse_statement(before)?;
                    if node.is_statement() {
                        last_statement_semicolon = had_semicolon;
                    }
                    nodes.push(node);
                }
            }
        }
    }

    fn parse_comment(&mut self, before: String) -> Result<Node, ParseError> {
        let start = self.pos;
        let Some(len) = self.input[start + 2..].find("*/") else {
            return Err(self.error("Unclosed comment", start))
        };
        let text = self.input[start + 2..start + 2 + len].to_string();
        self.pos = start + 2 + len + 2;
        Ok(Node::Comment(Comment {
            text,
            raws: Raws { before, ..Raws::default() },
            span: Some(Span { start, end: self.pos })
        }))
    }

    /// Parse a rule, at-rule, or declaration starting at the current position. Also returns
    /// whether a terminating `;` was consumed.
    fn parse_statement(&mut self, before: String) -> Result<(Node, bool), ParseError> {
        let start = self.pos;
        let (end, terminator) = self.scan_statement()?;
        let text = &self.input[start..end];
        let trimmed = text.trim_end();
        let trailing = text[trimmed.len()..].to_string();
        match terminator {
            Terminator::OpenBrace => {
                self.pos = end + 1;
                let block = self.parse_block(Some(start))?;
                let span = Some(Span { start, end: self.pos });
                let node = if trimmed.starts_with('@') {
                    let (name, after_name, params) = split_at_rule(trimmed);
                    Node::AtRule(AtRule {
                        name,
                        after_name,
                        params,
                        nodes: Some(block.nodes),
                        semicolon: block.semicolon,
                        raws: Raws { before, between: trailing, after: block.after },
                        span
                    })
                } else {
                    Node::Rule(Rule {
                        selector: trimmed.to_string(),
                        nodes: block.nodes,
                        semicolon: block.semicolon,
                        raws: Raws { before, between: trailing, after: block.after },
                        span
                    })
                };
                Ok((node, false))
            }
            Terminator::Semicolon | Terminator::CloseBrace | Terminator::Eof => {
                let had_semicolon = terminator == Terminator::Semicolon;
                // Whitespace before `}` or end of input belongs to the parent, not this node
                let (trailing, next) = if had_semicolon {
                    (trailing, end + 1)
                } else {
                    (String::new(), start + trimmed.len())
                };
                self.pos = next;
                let span = Some(Span { start, end: start + trimmed.len() });
                if trimmed.starts_with('@') {
                    let (name, after_name, params) = split_at_rule(trimmed);
                    Ok((Node::AtRule(AtRule {
                        name,
                        after_name,
                        params,
                        nodes: None,
                        semicolon: false,
                        raws: Raws { before, between: trailing, after: String::new() },
                        span
                    }), had_semicolon))
                } else {
                    let decl = self.parse_decl(trimmed, start, before, trailing)?;
                    Ok((Node::Decl(Decl { span, ..decl }), had_semicolon))
                }
            }
        }
    }

    fn parse_decl(&self, text: &str, start: usize, before: String, after: String) -> Result<Decl, ParseError> {
        let Some(colon) = text.find(':') else {
            return Err(self.error(format!("Unknown word {}", text.split_whitespace().next().unwrap_or(text)), start))
        };
        let prop = text[..colon].trim_end();
        if prop.is_empty() {
            return Err(self.error("Declaration without a property", start))
        }
        let rest = &text[colon + 1..];
        let value_start = rest.len() - rest.trim_start().len();
        let between = format!("{}:{}", &text[prop.len()..colon], &rest[..value_start]);
        let mut value = &rest[value_start..];
        let mut important = None;
        if let Some(bang) = value.rfind('!') {
            if value[bang + 1..].trim().eq_ignore_ascii_case("important") {
                let kept = value[..bang].trim_end();
                important = Some(value[kept.len()..].to_string());
                value = kept;
            }
        }
        Ok(Decl {
            prop: prop.to_string(),
            value: value.to_string(),
            important,
            raws: Raws { before, between, after },
            span: None
        })
    }

    /// Find the end of the statement starting at the current position: the first `;`, `{` or `}`
    /// outside of strings, comments and brackets
    fn scan_statement(&self) -> Result<(usize, Terminator), ParseError> {
        let mut idx = self.pos;
        let mut brackets: Vec<usize> = Vec::new();
        loop {
            let Some(&byte) = self.bytes.get(idx) else {
                if let Some(&open) = brackets.last() {
                    return Err(self.error("Unclosed bracket", open))
                }
                return Ok((idx, Terminator::Eof))
            };
            match byte {
                b'"' | b'\'' => idx = self.skip_string(idx)?,
                b'/' if self.bytes.get(idx + 1) == Some(&b'*') => {
                    match self.input[idx + 2..].find("*/") {
                        Some(len) => idx += 2 + len + 2,
                        None => return Err(self.error("Unclosed comment", idx))
                    }
                }
                b'\\' => idx = (idx + 2).min(self.bytes.len()),
                b'(' | b'[' => {
                    brackets.push(idx);
                    idx += 1;
                }
                b')' | b']' => {
                    brackets.pop();
                    idx += 1;
                }
                b';' if brackets.is_empty() => return Ok((idx, Terminator::Semicolon)),
                b'{' if brackets.is_empty() => return Ok((idx, Terminator::OpenBrace)),
                b'}' if brackets.is_empty() => return Ok((idx, Terminator::CloseBrace)),
                _ => idx += 1,
            }
        }
    }

    /// Returns the index after the closing quote
    fn skip_string(&self, open: usize) -> Result<usize, ParseError> {
        let quote = self.bytes[open];
        let mut idx = open + 1;
        loop {
            match self.bytes.get(idx) {
                None => return Err(self.error("Unclosed string", open)),
                Some(b'\\') => idx = (idx + 2).min(self.bytes.len()),
                Some(&b) if b == quote => return Ok(idx + 1),
                Some(_) => idx += 1,
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> ParseError {
        let offset = offset.min(self.input.len());
        ParseError {
            message: message.into(),
            offset,
            src: self.input.to_string(),
            span: (offset, if offset < self.input.len() { 1 } else { 0 }).into(),
        }
    }
}

/// Split `@name params` into name, whitespace after name, and params
fn split_at_rule(text: &str) -> (String, String, String) {
    let body = &text[1..];
    let name_len = body
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    let rest = &body[name_len..];
    let params = rest.trim_start();
    let after_name = &rest[..rest.len() - params.len()];
    (body[..name_len].to_string(), after_name.to_string(), params.to_string())
}
