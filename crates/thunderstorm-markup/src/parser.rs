//! Markup text parser
//!
//! Recursive descent over the decoded document text:
//!
//! ```text
//! element  := name ( ":" value ( "," value )* [ block ]
//!                  | [ value ] block )
//! block    := "{" element* "}"
//! ```
//!
//! Whitespace and comments (`; ...`, `// ...`, `/* ... */`) may appear
//! between any two tokens. Errors report the 1-based line and column of
//! the offending position.

use std::path::PathBuf;

use thunderstorm_common::{Error, Result};

use crate::tree::{ElemId, ElemShape, InfoTree};
use crate::variable::{is_name_char, Variable};

struct Parser<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Parser<'t> {
    fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skip whitespace and comments
    fn skip_filler(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with(';') || trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').map_or(trimmed.len(), |n| n + 1);
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                self.pos += body.find("*/").map_or(trimmed.len(), |n| n + 4);
            } else {
                break;
            }
        }
    }

    fn error(&self, expected: &str) -> Error {
        let before = &self.text[..self.pos];
        let line = 1 + before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |n| n + 1);
        let column = 1 + before[line_start..].chars().count();
        Error::FileParse {
            path: PathBuf::new(),
            line,
            column,
            expected: expected.to_string(),
        }
    }

    fn name(&mut self) -> Result<&'t str> {
        let rest = self.rest();
        let len: usize = rest
            .chars()
            .take_while(|&c| is_name_char(c))
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            return Err(self.error("element name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn value(&mut self) -> Result<Variable> {
        let mut value = Variable::Undefined;
        match value.try_parse(self.rest()) {
            Some(consumed) => {
                self.pos += consumed;
                Ok(value)
            }
            None => Err(self.error("element value")),
        }
    }

    /// Everything after the element name: payload and children
    fn body(&mut self, tree: &mut InfoTree, id: ElemId) -> Result<()> {
        self.skip_filler();

        if self.peek() == Some(':') {
            self.pos += 1;
            self.skip_filler();
            let first = self.value()?;
            let mut end = self.pos;
            self.skip_filler();

            if self.peek() == Some(',') {
                tree.set_shape(id, ElemShape::ValueList)?;
                tree.create_value(id, "", first)?;
                while self.peek() == Some(',') {
                    self.pos += 1;
                    self.skip_filler();
                    let next = self.value()?;
                    tree.create_value(id, "", next)?;
                    end = self.pos;
                    self.skip_filler();
                }
                self.pos = end;
            } else if self.peek() == Some('{') {
                tree.set_shape(id, ElemShape::ValueBlock)?;
                tree.set_value(id, first)?;
                self.block(tree, id)?;
            } else {
                self.pos = end;
                tree.set_shape(id, ElemShape::Value)?;
                tree.set_value(id, first)?;
            }
            return Ok(());
        }

        if self.peek() == Some('{') {
            tree.set_shape(id, ElemShape::Block)?;
        } else {
            let value = self.value()?;
            self.skip_filler();
            if self.peek() != Some('{') {
                return Err(self.error("\"{\""));
            }
            tree.set_shape(id, ElemShape::ValueBlock)?;
            tree.set_value(id, value)?;
        }
        self.block(tree, id)
    }

    /// `{ child* }`, positioned on the opening brace
    fn block(&mut self, tree: &mut InfoTree, id: ElemId) -> Result<()> {
        self.pos += 1;
        loop {
            self.skip_filler();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(());
                }
                None => return Err(self.error("element name")),
                Some(_) => {
                    let name = self.name()?;
                    let child = tree.create_child(id, name, ElemShape::Block)?;
                    self.body(tree, child)?;
                }
            }
        }
    }
}

impl InfoTree {
    /// Parse one element from the start of `text` into `id`, replacing its
    /// name, payload and children. Returns the bytes consumed.
    ///
    /// On failure `id` may hold a partially parsed subtree.
    pub fn parse_into(&mut self, id: ElemId, text: &str) -> Result<usize> {
        self.remove_all_children(id)?;
        self.set_shape(id, ElemShape::Block)?;

        let mut parser = Parser { text, pos: 0 };
        parser.skip_filler();
        let name = parser.name()?;
        self.set_name(id, name)?;
        parser.body(self, id)?;

        tracing::trace!("Parsed element \"{}\" ({} bytes)", name, parser.pos);
        Ok(parser.pos)
    }
}

/// Length of the whitespace / comment run at the start of `text`
pub(crate) fn filler_len(text: &str) -> usize {
    let mut parser = Parser { text, pos: 0 };
    parser.skip_filler();
    parser.pos
}
