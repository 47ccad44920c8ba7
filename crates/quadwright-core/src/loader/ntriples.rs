//! Line-oriented N-Triples and N-Quads.
//!
//! One statement per line. Parsing stops at the first malformed line and
//! reports its line number.

use super::format::{StatementParser, StatementSink};
use crate::primitives::MAX_LINE_LENGTH;
use crate::{Literal, Statement, Term, UpdateError};
use std::io::{BufRead, Read, Write};

/// Streaming parser for N-Triples (no graph term) or N-Quads.
#[derive(Debug, Clone, Copy)]
pub struct NQuadsParser {
    allow_graph: bool,
}

impl NQuadsParser {
    #[must_use]
    pub fn ntriples() -> Self {
        Self { allow_graph: false }
    }

    #[must_use]
    pub fn nquads() -> Self {
        Self { allow_graph: true }
    }

    /// Parse one line. Blank and comment-only lines yield `None`.
    pub fn parse_line(&self, line: &str, number: u64) -> Result<Option<Statement>, UpdateError> {
        let mut cursor = LineCursor {
            src: line.trim_end_matches(['\n', '\r']),
            pos: 0,
            line: number,
        };

        cursor.skip_ws();
        if cursor.at_end() {
            return Ok(None);
        }

        let subject = cursor.term()?;
        if !subject.is_resource() {
            return Err(cursor.error("literal in subject position"));
        }
        cursor.skip_ws();
        let predicate = cursor.iri()?;
        cursor.skip_ws();
        let object = cursor.term()?;
        cursor.skip_ws();

        let context = match cursor.peek() {
            Some('<' | '_') if self.allow_graph => {
                let graph = cursor.term()?;
                cursor.skip_ws();
                Some(graph)
            }
            Some('<' | '_') => return Err(cursor.error("graph term in N-Triples")),
            _ => None,
        };

        cursor.expect('.')?;
        cursor.skip_ws();
        if !cursor.at_end() {
            return Err(cursor.error("trailing characters after '.'"));
        }

        Ok(Some(Statement {
            subject,
            predicate,
            object,
            context,
        }))
    }
}

impl StatementParser for NQuadsParser {
    fn parse(
        &self,
        reader: &mut dyn BufRead,
        sink: &mut StatementSink<'_>,
    ) -> Result<u64, UpdateError> {
        let mut line = String::new();
        let mut number = 0u64;
        let mut delivered = 0u64;

        loop {
            line.clear();
            // Room for the longest allowed line plus a CRLF terminator.
            let read = (&mut *reader)
                .take(MAX_LINE_LENGTH as u64 + 2)
                .read_line(&mut line)?;
            if read == 0 {
                break;
            }
            number += 1;

            if line.trim_end_matches(['\n', '\r']).len() > MAX_LINE_LENGTH {
                return Err(UpdateError::Parse {
                    line: number,
                    message: format!("line longer than {} bytes", MAX_LINE_LENGTH),
                });
            }

            if let Some(statement) = self.parse_line(&line, number)? {
                sink(statement)?;
                delivered += 1;
            }
        }

        Ok(delivered)
    }
}

/// Serialise statements as N-Quads, one per line. Returns the number written.
pub fn write_nquads<'a, W: Write>(
    writer: &mut W,
    statements: impl IntoIterator<Item = &'a Statement>,
) -> Result<usize, UpdateError> {
    let mut written = 0;
    for statement in statements {
        writeln!(writer, "{}", statement)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

// =============================================================================
// LINE CURSOR
// =============================================================================

struct LineCursor<'a> {
    src: &'a str,
    pos: usize,
    line: u64,
}

impl LineCursor<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some('#'))
    }

    fn error(&self, message: &str) -> UpdateError {
        UpdateError::Parse {
            line: self.line,
            message: format!("{} (column {})", message, self.pos + 1),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), UpdateError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(&format!("expected '{}', found end of line", want))),
        }
    }

    fn term(&mut self) -> Result<Term, UpdateError> {
        match self.peek() {
            Some('<') => self.iri(),
            Some('_') => self.blank(),
            Some('"') => self.literal(),
            Some(c) => Err(self.error(&format!("unexpected '{}'", c))),
            None => Err(self.error("unexpected end of line")),
        }
    }

    fn iri(&mut self) -> Result<Term, UpdateError> {
        Ok(Term::Iri(self.iri_text()?))
    }

    fn iri_text(&mut self) -> Result<String, UpdateError> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some('\\') => match self.bump() {
                    Some('u') => iri.push(self.hex_char(4)?),
                    Some('U') => iri.push(self.hex_char(8)?),
                    _ => return Err(self.error("invalid escape in IRI")),
                },
                Some(c @ (' ' | '<' | '"' | '{' | '}' | '|' | '^' | '`')) => {
                    return Err(self.error(&format!("'{}' not allowed in IRI", c)));
                }
                Some(c) => iri.push(c),
                None => return Err(self.error("unterminated IRI")),
            }
        }
        if !iri.contains(':') {
            return Err(self.error(&format!("relative IRI <{}>", iri)));
        }
        Ok(iri)
    }

    fn blank(&mut self) -> Result<Term, UpdateError> {
        self.expect('_')?;
        self.expect(':')?;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.bump();
        }
        // A label never ends with '.'; that dot terminates the statement.
        while self.pos > start && self.src[..self.pos].ends_with('.') {
            self.pos -= 1;
        }
        if self.pos == start {
            return Err(self.error("empty blank node label"));
        }
        Ok(Term::blank(&self.src[start..self.pos]))
    }

    fn literal(&mut self) -> Result<Term, UpdateError> {
        self.expect('"')?;
        let mut lexical = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => lexical.push(self.escape()?),
                Some(c) => lexical.push(c),
                None => return Err(self.error("unterminated literal")),
            }
        }

        let literal = if self.peek() == Some('@') {
            self.bump();
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-') {
                self.bump();
            }
            if self.pos == start {
                return Err(self.error("empty language tag"));
            }
            Literal::lang(lexical, &self.src[start..self.pos])
        } else if self.src[self.pos..].starts_with("^^") {
            self.pos += 2;
            Literal::typed(lexical, self.iri_text()?)
        } else {
            Literal::simple(lexical)
        };

        Ok(Term::Literal(literal))
    }

    fn escape(&mut self) -> Result<char, UpdateError> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('b') => Ok('\u{8}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('f') => Ok('\u{c}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.hex_char(4),
            Some('U') => self.hex_char(8),
            Some(c) => Err(self.error(&format!("invalid escape '\\{}'", c))),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, UpdateError> {
        let mut value = 0u32;
        for _ in 0..digits {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or_else(|| self.error("escape is not a scalar value"))
    }
}
