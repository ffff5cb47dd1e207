use std::ops::Range;

/// Byte range of a word inside the line it was read from.
pub type Span = Range<usize>;

const WHITESPACE: &str = " \t\r\n\x0b";
const SYMBOLS: &str = "<|>&;()";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Character {
    WhiteSpace,
    Symbol,
    Other,
}

impl Character {
    fn map(c: char) -> Self {
        if WHITESPACE.contains(c) {
            Self::WhiteSpace
        } else if SYMBOLS.contains(c) {
            Self::Symbol
        } else {
            Self::Other
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// `|`
    Pipe,
    /// `(`
    Open,
    /// `)`
    Close,
    /// `;`
    Semicolon,
    /// `&`
    Ampersand,
    /// `<`
    Input,
    /// `>`
    Output,
    /// `>>`
    Append,
    Word,
    End,
}

/// Cursor over one input line.
///
/// Tokens are reported as spans into the line; nothing is copied until the
/// command tree is terminated.
pub struct Tokenizer<'line> {
    line: &'line str,
    pos: usize,
}

impl<'line> Tokenizer<'line> {
    pub fn new(line: &'line str) -> Self {
        Self { line, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.line[self.pos..];
        self.pos += rest
            .find(|c| Character::map(c) != Character::WhiteSpace)
            .unwrap_or(rest.len());
    }

    /// Skips whitespace and reports whether the next character is one of
    /// `candidates`, without consuming it.
    pub fn peek(&mut self, candidates: &str) -> bool {
        self.skip_whitespace();
        self.line[self.pos..]
            .chars()
            .next()
            .is_some_and(|c| candidates.contains(c))
    }

    pub fn next_token(&mut self) -> (Token, Span) {
        self.skip_whitespace();

        let start = self.pos;
        let rest = &self.line[start..];

        let (token, len) = match rest.chars().next() {
            None => (Token::End, 0),
            Some('|') => (Token::Pipe, 1),
            Some('(') => (Token::Open, 1),
            Some(')') => (Token::Close, 1),
            Some(';') => (Token::Semicolon, 1),
            Some('&') => (Token::Ampersand, 1),
            Some('<') => (Token::Input, 1),
            Some('>') if rest[1..].starts_with('>') => (Token::Append, 2),
            Some('>') => (Token::Output, 1),
            Some(_) => {
                let len = rest
                    .find(|c| Character::map(c) != Character::Other)
                    .unwrap_or(rest.len());
                (Token::Word, len)
            }
        };

        self.pos += len;
        let span = start..self.pos;

        self.skip_whitespace();

        (token, span)
    }

    /// Unconsumed remainder of the line.
    pub fn rest(&self) -> &'line str {
        &self.line[self.pos..]
    }

    pub fn slice(&self, span: Span) -> &'line str {
        &self.line[span]
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = (Token, Span);

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            (Token::End, _) => None,
            token => Some(token),
        }
    }
}
