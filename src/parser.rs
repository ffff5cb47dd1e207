//! Recursive descent over [`Tokenizer`].
//!
//! ```text
//! line      := pipeline ('&')* (';' line)?
//! pipeline  := unit ('|' pipeline)?
//! unit      := '(' line ')' redir*  |  redir* (word redir*)*
//! redir     := '<' word | '>' word | '>>' word
//! ```

use tracing::trace;

use crate::{
    args::{Span, Token, Tokenizer},
    command::{self, Command, RedirMode},
};

/// Upper bound on the words of a single program invocation, name included.
pub const MAX_ARGV: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("too many args")]
    TooManyArgs,
    #[error("missing file for redirection")]
    MissingRedirTarget,
    #[error("missing )")]
    MissingParen,
    #[error("unexpected {0}")]
    Syntax(String),
    #[error("leftovers: {0}")]
    Trailing(String),
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parses a full line and terminates the resulting tree.
pub fn parse(line: &str) -> Result<Command> {
    let mut tokens = Tokenizer::new(line);

    let raw = parse_line(&mut tokens)?;

    tokens.peek("");
    if !tokens.rest().is_empty() {
        return Err(ParseError::Trailing(tokens.rest().to_owned()));
    }

    let cmd = command::terminate(raw, line);
    trace!(?cmd, "parsed");
    Ok(cmd)
}

fn parse_line(tokens: &mut Tokenizer<'_>) -> Result<Command<Span>> {
    let mut cmd = parse_pipe(tokens)?;

    while tokens.peek("&") {
        tokens.next_token();
        cmd = Command::background(cmd);
    }

    if tokens.peek(";") {
        tokens.next_token();
        cmd = Command::sequence(cmd, parse_line(tokens)?);
    }

    Ok(cmd)
}

fn parse_pipe(tokens: &mut Tokenizer<'_>) -> Result<Command<Span>> {
    let cmd = parse_unit(tokens)?;

    if tokens.peek("|") {
        tokens.next_token();
        return Ok(Command::pipe(cmd, parse_pipe(tokens)?));
    }

    Ok(cmd)
}

fn parse_redirs(tokens: &mut Tokenizer<'_>, redirs: &mut Vec<(Span, RedirMode)>) -> Result<()> {
    while tokens.peek("<>") {
        let mode = match tokens.next_token() {
            (Token::Input, _) => RedirMode::Read,
            (Token::Output, _) => RedirMode::Truncate,
            (Token::Append, _) => RedirMode::Append,
            (_, span) => return Err(ParseError::Syntax(tokens.slice(span).to_owned())),
        };

        match tokens.next_token() {
            (Token::Word, target) => redirs.push((target, mode)),
            _ => return Err(ParseError::MissingRedirTarget),
        }
    }
    Ok(())
}

/// Wraps `cmd` in its redirections, the last one written ends up outermost.
fn with_redirs(cmd: Command<Span>, redirs: Vec<(Span, RedirMode)>) -> Command<Span> {
    redirs
        .into_iter()
        .fold(cmd, |inner, (target, mode)| Command::redir(inner, target, mode))
}

fn parse_block(tokens: &mut Tokenizer<'_>) -> Result<Command<Span>> {
    // opening paren, already peeked by the caller
    tokens.next_token();

    let cmd = parse_line(tokens)?;

    if !tokens.peek(")") {
        return Err(ParseError::MissingParen);
    }
    tokens.next_token();

    let mut redirs = vec![];
    parse_redirs(tokens, &mut redirs)?;

    Ok(with_redirs(cmd, redirs))
}

fn parse_unit(tokens: &mut Tokenizer<'_>) -> Result<Command<Span>> {
    if tokens.peek("(") {
        return parse_block(tokens);
    }

    let mut argv = vec![];
    let mut redirs = vec![];

    parse_redirs(tokens, &mut redirs)?;
    while !tokens.peek("|)&;") {
        match tokens.next_token() {
            (Token::End, _) => break,
            (Token::Word, span) => argv.push(span),
            (_, span) => return Err(ParseError::Syntax(tokens.slice(span).to_owned())),
        }
        if argv.len() > MAX_ARGV {
            return Err(ParseError::TooManyArgs);
        }
        parse_redirs(tokens, &mut redirs)?;
    }

    Ok(with_redirs(Command::Exec { argv }, redirs))
}
