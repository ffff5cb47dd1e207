use std::{fmt, os::fd::RawFd};

use itertools::Itertools as _;

use crate::args::Span;

pub const STDIN: RawFd = 0;
pub const STDOUT: RawFd = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirMode {
    /// `<`, read only
    Read,
    /// `>`, write, create and truncate
    Truncate,
    /// `>>`, write, create and append
    Append,
}

impl RedirMode {
    /// Descriptor the redirection rebinds.
    pub fn slot(self) -> RawFd {
        match self {
            RedirMode::Read => STDIN,
            RedirMode::Truncate | RedirMode::Append => STDOUT,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            RedirMode::Read => "<",
            RedirMode::Truncate => ">",
            RedirMode::Append => ">>",
        }
    }
}

/// Parsed form of one input line.
///
/// `W` is the word representation: the parser produces `Command<Span>`,
/// [`terminate`] turns it into the owned `Command<String>` that gets
/// executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<W = String> {
    Exec {
        argv: Vec<W>,
    },
    Redir {
        inner: Box<Command<W>>,
        target: W,
        mode: RedirMode,
        slot: RawFd,
    },
    Pipe {
        left: Box<Command<W>>,
        right: Box<Command<W>>,
    },
    Sequence {
        left: Box<Command<W>>,
        right: Box<Command<W>>,
    },
    Background {
        inner: Box<Command<W>>,
    },
}

impl<W> Command<W> {
    pub fn exec(argv: impl IntoIterator<Item = impl Into<W>>) -> Self {
        Command::Exec {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn redir(inner: Self, target: impl Into<W>, mode: RedirMode) -> Self {
        Command::Redir {
            inner: Box::new(inner),
            target: target.into(),
            mode,
            slot: mode.slot(),
        }
    }

    pub fn pipe(left: Self, right: Self) -> Self {
        Command::Pipe {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sequence(left: Self, right: Self) -> Self {
        Command::Sequence {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn background(inner: Self) -> Self {
        Command::Background {
            inner: Box::new(inner),
        }
    }

    /// Rebuilds the tree with every word passed through `f`, visiting
    /// nested blocks as well.
    pub fn map_words<V, F>(self, f: &mut F) -> Command<V>
    where
        F: FnMut(W) -> V,
    {
        match self {
            Command::Exec { argv } => Command::Exec {
                argv: argv.into_iter().map(&mut *f).collect(),
            },
            Command::Redir {
                inner,
                target,
                mode,
                slot,
            } => Command::Redir {
                inner: Box::new((*inner).map_words(f)),
                target: f(target),
                mode,
                slot,
            },
            Command::Pipe { left, right } => Command::Pipe {
                left: Box::new((*left).map_words(f)),
                right: Box::new((*right).map_words(f)),
            },
            Command::Sequence { left, right } => Command::Sequence {
                left: Box::new((*left).map_words(f)),
                right: Box::new((*right).map_words(f)),
            },
            Command::Background { inner } => Command::Background {
                inner: Box::new((*inner).map_words(f)),
            },
        }
    }
}

/// Materializes every span of `raw` as its own string cut out of `line`.
pub fn terminate(raw: Command<Span>, line: &str) -> Command<String> {
    raw.map_words(&mut |span: Span| line[span].to_owned())
}

impl Command<String> {
    fn fmt_grouped(&self, f: &mut fmt::Formatter<'_>, plain: bool) -> fmt::Result {
        if plain {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }

    fn is_unit(&self) -> bool {
        matches!(self, Command::Exec { .. } | Command::Redir { .. })
    }
}

impl fmt::Display for Command<String> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Exec { argv } => write!(f, "{}", argv.iter().join(" ")),
            Command::Redir {
                inner,
                target,
                mode,
                ..
            } => {
                inner.fmt_grouped(f, inner.is_unit())?;
                write!(f, " {} {}", mode.symbol(), target)
            }
            Command::Pipe { left, right } => {
                left.fmt_grouped(f, left.is_unit())?;
                f.write_str(" | ")?;
                right.fmt_grouped(f, right.is_unit() || matches!(**right, Command::Pipe { .. }))
            }
            Command::Sequence { left, right } => {
                left.fmt_grouped(f, !matches!(**left, Command::Sequence { .. }))?;
                write!(f, " ; {}", right)
            }
            Command::Background { inner } => {
                inner.fmt_grouped(f, !matches!(**inner, Command::Sequence { .. }))?;
                f.write_str(" &")
            }
        }
    }
}
