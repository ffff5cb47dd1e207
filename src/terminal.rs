use std::{
    io::{self, Read, Write},
    path::PathBuf,
};

use bytes::{BufMut, BytesMut};
use crossterm::{
    style,
    terminal::{disable_raw_mode, enable_raw_mode},
    QueueableCommand,
};
use tracing::debug;

use crate::{
    completion::{self, Candidate},
    history::{Browse, History},
};

pub const PROMT: &str = "$ ";
pub const NEWLINE_RAW_TERM: &str = "\r\n";
/// Moves back one column, blanks it and moves back again.
const ERASE: &str = "\x08 \x08";
const AMBIGUOUS: &str = "[ambiguous]";

/// Size of the line buffer; one byte of it is never handed out.
pub const MAX_LINE: usize = 100;

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;
const BACKSPACE: u8 = 0x08;
const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;

#[derive(Debug, thiserror::Error)]
pub enum ReadLineError {
    #[error("end of input")]
    Eof,
    #[error("Io Error <{0}>")]
    Io(#[from] io::Error),
}

/// Bounded buffer for the line being edited.
#[derive(Debug)]
pub struct LineBuffer {
    bytes: BytesMut,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_LINE)
    }
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
            limit: capacity.saturating_sub(1),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Appends `byte` if there is room left.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.bytes.len() >= self.limit {
            return false;
        }
        self.bytes.put_u8(byte);
        true
    }

    /// Removes the last character, continuation bytes included.
    pub fn pop_char(&mut self) -> bool {
        let Some(last) = self
            .bytes
            .iter()
            .rposition(|b| !is_continuation(*b))
            .or_else(|| self.bytes.len().checked_sub(1))
        else {
            return false;
        };
        self.bytes.truncate(last);
        true
    }

    /// Replaces everything from `start` on with `tail`, if it fits.
    pub fn splice_tail(&mut self, start: usize, tail: &[u8]) -> bool {
        if start > self.bytes.len() || start + tail.len() > self.limit {
            return false;
        }
        self.bytes.truncate(start);
        self.bytes.extend_from_slice(tail);
        true
    }

    /// Number of characters the terminal shows for `bytes`.
    pub fn visible_len(bytes: &[u8]) -> usize {
        bytes.iter().filter(|b| !is_continuation(**b)).count()
    }

    /// Hands out the line and leaves the buffer empty.
    pub fn take(&mut self) -> String {
        let line = self.bytes.split().freeze();
        String::from_utf8_lossy(&line).into_owned()
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}

#[derive(Clone, Copy, Debug)]
enum Escape {
    None,
    Started,
    Intro(u8),
}

/// Line editing state: the line being typed, the history ring and a pending
/// escape sequence.
///
/// Input is fed one byte at a time; a byte that finishes a line hands it
/// back.
pub struct Session {
    line: LineBuffer,
    history: History,
    escape: Escape,
    completion_dir: PathBuf,
    prompt: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            line: LineBuffer::default(),
            history: History::new(),
            escape: Escape::None,
            completion_dir: PathBuf::from("."),
            prompt: PROMT.to_owned(),
        }
    }

    /// Completes against `dir` instead of the working directory.
    pub fn with_completion_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.completion_dir = dir.into();
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn line(&self) -> &[u8] {
        self.line.as_bytes()
    }

    /// Handles one input byte, echoing to `out`.
    pub fn feed(&mut self, byte: u8, out: &mut dyn Write) -> Result<Option<String>, ReadLineError> {
        let line = self.handle(byte, out)?;
        out.flush()?;
        Ok(line)
    }

    fn handle(&mut self, byte: u8, out: &mut dyn Write) -> Result<Option<String>, ReadLineError> {
        match std::mem::replace(&mut self.escape, Escape::None) {
            Escape::Started => {
                self.escape = Escape::Intro(byte);
                return Ok(None);
            }
            Escape::Intro(intro) => {
                self.handle_escape(intro, byte, out)?;
                return Ok(None);
            }
            Escape::None => {}
        }

        match byte {
            b'\n' | b'\r' => return self.finish_line(out).map(Some),
            ESC => self.escape = Escape::Started,
            DEL | BACKSPACE => {
                if self.line.pop_char() {
                    out.queue(style::Print(ERASE))?;
                }
            }
            b'\t' => self.complete(out)?,
            CTRL_D if self.line.is_empty() => return Err(ReadLineError::Eof),
            CTRL_D => {}
            CTRL_C => {
                self.line.clear();
                self.history.reset_browsing();
                out.queue(style::Print("^C"))?
                    .queue(style::Print(NEWLINE_RAW_TERM))?
                    .queue(style::Print(&self.prompt))?;
            }
            _ => {
                if self.line.push(byte) {
                    out.write_all(&[byte])?;
                }
            }
        }

        Ok(None)
    }

    fn finish_line(&mut self, out: &mut dyn Write) -> Result<String, ReadLineError> {
        out.queue(style::Print(NEWLINE_RAW_TERM))?;

        let line = self.line.take();
        if self.history.push(&line) {
            debug!(total = self.history.total_saved(), "saved to history");
        }

        Ok(line)
    }

    /// What is left when the input ends in the middle of a line.
    pub fn take_partial(&mut self) -> Option<String> {
        self.escape = Escape::None;
        if self.line.is_empty() {
            return None;
        }
        Some(self.line.take())
    }

    fn handle_escape(&mut self, intro: u8, code: u8, out: &mut dyn Write) -> io::Result<()> {
        match (intro, code) {
            (b'[', b'A') => {
                let Some(entry) = self.history.older() else {
                    return Ok(());
                };
                erase(out, LineBuffer::visible_len(self.line.as_bytes()))?;
                self.line.splice_tail(0, entry.as_bytes());
                out.write_all(self.line.as_bytes())?;
            }
            (b'[', b'B') => {
                let Some(browse) = self.history.newer() else {
                    return Ok(());
                };
                erase(out, LineBuffer::visible_len(self.line.as_bytes()))?;
                match browse {
                    Browse::Entry(entry) => {
                        self.line.splice_tail(0, entry.as_bytes());
                        out.write_all(self.line.as_bytes())?;
                    }
                    Browse::Blank => self.line.clear(),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn complete(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let start = completion::word_start(self.line.as_bytes());

        let completion = match completion::generate_completion(&self.completion_dir) {
            Ok(c) => c,
            Err(err) => {
                debug!(%err, "completion unavailable");
                return Ok(());
            }
        };

        match completion::complete(&completion, &self.line.as_bytes()[start..]) {
            Candidate::None => {}
            Candidate::Unique(name) => {
                let typed = LineBuffer::visible_len(&self.line.as_bytes()[start..]);
                if !self.line.splice_tail(start, name.as_bytes()) {
                    debug!(%name, "completion does not fit the line");
                    return Ok(());
                }
                erase(out, typed)?;
                out.queue(style::Print(&name))?;
            }
            Candidate::Ambiguous(_) => {
                out.queue(style::Print(NEWLINE_RAW_TERM))?
                    .queue(style::Print(AMBIGUOUS))?
                    .queue(style::Print(NEWLINE_RAW_TERM))?
                    .queue(style::Print(&self.prompt))?;
                out.write_all(self.line.as_bytes())?;
            }
        }
        Ok(())
    }
}

fn erase(out: &mut dyn Write, count: usize) -> io::Result<()> {
    for _ in 0..count {
        out.queue(style::Print(ERASE))?;
    }
    Ok(())
}

/// Reads bytes from `input` into `session` until a line is complete.
///
/// A line cut short by the end of input is still handed out; the next call
/// then reports [`ReadLineError::Eof`].
pub fn read_line(
    input: &mut dyn Read,
    out: &mut dyn Write,
    session: &mut Session,
) -> Result<String, ReadLineError> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return session.take_partial().ok_or(ReadLineError::Eof),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }

        if let Some(line) = session.feed(byte[0], out)? {
            return Ok(line);
        }
    }
}

/// Unbuffered standard input: nothing past the current line is consumed, so
/// spawned commands see the rest of the stream.
pub struct RawInput;

impl Read for RawInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(nix::libc::STDIN_FILENO, buf).map_err(io::Error::from)
    }
}

/// Keeps the terminal in raw mode while alive.
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    pub fn new(enable: bool) -> io::Result<Self> {
        if enable {
            enable_raw_mode()?;
        }
        Ok(Self { enabled: enable })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(err) = disable_raw_mode() {
                debug!(%err, "could not leave raw mode");
            }
        }
    }
}
