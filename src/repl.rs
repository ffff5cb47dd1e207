use std::io::{self, Read, Write};

use anyhow::Context as _;
use crossterm::tty::IsTty;
use tracing::debug;

use crate::{
    builtin::{self, Builtins, Errors},
    exec::{self, Kernel},
    parser,
    process::Unix,
    terminal::{read_line, RawInput, RawModeGuard, ReadLineError, Session, PROMT},
};

pub struct State<K> {
    kernel: K,
    session: Session,
    interactive: bool,
}

impl<K: Kernel> State<K> {
    pub fn new(kernel: K, session: Session, interactive: bool) -> Self {
        Self {
            kernel,
            session,
            interactive,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs one input line and waits for whatever it started in the
    /// foreground.
    pub fn run_line(&mut self, line: &str) -> Result<(), Errors> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if let Some((com, rest)) = Builtins::parse(line) {
            return builtin::run(com, rest);
        }

        let cmd = parser::parse(line)?;
        debug!(command = %cmd, "running");

        let pid = self.kernel.spawn(|k| exec::run_child(&cmd, k))?;
        let status = self.kernel.wait(pid)?;
        debug!(%pid, status, "line finished");

        Ok(())
    }

    fn next_line(
        &mut self,
        input: &mut dyn Read,
        out: &mut dyn Write,
    ) -> Result<String, ReadLineError> {
        if self.interactive {
            let mut stderr = io::stderr();
            write!(stderr, "{}", PROMT)?;
            stderr.flush()?;
        }

        let _raw = RawModeGuard::new(self.interactive)?;
        read_line(input, out, &mut self.session)
    }

    /// Reads and runs lines until the input ends.
    pub fn run(&mut self, input: &mut dyn Read, out: &mut dyn Write) -> anyhow::Result<()> {
        loop {
            let line = match self.next_line(input, out) {
                Ok(line) => line,
                Err(ReadLineError::Eof) => break,
                Err(ReadLineError::Io(err)) => {
                    debug!(%err, "input failed");
                    break;
                }
            };

            match self.run_line(&line) {
                Ok(()) => {}
                Err(e @ (Errors::CannotCd { .. } | Errors::ParseError(_))) => {
                    eprintln!("{}", e);
                }
                Err(Errors::Resource(err)) => {
                    return Err(err).context("interpreter can not continue");
                }
                Err(Errors::IoError(err)) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

pub fn repl() -> anyhow::Result<()> {
    let interactive = io::stdin().is_tty();
    debug!(interactive, "starting");

    let mut state = State::new(Unix, Session::new(), interactive);

    // without a terminal there is nobody to echo to
    let mut out: Box<dyn Write> = if interactive {
        Box::new(io::stdout())
    } else {
        Box::new(io::sink())
    };

    state.run(&mut RawInput, &mut *out)
}
