//! Turns a [`Command`] tree into processes.
//!
//! [`execute`] describes what the *current* process ends up doing as an
//! [`Outcome`]. Everything that touches the operating system goes through
//! [`Kernel`], so the branching here never ends the calling process itself;
//! only the kernel adapter acts on the final outcome.

use std::os::fd::RawFd;

use nix::unistd::Pid;
use tracing::{debug, trace};

use crate::{
    command::{Command, RedirMode, STDIN, STDOUT},
    redirect::RedirError,
};

pub type ExitCode = i32;

pub const FAILURE: ExitCode = 1;

/// A primitive the interpreter can not continue without.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("pipe: {0}")]
    Pipe(#[source] nix::Error),
    #[error("fork: {0}")]
    Fork(#[source] nix::Error),
    #[error("dup: {0}")]
    Dup(#[source] nix::Error),
    #[error("wait: {0}")]
    Wait(#[source] nix::Error),
}

/// Why a single process gives up.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("exec {program} failed: {source}")]
    Exec {
        program: String,
        #[source]
        source: nix::Error,
    },
    #[error(transparent)]
    Redir(#[from] RedirError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// What the current process becomes once a command has been interpreted.
#[derive(Debug)]
pub enum Outcome {
    /// Exit with the given status.
    Terminated(ExitCode),
    /// Replace the process image with `argv`.
    Replace(Vec<String>),
    /// Report the failure and exit unsuccessfully.
    Failed(Failure),
}

impl From<ResourceError> for Outcome {
    fn from(value: ResourceError) -> Self {
        Outcome::Failed(value.into())
    }
}

/// The process primitives used by [`execute`].
pub trait Kernel: Sized {
    /// Runs `body` in a new process; the caller gets the child's pid back.
    fn spawn<F>(&mut self, body: F) -> Result<Pid, ResourceError>
    where
        F: FnOnce(&mut Self) -> Outcome;

    /// Returns `(read, write)`.
    fn pipe(&mut self) -> Result<(RawFd, RawFd), ResourceError>;

    /// Makes `slot` refer to what `fd` refers to and closes `fd`.
    fn bind(&mut self, fd: RawFd, slot: RawFd) -> Result<(), ResourceError>;

    fn close(&mut self, fd: RawFd);

    fn open(&mut self, target: &str, mode: RedirMode) -> Result<RawFd, RedirError>;

    /// Blocks until `pid` is gone and returns its exit status.
    fn wait(&mut self, pid: Pid) -> Result<ExitCode, ResourceError>;
}

/// Interprets `cmd` inside the current process.
///
/// Only `Sequence` and `Pipe` wait for children here; everything else hands
/// back an outcome right away.
pub fn execute<K: Kernel>(cmd: &Command, kernel: &mut K) -> Result<Outcome, ResourceError> {
    match cmd {
        Command::Exec { argv } => {
            if argv.is_empty() {
                return Ok(Outcome::Terminated(FAILURE));
            }
            Ok(Outcome::Replace(argv.clone()))
        }
        Command::Redir {
            inner,
            target,
            mode,
            slot,
        } => {
            let fd = match kernel.open(target, *mode) {
                Ok(fd) => fd,
                Err(err) => return Ok(Outcome::Failed(err.into())),
            };
            trace!(path = %target, ?mode, slot, "redirect");
            kernel.bind(fd, *slot)?;
            execute(inner, kernel)
        }
        Command::Pipe { left, right } => {
            let (read, write) = kernel.pipe()?;

            let left_pid = kernel.spawn(|k| {
                k.close(read);
                match k.bind(write, STDOUT) {
                    Ok(()) => run_child(left, k),
                    Err(err) => err.into(),
                }
            })?;
            let right_pid = kernel.spawn(|k| {
                k.close(write);
                match k.bind(read, STDIN) {
                    Ok(()) => run_child(right, k),
                    Err(err) => err.into(),
                }
            })?;

            kernel.close(read);
            kernel.close(write);

            let left_status = kernel.wait(left_pid)?;
            let right_status = kernel.wait(right_pid)?;
            debug!(left_status, right_status, "pipe finished");

            Ok(Outcome::Terminated(0))
        }
        Command::Sequence { left, right } => {
            let pid = kernel.spawn(|k| run_child(left, k))?;
            let status = kernel.wait(pid)?;
            debug!(%pid, status, "sequence left finished");

            execute(right, kernel)
        }
        Command::Background { inner } => {
            let pid = kernel.spawn(|k| run_child(inner, k))?;
            debug!(%pid, "background");

            Ok(Outcome::Terminated(0))
        }
    }
}

/// Body of a freshly spawned process: a resource failure only ends that
/// process.
pub fn run_child<K: Kernel>(cmd: &Command, kernel: &mut K) -> Outcome {
    execute(cmd, kernel).unwrap_or_else(Outcome::from)
}


#[cfg(test)]
mod test {
    use super::{testing::*, *};

    use pretty_assertions::assert_eq;

    use crate::parser::parse;

    fn run(line: &str) -> (String, Vec<String>) {
        let mut recorder = Recorder::default();
        let outcome = testing::top_level(&mut recorder, &parse(line).unwrap());
        (outcome, recorder.events)
    }

    #[test]
    fn exec_replaces_the_process() {
        let (outcome, events) = run("echo hi there");
        assert_eq!(outcome, "exec echo hi there");
        assert!(events.is_empty());
    }

    #[test]
    fn empty_exec_fails() {
        let (outcome, _) = run("");
        assert_eq!(outcome, "status 1");
    }

    #[test]
    fn redirections_bind_before_exec() {
        let (outcome, events) = run("sort < in > out");
        assert_eq!(outcome, "exec sort");
        assert_eq!(
            events,
            [
                "open out > = 3",
                "bind 3 -> 1",
                "open in < = 4",
                "bind 4 -> 0",
            ]
        );
    }

    #[test]
    fn redirection_open_failure_ends_the_branch() {
        let mut recorder = Recorder::with_missing(&["nope"]);
        let outcome = testing::top_level(&mut recorder, &parse("cat < nope").unwrap());
        assert_eq!(outcome, "failed: open nope failed: entity not found");
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn pipe_closes_every_unused_end() {
        let (outcome, events) = run("ls | wc");
        assert_eq!(outcome, "status 0");
        assert_eq!(
            events,
            [
                "pipe 3 4",
                "spawn 101",
                "close 3",
                "bind 4 -> 1",
                "exit 101: exec ls",
                "spawn 102",
                "close 4",
                "bind 3 -> 0",
                "exit 102: exec wc",
                "close 3",
                "close 4",
                "wait 101",
                "wait 102",
            ]
        );
    }

    #[test]
    fn pipe_chain_nests_in_the_right_child() {
        let (_, events) = run("a | b | c");
        assert_eq!(
            events,
            [
                "pipe 3 4",
                "spawn 101",
                "close 3",
                "bind 4 -> 1",
                "exit 101: exec a",
                "spawn 102",
                "close 4",
                "bind 3 -> 0",
                "pipe 5 6",
                "spawn 103",
                "close 5",
                "bind 6 -> 1",
                "exit 103: exec b",
                "spawn 104",
                "close 6",
                "bind 5 -> 0",
                "exit 104: exec c",
                "close 5",
                "close 6",
                "wait 103",
                "wait 104",
                "exit 102: status 0",
                "close 3",
                "close 4",
                "wait 101",
                "wait 102",
            ]
        );
    }

    #[test]
    fn sequence_always_runs_the_right_side() {
        let (outcome, events) = run("false ; echo hi");
        assert_eq!(outcome, "exec echo hi");
        assert_eq!(events, ["spawn 101", "exit 101: exec false", "wait 101"]);
    }

    #[test]
    fn background_does_not_wait() {
        let (outcome, events) = run("sleep 100 &");
        assert_eq!(outcome, "status 0");
        assert_eq!(events, ["spawn 101", "exit 101: exec sleep 100"]);
    }

    #[test]
    fn block_redirection_applies_to_the_whole_block() {
        let (outcome, events) = run("(a ; b) > log");
        assert_eq!(outcome, "exec b");
        assert_eq!(
            events,
            [
                "open log > = 3",
                "bind 3 -> 1",
                "spawn 101",
                "exit 101: exec a",
                "wait 101",
            ]
        );
    }
}
