use std::{
    ffi::CString,
    io::Write,
    os::fd::{IntoRawFd, RawFd},
};

use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitStatus},
    unistd::{self, execvp, fork, ForkResult, Pid},
};
use tracing::{trace, warn};

use crate::{
    command::RedirMode,
    exec::{ExitCode, Failure, Kernel, Outcome, ResourceError, FAILURE},
    redirect::{self, RedirError},
};

/// The real process primitives.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unix;

impl Unix {
    /// Acts on `outcome`: replaces the process image or exits. Never returns.
    pub fn finish(&mut self, outcome: Outcome) -> ! {
        let code = match outcome {
            Outcome::Terminated(code) => code,
            Outcome::Replace(argv) => {
                let err = replace(argv);
                eprintln!("{}", err);
                FAILURE
            }
            Outcome::Failed(err) => {
                eprintln!("{}", err);
                FAILURE
            }
        };

        flush_std();
        std::process::exit(code)
    }
}

/// Replaces the current process image; only returns on failure.
fn replace(argv: Vec<String>) -> Failure {
    let program = argv.first().cloned().unwrap_or_default();

    let args = match argv
        .into_iter()
        .map(CString::new)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(args) => args,
        Err(_) => {
            return Failure::Exec {
                program,
                source: Errno::EINVAL,
            }
        }
    };

    let Some(name) = args.first() else {
        return Failure::Exec {
            program,
            source: Errno::ENOENT,
        };
    };

    match execvp(name, &args) {
        Ok(never) => match never {},
        Err(source) => Failure::Exec { program, source },
    }
}

/// Buffered output would otherwise be written twice, once by each side of
/// the fork.
fn flush_std() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}

impl Kernel for Unix {
    fn spawn<F>(&mut self, body: F) -> Result<Pid, ResourceError>
    where
        F: FnOnce(&mut Self) -> Outcome,
    {
        flush_std();

        // SAFETY: the interpreter is single threaded; the child only touches
        // descriptors before it replaces its image or exits.
        match unsafe { fork() }.map_err(ResourceError::Fork)? {
            ForkResult::Parent { child } => {
                trace!(%child, "spawned");
                Ok(child)
            }
            ForkResult::Child => {
                let outcome = body(self);
                self.finish(outcome)
            }
        }
    }

    fn pipe(&mut self) -> Result<(RawFd, RawFd), ResourceError> {
        let (read, write) = unistd::pipe().map_err(ResourceError::Pipe)?;
        Ok((read.into_raw_fd(), write.into_raw_fd()))
    }

    fn bind(&mut self, fd: RawFd, slot: RawFd) -> Result<(), ResourceError> {
        if fd == slot {
            return Ok(());
        }
        unistd::dup2(fd, slot).map_err(ResourceError::Dup)?;
        self.close(fd);
        Ok(())
    }

    fn close(&mut self, fd: RawFd) {
        if let Err(err) = unistd::close(fd) {
            warn!(fd, %err, "close failed");
        }
    }

    fn open(&mut self, target: &str, mode: RedirMode) -> Result<RawFd, RedirError> {
        redirect::open(target, mode).map(IntoRawFd::into_raw_fd)
    }

    fn wait(&mut self, pid: Pid) -> Result<ExitCode, ResourceError> {
        loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(code),
                Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(err) => return Err(ResourceError::Wait(err)),
            }
        }
    }
}
