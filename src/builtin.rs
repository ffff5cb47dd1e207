use crate::{exec::ResourceError, parser::ParseError};

#[derive(thiserror::Error, Debug)]
pub enum Errors {
    #[error("cannot cd {path}")]
    CannotCd {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error: {0}")]
    ParseError(#[from] ParseError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("Io Error <{0}>")]
    IoError(#[from] std::io::Error),
}

/// Commands that have to run inside the interpreter process itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtins {
    Cd,
}

impl Builtins {
    pub fn supported() -> [(Builtins, &'static str); 1] {
        [(Builtins::Cd, "cd ")]
    }

    /// Splits a builtin invocation off the front of `line`.
    pub fn parse(line: &str) -> Option<(Builtins, &str)> {
        Self::supported()
            .into_iter()
            .find_map(|(com, prefix)| line.strip_prefix(prefix).map(|rest| (com, rest)))
    }
}

pub fn run(com: Builtins, rest: &str) -> Result<(), Errors> {
    match com {
        Builtins::Cd => cd::run(rest),
    }
}

mod cd {
    use super::Errors;

    pub fn run(rest: &str) -> Result<(), Errors> {
        // the line may still carry its newline
        let path = rest.trim();

        std::env::set_current_dir(path).map_err(|source| Errors::CannotCd {
            path: path.to_owned(),
            source,
        })
    }
}
