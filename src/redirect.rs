use std::{fs::File, path::Path};

use crate::command::RedirMode;

#[derive(Debug, thiserror::Error)]
#[error("open {path} failed: {source}")]
pub struct RedirError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Opens `target` the way `mode` asks for.
pub fn open(target: impl AsRef<Path>, mode: RedirMode) -> Result<File, RedirError> {
    let mut opts = File::options();

    match mode {
        RedirMode::Read => {
            opts.read(true);
        }
        RedirMode::Truncate => {
            opts.create(true).truncate(true).write(true);
        }
        RedirMode::Append => {
            opts.create(true).truncate(false).append(true);
        }
    }

    opts.open(target.as_ref()).map_err(|source| RedirError {
        path: target.as_ref().display().to_string(),
        source,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::{Read, Write};

    use pretty_assertions::assert_str_eq;

    fn contents(path: &Path) -> String {
        let mut s = String::new();
        open(path, RedirMode::Read)
            .unwrap()
            .read_to_string(&mut s)
            .unwrap();
        s
    }

    #[test]
    fn truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        open(&path, RedirMode::Truncate)
            .unwrap()
            .write_all(b"first\n")
            .unwrap();
        open(&path, RedirMode::Append)
            .unwrap()
            .write_all(b"second\n")
            .unwrap();
        assert_str_eq!(contents(&path), "first\nsecond\n");

        open(&path, RedirMode::Truncate)
            .unwrap()
            .write_all(b"third\n")
            .unwrap();
        assert_str_eq!(contents(&path), "third\n");
    }

    #[test]
    fn append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");

        open(&path, RedirMode::Append)
            .unwrap()
            .write_all(b"x")
            .unwrap();
        assert_str_eq!(contents(&path), "x");
    }

    #[test]
    fn reading_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");

        let err = open(&path, RedirMode::Read).unwrap_err();
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().starts_with("open "));
        assert!(!path.exists());
    }
}
