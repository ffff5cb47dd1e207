use std::path::Path;

use tracing::trace;

/// Longest file name the completer will match on.
pub const NAME_MAX: usize = 255;

pub type Completion = trie_rs::Trie<u8>;

#[derive(Debug, thiserror::Error)]
pub enum TabHandlingError {
    #[error("Io Error <{0}>")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    None,
    Unique(String),
    Ambiguous(Vec<String>),
}

/// Builds the completion set out of the entries of `dir`.
pub fn generate_completion(dir: &Path) -> Result<Completion, TabHandlingError> {
    let mut builder = trie_rs::TrieBuilder::new();

    for entry in std::fs::read_dir(dir)?.filter_map(Result::ok) {
        // names that are not valid UTF-8 can not be spliced into the line
        if let Some(name) = entry.file_name().to_str() {
            builder.push(name);
        }
    }

    Ok(builder.build())
}

/// Offset where the word ending at the end of `line` starts.
pub fn word_start(line: &[u8]) -> usize {
    line.iter()
        .rposition(|b| b.is_ascii_whitespace() || *b == b'/')
        .map_or(0, |i| i + 1)
}

pub fn complete(completion: &Completion, prefix: &[u8]) -> Candidate {
    let prefix = &prefix[..prefix.len().min(NAME_MAX)];

    let mut matches: Vec<String> = completion.predictive_search(prefix).collect();
    trace!(prefix = %String::from_utf8_lossy(prefix), matches = matches.len(), "completion");

    match matches.len() {
        0 => Candidate::None,
        1 => matches.pop().map_or(Candidate::None, Candidate::Unique),
        _ => Candidate::Ambiguous(matches),
    }
}
