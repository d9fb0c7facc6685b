use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    YAML(#[from] serde_yaml::Error),
    #[error(transparent)]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("corpus file listed in manifest not found: {path}")]
    MissingCorpusFile { path: PathBuf },
    #[error("invalid corpus entry: {detail}")]
    Corpus { detail: String },
    #[error("invalid pattern `{name}`: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("pattern `{name}` admits a zero-length match")]
    DegeneratePattern { name: String },
    #[error("input of {size} bytes exceeds configured max_bytes {max}")]
    InputTooLarge { size: usize, max: usize },
    #[error("conversion failed for `{source_ref}`: {detail}")]
    Conversion { source_ref: String, detail: String },
    #[error("pipeline is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, Error>;
