//! Error taxonomy for the ingestion pipeline
//!
//! Three classes matter to callers: configuration problems abort startup,
//! decode problems are fatal for one dump file only, and prefix parse
//! problems are fatal for the current address family of one file. The
//! orchestrator catches the latter two, logs them, and leaves the file to be
//! retried on a later pass.

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("config: {0}")]
    Config(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid prefix {prefix:?}: {reason}")]
    Parse { prefix: String, reason: String },
}

impl LoaderError {
    pub fn decode(msg: impl std::fmt::Display) -> Self {
        LoaderError::Decode(msg.to_string())
    }

    pub fn config(msg: impl std::fmt::Display) -> Self {
        LoaderError::Config(msg.to_string())
    }
}
