use thiserror::Error;

/// Unified error type shared across every Murmur crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid required settings. Raised at provider construction,
    /// never retried; the operator must fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote model/speech/image backend call failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Agent loop or message-protocol failure.
    #[error("agent error: {0}")]
    Agent(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The tool-call loop ran past its configured round cap without the model
    /// producing a plain answer.
    #[error("tool loop exceeded maximum of {0} rounds")]
    LoopExceeded(usize),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
