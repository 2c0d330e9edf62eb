use thiserror::Error;

/// Errors surfaced by the analysis core.
///
/// Running out of signal is not represented here: analysis calls return
/// `Ok(None)` for that, and the caller just skips the tick.
#[derive(Error, Debug)]
pub enum SpectraError {
    #[error("Invalid frame size {size}: {reason}")]
    InvalidFrameSize { size: usize, reason: &'static str },
    #[error("Buffer length mismatch: engine expects {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),
    #[error("Signal handle refers to a signal that has been replaced")]
    StaleHandle,
    #[error("No signal loaded")]
    NoSignal,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpectraError>;
