use thiserror::Error;

/// Errors surfaced by `AudioEngine`'s control-thread API (spec §7).
///
/// Internal consistency violations — a cue pointing at a sound index that
/// passed the loader's validation but no longer exists, for example — are
/// bugs, not recoverable conditions, and are reported via `debug_assert!`/
/// `unreachable!` instead of this enum.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("instance limit reached for category {category}")]
    InstanceLimit { category: u16 },
    #[error("invalid bank: {0}")]
    InvalidBank(#[from] bank_schema::BankError),
    #[error("bank already loaded: {0}")]
    AlreadyLoaded(String),
    #[error("out of memory")]
    OutOfMemory,
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid call: {0}")]
    InvalidCall(String),
}
