use thiserror::Error;

/// Errors raised while loading a [`crate::schema::SoundBank`] or
/// [`crate::wavebank::WaveBank`] from a byte stream.
///
/// A load either fully succeeds or fails atomically: no partially
/// constructed bank is ever handed back to the caller.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated bank: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("bad magic number: {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported bank version: {0}")]
    UnsupportedVersion(u16),
    #[error("unresolved reference: {kind} index {index} (have {count})")]
    UnresolvedReference {
        kind: &'static str,
        index: u32,
        count: u32,
    },
    #[error("empty variation table at index {0}")]
    EmptyVariationTable(usize),
    #[error("non-finite control point in RPC {rpc_index}")]
    NonFiniteCurvePoint { rpc_index: usize },
    #[error("RPC {rpc_index} points are not strictly increasing in x")]
    UnorderedCurvePoints { rpc_index: usize },
    #[error("duplicate name in name table: {0}")]
    DuplicateName(String),
}
