use thiserror::Error;

/// Every way a ledger operation can fail.
///
/// The first three variants are rejections: the request was understood, nothing
/// was appended and the caller may carry on. Persistence and corruption failures
/// mean the in-memory chain cannot be trusted to match what is stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("certificate {0} is already ISSUED")]
    DuplicateIssue(String),
    #[error("certificate {0} not found")]
    NotFound(String),
    #[error("certificate {0} is already REVOKED")]
    AlreadyRevoked(String),
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("corrupt chain data: {0}")]
    CorruptChainData(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::DuplicateIssue(_) | LedgerError::NotFound(_) | LedgerError::AlreadyRevoked(_)
        )
    }

    /// Classify a storage-layer error. Stores flag malformed data by wrapping a
    /// `CorruptChainData`; anything else is an I/O level failure.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<LedgerError>() {
            Ok(inner) => inner,
            Err(other) => LedgerError::PersistenceFailure(format!("{other:#}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
