//! `ChainStore` backends for the certificate ledger.

pub mod json_store;
pub mod sled_store;

pub use json_store::JsonFileStore;
pub use sled_store::SledStore;

use cert_ledger_core::LedgerError;

pub(crate) fn corrupt(detail: String) -> anyhow::Error {
    anyhow::Error::new(LedgerError::CorruptChainData(detail))
}
