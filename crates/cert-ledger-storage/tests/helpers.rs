#![allow(dead_code)]

use cert_ledger_core::{Block, Certificate, Ledger, LedgerConfig};
use cert_ledger_storage::sled_store::SledStore;
use cert_ledger_core::chain::ChainStore;
use std::fs;
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (temp_dir, db_path)
}

pub fn remove_temp_dir(temp_dir: TempDir) {
    let db_path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Temp directory should be removed");
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sled");
    (
        temp_dir,
        SledStore::open(&db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    store.clear().expect("Failed to clear the store");
    drop(store);
    remove_temp_dir(temp_dir);
}

pub fn cert(id: &str) -> Certificate {
    Certificate::issued(id, "A. Smith", "CS", "2024-01-01", "Dept X")
}

/// Genesis, two issues and one revoke.
pub fn populate<S: ChainStore>(store: S) -> Ledger<S> {
    let mut ledger = Ledger::open(store, LedgerConfig::default()).expect("open ledger");
    ledger.issue_certificate(cert("C-100")).expect("issue C-100");
    ledger.issue_certificate(cert("C-200")).expect("issue C-200");
    ledger
        .revoke_certificate("C-100", "Registrar", "error")
        .expect("revoke C-100");
    ledger
}

pub fn digests(blocks: &[Block]) -> Vec<String> {
    blocks.iter().map(Block::hash_hex).collect()
}
