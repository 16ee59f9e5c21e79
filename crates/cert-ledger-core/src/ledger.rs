//! The certificate ledger engine.
//!
//! A [`Ledger`] owns the chain in memory and writes the whole chain through its
//! [`ChainStore`] after every append. Mutating operations take `&mut self`, so a
//! host that shares one ledger between tasks has to serialise writers itself
//! (the node keeps it behind a `RwLock`).

use crate::chain::{self, ChainStore};
use crate::config::LedgerConfig;
use crate::constants::SHORT_HASH_LEN;
use crate::error::{LedgerError, Result};
use crate::{pow, Block, BlockData, CertStatus, Certificate};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Returned when an issue or revoke was appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub cert_id: String,
    pub index: u64,
    pub hash: String,
}

/// Result of checking the single block that holds a certificate's latest state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub cert_id: String,
    pub status: CertStatus,
    pub issuer: String,
    pub block_index: u64,
    pub link_valid: bool,
    pub pow_valid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub blocks: usize,
    pub valid: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertSummary {
    pub cert_id: String,
    pub status: CertStatus,
    pub student_name: String,
}

/// One row of the recent-blocks listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub index: u64,
    pub timestamp: u64,
    pub prev_hash: String,
    pub nonce: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub certificate: Option<CertSummary>,
}

impl From<&Block> for BlockSummary {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index,
            timestamp: block.timestamp as u64,
            prev_hash: block.prev_hash.chars().take(SHORT_HASH_LEN).collect(),
            nonce: block.nonce,
            kind: block.data.kind().to_string(),
            certificate: block.data.certificate().map(|c| CertSummary {
                cert_id: c.cert_id.clone(),
                status: c.status,
                student_name: c.student_name.clone(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub index: u64,
    pub certificate: Certificate,
}

pub struct Ledger<S: ChainStore> {
    store: S,
    blocks: Vec<Block>,
    config: LedgerConfig,
}

impl<S: ChainStore> Ledger<S> {
    /// Load the chain from `store`, or start a new one with a persisted genesis block.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let blocks = match store.load().map_err(LedgerError::from_store)? {
            Some(blocks) => {
                chain::check_structure(&blocks)?;
                info!(blocks = blocks.len(), "chain loaded");
                blocks
            }
            None => {
                let blocks = vec![Block::genesis(config.genesis_msg.clone())];
                store.save(&blocks).map_err(persistence_failure)?;
                info!("genesis block created");
                blocks
            }
        };
        if let Some(fault) = chain::first_fault(&blocks, config.difficulty_bits) {
            warn!(%fault, "loaded chain fails validation");
        }
        Ok(Self {
            store,
            blocks,
            config,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn find_latest(&self, cert_id: &str) -> Option<&Certificate> {
        chain::find_latest(&self.blocks, cert_id).map(|(_, c)| c)
    }

    pub fn issue_certificate(&mut self, mut cert: Certificate) -> Result<Receipt> {
        if let Some(current) = self.find_latest(&cert.cert_id) {
            if current.status == CertStatus::Issued {
                warn!(cert_id = %cert.cert_id, "issue rejected: already issued");
                return Err(LedgerError::DuplicateIssue(cert.cert_id));
            }
        }
        cert.status = CertStatus::Issued;
        let cert_id = cert.cert_id.clone();
        let receipt = self.append(cert_id, BlockData::Issue { certificate: cert })?;
        info!(cert_id = %receipt.cert_id, index = receipt.index, "certificate issued");
        Ok(receipt)
    }

    pub fn revoke_certificate(
        &mut self,
        cert_id: &str,
        issuer: &str,
        remarks: &str,
    ) -> Result<Receipt> {
        let current = match self.find_latest(cert_id) {
            None => {
                warn!(cert_id, "revoke rejected: not found");
                return Err(LedgerError::NotFound(cert_id.to_string()));
            }
            Some(c) if c.status == CertStatus::Revoked => {
                warn!(cert_id, "revoke rejected: already revoked");
                return Err(LedgerError::AlreadyRevoked(cert_id.to_string()));
            }
            Some(c) => c,
        };
        let revoked = current.revoked_by(issuer, remarks);
        let receipt = self.append(
            cert_id.to_string(),
            BlockData::Revoke {
                certificate: revoked,
            },
        )?;
        info!(cert_id, index = receipt.index, "certificate revoked");
        Ok(receipt)
    }

    /// Check only the block holding the latest record for `cert_id`: its link to
    /// the immediate predecessor and its own proof-of-work. Use
    /// [`Ledger::is_chain_valid`] for the whole chain.
    pub fn verify_certificate(&self, cert_id: &str) -> Result<Verification> {
        let (pos, cert) = chain::find_latest(&self.blocks, cert_id)
            .ok_or_else(|| LedgerError::NotFound(cert_id.to_string()))?;
        let block = &self.blocks[pos];
        Ok(Verification {
            cert_id: cert.cert_id.clone(),
            status: cert.status,
            issuer: cert.issuer.clone(),
            block_index: block.index,
            link_valid: chain::link_valid(&self.blocks, pos),
            pow_valid: pow::meets_target(&block.hash(), self.config.difficulty_bits),
        })
    }

    pub fn is_chain_valid(&self) -> bool {
        match chain::first_fault(&self.blocks, self.config.difficulty_bits) {
            None => true,
            Some(fault) => {
                warn!(%fault, "chain validation failed");
                false
            }
        }
    }

    pub fn status(&self) -> ChainStatus {
        ChainStatus {
            blocks: self.blocks.len(),
            valid: self.is_chain_valid(),
        }
    }

    /// The last `n` blocks, oldest first.
    pub fn recent(&self, n: usize) -> Vec<BlockSummary> {
        let start = self.blocks.len().saturating_sub(n);
        self.blocks[start..].iter().map(BlockSummary::from).collect()
    }

    pub fn certificate_history(&self, cert_id: &str) -> Result<Vec<HistoryEntry>> {
        let entries: Vec<HistoryEntry> = chain::history(&self.blocks, cert_id)
            .into_iter()
            .map(|(index, c)| HistoryEntry {
                index,
                certificate: c.clone(),
            })
            .collect();
        if entries.is_empty() {
            return Err(LedgerError::NotFound(cert_id.to_string()));
        }
        Ok(entries)
    }

    /// Seal a block for `data` on top of the tip, then persist the whole chain.
    /// If the save fails the block is dropped again so memory never runs ahead of storage.
    fn append(&mut self, cert_id: String, data: BlockData) -> Result<Receipt> {
        let prev_hash = self
            .blocks
            .last()
            .map(Block::hash_hex)
            .ok_or_else(|| LedgerError::CorruptChainData("ledger has no genesis block".into()))?;
        let candidate = Block::new(self.blocks.len() as u64, data, prev_hash);
        let sealed = pow::seal(candidate, self.config.difficulty_bits);
        let receipt = Receipt {
            cert_id,
            index: sealed.index,
            hash: sealed.hash_hex(),
        };
        self.blocks.push(sealed);
        if let Err(err) = self.store.save(&self.blocks) {
            self.blocks.pop();
            let reason = format!("{err:#}");
            error!(index = receipt.index, %reason, "failed to persist chain");
            return Err(persistence_failure(err));
        }
        Ok(receipt)
    }
}

fn persistence_failure(err: anyhow::Error) -> LedgerError {
    LedgerError::PersistenceFailure(format!("{err:#}"))
}
