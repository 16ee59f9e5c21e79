use super::*;
use crate::error::LedgerError;
use anyhow::Result;
use std::fmt;

/// Trait the storage backends should implement for the ledger to operate.
/// This lives in `cert-ledger-core` to avoid a circular dependency.
///
/// `save` followed by `load` must hand back an identical chain, byte for byte
/// in every field that feeds a digest. A backend reports malformed stored data
/// by returning a [`LedgerError::CorruptChainData`] inside the error.
pub trait ChainStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<Block>>>;
    fn save(&self, chain: &[Block]) -> Result<()>;
}

impl<S: ChainStore + ?Sized> ChainStore for Box<S> {
    fn load(&self) -> Result<Option<Vec<Block>>> {
        (**self).load()
    }

    fn save(&self, chain: &[Block]) -> Result<()> {
        (**self).save(chain)
    }
}

/// The first reason a chain fails validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainFault {
    Empty,
    BrokenLink { index: u64 },
    InsufficientWork { index: u64 },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::Empty => write!(f, "chain is empty"),
            ChainFault::BrokenLink { index } => {
                write!(f, "block {index} does not link to its predecessor")
            }
            ChainFault::InsufficientWork { index } => {
                write!(f, "block {index} does not satisfy proof-of-work")
            }
        }
    }
}

/// Walk every non-genesis block checking link integrity, then proof-of-work.
pub fn first_fault(blocks: &[Block], target_zeros: u32) -> Option<ChainFault> {
    if blocks.is_empty() {
        return Some(ChainFault::Empty);
    }
    let mut prev_hash = blocks[0].hash_hex();
    for block in &blocks[1..] {
        if block.prev_hash != prev_hash {
            return Some(ChainFault::BrokenLink { index: block.index });
        }
        let hash = block.hash();
        if !pow::meets_target(&hash, target_zeros) {
            return Some(ChainFault::InsufficientWork { index: block.index });
        }
        prev_hash = hex::encode(hash);
    }
    None
}

pub fn is_chain_valid(blocks: &[Block], target_zeros: u32) -> bool {
    first_fault(blocks, target_zeros).is_none()
}

/// Does the block at `position` point at the digest of the block before it?
/// Position 0 has no predecessor and always links.
pub fn link_valid(blocks: &[Block], position: usize) -> bool {
    match position.checked_sub(1) {
        None => true,
        Some(prev) => match (blocks.get(prev), blocks.get(position)) {
            (Some(prev), Some(block)) => block.prev_hash == prev.hash_hex(),
            _ => false,
        },
    }
}

/// Newest-to-oldest scan for the latest event recorded for `cert_id`.
/// Returns the block's position in the chain and its certificate.
pub fn find_latest<'a>(blocks: &'a [Block], cert_id: &str) -> Option<(usize, &'a Certificate)> {
    blocks.iter().enumerate().rev().find_map(|(pos, block)| {
        block
            .data
            .certificate()
            .filter(|c| c.cert_id == cert_id)
            .map(|c| (pos, c))
    })
}

/// Every ISSUE/REVOKE event for `cert_id`, oldest first, with the block index.
pub fn history<'a>(blocks: &'a [Block], cert_id: &str) -> Vec<(u64, &'a Certificate)> {
    blocks
        .iter()
        .filter_map(|block| {
            block
                .data
                .certificate()
                .filter(|c| c.cert_id == cert_id)
                .map(|c| (block.index, c))
        })
        .collect()
}

/// Shape checks a freshly loaded chain must pass before the engine uses it.
/// Content tampering is left to [`first_fault`].
pub fn check_structure(blocks: &[Block]) -> std::result::Result<(), LedgerError> {
    if blocks.is_empty() {
        return Err(LedgerError::CorruptChainData(
            "stored chain has no blocks".into(),
        ));
    }
    for (pos, block) in blocks.iter().enumerate() {
        if block.index != pos as u64 {
            return Err(LedgerError::CorruptChainData(format!(
                "block at position {pos} carries index {}",
                block.index
            )));
        }
    }
    Ok(())
}
