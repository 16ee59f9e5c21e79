use crate::corrupt;
use anyhow::{Context, Result};
use cert_ledger_core::{chain::ChainStore, Block};
use sled::{Batch, Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";

/// One JSON record per block in a sled tree, keyed by big-endian index so the
/// tree iterates in chain order.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let blocks = db.open_tree(TREE_BLOCKS)?;
        info!("sled store opened");
        Ok(Self { db, blocks })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.blocks.clear()?;
        self.flush()
    }
}

impl ChainStore for SledStore {
    fn load(&self) -> Result<Option<Vec<Block>>> {
        if self.blocks.is_empty() {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(self.blocks.len());
        for entry in self.blocks.iter() {
            let (key, value) = entry.context("reading blocks tree")?;
            let key: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| corrupt(format!("block key of {} bytes", key.len())))?;
            let index = u64::from_be_bytes(key);
            let block: Block = serde_json::from_slice(&value)
                .map_err(|e| corrupt(format!("block {index}: {e}")))?;
            out.push(block);
        }
        debug!(blocks = out.len(), "chain read from sled");
        Ok(Some(out))
    }

    fn save(&self, chain: &[Block]) -> Result<()> {
        let mut batch = Batch::default();
        for block in chain {
            batch.insert(block.index.to_be_bytes().to_vec(), serde_json::to_vec(block)?);
        }
        // Drop anything past the new tip.
        let tail = (chain.len() as u64).to_be_bytes();
        for key in self.blocks.range(tail..).keys() {
            batch.remove(key?);
        }
        self.blocks.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}
