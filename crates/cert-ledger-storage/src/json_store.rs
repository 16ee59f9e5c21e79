use crate::corrupt;
use anyhow::{Context, Result};
use cert_ledger_core::{chain::ChainStore, Block};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_FILE_NAME: &str = "chain.json";

/// The whole chain as one pretty-printed JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<dir>/chain.json`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Block>>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no chain file yet");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let blocks: Vec<Block> = serde_json::from_str(&raw)
            .map_err(|e| corrupt(format!("{}: {e}", self.path.display())))?;
        info!(path = %self.path.display(), blocks = blocks.len(), "chain file loaded");
        Ok(Some(blocks))
    }

    fn save(&self, chain: &[Block]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(chain)?;
        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.tmp_path();
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        debug!(path = %self.path.display(), blocks = chain.len(), "chain file saved");
        Ok(())
    }
}
