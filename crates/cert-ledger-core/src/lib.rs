use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod canonical;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::{BlockSummary, ChainStatus, Ledger, Receipt, Verification};

use constants::{HASH_HEX_SIZE, HASH_SIZE};

pub type Hash = [u8; HASH_SIZE];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertStatus {
    Issued,
    Revoked,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertStatus::Issued => f.write_str("ISSUED"),
            CertStatus::Revoked => f.write_str("REVOKED"),
        }
    }
}

/// One version of a certificate. A new version is a new block carrying the same `cert_id`.
///
/// Stored records must carry exactly these fields. Anything serde would drop or
/// fill in on load is a field the digest could not account for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Certificate {
    pub cert_id: String,
    pub student_name: String,
    pub program: String,
    pub issued_on: String,
    pub issuer: String,
    pub status: CertStatus,
    pub remarks: String,
}

impl Certificate {
    pub fn issued(
        cert_id: impl Into<String>,
        student_name: impl Into<String>,
        program: impl Into<String>,
        issued_on: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            cert_id: cert_id.into(),
            student_name: student_name.into(),
            program: program.into(),
            issued_on: issued_on.into(),
            issuer: issuer.into(),
            status: CertStatus::Issued,
            remarks: String::new(),
        }
    }

    /// The revoked successor of this record. Subject fields carry over.
    pub fn revoked_by(&self, issuer: impl Into<String>, remarks: impl Into<String>) -> Self {
        Self {
            cert_id: self.cert_id.clone(),
            student_name: self.student_name.clone(),
            program: self.program.clone(),
            issued_on: self.issued_on.clone(),
            issuer: issuer.into(),
            status: CertStatus::Revoked,
            remarks: remarks.into(),
        }
    }

    /// Sorted-key compact JSON of the record, the same bytes it contributes to a block digest.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        canonical::to_canonical_string(self)
    }
}

/// Ledger event carried by a block, tagged on `type` in the persisted form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE", deny_unknown_fields)]
pub enum BlockData {
    Genesis {
        msg: String,
    },
    Issue {
        certificate: Certificate,
    },
    Revoke {
        certificate: Certificate,
    },
}

impl BlockData {
    pub fn kind(&self) -> &'static str {
        match self {
            BlockData::Genesis { .. } => "GENESIS",
            BlockData::Issue { .. } => "ISSUE",
            BlockData::Revoke { .. } => "REVOKE",
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            BlockData::Genesis { .. } => None,
            BlockData::Issue { certificate } | BlockData::Revoke { certificate } => {
                Some(certificate)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub data: BlockData,
    pub prev_hash: String,
    pub nonce: u64,
}

impl Block {
    /// Unsealed candidate stamped with the current time.
    pub fn new(index: u64, data: BlockData, prev_hash: String) -> Self {
        Self {
            index,
            timestamp: now_secs(),
            data,
            prev_hash,
            nonce: 0,
        }
    }

    pub fn genesis(msg: impl Into<String>) -> Self {
        Self::new(
            0,
            BlockData::Genesis { msg: msg.into() },
            "0".repeat(HASH_HEX_SIZE),
        )
    }

    /// Canonical bytes of `{data, index, nonce, prev_hash, timestamp}`.
    pub fn hash_bytes(&self) -> Vec<u8> {
        // Only strings, integers, one f64 and string-keyed structs: to_value cannot fail.
        canonical::to_canonical_vec(self).expect("block fields always encode as JSON")
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.hash_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(&digest[..]);
        out
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.data, BlockData::Genesis { .. })
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub mod pow {
    use super::{Block, Hash};
    use crate::constants::BYTE;
    use tracing::debug;

    /// Seal the block by incrementing nonce until the number of leading zero bits
    /// in the block hash >= `target_zeros`.
    pub fn seal(mut block: Block, target_zeros: u32) -> Block {
        let mut attempts = 1u64;
        while !meets_target(&block.hash(), target_zeros) {
            block.nonce = block.nonce.wrapping_add(1);
            attempts += 1;
        }
        debug!(index = block.index, nonce = block.nonce, attempts, "block sealed");
        block
    }

    pub fn meets_target(hash: &Hash, target_zeros: u32) -> bool {
        count_leading_zero_bits(hash) >= target_zeros
    }

    pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += BYTE as u32;
            } else {
                total += b.leading_zeros();
                break;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENESIS_MSG;

    fn sample_cert() -> Certificate {
        Certificate::issued("C-100", "A. Smith", "CS", "2024-01-01", "Dept X")
    }

    fn sample_block() -> Block {
        let mut block = Block::new(
            1,
            BlockData::Issue {
                certificate: sample_cert(),
            },
            "0".repeat(HASH_HEX_SIZE),
        );
        block.timestamp = 1_700_000_000.25;
        block
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(pow::count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(pow::count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80; // 00000000 10000000
        assert_eq!(pow::count_leading_zero_bits(&h), 8);
        h[1] = 0x40; // 01000000
        assert_eq!(pow::count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn default_target_is_hex_prefix_00() {
        let sealed = pow::seal(sample_block(), constants::POW_TARGET_DIFFICULTY);
        assert!(sealed.hash_hex().starts_with("00"));
        assert!(pow::meets_target(&sealed.hash(), 8));
    }

    #[test]
    fn seal_only_touches_nonce() {
        let block = sample_block();
        let sealed = pow::seal(block.clone(), 8);
        assert_eq!(sealed.index, block.index);
        assert_eq!(sealed.timestamp, block.timestamp);
        assert_eq!(sealed.data, block.data);
        assert_eq!(sealed.prev_hash, block.prev_hash);
    }

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis(GENESIS_MSG);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.prev_hash, "0".repeat(64));
        assert_eq!(genesis.nonce, 0);
        assert!(genesis.is_genesis());
        assert_eq!(genesis.data.kind(), "GENESIS");
        assert!(genesis.data.certificate().is_none());
    }

    #[test]
    fn block_hash_consistency() {
        let block = sample_block();
        assert_eq!(block.hash(), block.hash());
        assert_eq!(block.hash_hex().len(), HASH_HEX_SIZE);
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let mut block = sample_block();
        let hash1 = block.hash();
        block.nonce += 1;
        let hash2 = block.hash();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn block_hash_changes_with_data() {
        let block = sample_block();
        let mut tampered = block.clone();
        if let BlockData::Issue { certificate } = &mut tampered.data {
            certificate.student_name = "B. Jones".into();
        }
        assert_ne!(block.hash(), tampered.hash());
    }

    #[test]
    fn hash_bytes_are_sorted_compact_json() {
        let block = sample_block();
        let s = String::from_utf8(block.hash_bytes()).unwrap();
        assert!(s.starts_with(r#"{"data":{"certificate":{"cert_id":"C-100""#));
        assert!(s.contains(r#""index":1,"nonce":0,"prev_hash":"#));
        assert!(s.ends_with(r#""timestamp":1700000000.25}"#));
    }

    #[test]
    fn hash_survives_json_round_trip() {
        let mut block = sample_block();
        block.timestamp = 1_712_345_678.123_456_7;
        let before = block.hash();
        let json = serde_json::to_string_pretty(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.hash(), before);
    }

    #[test]
    fn block_data_is_tagged_on_type() {
        let json = serde_json::to_value(&sample_block().data).unwrap();
        assert_eq!(json["type"], "ISSUE");
        assert_eq!(json["certificate"]["status"], "ISSUED");
        assert_eq!(json["certificate"]["remarks"], "");

        let genesis: BlockData =
            serde_json::from_str(r#"{"type":"GENESIS","msg":"Certificate Ledger Genesis"}"#)
                .unwrap();
        assert_eq!(
            genesis,
            BlockData::Genesis {
                msg: GENESIS_MSG.into()
            }
        );
    }

    #[test]
    fn certificate_canonical_json_example() {
        let json = sample_cert().canonical_json().unwrap();
        assert_eq!(
            json,
            r#"{"cert_id":"C-100","issued_on":"2024-01-01","issuer":"Dept X","program":"CS","remarks":"","status":"ISSUED","student_name":"A. Smith"}"#
        );
    }

    #[test]
    fn revoked_by_carries_subject_fields() {
        let revoked = sample_cert().revoked_by("Registrar", "error");
        assert_eq!(revoked.cert_id, "C-100");
        assert_eq!(revoked.student_name, "A. Smith");
        assert_eq!(revoked.program, "CS");
        assert_eq!(revoked.issued_on, "2024-01-01");
        assert_eq!(revoked.issuer, "Registrar");
        assert_eq!(revoked.remarks, "error");
        assert_eq!(revoked.status, CertStatus::Revoked);
    }

    #[test]
    fn missing_remarks_is_rejected() {
        let res: serde_json::Result<Certificate> = serde_json::from_str(
            r#"{"cert_id":"X","student_name":"S","program":"P","issued_on":"2024","issuer":"I","status":"REVOKED"}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn unknown_fields_are_rejected_at_every_level() {
        let block = sample_block();
        let mut json = serde_json::to_value(&block).unwrap();
        assert_eq!(serde_json::from_value::<Block>(json.clone()).unwrap(), block);

        json["data"]["certificate"]["grade"] = "A+".into();
        assert!(serde_json::from_value::<Block>(json.clone()).is_err());

        let mut json = serde_json::to_value(&block).unwrap();
        json["data"]["note"] = "injected".into();
        assert!(serde_json::from_value::<Block>(json).is_err());

        let mut json = serde_json::to_value(&block).unwrap();
        json["signature"] = "ff".into();
        assert!(serde_json::from_value::<Block>(json).is_err());

        let genesis: serde_json::Result<BlockData> =
            serde_json::from_str(r#"{"type":"GENESIS","msg":"m","extra":1}"#);
        assert!(genesis.is_err());
    }

    #[test]
    fn hash_bytes_handles_awkward_text() {
        let mut block = sample_block();
        if let BlockData::Issue { certificate } = &mut block.data {
            certificate.student_name = "Zoë \"Q\" O'Brien\n李".into();
            certificate.remarks = "{\"not\":\"json\"}".into();
        }
        let bytes = block.hash_bytes();
        let back: Block = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.hash(), block.hash());
    }
}
