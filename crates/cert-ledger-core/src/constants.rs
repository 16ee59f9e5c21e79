pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading zero bits a sealed block's digest must carry; 8 bits is the hex prefix "00".
pub const POW_TARGET_DIFFICULTY: u32 = 8;
/// Accepted range for a configured target. Each extra bit doubles expected sealing work.
pub const MIN_POW_DIFFICULTY: u32 = 1;
pub const MAX_POW_DIFFICULTY: u32 = 32;
pub const GENESIS_MSG: &str = "Certificate Ledger Genesis";
pub const DEFAULT_RECENT_BLOCKS: usize = 5;
pub const SHORT_HASH_LEN: usize = 8;
