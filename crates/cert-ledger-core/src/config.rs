use crate::constants::{GENESIS_MSG, MAX_POW_DIFFICULTY, MIN_POW_DIFFICULTY, POW_TARGET_DIFFICULTY};
use crate::error::LedgerError;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Leading zero bits required of every sealed block. The default of 8 is the
    /// hex prefix "00". Changing it after blocks were sealed makes those blocks
    /// fail validation if the new target is higher.
    #[serde(default = "default_difficulty_bits")]
    pub difficulty_bits: u32,
    /// Message recorded in the genesis block of a new ledger.
    #[serde(default = "default_genesis_msg")]
    pub genesis_msg: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: default_difficulty_bits(),
            genesis_msg: default_genesis_msg(),
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, bits: u32) -> Self {
        self.difficulty_bits = bits;
        self
    }

    /// A target outside `MIN_POW_DIFFICULTY..=MAX_POW_DIFFICULTY` would either seal
    /// nothing or never finish sealing.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if !(MIN_POW_DIFFICULTY..=MAX_POW_DIFFICULTY).contains(&self.difficulty_bits) {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty_bits must be within {MIN_POW_DIFFICULTY}..={MAX_POW_DIFFICULTY}, got {}",
                self.difficulty_bits
            )));
        }
        Ok(())
    }
}

fn default_difficulty_bits() -> u32 {
    POW_TARGET_DIFFICULTY
}

fn default_genesis_msg() -> String {
    GENESIS_MSG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.difficulty_bits, 8);
        assert_eq!(cfg.genesis_msg, "Certificate Ledger Genesis");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{"difficulty_bits":4}"#).unwrap();
        assert_eq!(cfg.difficulty_bits, 4);
        assert_eq!(cfg.genesis_msg, GENESIS_MSG);
        assert_eq!(LedgerConfig::default().with_difficulty(4), cfg);
    }

    #[test]
    fn difficulty_bounds() {
        assert!(LedgerConfig::default().validate().is_ok());
        assert!(LedgerConfig::default().with_difficulty(1).validate().is_ok());
        assert!(LedgerConfig::default().with_difficulty(32).validate().is_ok());
        for bits in [0, 33, 256, 300, u32::MAX] {
            assert!(matches!(
                LedgerConfig::default().with_difficulty(bits).validate(),
                Err(LedgerError::InvalidConfig(_))
            ));
        }
    }
}
