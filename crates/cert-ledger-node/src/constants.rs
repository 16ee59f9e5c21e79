pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub(crate) const DEFAULT_DATA_DIR: &str = "./data";
pub(crate) const SLED_DIR_NAME: &str = "sled";
pub(crate) const MAX_BLOCKS_PER_REQUEST: usize = 250;
