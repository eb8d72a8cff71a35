//! Environment configuration, loadable from a toml profile via
//! [`crate::support::load_toml`].

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// LMDB environment sizing knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Upper bound on the memory-mapped file size, in bytes.
    pub map_size: usize,
    /// Max number of concurrent read transactions, a hard limit enforced
    /// by the KV layer.
    pub max_readers: u32,
    /// Max number of named sub-databases the environment may open.
    pub max_dbs: u32,
    /// Name of the sibling advisory lock file.
    pub lock_file_name: String,
}

impl EnvConfig {
    /// Load sizing knobs from a toml profile, falling back to
    /// [`Default::default`] for any field it omits.
    pub fn load(path: &Path) -> Result<EnvConfig> {
        crate::support::load_toml(path)
    }
}

impl Default for EnvConfig {
    fn default() -> EnvConfig {
        EnvConfig {
            map_size: 10 * 1024 * 1024 * 1024, // 10 GiB
            max_readers: 126,
            max_dbs: 64,
            lock_file_name: "nogdb.lock".to_string(),
        }
    }
}
