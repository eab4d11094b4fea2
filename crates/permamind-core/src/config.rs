use std::time::Duration;

use crate::constants::*;

/// Memory-hard password hash parameters backing the symmetric key derivation (C1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordHashParams {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for PasswordHashParams {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_KDF_TIME_COST,
            memory_kib: DEFAULT_KDF_MEMORY_KIB,
            parallelism: DEFAULT_KDF_PARALLELISM,
            output_len: DEFAULT_KDF_OUTPUT_LEN,
        }
    }
}

/// Every previously-hard-coded budget, cap, and period, gathered into one
/// explicit, overridable surface. Constructed with [`SyncConfig::default`] and
/// passed by value into the sync engine and background loop — never read from
/// a global singleton, so tests can run several isolated instances side by side.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Maximum encrypted size of a data shard before it must be split (§4.6).
    pub free_upload_budget_bytes: usize,
    /// Pull-side defensive cap on a single data shard fetch (§4.7).
    pub data_shard_max_bytes: usize,
    /// Pull-side defensive cap on an identity record fetch (§4.7).
    pub identity_max_bytes: usize,
    /// Fact-sync ticker period (§4.9).
    pub fact_sync_period: Duration,
    /// Conversation watcher ticker period (§4.9).
    pub conversation_watch_period: Duration,
    /// Memory-hard password hash parameters (§4.1).
    pub kdf_params: PasswordHashParams,
    /// The `App-Name` tag value stamped on every upload (§6).
    pub app_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            free_upload_budget_bytes: DEFAULT_FREE_UPLOAD_BUDGET_BYTES,
            data_shard_max_bytes: DEFAULT_DATA_SHARD_MAX_BYTES,
            identity_max_bytes: DEFAULT_IDENTITY_MAX_BYTES,
            fact_sync_period: Duration::from_secs(DEFAULT_FACT_SYNC_PERIOD_SECS),
            conversation_watch_period: Duration::from_secs(DEFAULT_CONVERSATION_WATCH_PERIOD_SECS),
            kdf_params: PasswordHashParams::default(),
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }
}
