//! Ledger parameters

use crate::constants::CUT_OFF_AGE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Forks more than this many levels below the tip are pruned
    pub cut_off_age: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cut_off_age: CUT_OFF_AGE,
        }
    }
}
