//! Pool configuration.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Transaction pool tuning knobs.
#[derive(Debug, Clone)]
pub struct TxPoolConfig {
    /// Treat no transaction as exempt from the price floor.
    pub no_locals: bool,
    /// Path of the local-transaction journal; `None` disables it.
    pub journal: Option<PathBuf>,
    /// How often the journal is rewritten from scratch.
    pub rejournal: Duration,

    /// Minimum gas price for acceptance into a full pool.
    pub price_limit: u64,
    /// Minimum price increase, in percent, to replace a pooled slot.
    pub price_bump: u64,

    /// Executable transactions guaranteed per account.
    pub account_slots: usize,
    /// Executable transaction slots for the whole pool.
    pub global_slots: usize,
    /// Non-executable transactions allowed per account.
    pub account_queue: usize,
    /// Non-executable transaction slots for the whole pool.
    pub global_queue: usize,

    /// How long a non-executable transaction may wait before eviction.
    pub lifetime: Duration,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            no_locals: false,
            journal: None,
            rejournal: Duration::from_secs(60 * 60),
            price_limit: 1,
            price_bump: 10,
            account_slots: 16,
            global_slots: 4096,
            account_queue: 64,
            global_queue: 1024,
            lifetime: Duration::from_secs(3 * 60 * 60),
        }
    }
}

impl TxPoolConfig {
    /// Clamp nonsensical values back to defaults, logging each fix.
    pub fn sanitize(mut self) -> Self {
        let defaults = Self::default();
        if self.rejournal < Duration::from_secs(1) {
            warn!(provided = ?self.rejournal, "sanitizing invalid txpool journal time");
            self.rejournal = defaults.rejournal;
        }
        if self.price_limit == 0 {
            warn!(provided = self.price_limit, "sanitizing invalid txpool price limit");
            self.price_limit = defaults.price_limit;
        }
        if self.price_bump == 0 {
            warn!(provided = self.price_bump, "sanitizing invalid txpool price bump");
            self.price_bump = defaults.price_bump;
        }
        if self.account_slots == 0 {
            warn!(provided = self.account_slots, "sanitizing invalid txpool account slots");
            self.account_slots = defaults.account_slots;
        }
        self
    }

    /// Total slot budget across both tiers.
    pub fn total_slots(&self) -> usize {
        self.global_slots + self.global_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_restores_defaults() {
        let config = TxPoolConfig {
            price_limit: 0,
            price_bump: 0,
            rejournal: Duration::from_millis(10),
            account_slots: 0,
            ..Default::default()
        }
        .sanitize();
        let defaults = TxPoolConfig::default();
        assert_eq!(config.price_limit, defaults.price_limit);
        assert_eq!(config.price_bump, defaults.price_bump);
        assert_eq!(config.rejournal, defaults.rejournal);
        assert_eq!(config.account_slots, defaults.account_slots);
    }
}
