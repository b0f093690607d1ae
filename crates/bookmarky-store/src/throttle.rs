// crates/bookmarky-store/src/throttle.rs
// ============================================================================
// Module: Operation Throttle
// Description: Counter-gated cooldown for backend operation loops.
// Purpose: Keep chunk loops under the backend's operations-per-window ceiling.
// Dependencies: serde, tokio
// ============================================================================

//! ## Overview
//! A [`Throttle`] counts operations issued by one loop. Once the count
//! reaches [`ThrottleConfig::max_operations`], the next acquisition sleeps for
//! the configured cooldown and restarts the count. The threshold is a fixed
//! setting kept below the backend's true ceiling so concurrent callers keep
//! some headroom; nothing is measured from backend responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default operations allowed before a cooldown.
pub const DEFAULT_MAX_OPERATIONS: u32 = 100;
/// Default cooldown in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 60_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Throttle settings shared by every chunk loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThrottleConfig {
    /// Operations issued before the loop pauses.
    #[serde(default = "default_max_operations")]
    pub max_operations: u32,
    /// Pause length in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl ThrottleConfig {
    /// Returns the cooldown as a [`Duration`].
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Returns the default operation threshold.
const fn default_max_operations() -> u32 {
    DEFAULT_MAX_OPERATIONS
}

/// Returns the default cooldown in milliseconds.
const fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

// ============================================================================
// SECTION: Throttle
// ============================================================================

/// Per-loop operation counter with a fixed cooldown.
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Active settings.
    config: ThrottleConfig,
    /// Operations admitted since the last cooldown.
    operations: u32,
    /// Cooldowns taken so far.
    pauses: u32,
}

impl Throttle {
    /// Creates a throttle with a fresh count.
    #[must_use]
    pub const fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            operations: 0,
            pauses: 0,
        }
    }

    /// Admits one operation, sleeping first when the threshold was reached.
    ///
    /// Returns the pause taken, if any. A zero threshold never pauses.
    pub async fn acquire(&mut self) -> Option<Duration> {
        let mut paused = None;
        if self.config.max_operations > 0 && self.operations >= self.config.max_operations {
            let cooldown = self.config.cooldown();
            tokio::time::sleep(cooldown).await;
            self.operations = 0;
            self.pauses = self.pauses.saturating_add(1);
            paused = Some(cooldown);
        }
        self.operations = self.operations.saturating_add(1);
        paused
    }

    /// Returns how many cooldowns this throttle has taken.
    #[must_use]
    pub const fn pauses(&self) -> u32 {
        self.pauses
    }
}
