//! Per-user game state and its stored document form.
//!
//! `GameState` is the plain value the state machine mutates. `GameDocument`
//! wraps it with the identity and bookkeeping fields the store keeps. Both
//! serialize with camelCase keys so the JSON matches what the browser client
//! sends and expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Hearts available at full health.
pub const MAX_HEARTS: u8 = 5;

/// Minutes a depleted player waits before hearts refill.
pub const COOLDOWN_MINUTES: i64 = 30;

/// Gems spent to skip a cooldown.
pub const REFILL_GEM_COST: i64 = 50;

pub const DEFAULT_STREAK: u32 = 3;
pub const DEFAULT_GEMS: i64 = 150;

/// Complete game state for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    /// Remaining lives, `0..=MAX_HEARTS`.
    pub hearts: u8,
    pub xp: u64,
    pub streak: u32,
    /// Signed: `add_gems` applies spends without a floor.
    pub gems: i64,
    /// Highest unlocked level, starts at 1.
    pub current_level: u32,
    pub completed_levels: BTreeSet<u32>,
    /// Instant at which hearts refill. Set while depleted.
    pub cooldown_end_time: Option<DateTime<Utc>>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            hearts: MAX_HEARTS,
            xp: 0,
            streak: DEFAULT_STREAK,
            gems: DEFAULT_GEMS,
            current_level: 1,
            completed_levels: BTreeSet::new(),
            cooldown_end_time: None,
        }
    }
}

/// Stored form of a user's game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    /// Immutable identity key.
    pub user_id: String,
    #[serde(flatten)]
    pub state: GameState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameDocument {
    /// Fresh document with default state, stamped at `now`.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            state: GameState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
