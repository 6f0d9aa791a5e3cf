//! Client-side game state machine.
//!
//! A `GameSession` owns one player's `GameState` and applies the transitions
//! the UI triggers during play. Nothing here touches storage; the caller
//! decides when to send `sync_patch()` to the server.
//!
//! The composite state that matters is (hearts, cooldown). A session is
//! *active* while hearts > 0 and *depleted* once the last heart is lost, at
//! which point a refill deadline is armed. The UI polls `poll_cooldown` to
//! return to active once the deadline passes.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::game::curriculum;
use crate::game::patch::GameStatePatch;
use crate::game::state::{COOLDOWN_MINUTES, GameState, MAX_HEARTS, REFILL_GEM_COST};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("not enough gems: have {have}, need {need}")]
    InsufficientGems { have: i64, need: i64 },
}

/// Skill-tree standing of a level relative to the player's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Locked,
    Active,
    Completed,
}

impl LevelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelStatus::Locked => "locked",
            LevelStatus::Active => "active",
            LevelStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSession {
    state: GameState,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: GameState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn is_depleted(&self) -> bool {
        self.state.hearts == 0
    }

    /// Lose one heart. Returns true when this call used up the last heart,
    /// which arms the refill cooldown. Losing a heart at zero changes nothing.
    pub fn lose_heart(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.hearts == 0 {
            return false;
        }
        self.state.hearts -= 1;
        if self.state.hearts == 0 {
            self.state.cooldown_end_time = Some(now + TimeDelta::minutes(COOLDOWN_MINUTES));
            return true;
        }
        false
    }

    pub fn gain_xp(&mut self, amount: u64) {
        self.state.xp = self.state.xp.saturating_add(amount);
    }

    /// Mark `level_id` complete and unlock the level after it.
    pub fn complete_level(&mut self, level_id: u32) {
        self.state.completed_levels.insert(level_id);
        let next = level_id.saturating_add(1);
        self.state.current_level = self.state.current_level.max(next);
    }

    /// Complete a skill-tree lesson, awarding its XP reward.
    /// Returns the XP awarded; ids outside the catalog award none.
    pub fn finish_lesson(&mut self, level_id: u32) -> u64 {
        let reward = curriculum::node(level_id).map_or(0, |n| n.xp_reward);
        self.gain_xp(reward);
        self.complete_level(level_id);
        reward
    }

    pub fn reset_hearts(&mut self) {
        self.state.hearts = MAX_HEARTS;
        self.state.cooldown_end_time = None;
    }

    /// Arm a cooldown regardless of the current heart count.
    pub fn set_cooldown(&mut self, now: DateTime<Utc>, minutes: i64) {
        let length = TimeDelta::try_minutes(minutes).unwrap_or(TimeDelta::MAX);
        self.set_cooldown_for(now, length);
    }

    /// Arm a cooldown of arbitrary length, saturating at the latest instant.
    pub fn set_cooldown_for(&mut self, now: DateTime<Utc>, length: TimeDelta) {
        let end = now.checked_add_signed(length);
        self.state.cooldown_end_time = Some(end.unwrap_or(DateTime::<Utc>::MAX_UTC));
    }

    /// Adjust gems by `amount`. Negative amounts spend; no floor applies.
    pub fn add_gems(&mut self, amount: i64) {
        self.state.gems = self.state.gems.saturating_add(amount);
    }

    /// Spend gems to skip the cooldown.
    pub fn refill_with_gems(&mut self) -> Result<(), SessionError> {
        if self.state.gems < REFILL_GEM_COST {
            return Err(SessionError::InsufficientGems {
                have: self.state.gems,
                need: REFILL_GEM_COST,
            });
        }
        self.add_gems(-REFILL_GEM_COST);
        self.reset_hearts();
        Ok(())
    }

    /// Time left on the cooldown, or `None` when no cooldown is set.
    /// Saturates at zero once the deadline has passed.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let end = self.state.cooldown_end_time?;
        Some((end - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Refill hearts if the cooldown deadline has passed. Call on each UI tick.
    pub fn poll_cooldown(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.cooldown_end_time {
            Some(end) if now >= end => {
                self.reset_hearts();
                true
            }
            _ => false,
        }
    }

    pub fn level_status(&self, level_id: u32) -> LevelStatus {
        if self.state.completed_levels.contains(&level_id) {
            LevelStatus::Completed
        } else if level_id <= self.state.current_level {
            LevelStatus::Active
        } else {
            LevelStatus::Locked
        }
    }

    /// Full-state payload for the sync route.
    pub fn sync_patch(&self) -> GameStatePatch {
        GameStatePatch::from_state(&self.state)
    }
}

/// Render a countdown as `m:ss`.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
