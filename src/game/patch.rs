//! Sync payloads: partial game-state updates sent by the client.
//!
//! A sync body is an arbitrary JSON object. Identity keys are stripped,
//! unknown keys are ignored, and every known field is type- and range-checked
//! before the patch reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::game::state::{GameState, MAX_HEARTS};

/// Keys a client may never overwrite.
const IDENTITY_KEYS: &[&str] = &["userId", "_id"];

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid sync payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sync payload must be a JSON object")]
    NotAnObject,
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },
}

/// Field-level overwrite of a `GameState`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hearts: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gems: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_levels: Option<BTreeSet<u32>>,
    /// `Some(None)` is an explicit `null` that clears the cooldown.
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub cooldown_end_time: Option<Option<DateTime<Utc>>>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl GameStatePatch {
    /// Parse and validate a raw sync body.
    pub fn from_json(body: &str) -> Result<Self, PatchError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let Value::Object(mut fields) = serde_json::from_str::<Value>(body)? else {
            return Err(PatchError::NotAnObject);
        };
        for key in IDENTITY_KEYS {
            if fields.remove(*key).is_some() {
                tracing::debug!(key, "dropping identity key from sync payload");
            }
        }
        let patch: Self = serde_json::from_value(Value::Object(fields))?;
        patch.validate()?;
        Ok(patch)
    }

    /// Patch that overwrites every field with the values in `state`.
    pub fn from_state(state: &GameState) -> Self {
        Self {
            hearts: Some(state.hearts),
            xp: Some(state.xp),
            streak: Some(state.streak),
            gems: Some(state.gems),
            current_level: Some(state.current_level),
            completed_levels: Some(state.completed_levels.clone()),
            cooldown_end_time: Some(state.cooldown_end_time),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Range checks the type system does not already cover.
    pub fn validate(&self) -> Result<(), PatchError> {
        if let Some(hearts) = self.hearts {
            if hearts > MAX_HEARTS {
                return Err(PatchError::OutOfRange {
                    field: "hearts",
                    value: hearts.into(),
                    expected: "0..=5",
                });
            }
        }
        if let Some(gems) = self.gems {
            if gems < 0 {
                return Err(PatchError::OutOfRange {
                    field: "gems",
                    value: gems,
                    expected: ">= 0",
                });
            }
        }
        if self.current_level == Some(0) {
            return Err(PatchError::OutOfRange {
                field: "currentLevel",
                value: 0,
                expected: ">= 1",
            });
        }
        if let Some(levels) = &self.completed_levels {
            if levels.contains(&0) {
                return Err(PatchError::OutOfRange {
                    field: "completedLevels",
                    value: 0,
                    expected: "level ids >= 1",
                });
            }
        }
        Ok(())
    }

    /// Overwrite every present field on `state`.
    pub fn apply_to(&self, state: &mut GameState) {
        if let Some(hearts) = self.hearts {
            state.hearts = hearts;
        }
        if let Some(xp) = self.xp {
            state.xp = xp;
        }
        if let Some(streak) = self.streak {
            state.streak = streak;
        }
        if let Some(gems) = self.gems {
            state.gems = gems;
        }
        if let Some(level) = self.current_level {
            state.current_level = level;
        }
        if let Some(levels) = &self.completed_levels {
            state.completed_levels = levels.clone();
        }
        if let Some(cooldown) = self.cooldown_end_time {
            state.cooldown_end_time = cooldown;
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
