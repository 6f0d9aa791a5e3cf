//! Browser bindings for the game state machine.
//!
//! The UI creates one `Session`, loads the document returned by
//! `GET /api/game/{user_id}`, calls the transition methods during play and
//! posts `sync_payload()` to `/api/game/{user_id}/sync`. Timestamps cross
//! the boundary as epoch milliseconds (`Date.now()`), so the session never
//! reads a clock itself.

use chrono::{DateTime, TimeDelta, Utc};
use wasm_bindgen::prelude::*;

use crate::game::patch::GameStatePatch;
use crate::game::session::{GameSession, format_countdown};
use crate::game::state::GameState;

fn from_millis(ms: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_default()
}

#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct Session {
    inner: GameSession,
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Session {
        Session::default()
    }

    /// Replace the session state with a server document (or bare state) JSON.
    /// Returns "ok" on success, otherwise why the state was rejected. A
    /// rejected load keeps the current state.
    pub fn load(&mut self, json: &str) -> String {
        let state = match serde_json::from_str::<GameState>(json) {
            Ok(state) => state,
            Err(e) => return format!("Invalid game state JSON: {}", e),
        };
        if let Err(e) = GameStatePatch::from_state(&state).validate() {
            return format!("Invalid game state: {}", e);
        }
        self.inner = GameSession::from_state(state);
        "ok".to_string()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self.inner.state()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Body for `POST /api/game/{user_id}/sync`.
    pub fn sync_payload(&self) -> String {
        self.inner.sync_patch().to_json()
    }

    #[wasm_bindgen(getter)]
    pub fn hearts(&self) -> u8 {
        self.inner.state().hearts
    }

    #[wasm_bindgen(getter)]
    pub fn xp(&self) -> f64 {
        self.inner.state().xp as f64
    }

    #[wasm_bindgen(getter)]
    pub fn gems(&self) -> f64 {
        self.inner.state().gems as f64
    }

    #[wasm_bindgen(getter)]
    pub fn streak(&self) -> u32 {
        self.inner.state().streak
    }

    #[wasm_bindgen(getter)]
    pub fn current_level(&self) -> u32 {
        self.inner.state().current_level
    }

    /// True when this loss emptied the hearts and started the cooldown.
    pub fn lose_heart(&mut self, now_ms: f64) -> bool {
        self.inner.lose_heart(from_millis(now_ms))
    }

    pub fn gain_xp(&mut self, amount: f64) {
        self.inner.gain_xp(amount.max(0.0) as u64);
    }

    pub fn complete_level(&mut self, level_id: u32) {
        self.inner.complete_level(level_id);
    }

    /// Complete a skill-tree lesson and return the XP it awarded.
    pub fn finish_lesson(&mut self, level_id: u32) -> f64 {
        self.inner.finish_lesson(level_id) as f64
    }

    pub fn reset_hearts(&mut self) {
        self.inner.reset_hearts();
    }

    /// `minutes` may be fractional.
    pub fn set_cooldown(&mut self, now_ms: f64, minutes: f64) {
        let length =
            TimeDelta::try_milliseconds((minutes * 60_000.0) as i64).unwrap_or(TimeDelta::MAX);
        self.inner.set_cooldown_for(from_millis(now_ms), length);
    }

    pub fn add_gems(&mut self, amount: f64) {
        self.inner.add_gems(amount as i64);
    }

    /// Spend gems to refill hearts. False when the player cannot afford it.
    pub fn refill_with_gems(&mut self) -> bool {
        self.inner.refill_with_gems().is_ok()
    }

    /// Call once per UI tick; true when the cooldown ended and hearts refilled.
    pub fn poll_cooldown(&mut self, now_ms: f64) -> bool {
        self.inner.poll_cooldown(from_millis(now_ms))
    }

    /// Countdown label ("29:59"), or an empty string with no cooldown.
    pub fn cooldown_label(&self, now_ms: f64) -> String {
        self.inner
            .cooldown_remaining(from_millis(now_ms))
            .map(format_countdown)
            .unwrap_or_default()
    }

    /// "locked", "active" or "completed".
    pub fn level_status(&self, level_id: u32) -> String {
        self.inner.level_status(level_id).as_str().to_string()
    }
}
