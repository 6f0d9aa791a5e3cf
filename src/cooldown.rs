//! Server-side heart refills.
//!
//! Every stored cooldown deadline gets a one-shot timer keyed by user id.
//! When the timer fires the store refills hearts, provided the deadline it
//! was armed for is still the one on record. Arming and cancelling always
//! follow the store's current record, read under the timers lock, so two
//! syncs observed out of commit order still leave the right timer behind.
//!
//! Lock order: timers, then store. `fire` takes them one after the other.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::game::state::GameDocument;
use crate::store::{GameStore, StoreError};

struct ArmedTimer {
    deadline: DateTime<Utc>,
    handle: AbortHandle,
}

type Timers = HashMap<String, ArmedTimer>;

pub struct CooldownScheduler {
    store: Arc<GameStore>,
    runtime: Handle,
    timers: Mutex<Timers>,
}

impl CooldownScheduler {
    pub fn new(store: Arc<GameStore>, runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            store,
            runtime,
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// Bring the timer for `doc.user_id` in line with the stored cooldown.
    /// The stored record decides, not the snapshot in `doc`.
    pub fn observe(self: &Arc<Self>, doc: &GameDocument) {
        let user_id = doc.user_id.as_str();
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        match self.store.cooldown_end_time(user_id) {
            Ok(Some(deadline)) => self.arm(&mut timers, user_id, deadline),
            Ok(None) => {
                cancel_timer(&mut timers, user_id);
            }
            Err(e) => tracing::error!(user_id, error = %e, "failed to read cooldown"),
        }
    }

    /// Arm timers for every cooldown already in the store. Returns the count.
    pub fn rearm_all(self: &Arc<Self>) -> Result<usize, StoreError> {
        let Ok(mut timers) = self.timers.lock() else {
            return Err(StoreError::Poisoned);
        };
        let pending = self.store.pending_cooldowns()?;
        for (user_id, deadline) in &pending {
            self.arm(&mut timers, user_id, *deadline);
        }
        Ok(pending.len())
    }

    /// Drop the pending timer for `user_id`, if any.
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.timers.lock() {
            Ok(mut timers) => cancel_timer(&mut timers, user_id),
            Err(_) => false,
        }
    }

    pub fn is_armed(&self, user_id: &str) -> bool {
        self.timers
            .lock()
            .map(|t| t.contains_key(user_id))
            .unwrap_or(false)
    }

    fn arm(self: &Arc<Self>, timers: &mut Timers, user_id: &str, deadline: DateTime<Utc>) {
        if let Some(existing) = timers.get(user_id) {
            if existing.deadline == deadline {
                return;
            }
            existing.handle.abort();
        }

        let delay = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let scheduler: Weak<Self> = Arc::downgrade(self);
        let owner = user_id.to_string();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(scheduler) = scheduler.upgrade() else {
                return;
            };
            // The refill writes the store file.
            let user_id = owner.clone();
            let refill = tokio::task::spawn_blocking(move || scheduler.fire(&owner, deadline));
            if let Err(e) = refill.await {
                tracing::error!(user_id, error = %e, "cooldown refill task failed");
            }
        });

        tracing::debug!(user_id, %deadline, "cooldown timer armed");
        timers.insert(
            user_id.to_string(),
            ArmedTimer {
                deadline,
                handle: task.abort_handle(),
            },
        );
    }

    fn fire(&self, user_id: &str, deadline: DateTime<Utc>) {
        match self.store.finish_cooldown(user_id, deadline) {
            Ok(Some(_)) => tracing::info!(user_id, "cooldown elapsed, hearts refilled"),
            Ok(None) => tracing::debug!(user_id, "cooldown already cleared"),
            Err(e) => tracing::error!(user_id, error = %e, "failed to refill hearts"),
        }
        if let Ok(mut timers) = self.timers.lock() {
            if timers.get(user_id).is_some_and(|t| t.deadline == deadline) {
                timers.remove(user_id);
            }
        }
    }
}

fn cancel_timer(timers: &mut Timers, user_id: &str) -> bool {
    match timers.remove(user_id) {
        Some(timer) => {
            timer.handle.abort();
            tracing::debug!(user_id, "cooldown timer cancelled");
            true
        }
        None => false,
    }
}
