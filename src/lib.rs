//! Orator Spark game-state service.
//!
//! The `game` module holds the per-user state and the client-side state
//! machine; `bindings` exposes that machine to the browser through
//! wasm-bindgen. With the `server` feature the crate also provides the
//! durable store, the cooldown scheduler and `handle_request`, a
//! transport-agnostic dispatcher routed with `matchit` (the router engine
//! underneath Axum) that the server binary forwards every request to.

pub mod bindings;
pub mod game;

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod cooldown;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod store;

#[cfg(feature = "server")]
pub use server::{ServiceContext, handle_request};

#[cfg(feature = "server")]
mod server {
    use std::sync::Arc;

    use crate::cooldown::CooldownScheduler;
    use crate::routes;
    use crate::routes::util::ApiResponse;
    use crate::store::GameStore;

    /// Everything a request handler needs. Cheap to share behind an `Arc`.
    pub struct ServiceContext {
        store: Arc<GameStore>,
        cooldowns: Option<Arc<CooldownScheduler>>,
    }

    impl ServiceContext {
        pub fn new(store: Arc<GameStore>) -> Self {
            Self {
                store,
                cooldowns: None,
            }
        }

        /// Attach a scheduler that tracks every document the routes return.
        pub fn with_cooldowns(mut self, scheduler: Arc<CooldownScheduler>) -> Self {
            self.cooldowns = Some(scheduler);
            self
        }

        pub fn store(&self) -> &GameStore {
            &self.store
        }

        pub fn cooldowns(&self) -> Option<&Arc<CooldownScheduler>> {
            self.cooldowns.as_ref()
        }
    }

    /// Dispatch one request and return a JSON response.
    ///
    /// # Arguments
    /// * `method` — HTTP method (e.g., "GET", "POST")
    /// * `path`   — URL path without query (e.g., "/api/game/u1/sync")
    /// * `body`   — Request body. Empty string for GET requests.
    pub fn handle_request(ctx: &ServiceContext, method: &str, path: &str, body: &str) -> ApiResponse {
        let mut router = matchit::Router::new();

        router.insert("/healthz", "health").ok();
        router.insert("/api/game/{user_id}", "game_state").ok();
        router.insert("/api/game/{user_id}/sync", "game_sync").ok();

        let Ok(matched) = router.at(path) else {
            return ApiResponse::not_found();
        };
        let user_id = matched.params.get("user_id").unwrap_or_default();

        match (*matched.value, method) {
            ("health", "GET") => ApiResponse::ok(&serde_json::json!({ "status": "ok" })),
            ("game_state", "GET") => routes::game::handle_state_get(ctx, user_id),
            ("game_sync", "POST") => routes::game::handle_sync_post(ctx, user_id, body),
            _ => ApiResponse::method_not_allowed(),
        }
    }

}
