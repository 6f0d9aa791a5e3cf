//! `/api/game/*` routes: fetch and sync a user's game-state document.

use crate::ServiceContext;
use crate::game::patch::GameStatePatch;
use crate::game::state::GameDocument;
use crate::routes::util::ApiResponse;
use crate::store::StoreError;

// ── GET /api/game/{user_id} ────────────────────────────────────────

/// Handle GET /api/game/{user_id}
/// Returns the stored document, creating it with defaults on first access.
pub fn handle_state_get(ctx: &ServiceContext, user_id: &str) -> ApiResponse {
    let result = ctx.store().fetch_or_create(user_id);
    respond(ctx, user_id, result)
}

// ── POST /api/game/{user_id}/sync ──────────────────────────────────

/// Handle POST /api/game/{user_id}/sync
/// Body: JSON object with any subset of game-state fields. `userId` and
/// `_id` are ignored. Returns the merged document, or 400 if a field is
/// malformed or out of range (nothing is written in that case).
pub fn handle_sync_post(ctx: &ServiceContext, user_id: &str, body: &str) -> ApiResponse {
    let patch = match GameStatePatch::from_json(body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "rejected sync payload");
            return ApiResponse::error(400, &e.to_string());
        }
    };
    let result = ctx.store().merge(user_id, &patch);
    respond(ctx, user_id, result)
}

fn respond(
    ctx: &ServiceContext,
    user_id: &str,
    result: Result<GameDocument, StoreError>,
) -> ApiResponse {
    match result {
        Ok(doc) => {
            if let Some(cooldowns) = ctx.cooldowns() {
                cooldowns.observe(&doc);
            }
            ApiResponse::ok(&doc)
        }
        Err(e) => {
            tracing::error!(user_id, error = %e, "game store failure");
            ApiResponse::server_error()
        }
    }
}
