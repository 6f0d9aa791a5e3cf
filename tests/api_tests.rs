//! End-to-end scenarios through `handle_request`, the same entry point the
//! server binary forwards to.

use std::sync::Arc;

use chrono::Utc;
use orator_spark::game::session::GameSession;
use orator_spark::store::GameStore;
use orator_spark::{ServiceContext, handle_request};
use serde_json::Value;

fn service() -> ServiceContext {
    ServiceContext::new(Arc::new(GameStore::in_memory()))
}

fn call(ctx: &ServiceContext, method: &str, path: &str, body: &str) -> (u16, Value) {
    let res = handle_request(ctx, method, path, body);
    let json = serde_json::from_str(&res.body).expect("response body is JSON");
    (res.status, json)
}

#[test]
fn fresh_user_gets_default_document() {
    let ctx = service();
    let (status, doc) = call(&ctx, "GET", "/api/game/u1", "");
    assert_eq!(status, 200);
    assert_eq!(doc["userId"], "u1");
    assert_eq!(doc["hearts"], 5);
    assert_eq!(doc["xp"], 0);
    assert_eq!(doc["streak"], 3);
    assert_eq!(doc["gems"], 150);
    assert_eq!(doc["currentLevel"], 1);
    assert_eq!(doc["completedLevels"], serde_json::json!([]));
    assert!(doc["cooldownEndTime"].is_null());
}

#[test]
fn sync_merges_single_field() {
    let ctx = service();
    let (_, before) = call(&ctx, "GET", "/api/game/u1", "");
    let (status, _) = call(&ctx, "POST", "/api/game/u1/sync", r#"{"xp":500}"#);
    assert_eq!(status, 200);

    let (_, after) = call(&ctx, "GET", "/api/game/u1", "");
    assert_eq!(after["xp"], 500);
    for field in ["userId", "hearts", "streak", "gems", "currentLevel", "completedLevels", "cooldownEndTime", "createdAt"] {
        assert_eq!(after[field], before[field], "{field} changed");
    }
}

#[test]
fn sync_cannot_rewrite_identity() {
    let ctx = service();
    call(&ctx, "GET", "/api/game/u1", "");
    let (status, doc) = call(&ctx, "POST", "/api/game/u1/sync", r#"{"userId":"evil","xp":10}"#);
    assert_eq!(status, 200);
    assert_eq!(doc["userId"], "u1");
    assert_eq!(doc["xp"], 10);

    // No document was created or touched under the injected id.
    let (_, evil) = call(&ctx, "GET", "/api/game/evil", "");
    assert_eq!(evil["xp"], 0);
}

#[test]
fn sync_creates_missing_user() {
    let ctx = service();
    let (status, doc) = call(&ctx, "POST", "/api/game/newcomer/sync", r#"{"gems":75}"#);
    assert_eq!(status, 200);
    assert_eq!(doc["userId"], "newcomer");
    assert_eq!(doc["gems"], 75);
    assert_eq!(doc["hearts"], 5);
}

#[test]
fn out_of_range_sync_is_rejected() {
    let ctx = service();
    for body in [r#"{"hearts":9}"#, r#"{"gems":-1}"#, r#"{"hearts":-2}"#, r#"{"currentLevel":0}"#, "[]"] {
        let (status, err) = call(&ctx, "POST", "/api/game/u1/sync", body);
        assert_eq!(status, 400, "accepted {body}");
        assert!(err["error"].is_string());
    }
    let (_, doc) = call(&ctx, "GET", "/api/game/u1", "");
    assert_eq!(doc["hearts"], 5);
    assert_eq!(doc["gems"], 150);
}

#[test]
fn session_sync_round_trip() {
    let ctx = service();
    let (_, doc) = call(&ctx, "GET", "/api/game/u1", "");

    let mut session = GameSession::from_state(serde_json::from_value(doc).unwrap());
    let now = Utc::now();
    for _ in 0..5 {
        session.lose_heart(now);
    }
    session.finish_lesson(2);

    let (status, synced) = call(&ctx, "POST", "/api/game/u1/sync", &session.sync_patch().to_json());
    assert_eq!(status, 200);
    assert_eq!(synced["hearts"], 0);
    assert_eq!(synced["xp"], 50);
    assert_eq!(synced["currentLevel"], 3);
    assert!(synced["cooldownEndTime"].is_string());

    let restored: GameSession = GameSession::from_state(serde_json::from_value(synced).unwrap());
    assert_eq!(&restored, &session);
}
