use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use twilight_model::id::Id;

use supportbot::create_app;
use supportbot::discord::commands::{do_command, do_component};
use supportbot::discord::interaction::{Interaction, Reply};
use supportbot::storage::guild_config::{save_config, GuildConfig};

#[path = "../common/common.rs"]
mod common;

const TIMESTAMP: &str = "1700000000";

fn signed_request(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/discord")
        .header("content-type", "application/json")
        .header("x-signature-ed25519", signature)
        .header("x-signature-timestamp", TIMESTAMP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn component(custom_id: &str, user_id: u64) -> Interaction {
    serde_json::from_value(json!({
        "type": 3,
        "id": "2",
        "token": "component-token",
        "guild_id": common::GUILD_ID.to_string(),
        "member": { "user": { "id": user_id.to_string(), "username": "someone" }, "roles": [] },
        "message": { "content": "Are you sure you want to clear 2 notes?" },
        "data": { "custom_id": custom_id }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_ping_answered_with_pong() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let body = r#"{"type":1,"id":"1","token":"t"}"#;

    let response = create_app(state)
        .oneshot(signed_request(body, &common::sign(body, TIMESTAMP)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "type": 1 }));
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let body = r#"{"type":1,"id":"1","token":"t"}"#;
    let forged = common::sign(r#"{"type":2}"#, TIMESTAMP);

    let response = create_app(state)
        .oneshot(signed_request(body, &forged))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_signature_headers_rejected() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/discord")
        .body(Body::from(r#"{"type":1}"#))
        .unwrap();

    let response = create_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let response = create_app(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[sqlx::test]
async fn test_roll_through_endpoint(pool: PgPool) {
    let state = common::create_state(pool, Arc::new(common::MockDiscord::default()));
    let body = common::command_interaction(
        "roll",
        json!([
            { "name": "minimum", "type": 4, "value": 5 },
            { "name": "maximum", "type": 4, "value": 5 }
        ]),
        "0",
        &[],
    )
    .to_string();

    let response = create_app(state)
        .oneshot(signed_request(&body, &common::sign(&body, TIMESTAMP)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["type"], 4);
    assert_eq!(json["data"]["embeds"][0]["title"], "RNG Roller");
    assert_eq!(json["data"]["embeds"][0]["description"], "You rolled a 5");
}

#[sqlx::test]
async fn test_inverted_roll_is_ephemeral_deny(pool: PgPool) {
    let state = common::create_state(pool, Arc::new(common::MockDiscord::default()));
    let interaction: Interaction = serde_json::from_value(common::command_interaction(
        "roll",
        json!([
            { "name": "minimum", "type": 4, "value": 10 },
            { "name": "maximum", "type": 4, "value": 1 }
        ]),
        "0",
        &[],
    ))
    .unwrap();

    let Reply::Message(data) = do_command(&state, &interaction).await.unwrap() else {
        panic!("expected a message");
    };
    assert!(data.is_ephemeral());
    assert_eq!(data.embeds[0].title.as_deref(), Some("😕 👎"));
}

#[sqlx::test]
async fn test_disabled_extension_denied(pool: PgPool) {
    let config = GuildConfig {
        enabled_extensions: Some(vec!["who".into()]),
        ..Default::default()
    };
    save_config(&pool, &common::GUILD_ID.to_string(), &config)
        .await
        .unwrap();
    let state = common::create_state(pool, Arc::new(common::MockDiscord::default()));
    let interaction: Interaction =
        serde_json::from_value(common::command_interaction("roll", json!([]), "0", &[])).unwrap();

    let Reply::Message(data) = do_command(&state, &interaction).await.unwrap() else {
        panic!("expected a message");
    };
    assert!(data.embeds[0]
        .description
        .as_deref()
        .unwrap()
        .contains("`roll` extension is disabled"));
}

#[tokio::test]
async fn test_confirm_button_answers_prompt() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let confirmation = state.confirms.open(Id::new(common::MOD_ID));
    let yes = format!("confirm:{}:yes", confirmation.nonce());

    let reply = do_component(&state, &component(&yes, common::MOD_ID))
        .await
        .unwrap();
    let Reply::Update(data) = reply else {
        panic!("expected an update");
    };
    assert_eq!(data.components, Some(vec![]));
    assert!(data.content.unwrap().ends_with("*Confirmed*"));
}

#[tokio::test]
async fn test_confirm_button_rejects_other_users() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let confirmation = state.confirms.open(Id::new(common::MOD_ID));
    let yes = format!("confirm:{}:yes", confirmation.nonce());

    let reply = do_component(&state, &component(&yes, 999)).await.unwrap();
    let Reply::Message(data) = reply else {
        panic!("expected a message");
    };
    assert!(data.is_ephemeral());
    assert_eq!(state.confirms.pending_count(), 1);
}

#[tokio::test]
async fn test_page_button_turns_page() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let first = state
        .paginator
        .open(vec!["a".into(), "b".into()], Some(Id::new(common::MOD_ID)))
        .await;
    let next = first.components.as_ref().unwrap()[0]["components"][2]["custom_id"]
        .as_str()
        .unwrap()
        .to_string();

    let Reply::Update(page) = do_component(&state, &component(&next, common::MOD_ID))
        .await
        .unwrap()
    else {
        panic!("expected an update");
    };
    assert_eq!(page.content.as_deref(), Some("b"));

    let Reply::Message(denied) = do_component(&state, &component(&next, 999)).await.unwrap() else {
        panic!("expected a deny");
    };
    assert!(denied.is_ephemeral());
}

#[tokio::test]
async fn test_unknown_component_acknowledged() {
    let state = common::create_state(common::lazy_pool(), Arc::new(common::MockDiscord::default()));
    let reply = do_component(&state, &component("something-else", 1)).await.unwrap();
    assert_eq!(reply, Reply::Acknowledge);
}
