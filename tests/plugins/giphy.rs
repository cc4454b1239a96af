use std::sync::Arc;

use serde_json::json;
use twilight_model::id::Id;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use supportbot::discord::paginate::PageTurn;
use supportbot::error::Error;
use supportbot::plugins::giphy::do_giphy;
use supportbot::AppState;

#[path = "../common/common.rs"]
mod common;

const SEARCH_PATH: &str = "/v1/gifs/search";

fn state_for(server: &MockServer, api_key: Option<&str>) -> AppState {
    let mut config = common::test_config();
    config.giphy_api_url = format!("{}{}", server.uri(), SEARCH_PATH);
    config.giphy_api_key = api_key.map(str::to_string);
    common::create_state_with(
        common::lazy_pool(),
        Arc::new(common::MockDiscord::default()),
        config,
    )
}

fn gif(id: &str) -> serde_json::Value {
    json!({
        "images": {
            "original": { "url": format!("https://media.giphy.com/media/{id}/giphy.gif?cid=abc&rid=giphy.gif") }
        }
    })
}

#[tokio::test]
async fn test_search_opens_restricted_paginator() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("q", "cute cats"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("limit", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [gif("one"), gif("two")] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = state_for(&server, Some("test-key"));
    let owner = Id::new(common::MOD_ID);
    let first = do_giphy(&state, "cute cats", owner).await.unwrap();

    assert_eq!(
        first.content.as_deref(),
        Some("https://media.giphy.com/media/one/giphy.gif")
    );
    let next = first.components.as_ref().unwrap()[0]["components"][2]["custom_id"]
        .as_str()
        .unwrap()
        .to_string();

    assert_eq!(state.paginator.turn(&next, Id::new(999)).await, PageTurn::NotOwner);
    let PageTurn::Page(second) = state.paginator.turn(&next, owner).await else {
        panic!("expected the second page");
    };
    assert_eq!(
        second.content.as_deref(),
        Some("https://media.giphy.com/media/two/giphy.gif")
    );
}

#[tokio::test]
async fn test_repeat_search_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [gif("one")] })))
        .expect(1)
        .mount(&server)
        .await;

    let state = state_for(&server, Some("test-key"));
    let owner = Id::new(common::MOD_ID);
    do_giphy(&state, "dogs", owner).await.unwrap();
    let again = do_giphy(&state, "dogs", owner).await.unwrap();

    // One result means no page buttons
    assert!(again.components.is_none());
}

#[tokio::test]
async fn test_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let state = state_for(&server, Some("test-key"));
    let err = do_giphy(&state, "zzzz", Id::new(common::MOD_ID))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No search results found for: *zzzz*");
}

#[tokio::test]
async fn test_empty_query_never_calls_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let state = state_for(&server, Some("test-key"));
    let err = do_giphy(&state, "   ", Id::new(common::MOD_ID))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "I can't search for nothing!");
}

#[tokio::test]
async fn test_missing_api_key() {
    let server = MockServer::start().await;
    let state = state_for(&server, None);
    assert!(matches!(
        do_giphy(&state, "cats", Id::new(common::MOD_ID)).await,
        Err(Error::Validation(_))
    ));
}
