//! REST surface tests against the real router with an in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use teamline_api::state::AppState;
use teamline_db::{DEFAULT_USER_ID, Database, GENERAL_CHANNEL_ID};
use teamline_gateway::rooms::RoomRegistry;
use teamline_types::events::ServerEvent;

fn test_app() -> (Router, AppState) {
    let db = Database::open_in_memory().expect("in-memory db");
    let state = AppState::new(Arc::new(db), RoomRegistry::new(), None);
    (teamline_api::router(state.clone()), state)
}

async fn request(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");

    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn post_message(app: &Router, channel: &str, content: &str) -> Value {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/messages",
        Some(json!({
            "content": content,
            "channel": channel,
            "sender": DEFAULT_USER_ID,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create message failed: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn banner_and_health_respond() {
    let (app, _) = test_app();

    let (status, body) = request(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["channels"], "/api/channels");

    let (status, body) = request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "Connected");
}

#[tokio::test]
async fn creating_a_channel_auto_adds_the_creator() {
    let (app, _) = test_app();

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels",
        Some(json!({
            "name": "dev",
            "description": "engineering",
            "createdBy": DEFAULT_USER_ID,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "dev");
    assert_eq!(body["data"]["createdBy"]["id"], DEFAULT_USER_ID);

    let members = body["data"]["members"].as_array().expect("members");
    assert!(
        members.iter().any(|m| m["id"] == DEFAULT_USER_ID),
        "creator must be a member even when not listed explicitly"
    );
}

#[tokio::test]
async fn channel_creation_validates_inputs() {
    let (app, _) = test_app();

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels",
        Some(json!({ "name": "   ", "createdBy": DEFAULT_USER_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels",
        Some(json!({ "name": "ok", "createdBy": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn channels_list_newest_first() {
    let (app, _) = test_app();

    for name in ["alpha", "beta"] {
        let (status, _) = request(
            &app,
            Method::POST,
            "/api/channels",
            Some(json!({ "name": name, "createdBy": DEFAULT_USER_ID })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request(&app, Method::GET, "/api/channels", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("channels")
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    // seeded general channel is the oldest
    assert_eq!(names, vec!["beta", "alpha", "general"]);
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn add_member_rejects_existing_members() {
    let (app, state) = test_app();
    let newcomer = Uuid::new_v4();
    state
        .db
        .create_user(&newcomer.to_string(), "Blake", "blake@teamline.local")
        .expect("create user");

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels/add-member",
        Some(json!({ "channelId": GENERAL_CHANNEL_ID, "userId": newcomer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["members"].as_array().expect("members").len(),
        2
    );

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels/add-member",
        Some(json!({ "channelId": GENERAL_CHANNEL_ID, "userId": newcomer })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User is already a member of the channel");
}

#[tokio::test]
async fn unknown_channel_lookups_are_404() {
    let (app, _) = test_app();

    let (status, body) =
        request(&app, Method::GET, &format!("/api/channels/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Channel not found");

    let (status, _) =
        request(&app, Method::DELETE, &format!("/api/channels/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_creation_validates_referents() {
    let (app, _) = test_app();

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/messages",
        Some(json!({
            "content": "  ",
            "channel": GENERAL_CHANNEL_ID,
            "sender": DEFAULT_USER_ID,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/messages",
        Some(json!({
            "content": "hi",
            "channel": Uuid::new_v4(),
            "sender": DEFAULT_USER_ID,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Channel not found");

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/messages",
        Some(json!({
            "content": "hi",
            "channel": GENERAL_CHANNEL_ID,
            "sender": Uuid::new_v4(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn pagination_returns_most_recent_page_in_chronological_order() {
    let (app, _) = test_app();

    for content in ["A", "B", "C", "D", "E"] {
        post_message(&app, GENERAL_CHANNEL_ID, content).await;
    }

    let (status, body) = request(
        &app,
        Method::GET,
        &format!("/api/messages/channel/{}?limit=2&skip=0", GENERAL_CHANNEL_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["total"], 5);

    let contents: Vec<&str> = body["data"]
        .as_array()
        .expect("page")
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["D", "E"]);

    // skipping past the most recent page walks backwards in time
    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/api/messages/channel/{}?limit=2&skip=2", GENERAL_CHANNEL_ID),
        None,
    )
    .await;
    let contents: Vec<&str> = body["data"]
        .as_array()
        .expect("page")
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["B", "C"]);
}

#[tokio::test]
async fn editing_a_message_sets_the_edited_flag() {
    let (app, _) = test_app();
    let created = post_message(&app, GENERAL_CHANNEL_ID, "draft").await;
    assert_eq!(created["isEdited"], false);
    let id = created["id"].as_str().expect("id");

    let (status, body) = request(
        &app,
        Method::PUT,
        &format!("/api/messages/{id}"),
        Some(json!({ "content": "final" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "final");
    assert_eq!(body["data"]["isEdited"], true);

    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/api/messages/{}", Uuid::new_v4()),
        Some(json!({ "content": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reaction_toggle_is_symmetric() {
    let (app, _) = test_app();
    let created = post_message(&app, GENERAL_CHANNEL_ID, "react here").await;
    let id = created["id"].as_str().expect("id");
    let uri = format!("/api/messages/{id}/reaction");
    let reaction = json!({ "emoji": "👍", "userId": DEFAULT_USER_ID });

    let (status, body) = request(&app, Method::POST, &uri, Some(reaction.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let reactions = body["data"]["reactions"].as_array().expect("reactions");
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["emoji"], "👍");
    assert_eq!(reactions[0]["users"].as_array().unwrap().len(), 1);

    // same (message, emoji, user) again removes the reaction, and the empty
    // emoji group disappears with it
    let (status, body) = request(&app, Method::POST, &uri, Some(reaction)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["reactions"].as_array().expect("reactions").is_empty());
}

#[tokio::test]
async fn deleting_a_message_removes_it_from_the_page() {
    let (app, _) = test_app();
    let created = post_message(&app, GENERAL_CHANNEL_ID, "short-lived").await;
    let id = created["id"].as_str().expect("id");

    let (status, _) = request(&app, Method::DELETE, &format!("/api/messages/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, Method::DELETE, &format!("/api/messages/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = request(
        &app,
        Method::GET,
        &format!("/api/messages/channel/{}", GENERAL_CHANNEL_ID),
        None,
    )
    .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn deleting_a_channel_cascades_to_its_messages() {
    let (app, _) = test_app();
    let created = post_message(&app, GENERAL_CHANNEL_ID, "doomed").await;
    let message_id = created["id"].as_str().expect("id");

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/channels/{}", GENERAL_CHANNEL_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/api/channels/{}", GENERAL_CHANNEL_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the channel's messages went with it
    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/api/messages/{message_id}"),
        Some(json!({ "content": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn message_create_broadcasts_to_the_room_before_responding() {
    let (app, state) = test_app();
    let channel: Uuid = GENERAL_CHANNEL_ID.parse().unwrap();

    let (conn, mut rx) = state.rooms.register().await;
    state.rooms.join(conn, channel).await;

    let created = post_message(&app, GENERAL_CHANNEL_ID, "hello room").await;

    // the response already returned, so the broadcast must be queued
    let event = rx.try_recv().expect("broadcast must precede the response");
    match event {
        ServerEvent::NewMessage(message) => {
            assert_eq!(message.id.to_string(), created["id"].as_str().unwrap());
            assert_eq!(message.content, "hello room");
            assert_eq!(message.sender.username, "Admin");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn rooms_are_isolated_across_channels() {
    let (app, state) = test_app();
    let general: Uuid = GENERAL_CHANNEL_ID.parse().unwrap();

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/channels",
        Some(json!({ "name": "private-corner", "createdBy": DEFAULT_USER_ID })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let other: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let (conn, mut rx) = state.rooms.register().await;
    state.rooms.join(conn, other).await;

    post_message(&app, GENERAL_CHANNEL_ID, "not for you").await;
    assert!(
        rx.try_recv().is_err(),
        "a room-B member must not see room-A traffic"
    );

    // but traffic in its own room arrives, tagged with the right channel
    post_message(&app, &other.to_string(), "for you").await;
    match rx.try_recv().expect("own-room broadcast") {
        ServerEvent::NewMessage(message) => {
            assert_eq!(message.channel_id, other);
            assert_ne!(message.channel_id, general);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn edit_delete_and_reaction_events_reach_the_room() {
    let (app, state) = test_app();
    let channel: Uuid = GENERAL_CHANNEL_ID.parse().unwrap();
    let created = post_message(&app, GENERAL_CHANNEL_ID, "watch me").await;
    let id = created["id"].as_str().expect("id");

    let (conn, mut rx) = state.rooms.register().await;
    state.rooms.join(conn, channel).await;

    request(
        &app,
        Method::PUT,
        &format!("/api/messages/{id}"),
        Some(json!({ "content": "watched" })),
    )
    .await;
    assert!(matches!(
        rx.try_recv().expect("update event"),
        ServerEvent::MessageUpdated(m) if m.content == "watched"
    ));

    request(
        &app,
        Method::POST,
        &format!("/api/messages/{id}/reaction"),
        Some(json!({ "emoji": "🎉", "userId": DEFAULT_USER_ID })),
    )
    .await;
    assert!(matches!(
        rx.try_recv().expect("reaction event"),
        ServerEvent::ReactionAdded { message, .. } if !message.reactions.is_empty()
    ));

    request(&app, Method::DELETE, &format!("/api/messages/{id}"), None).await;
    assert!(matches!(
        rx.try_recv().expect("delete event"),
        ServerEvent::MessageDeleted { message_id } if message_id.to_string() == id
    ));
}
