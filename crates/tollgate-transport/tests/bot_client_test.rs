// Integration tests for `BotClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate_transport::{BotClient, Error, MemberRole, Transport};

const TOKEN: &str = "12345:TESTTOKEN";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, BotClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().unwrap();
    let client = BotClient::from_reqwest(base, TOKEN, reqwest::Client::new());
    (server, client)
}

fn ok_body(result: serde_json::Value) -> serde_json::Value {
    json!({ "ok": true, "result": result })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn membership_maps_member_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChatMember")))
        .and(body_partial_json(json!({ "chat_id": -1001, "user_id": 42 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "status": "member",
            "user": { "id": 42, "is_bot": false, "first_name": "A" }
        }))))
        .mount(&server)
        .await;

    let membership = client.membership(-1001, 42).await.unwrap();
    assert_eq!(membership.role, MemberRole::Member);
    assert!(membership.is_member);
}

#[tokio::test]
async fn membership_maps_creator_to_owner() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChatMember")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "status": "creator",
            "user": { "id": 7, "is_bot": false, "first_name": "O" }
        }))))
        .mount(&server)
        .await;

    let membership = client.membership(-1001, 7).await.unwrap();
    assert_eq!(membership.role, MemberRole::Owner);
    assert!(membership.role.is_privileged());
}

#[tokio::test]
async fn create_invite_is_single_use_and_expiring() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/createChatInviteLink")))
        .and(body_partial_json(json!({ "chat_id": -1001, "member_limit": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "invite_link": "https://t.me/+abcdef",
            "expire_date": 1_900_000_000,
            "member_limit": 1,
            "creates_join_request": false
        }))))
        .mount(&server)
        .await;

    let cred = client
        .create_single_use_invite(-1001, "sub-42", Duration::from_secs(86_400))
        .await
        .unwrap();

    assert_eq!(cred.url, "https://t.me/+abcdef");
    assert_eq!(cred.member_limit, 1);
    assert_eq!(cred.expires_at, 1_900_000_000);
}

#[tokio::test]
async fn remove_and_allow_rejoin_bans_then_unbans() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/banChatMember")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/unbanChatMember")))
        .and(body_partial_json(json!({ "only_if_banned": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!(true))))
        .expect(1)
        .mount(&server)
        .await;

    client.remove_and_allow_rejoin(-1001, 42).await.unwrap();
}

#[tokio::test]
async fn notify_admin_attaches_inline_keyboard() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": 99,
            "reply_markup": { "inline_keyboard": [
                [{ "callback_data": "mark_paid:42:-1001" }],
                [{ "callback_data": "mark_not_paid:42:-1001" }],
                [{ "callback_data": "force_kick:42:-1001" }],
            ]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({
            "message_id": 5, "date": 0, "chat": { "id": 99, "type": "private" }
        }))))
        .expect(1)
        .mount(&server)
        .await;

    client
        .notify_admin(
            99,
            "subscription expired",
            Some(tollgate_transport::AdminPrompt::warning(42, -1001)),
        )
        .await
        .unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn chat_not_found_is_destination_missing() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChatMember")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let err = client.membership(-1001, 42).await.unwrap_err();
    assert!(err.is_destination_missing());
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 7",
            "parameters": { "retry_after": 7 }
        })))
        .mount(&server)
        .await;

    let err = client.send_direct(42, "hi").await.unwrap_err();
    match err {
        Error::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 7),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getChat")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = client.chat_info(-1001).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}
