#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use std::sync::Arc;

use meme_api_client::error::NETWORK_FAILURE_MESSAGE;
use meme_api_client::{
    ClientConfig, Error, InMemorySessionStore, LoginRequest, MemeApiClient, RequestDescriptor,
    Session, SessionStore,
};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Meme {
    id: u32,
    caption: String,
}

fn auth_body(access: &str, refresh: &str, user_id: &str) -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "user": { "id": user_id, "email": "cat@memes.test" },
            "accessToken": access,
            "refreshToken": refresh
        }
    })
}

fn meme_body() -> serde_json::Value {
    json!({ "id": 7, "caption": "one does not simply" })
}

async fn client_with(server: &MockServer, session: Session) -> MemeApiClient {
    let config = ClientConfig::new(format!("{}/v1", server.uri()).parse().expect("mock url"));
    let store = Arc::new(InMemorySessionStore::with_session(session));
    MemeApiClient::from_config(config, store).expect("client builds")
}

#[tokio::test]
async fn test_login_then_protected_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .and(body_json(json!({ "email": "cat@memes.test", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("at-1", "rt-1", "u-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/memes/7"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(meme_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_with(&server, Session::anonymous()).await;
    let session = client
        .login(&LoginRequest::new("cat@memes.test", "hunter2"))
        .await
        .expect("login succeeds");
    assert_eq!(session.access_token(), Some("at-1"));

    let meme: Meme = client
        .execute(&RequestDescriptor::get("/memes/7"))
        .await
        .expect("protected call succeeds");
    assert_eq!(meme.caption, "one does not simply");

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_and_replayed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/memes/7"))
        .and(header("authorization", "Bearer stale-at"))
        .respond_with(ResponseTemplate::new(401).set_body_string("jwt expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/memes/7"))
        .and(header("authorization", "Bearer fresh-at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(meme_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "rt-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_body("fresh-at", "fresh-rt", "u-1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Session::new("stale-at", "rt-1", "u-1")).await;

    let meme: Meme = client
        .execute(&RequestDescriptor::get("/memes/7"))
        .await
        .expect("replayed call succeeds");

    assert_eq!(meme, Meme { id: 7, caption: "one does not simply".into() });
    assert_eq!(
        client.sessions().get(),
        Session::new("fresh-at", "fresh-rt", "u-1")
    );
}

#[tokio::test]
async fn test_revoked_refresh_token_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/memes/7"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "success": false, "message": "refresh token revoked" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let original = Session::new("stale-at", "revoked-rt", "u-1");
    let client = client_with(&server, original.clone()).await;

    let err = client
        .execute::<Meme>(&RequestDescriptor::get("/memes/7"))
        .await
        .expect_err("session should expire");

    assert!(matches!(err, Error::SessionExpired));
    assert_eq!(err.to_string(), "Session expired. Please log in again.");
    assert_eq!(client.sessions().get(), original);
}

#[tokio::test]
async fn test_server_error_body_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/memes/generate"))
        .and(body_json(json!({ "prompt": "cat", "templateId": 3 })))
        .respond_with(ResponseTemplate::new(422).set_body_string("Prompt too short"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Session::new("at", "rt", "u")).await;
    let descriptor = RequestDescriptor::post("/memes/generate")
        .with_json(&json!({ "prompt": "cat", "templateId": 3 }))
        .expect("object body");

    let err = client
        .execute::<Meme>(&descriptor)
        .await
        .expect_err("422 is an error");

    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "Prompt too short");
}

#[tokio::test]
async fn test_url_encoded_params_go_to_query_for_get() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/memes/feed"))
        .and(wiremock::matchers::query_param("page", "2"))
        .and(wiremock::matchers::query_param("sort", "top"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([meme_body()])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Session::anonymous()).await;
    let feed: Vec<Meme> = client
        .execute(
            &RequestDescriptor::get("/memes/feed")
                .with_param("page", 2)
                .with_param("sort", "top"),
        )
        .await
        .expect("feed loads");

    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let config = ClientConfig::new(format!("http://127.0.0.1:{port}").parse().expect("url"));
    let client =
        MemeApiClient::from_config(config, Arc::new(InMemorySessionStore::new())).expect("client");

    let err = client
        .execute::<Meme>(&RequestDescriptor::get("/memes/7"))
        .await
        .expect_err("nothing is listening");

    assert!(matches!(err, Error::Transport { status: None, .. }), "{err:?}");
    assert_eq!(err.to_string(), NETWORK_FAILURE_MESSAGE);
    assert_eq!(err.status(), None);
}
