//! End-to-end behavior of the authenticated stacks against mock servers

use std::sync::Arc;

use gymtrack_client::session::store::{CredentialStore, InMemoryCredentialStore};
use gymtrack_client::session::{AccessToken, SessionStatus};
use gymtrack_client::{ApiError, ClientConfig, GymClient, Service};
use mockito::Matcher;

fn client_pair(
    backend: &mockito::ServerGuard,
    assistant: &mockito::ServerGuard,
    token: Option<&str>,
) -> (GymClient, Arc<InMemoryCredentialStore>) {
    let store = Arc::new(match token {
        Some(token) => InMemoryCredentialStore::with_token(AccessToken::from(token)),
        None => InMemoryCredentialStore::new(),
    });
    let config = ClientConfig::with_base_urls(
        backend.url().parse().expect("mock backend url"),
        assistant.url().parse().expect("mock assistant url"),
    );
    let client = GymClient::with_store(config, Arc::clone(&store) as Arc<dyn CredentialStore>)
        .expect("client builds");
    (client, store)
}

#[tokio::test]
async fn stored_credential_rides_along_as_bearer() {
    let mut backend = mockito::Server::new_async().await;
    let assistant = mockito::Server::new_async().await;

    let list = backend
        .mock("GET", "/api/exercises")
        .match_header("authorization", "Bearer test-token-123")
        .match_header("x-request-id", Matcher::Regex(".+".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let (client, _store) = client_pair(&backend, &assistant, Some("test-token-123"));
    let exercises = client.exercises().list().await.expect("list succeeds");
    assert!(exercises.is_empty());

    list.assert_async().await;
}

#[tokio::test]
async fn requests_without_a_credential_carry_no_authorization() {
    let mut backend = mockito::Server::new_async().await;
    let assistant = mockito::Server::new_async().await;

    let list = backend
        .mock("GET", "/api/exercises")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let (client, _store) = client_pair(&backend, &assistant, None);
    client.exercises().list().await.expect("list succeeds");

    list.assert_async().await;
}

#[tokio::test]
async fn a_401_refreshes_once_and_replays_transparently() {
    let mut backend = mockito::Server::new_async().await;
    let assistant = mockito::Server::new_async().await;

    let first_attempt = backend
        .mock("GET", "/protected")
        .match_header("authorization", "Bearer old-token")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    // the refresh call authenticates by cookie, never by bearer
    let refresh = backend
        .mock("GET", "/api/v1/auth/refresh")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"accessToken":"new-token"}}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = backend
        .mock("GET", "/protected")
        .match_header("authorization", "Bearer new-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":"success"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, store) = client_pair(&backend, &assistant, Some("old-token"));

    let response = client
        .backend()
        .get(format!("{}/protected", backend.url()))
        .send()
        .await
        .expect("request recovers");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("valid body");
    assert_eq!(body["data"], "success");

    let stored = store.load().await.expect("store readable");
    assert_eq!(stored.expect("credential present").as_str(), "new-token");

    first_attempt.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
}

#[tokio::test]
async fn a_rejected_refresh_expires_the_session() {
    let mut backend = mockito::Server::new_async().await;
    let assistant = mockito::Server::new_async().await;

    let first_attempt = backend
        .mock("GET", "/protected")
        .match_header("authorization", "Bearer expired-token")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = backend
        .mock("GET", "/api/v1/auth/refresh")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let (client, store) = client_pair(&backend, &assistant, Some("expired-token"));
    let session = client.session_updates();

    let error = client
        .backend()
        .get(format!("{}/protected", backend.url()))
        .send()
        .await
        .expect_err("request fails with the refresh failure");

    let error = ApiError::from(error);
    assert_eq!(error.status().map(|s| s.as_u16()), Some(401));
    assert_eq!(
        error.user_message(),
        "Your session has expired. Please log in again."
    );

    assert!(store.load().await.expect("store readable").is_none());
    assert_eq!(*session.borrow(), SessionStatus::Expired);

    first_attempt.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn a_replayed_request_never_triggers_a_second_refresh() {
    let mut backend = mockito::Server::new_async().await;
    let assistant = mockito::Server::new_async().await;

    // the endpoint rejects every bearer, fresh or not
    let protected = backend
        .mock("GET", "/protected")
        .match_header("authorization", Matcher::Regex("^Bearer .+$".into()))
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let refresh = backend
        .mock("GET", "/api/v1/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"accessToken":"new-token"}}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, store) = client_pair(&backend, &assistant, Some("stale-token"));

    let response = client
        .backend()
        .get(format!("{}/protected", backend.url()))
        .send()
        .await
        .expect("the second 401 is propagated, not retried");
    assert_eq!(response.status(), 401);

    // the refreshed credential still landed in the store
    let stored = store.load().await.expect("store readable");
    assert_eq!(stored.expect("credential present").as_str(), "new-token");

    protected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn an_assistant_401_refreshes_through_the_backend() {
    let mut backend = mockito::Server::new_async().await;
    let mut assistant = mockito::Server::new_async().await;

    let first_attempt = assistant
        .mock("POST", "/api/v1/chat/")
        .match_header("authorization", "Bearer old-token")
        .match_header("x-session-id", Matcher::Regex(".+".into()))
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = backend
        .mock("GET", "/api/v1/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"accessToken":"new-token"}}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = assistant
        .mock("POST", "/api/v1/chat/")
        .match_header("authorization", "Bearer new-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"Success","session_id":"session-123"}"#)
        .expect(1)
        .create_async()
        .await;

    let (client, store) = client_pair(&backend, &assistant, Some("old-token"));

    let reply = client
        .chat()
        .send_message("test")
        .await
        .expect("chat recovers");
    assert_eq!(reply.response, "Success");

    let stored = store.load().await.expect("store readable");
    assert_eq!(stored.expect("credential present").as_str(), "new-token");

    first_attempt.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;
}

#[tokio::test]
async fn health_checks_never_error() {
    let mut backend = mockito::Server::new_async().await;
    let mut assistant = mockito::Server::new_async().await;

    let backend_health = backend
        .mock("GET", "/actuator/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"UP"}"#)
        .create_async()
        .await;
    let assistant_health = assistant
        .mock("GET", "/health")
        .with_status(500)
        .create_async()
        .await;

    let (client, _store) = client_pair(&backend, &assistant, None);

    assert!(client.check_service_health(Service::Backend).await);
    assert!(!client.check_service_health(Service::Assistant).await);

    backend_health.assert_async().await;
    assistant_health.assert_async().await;
}

#[tokio::test]
async fn health_check_is_false_when_the_service_is_unreachable() {
    // nothing listens on this address
    let config = ClientConfig::with_base_urls(
        "http://127.0.0.1:9".parse().expect("url"),
        "http://127.0.0.1:9".parse().expect("url"),
    );
    let client = GymClient::new(config).expect("client builds");

    assert!(!client.check_service_health(Service::Backend).await);
}
