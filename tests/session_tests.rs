mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{token_body, MockResponse, MockServer};
use swipetune::api::{ApiClient, EvaluationSink};
use swipetune::cache::LocalLibrary;
use swipetune::constants::AUTH_SESSION_KEY;
use swipetune::state::{AuthStatus, DeckConfig, SessionStore, SwipeDeck, SwipeDirection};
use swipetune::storage::{EncryptedStore, KeyValueStore, SqliteStore};
use swipetune::utils::crypto::SecretBox;

fn backend() -> MockServer {
    MockServer::start(|request| match (request.method.as_str(), request.path()) {
        ("POST", "/api/v1/auth/login") if request.body.contains("hunter2") => {
            MockResponse::json(200, &token_body("access-1", "refresh-1", 3600))
        }
        ("POST", "/api/v1/auth/login") => MockResponse::json(401, r#"{"error": "Invalid credentials"}"#),
        ("POST", "/api/v1/auth/register") => MockResponse::json(201, &token_body("access-new", "refresh-new", 3600)),
        ("GET", "/api/v1/tracks/suggestions") => MockResponse::json(
            200,
            r#"{"data": [
                {"id": 1, "title": "One", "artist": "A"},
                {"id": 2, "title": "Two", "artist": "B"},
                {"id": 3, "title": "Three", "artist": "C"},
                {"id": 4, "title": "Four", "artist": "D"},
                {"id": 5, "title": "Five", "artist": "E"},
                {"id": 6, "title": "Six", "artist": "F"}
            ]}"#,
        ),
        ("POST", "/api/v1/evaluations") => MockResponse::json(201, ""),
        _ => MockResponse::json(404, r#"{"error": "Not found"}"#),
    })
}

fn secure_store(dir: &tempfile::TempDir) -> Arc<dyn KeyValueStore> {
    let database: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&dir.path().join("swipetune.db")).unwrap());
    Arc::new(EncryptedStore::new(database, SecretBox::from_passphrase("test secret")))
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_base_url(&server.url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn login_persists_an_encrypted_session_that_survives_restart() {
    let server = backend();
    let dir = tempfile::tempdir().unwrap();

    let client = client(&server);
    let session = SessionStore::new(Arc::new(client.clone()), secure_store(&dir));
    assert_eq!(session.initialize().await, AuthStatus::Unauthenticated);

    let user = session.login("me@example.com", "hunter2").await.unwrap().unwrap();
    assert_eq!(user.email, "me@example.com");
    assert_eq!(session.status(), AuthStatus::Authenticated);
    assert!(client.has_bearer_token());
    assert_eq!(session.access_token().as_deref(), Some("access-1"));

    // Tokens are never written in the clear
    let raw = SqliteStore::open(&dir.path().join("swipetune.db"))
        .unwrap()
        .get(AUTH_SESSION_KEY)
        .unwrap()
        .unwrap();
    assert!(!raw.contains("access-1"));
    drop(session);

    let restarted_client = ApiClient::with_base_url(&server.url, Duration::from_secs(5)).unwrap();
    let restarted = SessionStore::new(Arc::new(restarted_client.clone()), secure_store(&dir));
    assert_eq!(restarted.initialize().await, AuthStatus::Authenticated);
    assert!(restarted_client.has_bearer_token());
    assert_eq!(restarted.user().unwrap().display_name.as_deref(), Some("Me"));
}

#[tokio::test]
async fn register_sends_display_name_and_signs_in() {
    let server = backend();
    let dir = tempfile::tempdir().unwrap();
    let client = client(&server);
    let session = SessionStore::new(Arc::new(client.clone()), secure_store(&dir));
    session.initialize().await;

    let user = session
        .register(" me@example.com ", "hunter2", Some("Me"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.display_name.as_deref(), Some("Me"));
    assert_eq!(session.status(), AuthStatus::Authenticated);
    assert_eq!(session.access_token().as_deref(), Some("access-new"));

    let sent = server.wait_for("POST", "/api/v1/auth/register", Duration::from_secs(2)).unwrap();
    assert!(sent.body.contains(r#""display_name":"Me""#));
    assert!(sent.body.contains(r#""email":"me@example.com""#));
}

#[tokio::test]
async fn rejected_login_surfaces_server_message() {
    let server = backend();
    let dir = tempfile::tempdir().unwrap();
    let session = SessionStore::new(Arc::new(client(&server)), secure_store(&dir));
    session.initialize().await;

    assert!(session.login("me@example.com", "wrong").await.is_err());
    assert_eq!(session.status(), AuthStatus::Unauthenticated);
    assert_eq!(session.error().as_deref(), Some("Invalid credentials"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn authenticated_swipes_post_evaluations_with_bearer_token() {
    let server = backend();
    let dir = tempfile::tempdir().unwrap();
    let client = client(&server);
    let session = SessionStore::new(Arc::new(client.clone()), secure_store(&dir));
    session.initialize().await;
    session.login("me@example.com", "hunter2").await.unwrap();

    let library_store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&dir.path().join("library.db")).unwrap());
    let library = Arc::new(Mutex::new(LocalLibrary::load(library_store, 100, 30 * 24 * 3600)));
    let sink: Arc<dyn EvaluationSink> = Arc::new(client.clone());
    let deck = SwipeDeck::new(Arc::new(client.clone()), Some(sink), Arc::clone(&library), DeckConfig::default());

    assert_eq!(deck.fetch_initial().await.unwrap(), 6);
    let first = deck.current().unwrap();
    let outcome = deck.record_swipe(SwipeDirection::Left, &first);
    assert!(outcome.stored_locally && outcome.sent_to_server);

    let posted = tokio::task::spawn_blocking(move || {
        let found = server.wait_for("POST", "/api/v1/evaluations", Duration::from_secs(5));
        (found, server)
    })
    .await
    .unwrap();
    let request = posted.0.expect("evaluation was not posted");
    assert_eq!(request.authorization.as_deref(), Some("Bearer access-1"));
    assert!(request.body.contains("\"status\":\"dislike\""));

    assert_eq!(library.lock().unwrap().disliked()[0].track_id, first.id);
    let suggestions = posted
        .1
        .requests()
        .into_iter()
        .filter(|r| r.path() == "/api/v1/tracks/suggestions")
        .count();
    assert_eq!(suggestions, 1);
}
