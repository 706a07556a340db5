//! ScoreboardClient against an in-process stub backend

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tracker::{
    RetryPolicy, ScoreboardApi, ScoreboardClient, ScoreboardError, TeamDraft, TeamPatch,
    TrackerConfig,
};

async fn leaderboard() -> Json<Value> {
    Json(json!({
        "data": [
            { "id": 2, "name": "Bats", "members": ["cy"], "score": 12,
              "created_at": "2024-05-01T09:00:00Z", "updated_at": "2024-05-02T10:30:00Z" },
            { "id": 1, "name": "Owls", "members": ["ann", "bob"], "score": 10,
              "created_at": "2024-05-01T09:00:00Z", "updated_at": null }
        ]
    }))
}

async fn list_teams() -> Json<Value> {
    Json(json!([{ "id": 1, "name": "Owls", "members": ["ann"], "score": 10 }]))
}

async fn create_team(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut created = body;
    created["id"] = json!(42);
    (StatusCode::CREATED, Json(json!({ "data": created })))
}

async fn get_team(Path(id): Path<String>) -> impl IntoResponse {
    if id == "1" || id == "owls/2024?final" {
        (StatusCode::OK, Json(json!({ "id": id, "name": "Owls", "score": 10 })))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "Team not found" })))
    }
}

async fn patch_team(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "id": id, "name": "Owls", "score": body["score"] }))
}

async fn delete_team() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn stats() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/api/leaderboard/", get(leaderboard))
        .route("/api/teams/", get(list_teams).post(create_team))
        .route(
            "/api/teams/:id/",
            get(get_team).patch(patch_team).delete(delete_team),
        )
        .route("/api/stats/", get(stats));
    serve(app).await
}

/// Leaderboard route whose first response stalls past the client timeout
async fn spawn_stalling_stub(attempts: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new().route(
        "/api/leaderboard/",
        get(move || {
            let attempts = Arc::clone(&attempts);
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_millis(800)).await;
                }
                Json(json!([{ "id": 1, "name": "Owls", "members": ["ann"], "score": 3 }]))
            }
        }),
    );
    serve(app).await
}

fn client_with_timeout(addr: SocketAddr, timeout: Duration, retry: RetryPolicy) -> ScoreboardClient {
    let config = TrackerConfig {
        api_url: format!("http://{}/api", addr),
        http_timeout: timeout,
        retry,
        ..TrackerConfig::default()
    };
    ScoreboardClient::new(&config).unwrap()
}

fn client_for(addr: SocketAddr, retry: RetryPolicy) -> ScoreboardClient {
    client_with_timeout(addr, Duration::from_secs(5), retry)
}

#[tokio::test]
async fn test_leaderboard_envelope_and_timestamps() {
    let client = client_for(spawn_stub().await, RetryPolicy::none());
    let teams = client.get_leaderboard().await.unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].id, "2");
    assert_eq!(teams[0].score, 12);
    assert!(teams[0].updated_at.is_some());
    assert!(teams[1].updated_at.is_none());
}

#[tokio::test]
async fn test_team_crud_round() {
    let client = client_for(spawn_stub().await, RetryPolicy::none());

    assert_eq!(client.get_teams().await.unwrap().len(), 1);

    let created = client
        .create_team(&TeamDraft {
            name: "Comets".into(),
            members: vec!["zoe".into()],
            score: 4,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "42");
    assert_eq!(created.members, vec!["zoe"]);

    let patched = client.patch_team("1", &TeamPatch::score(15)).await.unwrap();
    assert_eq!(patched.score, 15);

    client.delete_team("1").await.unwrap();
}

#[tokio::test]
async fn test_error_bodies_become_messages() {
    let client = client_for(spawn_stub().await, RetryPolicy::none());

    match client.get_team("999").await {
        Err(ScoreboardError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Team not found");
        }
        other => panic!("expected API error, got {:?}", other.map(|t| t.id)),
    }

    match client.get_stats().await {
        Err(ScoreboardError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Bind then release a port so nothing is listening on it
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = client_for(
        addr,
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
        },
    );

    let err = client.get_leaderboard().await.unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_team_id_with_reserved_characters() {
    let client = client_for(spawn_stub().await, RetryPolicy::none());
    let team = client.get_team("owls/2024?final").await.unwrap();
    assert_eq!(team.id, "owls/2024?final");
}

#[tokio::test]
async fn test_timeout_retried_then_succeeds() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let addr = spawn_stalling_stub(Arc::clone(&attempts)).await;
    let client = client_with_timeout(
        addr,
        Duration::from_millis(200),
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(10),
        },
    );

    let teams = client.get_leaderboard().await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].name, "Owls");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_timeout_without_retries_fails_after_one_attempt() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let addr = spawn_stalling_stub(Arc::clone(&attempts)).await;
    let client = client_with_timeout(addr, Duration::from_millis(200), RetryPolicy::none());

    let err = client.get_leaderboard().await.unwrap_err();
    assert!(matches!(err, ScoreboardError::Network(_)), "unexpected error: {}", err);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
