use geowar_server::auth::{issue_jwt, AuthSecret};
use geowar_server::engine::{GameConfig, LOBBY_OBJECTIVE_COUNT};
use geowar_server::state::ServerState;
use geowar_server::AppState;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;

const SECRET: &str = "integration-secret";

async fn spawn_app() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app_state = AppState {
        state: ServerState::new(GameConfig::default()).unwrap(),
        secret: AuthSecret(SECRET.to_string()),
    };
    tokio::spawn(async move {
        geowar_server::serve(listener, app_state).await.unwrap();
    });
    addr
}

fn token(player: &str, admin: bool) -> String {
    issue_jwt(player, admin, &AuthSecret(SECRET.to_string())).unwrap()
}

struct TestClient {
    client: Client,
    addr: SocketAddr,
    token: String,
}

impl TestClient {
    fn new(addr: SocketAddr, player: &str) -> Self {
        Self::with_admin(addr, player, false)
    }

    fn with_admin(addr: SocketAddr, player: &str, admin: bool) -> Self {
        TestClient {
            client: Client::new(),
            addr,
            token: token(player, admin),
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("http://{}{}", self.addr, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("http://{}{}", self.addr, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .delete(format!("http://{}{}", self.addr, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_health() {
    let addr = spawn_app().await;
    let response = Client::new()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let addr = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(format!("http://{}/lobbies", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("http://{}/lobbies", addr))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let forged = issue_jwt("mallory", true, &AuthSecret("other-secret".into())).unwrap();
    let response = client
        .delete(format!("http://{}/admin/lobbies/{}", addr, uuid::Uuid::new_v4()))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_match_flow() {
    let addr = spawn_app().await;
    let alice = TestClient::new(addr, "alice");
    let bob = TestClient::new(addr, "bob");

    // 1. Both players land in the same waiting lobby
    let (status, body) = alice.post("/lobbies/quick_join", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lobby"]["status"], "WAITING");
    let lobby_id = body["lobby"]["id"].as_str().unwrap().to_string();

    let (status, body) = bob.post("/lobbies/quick_join", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lobby"]["id"], lobby_id.as_str());

    // 2. One player per team starts the match
    let (status, body) = alice
        .post(&format!("/lobbies/{}/team", lobby_id), json!({ "team": "RED" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lobby"]["status"], "WAITING");

    let (status, body) = bob
        .post(&format!("/lobbies/{}/team", lobby_id), json!({ "team": "blue" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["team"], "BLUE");
    assert_eq!(body["lobby"]["status"], "ACTIVE");

    // 3. Lobby objectives are visible and capturable
    let (status, body) = alice.get("/objectives").await;
    assert_eq!(status, StatusCode::OK);
    let objectives = body.as_array().unwrap();
    assert_eq!(objectives.len(), LOBBY_OBJECTIVE_COUNT);
    assert!(objectives.iter().all(|o| o["owner_team"] == "NEUTRAL"));
    let target = objectives[0]["id"].as_u64().unwrap();

    let (status, body) = alice
        .post(&format!("/objectives/{}/capture", target), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_owned"], false);
    assert_eq!(body["objective"]["owner_team"], "RED");
    assert_eq!(body["lobby"]["targets_red"], 1);

    let (_, body) = alice
        .post(&format!("/objectives/{}/capture", target), json!({}))
        .await;
    assert_eq!(body["already_owned"], true);

    // 4. Status carries counters, headcount and the remaining time
    let (status, body) = bob.get(&format!("/lobbies/{}", lobby_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["targets_red"], 1);
    assert_eq!(body["targets_blue"], 0);
    assert_eq!(body["headcount"]["red"], 1);
    assert!(body["time_remaining_secs"].as_i64().unwrap() > 0);

    let (_, body) = bob.get(&format!("/lobbies/{}/summary", lobby_id)).await;
    assert_eq!(body["captures"], 1);
    assert_eq!(body["total_targets"], LOBBY_OBJECTIVE_COUNT);

    // 5. BLUE emptying voids the match
    let (status, body) = bob.post("/lobbies/leave", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["match_voided"], true);

    let (_, body) = alice.get(&format!("/lobbies/{}", lobby_id)).await;
    assert_eq!(body["status"], "WAITING");
    assert_eq!(body["targets_red"], 0);
    let (_, body) = alice.get("/objectives").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_private_lobby_by_code() {
    let addr = spawn_app().await;
    let host = TestClient::new(addr, "host");
    let guest = TestClient::new(addr, "guest");

    let (status, body) = host.post("/lobbies/private", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lobby"]["is_private"], true);
    let code = body["lobby"]["join_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (_, listed) = guest.get("/lobbies").await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, body) = guest
        .post("/lobbies/join_code", json!({ "code": code.to_lowercase() }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lobby"]["status"], "ACTIVE");
    assert_eq!(body["lobby"]["player_count"], 2);

    let (status, body) = guest
        .post("/lobbies/join_code", json!({ "code": "QQQQQQ" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_validation_errors() {
    let addr = spawn_app().await;
    let player = TestClient::new(addr, "carol");

    let (_, body) = player.post("/lobbies/quick_join", json!({})).await;
    let lobby_id = body["lobby"]["id"].as_str().unwrap().to_string();

    let (status, body) = player
        .post(&format!("/lobbies/{}/team", lobby_id), json!({ "team": "GREEN" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = player
        .post(
            "/positions",
            json!({ "lat": 0.0, "lon": 0.0, "timestamp_ms": 1_700_000_000_000i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = player
        .post(
            "/positions",
            json!({ "lat": 123.0, "lon": 9.0, "timestamp_ms": 1_700_000_000_000i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let far_future = chrono::Utc::now().timestamp_millis() + 86_400_000;
    let (status, body) = player
        .post(
            "/positions",
            json!({ "lat": 45.46, "lon": 9.19, "timestamp_ms": far_future }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = player
        .post(&format!("/objectives/{}/capture", 12_345), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");
}

#[tokio::test]
async fn test_position_reports() {
    let addr = spawn_app().await;
    let runner = TestClient::new(addr, "runner");
    let now_ms = chrono::Utc::now().timestamp_millis();

    let (status, body) = runner
        .post(
            "/positions",
            json!({ "lat": 45.4641, "lon": 9.1919, "timestamp_ms": now_ms }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], true);

    let (status, body) = runner
        .post(
            "/positions",
            json!({ "lat": 45.5, "lon": 9.2, "timestamp_ms": now_ms - 5_000 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);

    let (_, body) = runner.get("/positions/active").await;
    let active = body.as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], "runner");
    assert_eq!(active[0]["lat"], 45.4641);
}

#[tokio::test]
async fn test_admin_routes() {
    let addr = spawn_app().await;
    let admin = TestClient::with_admin(addr, "admin", true);
    let host = TestClient::new(addr, "host");
    let guest = TestClient::new(addr, "guest");

    let (_, body) = host.post("/lobbies/private", json!({})).await;
    let lobby_id = body["lobby"]["id"].as_str().unwrap().to_string();
    let code = body["lobby"]["join_code"].as_str().unwrap().to_string();
    guest
        .post("/lobbies/join_code", json!({ "code": code }))
        .await;

    // plain players cannot use admin routes
    let (status, _) = host.delete(&format!("/admin/lobbies/{}", lobby_id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = admin
        .post(&format!("/admin/lobbies/{}/recount", lobby_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["targets_red"], 0);

    let (status, body) = admin
        .post(
            "/admin/objectives/random",
            json!({ "lat": 45.4641, "lon": 9.1919, "radius_km": 5.0, "count": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 3);

    let (status, _) = admin
        .post("/admin/objectives/scatter", json!({ "count": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = admin.delete(&format!("/admin/lobbies/{}", lobby_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["players_detached"], 2);

    let (status, _) = host.get(&format!("/lobbies/{}", lobby_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // banned players are locked out of every player route
    let (status, body) = admin.post("/admin/players/guest/ban", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["banned"], true);
    let (status, _) = guest.get("/objectives").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = admin.post("/admin/players/guest/unban", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = guest.get("/objectives").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}
