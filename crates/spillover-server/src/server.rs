use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use spillover_engine::{AccountService, DownlineQuery};
use spillover_store::MemberRepo;

use crate::handlers;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub downline: Arc<DownlineQuery>,
    pub repo: Arc<MemberRepo>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/profile", get(handlers::profile))
        .route("/api/downline", get(handlers::downline))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns once the listener is up.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(host = %config.host, port = local_addr.port(), "spillover server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        shutdown: shutdown_tx,
        server,
    })
}

/// Handle returned by `start()`; keeps the server task alive.
pub struct ServerHandle {
    pub port: u16,
    shutdown: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.server.await {
            tracing::warn!(error = %e, "server task did not exit cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use spillover_core::{CountRule, MemberCode};
    use spillover_engine::{JwtIssuer, SaltedSha256Hasher, TreeMutator};
    use spillover_store::Database;
    use tower::ServiceExt;

    use super::*;

    fn setup() -> AppState {
        let repo = Arc::new(MemberRepo::new(Database::in_memory().unwrap()));
        let mutator = Arc::new(TreeMutator::new(repo.clone(), CountRule::ReferralChain, 3));
        let tokens = JwtIssuer::new(
            &SecretString::from("test-secret".to_string()),
            Duration::from_secs(3600),
        );
        let accounts = Arc::new(AccountService::new(
            repo.clone(),
            mutator,
            Arc::new(SaltedSha256Hasher::new(10)),
            Arc::new(tokens),
            MemberCode::from_raw("MEM1"),
        ));
        accounts
            .seed_root("Root", "root@example.com", "555-0000", "rootpw")
            .unwrap();
        AppState {
            accounts,
            downline: Arc::new(DownlineQuery::new(repo.clone())),
            repo,
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn registration(name: &str, sponsor: &str, position: &str) -> Value {
        json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "mobile": "555-0101",
            "password": "pw",
            "sponsor_code": sponsor,
            "position": position,
        })
    }

    async fn login(app: &Router, code: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            post_json("/api/login", json!({ "member_code": code, "password": password })),
        )
        .await
    }

    #[tokio::test]
    async fn register_returns_created_with_code() {
        let app = build_router(setup());
        let (status, body) = send(&app, post_json("/api/register", registration("Alice", "MEM1", "left"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Member registered successfully");
        assert!(body["member_code"].as_str().unwrap().starts_with("MEM"));
    }

    #[tokio::test]
    async fn register_validation_errors() {
        let app = build_router(setup());

        let mut missing = registration("Bob", "MEM1", "left");
        missing.as_object_mut().unwrap().remove("mobile");
        let (status, body) = send(&app, post_json("/api/register", missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");
        assert_eq!(body["kind"], "invalid_input");

        let (status, body) = send(&app, post_json("/api/register", registration("Bob", "MEM1", "up"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Position must be left or right");

        let (status, body) = send(&app, post_json("/api/register", registration("Bob", "MEM77", "left"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid sponsor code");
        assert_eq!(body["kind"], "sponsor_not_found");
    }

    #[tokio::test]
    async fn register_malformed_json_is_bad_request() {
        let app = build_router(setup());
        let req = Request::builder()
            .method("POST")
            .uri("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let app = build_router(setup());
        let first = send(&app, post_json("/api/register", registration("Carol", "MEM1", "left"))).await;
        assert_eq!(first.0, StatusCode::CREATED);
        let (status, body) = send(&app, post_json("/api/register", registration("Carol", "MEM1", "right"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Email already registered");
    }

    #[tokio::test]
    async fn login_profile_and_downline() {
        let app = build_router(setup());
        send(&app, post_json("/api/register", registration("Left", "MEM1", "left"))).await;
        send(&app, post_json("/api/register", registration("Right", "MEM1", "RIGHT"))).await;

        let (status, body) = login(&app, "MEM1", "rootpw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["member_code"], "MEM1");
        assert_eq!(body["user"]["name"], "Root");
        let token = body["token"].as_str().unwrap().to_string();

        let (status, profile) = send(&app, get_with_token("/api/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["email"], "root@example.com");
        assert_eq!(profile["sponsor_code"], Value::Null);
        assert_eq!(profile["left_count"], 0);
        assert!(profile.get("password").is_none());

        let (status, downline) = send(&app, get_with_token("/api/downline", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(downline["left"][0]["name"], "Left");
        assert_eq!(downline["right"][0]["name"], "Right");
        assert_eq!(downline["left"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_failures() {
        let app = build_router(setup());
        let (status, body) = login(&app, "MEM1", "wrong").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, unknown) = login(&app, "MEM404", "rootpw").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(unknown, body);

        let (status, body) = send(&app, post_json("/api/login", json!({ "member_code": "MEM1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Member code and password required");
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let app = build_router(setup());
        let (status, body) = send(&app, get_with_token("/api/profile", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied");

        let (status, body) = send(&app, get_with_token("/api/downline", Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn profile_of_deleted_member_is_not_found() {
        let state = setup();
        let token = state
            .accounts
            .tokens()
            .issue(spillover_core::MemberId::from_raw(999), &MemberCode::from_raw("MEM999"))
            .unwrap();
        let app = build_router(state);
        let (status, body) = send(&app, get_with_token("/api/profile", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build_router(setup());
        let (status, _) = send(&app, get_with_token("/nonexistent", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let handle = start(config, setup()).await.unwrap();
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["members"], 1);

        handle.shutdown().await;
    }
}
