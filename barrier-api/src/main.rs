//! Barrier API Server
//!
//! Thin HTTP surface over the barrier core: rotation, encrypt/decrypt, and
//! basic operability endpoints. No authentication, rate limiting, or
//! dashboard — those are explicitly out of scope for the core's external
//! collaborator (see `BarrierError`'s doc comment for the core's own
//! error taxonomy, which this surface maps to HTTP status).
//!
//! Configuration (environment variables):
//!   BARRIER_PORT           - Listen port (default: 8080)
//!   BARRIER_SQLITE_PATH    - Path to a SQLite file (default: in-memory store)
//!   BARRIER_UNSEAL_KEYS    - Ordered `id:hexkey` pairs separated by `,`;
//!                            first entry is primary. Each key is 64 hex
//!                            characters (32 bytes). Required.
//!   BARRIER_MAX_ROTATION_REASON_LEN - Max rotation reason length (default: 500)
//!   BARRIER_LOG_FORMAT     - "json" for structured logging, "pretty" for dev

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use barrier_core::{Barrier, BarrierError, Rotator};
use barrier_crypto::JoseCrypto;
use barrier_store::{SqliteStore, Store};
use barrier_unseal::{StaticUnsealProvider, UnsealProvider};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

struct AppState<S: Store> {
    barrier: Barrier<S>,
}

type Shared<S> = Arc<AppState<S>>;

#[derive(Deserialize)]
struct RotateReq {
    reason: String,
}

#[derive(Serialize)]
struct RotateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    old_key_uuid: Option<String>,
    new_key_uuid: String,
    rotated_at: i64,
    reason: String,
}

#[derive(Deserialize)]
struct EncryptReq {
    plaintext: String,
}

#[derive(Serialize)]
struct EncryptResponse {
    ciphertext: String,
}

#[derive(Deserialize)]
struct DecryptReq {
    ciphertext: String,
}

#[derive(Serialize)]
struct DecryptResponse {
    plaintext: String,
}

#[derive(Serialize)]
struct StatusResponse {
    closed: bool,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// `Validation` is the sole 4xx-class error the core can return; every
/// other error kind surfaces as `500` with an error body — the core makes
/// no finer HTTP distinction than that.
fn status_for(err: &BarrierError) -> StatusCode {
    match err {
        BarrierError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn err_response(err: BarrierError) -> axum::response::Response {
    let status = status_for(&err);
    (status, Json(ApiError { error: err.to_string(), kid: None })).into_response()
}

/// Same as [`err_response`], but for a failed `/decrypt` call also reports
/// the `kid` the caller's ciphertext named, when it parses — this is the
/// one piece of information a `KeyGone`/`MalformedCiphertext` response can
/// usefully add for an operator chasing down which content key vanished.
fn decrypt_err_response(err: BarrierError, jwe: &[u8]) -> axum::response::Response {
    let status = status_for(&err);
    let kid = barrier_crypto::parse_compact_kid(jwe).ok().map(|id| id.to_string());
    (status, Json(ApiError { error: err.to_string(), kid })).into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_status<S: Store>(State(state): State<Shared<S>>) -> impl IntoResponse {
    Json(StatusResponse {
        closed: state.barrier.is_closed(),
    })
}

async fn encrypt<S: Store>(State(state): State<Shared<S>>, Json(req): Json<EncryptReq>) -> impl IntoResponse {
    match state.barrier.encrypt(req.plaintext.as_bytes()).await {
        Ok(jwe) => Json(EncryptResponse {
            ciphertext: String::from_utf8_lossy(&jwe).into_owned(),
        })
        .into_response(),
        Err(e) => err_response(e),
    }
}

async fn decrypt<S: Store>(State(state): State<Shared<S>>, Json(req): Json<DecryptReq>) -> impl IntoResponse {
    match state.barrier.decrypt(req.ciphertext.as_bytes()).await {
        Ok(plaintext) => Json(DecryptResponse {
            plaintext: String::from_utf8_lossy(&plaintext).into_owned(),
        })
        .into_response(),
        Err(e) => decrypt_err_response(e, req.ciphertext.as_bytes()),
    }
}

fn rotation_result(result: Result<barrier_core::RotationRecord, BarrierError>) -> axum::response::Response {
    match result {
        Ok(record) => (
            StatusCode::OK,
            Json(RotateResponse {
                old_key_uuid: record.old_id.map(|id| id.to_string()),
                new_key_uuid: record.new_id.to_string(),
                rotated_at: record.rotated_at_ms,
                reason: record.reason,
            }),
        )
            .into_response(),
        Err(e) => err_response(e),
    }
}

fn rotator_for<S: Store>(state: &Shared<S>) -> Rotator<S> {
    state.barrier.rotator()
}

async fn rotate_root<S: Store>(State(state): State<Shared<S>>, Json(req): Json<RotateReq>) -> impl IntoResponse {
    rotation_result(rotator_for(&state).rotate_root(&req.reason))
}

async fn rotate_intermediate<S: Store>(
    State(state): State<Shared<S>>,
    Json(req): Json<RotateReq>,
) -> impl IntoResponse {
    rotation_result(rotator_for(&state).rotate_intermediate(&req.reason))
}

async fn rotate_content<S: Store>(State(state): State<Shared<S>>, Json(req): Json<RotateReq>) -> impl IntoResponse {
    rotation_result(rotator_for(&state).rotate_content(&req.reason))
}

/// Parses `BARRIER_UNSEAL_KEYS`, an ordered `id:hexkey` list separated by
/// commas; the first entry is the primary key used for wrapping.
fn parse_unseal_keys(raw: &str) -> Result<Vec<([u8; 32], String)>, String> {
    let mut keys = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (id, hex_key) = entry
            .split_once(':')
            .ok_or_else(|| format!("malformed unseal key entry {:?}, expected id:hexkey", entry))?;
        let mut key = [0u8; 32];
        hex::decode_to_slice(hex_key, &mut key)
            .map_err(|e| format!("unseal key {:?} is not 64 hex characters: {}", id, e))?;
        keys.push((key, id.to_string()));
    }
    Ok(keys)
}

async fn run_server<S: Store + 'static>(store: Arc<S>, port: u16) {
    let unseal_keys_raw = std::env::var("BARRIER_UNSEAL_KEYS")
        .expect("BARRIER_UNSEAL_KEYS must be set to an ordered id:hexkey list");
    let unseal_keys = parse_unseal_keys(&unseal_keys_raw).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });

    let crypto = Arc::new(JoseCrypto::new());
    let unseal: Arc<dyn UnsealProvider> =
        Arc::new(StaticUnsealProvider::new(unseal_keys).unwrap_or_else(|e| {
            tracing::error!("{}", e);
            std::process::exit(1);
        }));

    let barrier = Barrier::new(store, crypto, unseal).unwrap_or_else(|e| {
        tracing::error!("failed to bootstrap barrier: {}", e);
        std::process::exit(1);
    });

    let state: Shared<S> = Arc::new(AppState { barrier });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(get_status::<S>))
        .route("/encrypt", post(encrypt::<S>))
        .route("/decrypt", post(decrypt::<S>))
        .route("/rotate/root", post(rotate_root::<S>))
        .route("/rotate/intermediate", post(rotate_intermediate::<S>))
        .route("/rotate/content", post(rotate_content::<S>))
        .layer(cors)
        .with_state(state);

    tracing::info!(port, "starting barrier API server");

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .unwrap();
}

#[tokio::main]
async fn main() {
    let log_format = std::env::var("BARRIER_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "barrier_api=info,tower_http=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(true).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let port: u16 = std::env::var("BARRIER_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

    match std::env::var("BARRIER_SQLITE_PATH") {
        Ok(path) => {
            let store = Arc::new(SqliteStore::open(&path).unwrap_or_else(|e| {
                tracing::error!("failed to open sqlite store at {}: {}", path, e);
                std::process::exit(1);
            }));
            run_server(store, port).await;
        }
        Err(_) => {
            tracing::warn!("BARRIER_SQLITE_PATH not set — using an in-memory store (data is lost on restart)");
            let store = Arc::new(SqliteStore::in_memory().unwrap_or_else(|e| {
                tracing::error!("failed to open in-memory store: {}", e);
                std::process::exit(1);
            }));
            run_server(store, port).await;
        }
    }
}
