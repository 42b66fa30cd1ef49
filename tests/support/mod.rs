//! In-process OCI registry used to drive real pushes in tests.

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, head, patch, post, put},
    Router,
};
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

const MANIFEST_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

fn sha256(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

#[derive(Clone)]
struct StoredManifest {
    content_type: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct RegistryState {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    uploads: RwLock<HashMap<String, Vec<u8>>>,
    manifests: RwLock<HashMap<String, StoredManifest>>,
    /// Expected `Authorization` header value, if auth is enforced.
    authorization: Option<String>,
}

type SharedState = Arc<RegistryState>;

#[derive(Deserialize)]
struct UploadParams {
    digest: Option<String>,
}

pub struct MockRegistry {
    addr: SocketAddr,
    state: SharedState,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockRegistry {
    pub async fn start() -> Self {
        Self::serve(RegistryState::default()).await
    }

    /// Rejects every request lacking these HTTP Basic credentials.
    pub async fn with_basic_auth(username: &str, password: &str) -> Self {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password));
        Self::serve(RegistryState {
            authorization: Some(format!("Basic {}", token)),
            ..Default::default()
        })
        .await
    }

    async fn serve(state: RegistryState) -> Self {
        let state: SharedState = Arc::new(state);

        let app = Router::new()
            .route("/v2/", get(api_version))
            .route("/v2/{name}/blobs/{digest}", head(check_blob))
            .route("/v2/{name}/blobs/uploads/", post(start_upload))
            .route("/v2/{name}/blobs/uploads/{uuid}", patch(upload_chunk))
            .route("/v2/{name}/blobs/uploads/{uuid}", put(finish_upload))
            .route("/v2/{name}/manifests/{reference}", put(put_manifest))
            .route("/v2/{name}/manifests/{reference}", get(get_manifest))
            .route("/v2/{name}/manifests/{reference}", head(check_manifest))
            .layer(
                tower::ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn_with_state(state.clone(), require_auth)),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    /// `127.0.0.1:<port>`, usable as a registry host.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn manifest(&self, name: &str, reference: &str) -> Option<Vec<u8>> {
        let key = format!("{}:{}", name, reference);
        self.state
            .manifests
            .read()
            .await
            .get(&key)
            .map(|m| m.data.clone())
    }

    pub async fn blob(&self, digest: &str) -> Option<Vec<u8>> {
        self.state.blobs.read().await.get(digest).cloned()
    }

    pub async fn blob_count(&self) -> usize {
        self.state.blobs.read().await.len()
    }
}

async fn require_auth(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let Some(expected) = &state.authorization else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if presented == Some(expected.as_str()) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, r#"Basic realm="mock-registry""#)],
        )
            .into_response()
    }
}

async fn api_version() -> impl IntoResponse {
    (StatusCode::OK, "{}")
}

async fn check_blob(
    State(state): State<SharedState>,
    Path((_name, digest)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.blobs.read().await.get(&digest) {
        Some(blob) => (StatusCode::OK, [("Content-Length", blob.len().to_string())]),
        None => (StatusCode::NOT_FOUND, [("Content-Length", "0".to_string())]),
    }
}

async fn start_upload(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let uuid = uuid::Uuid::new_v4().to_string();
    state.uploads.write().await.insert(uuid.clone(), Vec::new());

    (
        StatusCode::ACCEPTED,
        [
            ("Location", format!("/v2/{}/blobs/uploads/{}", name, uuid)),
            ("Docker-Upload-UUID", uuid),
        ],
    )
}

async fn upload_chunk(
    State(state): State<SharedState>,
    Path((name, uuid)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let mut uploads = state.uploads.write().await;
    let Some(upload) = uploads.get_mut(&uuid) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    upload.extend_from_slice(&body);
    let end = upload.len().saturating_sub(1);

    (
        StatusCode::ACCEPTED,
        [
            ("Location", format!("/v2/{}/blobs/uploads/{}", name, uuid)),
            ("Range", format!("0-{}", end)),
            ("Docker-Upload-UUID", uuid),
        ],
    )
        .into_response()
}

async fn finish_upload(
    State(state): State<SharedState>,
    Path((name, uuid)): Path<(String, String)>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let Some(mut data) = state.uploads.write().await.remove(&uuid) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    data.extend_from_slice(&body);

    let actual = sha256(&data);
    if params.digest.as_deref().is_some_and(|d| d != actual) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    state.blobs.write().await.insert(actual.clone(), data);

    (
        StatusCode::CREATED,
        [
            ("Location", format!("/v2/{}/blobs/{}", name, actual)),
            ("Docker-Content-Digest", actual),
        ],
    )
        .into_response()
}

async fn put_manifest(
    State(state): State<SharedState>,
    Path((name, reference)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(MANIFEST_TYPE)
        .to_string();
    let digest = sha256(&body);

    let entry = StoredManifest {
        content_type,
        data: body.to_vec(),
    };

    let mut manifests = state.manifests.write().await;
    manifests.insert(format!("{}:{}", name, reference), entry.clone());
    manifests.insert(format!("{}:{}", name, digest), entry);

    (
        StatusCode::CREATED,
        [
            ("Location", format!("/v2/{}/manifests/{}", name, digest)),
            ("Docker-Content-Digest", digest),
        ],
    )
}

async fn get_manifest(
    State(state): State<SharedState>,
    Path((name, reference)): Path<(String, String)>,
) -> Response {
    let key = format!("{}:{}", name, reference);
    match state.manifests.read().await.get(&key) {
        Some(entry) => (
            StatusCode::OK,
            [
                ("Content-Type", entry.content_type.clone()),
                ("Docker-Content-Digest", sha256(&entry.data)),
            ],
            entry.data.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn check_manifest(
    State(state): State<SharedState>,
    Path((name, reference)): Path<(String, String)>,
) -> Response {
    let key = format!("{}:{}", name, reference);
    match state.manifests.read().await.get(&key) {
        Some(entry) => (
            StatusCode::OK,
            [
                ("Content-Type", entry.content_type.clone()),
                ("Docker-Content-Digest", sha256(&entry.data)),
            ],
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
