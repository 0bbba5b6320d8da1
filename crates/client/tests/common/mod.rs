//! In-process QR Tracker back-end for integration tests.
//!
//! Serves the HTTP routes the client calls plus a minimal Engine.IO /
//! Socket.IO endpoint on `/socket.io/`, all on an ephemeral localhost port.
//! Sessions are a random-ish token in a `session` cookie.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use qrtrack_client::api::QrTrackerApi;
use qrtrack_core::credentials::Credentials;
use qrtrack_core::qr_code::{QrCode, ScanUpdate};
use qrtrack_core::types::DbId;

pub const TEST_EMAIL: &str = "owner@example.com";
pub const TEST_PASSWORD: &str = "hunter22";

/// Bytes served for every image; not a real PNG.
pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock";

/// Frames the mock pushes to every open Socket.IO session.
#[derive(Debug, Clone)]
enum PushFrame {
    Scan(ScanUpdate),
    Ping,
    Close,
}

/// Actions that can be told to fail with a 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Generate,
    Rename,
    Delete,
    Logout,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, String>,
    sessions: HashSet<String>,
    codes: Vec<QrCode>,
    next_id: DbId,
    failing: HashSet<Action>,
    reject_push: bool,
    plain_generate_reply: bool,
    list_requests: usize,
    session_counter: u64,
}

#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
    push: broadcast::Sender<PushFrame>,
    pongs: Arc<AtomicUsize>,
    push_sessions: Arc<AtomicUsize>,
    addr: std::net::SocketAddr,
}

impl MockBackend {
    /// Start the back-end with one registered user and no codes.
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(64);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let backend = Self {
            state: Arc::new(Mutex::new(BackendState {
                next_id: 1,
                ..BackendState::default()
            })),
            push,
            pongs: Arc::new(AtomicUsize::new(0)),
            push_sessions: Arc::new(AtomicUsize::new(0)),
            addr,
        };
        backend.add_user(TEST_EMAIL, TEST_PASSWORD);

        let app = router(backend.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        backend
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn push_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// A fresh API client with no session.
    pub fn api(&self) -> Arc<QrTrackerApi> {
        Arc::new(QrTrackerApi::new(self.api_url()).unwrap())
    }

    /// A fresh API client already logged in as the default user.
    pub async fn logged_in_api(&self) -> Arc<QrTrackerApi> {
        let api = self.api();
        let credentials = Credentials::new(TEST_EMAIL, TEST_PASSWORD).unwrap();
        api.login(&credentials).await.unwrap();
        api
    }

    pub fn add_user(&self, email: &str, password: &str) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(email.to_string(), password.to_string());
    }

    /// Store `codes` in the given order; ids must be unique.
    pub fn seed(&self, codes: Vec<QrCode>) {
        let mut state = self.state.lock().unwrap();
        let max_id = codes.iter().map(|qr| qr.id).max().unwrap_or(0);
        state.next_id = state.next_id.max(max_id + 1);
        state.codes = codes;
    }

    pub fn codes(&self) -> Vec<QrCode> {
        self.state.lock().unwrap().codes.clone()
    }

    pub fn set_failing(&self, action: Action, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing.insert(action);
        } else {
            state.failing.remove(&action);
        }
    }

    /// Refuse Socket.IO namespace joins with a CONNECT_ERROR.
    pub fn set_reject_push(&self, reject: bool) {
        self.state.lock().unwrap().reject_push = reject;
    }

    /// Answer generate with a bare `200 OK` text body instead of JSON.
    pub fn set_plain_generate_reply(&self, plain: bool) {
        self.state.lock().unwrap().plain_generate_reply = plain;
    }

    pub fn list_requests(&self) -> usize {
        self.state.lock().unwrap().list_requests
    }

    /// Count a scan of `redirect_id` and push the new counter.
    pub fn record_scan(&self, redirect_id: &str) -> Option<ScanUpdate> {
        let update = {
            let mut state = self.state.lock().unwrap();
            let qr = state
                .codes
                .iter_mut()
                .find(|qr| qr.redirect_id == redirect_id)?;
            qr.scan_count += 1;
            ScanUpdate {
                id: qr.id,
                scan_count: qr.scan_count,
            }
        };
        let _ = self.push.send(PushFrame::Scan(update));
        Some(update)
    }

    /// Push an arbitrary update without touching stored state.
    pub fn push_scan(&self, update: ScanUpdate) {
        let _ = self.push.send(PushFrame::Scan(update));
    }

    pub fn ping_push_sessions(&self) {
        let _ = self.push.send(PushFrame::Ping);
    }

    /// End every open Socket.IO session with an Engine.IO close.
    pub fn close_push_sessions(&self) {
        let _ = self.push.send(PushFrame::Close);
    }

    pub fn pong_count(&self) -> usize {
        self.pongs.load(Ordering::SeqCst)
    }

    /// Number of namespace joins the server has acknowledged.
    pub fn push_session_count(&self) -> usize {
        self.push_sessions.load(Ordering::SeqCst)
    }

    fn is_failing(&self, action: Action) -> bool {
        self.state.lock().unwrap().failing.contains(&action)
    }

    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        let Some(token) = session_token(headers) else {
            return false;
        };
        self.state.lock().unwrap().sessions.contains(&token)
    }
}

/// Build a QR code fixture.
pub fn qr(id: DbId, redirect_id: &str, scan_count: u64) -> QrCode {
    QrCode {
        id,
        original_url: format!("https://example.com/{id}"),
        redirect_id: redirect_id.to_string(),
        filename: format!("{redirect_id}.png"),
        scan_count,
        custom_name: None,
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

fn router(backend: MockBackend) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/api/qrcodes", get(list_codes))
        .route("/generate_qrs", post(generate))
        .route("/update_name", post(update_name))
        .route("/delete_qr", post(delete_qr))
        .route("/static/qrs/{filename}", get(image))
        .route("/r/{redirect_id}", get(redirect))
        .route("/socket.io/", get(socket_io))
        .with_state(backend)
}

#[derive(Deserialize)]
struct CredentialsForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct GenerateForm {
    url: String,
    count: u32,
}

#[derive(Deserialize)]
struct RenameForm {
    qr_id: DbId,
    custom_name: String,
}

#[derive(Deserialize)]
struct DeleteForm {
    qr_id: DbId,
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("session="))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn server_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn register(State(backend): State<MockBackend>, Form(form): Form<CredentialsForm>) -> Response {
    let mut state = backend.state.lock().unwrap();
    if state.users.contains_key(&form.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Email already exists" })),
        )
            .into_response();
    }
    state.users.insert(form.email, form.password);
    (
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response()
}

async fn login(State(backend): State<MockBackend>, Form(form): Form<CredentialsForm>) -> Response {
    let mut state = backend.state.lock().unwrap();
    if state.users.get(&form.email) != Some(&form.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response();
    }
    state.session_counter += 1;
    let token = format!("tok{}", state.session_counter);
    state.sessions.insert(token.clone());
    (
        [(SET_COOKIE, format!("session={token}; Path=/; HttpOnly"))],
        Json(json!({ "message": "Logged in successfully" })),
    )
        .into_response()
}

async fn logout(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if backend.is_failing(Action::Logout) {
        return server_error("logout failed");
    }
    if let Some(token) = session_token(&headers) {
        backend.state.lock().unwrap().sessions.remove(&token);
    }
    Json(json!({ "message": "Logged out" })).into_response()
}

async fn me(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    let logged_in = backend.is_authenticated(&headers);
    Json(json!({ "logged_in": logged_in })).into_response()
}

async fn list_codes(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if !backend.is_authenticated(&headers) {
        return unauthorized();
    }
    let mut state = backend.state.lock().unwrap();
    state.list_requests += 1;
    Json(state.codes.clone()).into_response()
}

async fn generate(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    if !backend.is_authenticated(&headers) {
        return unauthorized();
    }
    if backend.is_failing(Action::Generate) {
        return server_error("generation failed");
    }
    let mut state = backend.state.lock().unwrap();
    for _ in 0..form.count {
        let id = state.next_id;
        state.next_id += 1;
        let token = format!("gen{id:05}");
        state.codes.push(QrCode {
            id,
            original_url: form.url.clone(),
            redirect_id: token.clone(),
            filename: format!("{token}.png"),
            scan_count: 0,
            custom_name: None,
        });
    }
    if state.plain_generate_reply {
        return (StatusCode::OK, "OK").into_response();
    }
    Json(json!({ "success": true, "count": form.count })).into_response()
}

async fn update_name(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Form(form): Form<RenameForm>,
) -> Response {
    if !backend.is_authenticated(&headers) {
        return unauthorized();
    }
    if backend.is_failing(Action::Rename) {
        return server_error("rename failed");
    }
    let mut state = backend.state.lock().unwrap();
    match state.codes.iter_mut().find(|qr| qr.id == form.qr_id) {
        Some(qr) => {
            qr.custom_name = Some(form.custom_name);
            Json(json!({ "success": true })).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Invalid QR code.").into_response(),
    }
}

async fn delete_qr(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Form(form): Form<DeleteForm>,
) -> Response {
    if !backend.is_authenticated(&headers) {
        return unauthorized();
    }
    if backend.is_failing(Action::Delete) {
        return server_error("delete failed");
    }
    let mut state = backend.state.lock().unwrap();
    let before = state.codes.len();
    state.codes.retain(|qr| qr.id != form.qr_id);
    if state.codes.len() == before {
        return (StatusCode::NOT_FOUND, "Invalid QR code.").into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn image(State(backend): State<MockBackend>, Path(filename): Path<String>) -> Response {
    let exists = backend
        .state
        .lock()
        .unwrap()
        .codes
        .iter()
        .any(|qr| qr.filename == filename);
    if !exists {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([(CONTENT_TYPE, "image/png")], IMAGE_BYTES).into_response()
}

async fn redirect(State(backend): State<MockBackend>, Path(redirect_id): Path<String>) -> Response {
    let Some(update) = backend.record_scan(&redirect_id) else {
        return (StatusCode::NOT_FOUND, "Invalid QR code.").into_response();
    };
    let target = backend
        .state
        .lock()
        .unwrap()
        .codes
        .iter()
        .find(|qr| qr.id == update.id)
        .map(|qr| qr.original_url.clone())
        .unwrap_or_default();
    (StatusCode::FOUND, [(LOCATION, target)]).into_response()
}

// ---------------------------------------------------------------------------
// Socket.IO endpoint
// ---------------------------------------------------------------------------

async fn socket_io(ws: WebSocketUpgrade, State(backend): State<MockBackend>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, backend))
}

async fn handle_socket(socket: WebSocket, backend: MockBackend) {
    let (mut sink, mut stream) = socket.split();
    let sid = {
        let mut state = backend.state.lock().unwrap();
        state.session_counter += 1;
        format!("eio{}", state.session_counter)
    };

    let open = json!({
        "sid": sid,
        "upgrades": [],
        "pingInterval": 25000,
        "pingTimeout": 20000,
        "maxPayload": 1_000_000,
    });
    if sink.send(Message::Text(format!("0{open}").into())).await.is_err() {
        return;
    }

    // Wait for the namespace join.
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) if text.as_str() == "40" => break,
            Some(Ok(_)) => {}
            _ => return,
        }
    }

    if backend.state.lock().unwrap().reject_push {
        let _ = sink
            .send(Message::Text(r#"44{"message":"unauthorized"}"#.into()))
            .await;
        return;
    }

    let mut frames = backend.push.subscribe();
    let ack = json!({ "sid": format!("{sid}-ns") });
    if sink.send(Message::Text(format!("40{ack}").into())).await.is_err() {
        return;
    }
    backend.push_sessions.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let text = match frame {
                    Ok(PushFrame::Scan(update)) => {
                        format!("42{}", json!(["scan_update", update]))
                    }
                    Ok(PushFrame::Ping) => "2".to_string(),
                    Ok(PushFrame::Close) => {
                        let _ = sink.send(Message::Text("1".into())).await;
                        break;
                    }
                    Err(_) => break,
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if text.as_str() == "3" {
                        backend.pongs.fetch_add(1, Ordering::SeqCst);
                    }
                    if text.as_str() == "1" {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }
}
