//! `vizpack dev` command implementation.
//!
//! Runs a [`DevSession`] behind an HTTP server:
//!
//! ```text
//! GET /                    index.html from the output directory + reload client
//! GET /__vizpack/client.js reload client
//! GET /__vizpack/ws        session events as JSON text frames
//! GET /*                   files from the output directory
//! ```
//!
//! File changes are batched by the watcher thread; each batch is rebuilt on a
//! blocking task. Concurrent rebuilds are allowed, the session keeps only the
//! newest result per entry.

use super::{exit_with, load_pipeline};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use miette::{IntoDiagnostic, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use vizpack_core::dev::watch_project;
use vizpack_core::document::inject_scripts;
use vizpack_core::{DeploymentMode, DevSession, SessionEvent};

const CLIENT_PATH: &str = "/__vizpack/client.js";
const SOCKET_PATH: &str = "/__vizpack/ws";

/// Reload client: reloads the page after a successful rebuild and logs
/// failures to the console.
const CLIENT_SCRIPT: &str = r"const protocol = location.protocol === 'https:' ? 'wss' : 'ws';
const socket = new WebSocket(`${protocol}://${location.host}/__vizpack/ws`);
socket.addEventListener('message', (message) => {
  const event = JSON.parse(message.data);
  if (event.type === 'rebuilt') {
    location.reload();
  } else if (event.type === 'failed') {
    for (const error of event.errors) {
      console.error(`[vizpack] ${error.errorKind}: ${error.message}`);
    }
  }
});
socket.addEventListener('close', () => {
  console.warn('[vizpack] dev server disconnected');
});
";

/// Dev server action.
#[derive(Debug, Clone)]
pub struct DevAction {
    /// Canonical project root.
    pub root: PathBuf,
    pub mode: DeploymentMode,
    /// Overrides `devServer.port`.
    pub port: Option<u16>,
    /// Overrides `devServer.host`.
    pub host: Option<String>,
    pub json: bool,
}

#[derive(Clone)]
struct AppState {
    session: Arc<DevSession>,
    out_dir: PathBuf,
}

/// Run the dev server until Ctrl+C.
pub async fn run(action: DevAction) -> Result<()> {
    let pipeline = Arc::new(load_pipeline(&action.root));
    let session = Arc::new(
        DevSession::new(Arc::clone(&pipeline), action.mode)
            .unwrap_or_else(|e| exit_with(&[e.report()])),
    );

    let initial = {
        let session = Arc::clone(&session);
        tokio::task::spawn_blocking(move || session.start())
            .await
            .into_diagnostic()?
    };
    log_event(&initial);

    let out_dir = pipeline.emitter().out_dir().to_path_buf();

    let (change_tx, mut change_rx) = mpsc::channel::<Vec<PathBuf>>(16);
    let watch_root = action.root.clone();
    let watch_out = out_dir.clone();
    std::thread::spawn(move || {
        if let Err(e) = watch_project(&watch_root, &watch_out, change_tx) {
            warn!(error = %e, "file watcher stopped");
        }
    });

    let rebuild_session = Arc::clone(&session);
    tokio::spawn(async move {
        while let Some(changed) = change_rx.recv().await {
            let session = Arc::clone(&rebuild_session);
            tokio::task::spawn_blocking(move || {
                if let Some(event) = session.rebuild(&changed) {
                    log_event(&event);
                }
            });
        }
    });

    let settings = &pipeline.config().dev_server;
    let port = action.port.unwrap_or(settings.port);
    let host = action.host.unwrap_or_else(|| settings.host.clone());
    let host_ip = if host == "localhost" {
        "127.0.0.1".to_string()
    } else {
        host.clone()
    };
    let addr: SocketAddr = format!("{host_ip}:{port}").parse().into_diagnostic()?;

    let state = AppState {
        session: Arc::clone(&session),
        out_dir: out_dir.clone(),
    };
    let app = Router::new()
        .route("/", get(serve_index))
        .route("/index.html", get(serve_index))
        .route(CLIENT_PATH, get(serve_client))
        .route(SOCKET_PATH, get(session_websocket))
        .fallback_service(ServeDir::new(&out_dir))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    session.set_serving(true);

    if action.json {
        info!(url = %format!("http://{host}:{port}"), mode = %action.mode, "dev server listening");
    } else {
        println!();
        println!("  vizpack dev ({}) at http://{host}:{port}", action.mode);
        println!("  serving {}", out_dir.display());
        println!();
        println!("  Press Ctrl+C to stop");
        println!();
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    session.set_serving(false);
    served.into_diagnostic()
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::Rebuilt {
            generation,
            entries,
        } => info!(generation, entries = ?entries, "rebuilt"),
        SessionEvent::Failed { generation, errors } => {
            for error in errors {
                warn!(
                    generation,
                    kind = error.error_kind,
                    entries = ?error.entry_names,
                    "{}",
                    error.message
                );
            }
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Serve the host document with the reload client injected.
async fn serve_index(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.out_dir.join("index.html")).await {
        Ok(html) => Html(inject_scripts(&html, &[CLIENT_PATH.to_string()])).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("index.html is not built yet: {e}"),
        )
            .into_response(),
    }
}

async fn serve_client() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_SCRIPT,
    )
}

async fn session_websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| forward_events(socket, state.session.subscribe()))
}

/// Forward session events to one client until either side closes.
async fn forward_events(mut socket: WebSocket, mut events: broadcast::Receiver<SessionEvent>) {
    if socket
        .send(Message::Text(r#"{"type":"connected"}"#.to_string()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if socket.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "reload client lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
