// src/reload/server.rs

//! Development HTTP server: static files plus a live-reload event stream.
//!
//! - `GET /__reload` streams `reload` events as Server-Sent Events.
//! - `GET /__reload/client.js` returns a tiny script that listens on that
//!   stream and reloads the page.
//! - everything else is served from `base_dir`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::errors::Result;
use crate::reload::LiveReload;

pub const RELOAD_PATH: &str = "/__reload";
pub const CLIENT_SCRIPT_PATH: &str = "/__reload/client.js";

const CLIENT_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__reload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

#[derive(Clone)]
struct ServerState {
    reload: LiveReload,
    stop: watch::Receiver<bool>,
}

/// Build the router without binding a socket.
///
/// Open `/__reload` streams end once `stop` turns `true` or its sender is
/// dropped.
pub fn router(
    reload: LiveReload,
    base_dir: impl Into<PathBuf>,
    stop: watch::Receiver<bool>,
) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(reload_stream))
        .route(CLIENT_SCRIPT_PATH, get(client_script))
        .fallback_service(ServeDir::new(base_dir.into()))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { reload, stop })
}

/// Bind the server socket. Kept separate from [`serve`] so a taken port is
/// reported before watching starts.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding live-reload server to {addr}"))?;
    Ok(listener)
}

/// Serve on `listener` until `stop` turns `true`.
pub async fn serve(
    listener: TcpListener,
    base_dir: PathBuf,
    reload: LiveReload,
    stop: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("reading live-reload server address")?;
    info!(
        addr = %addr,
        base_dir = %base_dir.display(),
        "live-reload server listening"
    );

    let mut shutdown = stop.clone();
    axum::serve(listener, router(reload, base_dir, stop))
        .with_graceful_shutdown(async move { wait_for_stop(&mut shutdown).await })
        .await
        .context("live-reload server failed")?;

    Ok(())
}

async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as stop.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn reload_stream(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let ServerState { reload, mut stop } = state;
    let mut rx = reload.subscribe();
    debug!(observers = reload.observers(), "live-reload observer connected");

    let stream = async_stream::stream! {
        loop {
            let received = tokio::select! {
                _ = wait_for_stop(&mut stop) => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(ev) => {
                    let sse = Event::default()
                        .event("reload")
                        .json_data(&ev)
                        .unwrap_or_else(|_| Event::default().event("reload"));
                    yield Ok(sse);
                }
                // Missed notifications collapse into one refresh.
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    yield Ok(Event::default().event("reload"));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("live-reload observer stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        CLIENT_SCRIPT,
    )
}
