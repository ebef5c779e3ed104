//! HTTP server for broadcast mode.
//!
//! Serves the static asset root at `/` and upgrades `/ws` to a WebSocket.
//! Per connection: one greeting text message, then the current aggregate as
//! JSON, then every subsequent frame until the connection closes or a send
//! fails. A failed send ends that client's loop only; the engine and other
//! clients are unaffected.

use std::path::Path;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

use super::Broadcaster;

/// First message on every new connection.
pub const GREETING: &str = "stashwatch: aggregate stream connected";

/// Build the application router.
pub fn app(broadcaster: Broadcaster, static_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(upgrade_handler))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(broadcaster)
}

/// Bind and serve until ctrl-c or until `ct` is cancelled (the engine task
/// cancels it when it stops).
pub async fn serve(
    broadcaster: Broadcaster,
    bind: &str,
    static_dir: &Path,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    crate::log_event!("server", "listening", "http://{bind}, stream at /ws");

    let server = axum::serve(listener, app(broadcaster, static_dir));

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            crate::log_event!("server", "shutting down");
            ct.cancel();
        }
        _ = ct.cancelled() => {
            anyhow::bail!("synchronization engine stopped");
        }
    }
    Ok(())
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Broadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, broadcaster))
}

async fn client_session(socket: WebSocket, broadcaster: Broadcaster) {
    let (current, mut updates) = broadcaster.subscribe();
    let (mut sink, mut stream) = socket.split();

    crate::debug_event!("ws", "connected");

    if sink.send(Message::Text(GREETING.into())).await.is_err() {
        return;
    }
    if let Some(frame) = current
        && sink
            .send(Message::Text(frame.to_string().into()))
            .await
            .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            frame = updates.recv() => match frame {
                Ok(frame) => {
                    if sink.send(Message::Text(frame.to_string().into())).await.is_err() {
                        crate::debug_event!("ws", "send failed, closing session");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[ws] client lagging, dropped {skipped} frames");
                }
                Err(RecvError::Closed) => break,
            },
            // Clients do not speak the protocol; polling the inbound half
            // keeps control frames flowing and detects disconnects.
            incoming = stream.next() => match incoming {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    crate::debug_event!("ws", "disconnected");
}
