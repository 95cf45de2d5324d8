//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use ooda_telemetry::Metrics;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, trace, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::queue::DashboardEventQueue;
use crate::status::{AgentStatusSnapshot, StatusBoard};

/// Broadcast buffer for slow WebSocket clients.
const BROADCAST_CAPACITY: usize = 256;

/// What the agent shares with the dashboard.
#[derive(Clone, Default)]
pub struct DashboardState {
    pub status: StatusBoard,
    pub events: Arc<DashboardEventQueue>,
}

impl DashboardState {
    #[must_use]
    pub fn new(events: Arc<DashboardEventQueue>) -> Self {
        Self {
            status: StatusBoard::new(),
            events,
        }
    }
}

/// Limits concurrent WebSocket connections.
struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    fn try_acquire(&self) -> Option<ConnectionGuard<'_>> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard { limiter: self });
            }
        }
    }

    fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

struct ConnectionGuard<'a> {
    limiter: &'a ConnectionLimiter,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    dashboard: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    limiter: Arc<ConnectionLimiter>,
}

/// Create the axum router.
pub fn create_router(
    dashboard: DashboardState,
    broadcast_tx: broadcast::Sender<String>,
    max_connections: usize,
) -> Router {
    let state = AppState {
        dashboard,
        broadcast_tx,
        limiter: Arc::new(ConnectionLimiter::new(max_connections)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(get_status))
        .route("/metrics", get(get_metrics))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(cors)
}

async fn get_status(State(state): State<AppState>) -> Json<AgentStatusSnapshot> {
    Json(state.dashboard.status.snapshot())
}

async fn get_metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.limiter.current_count() >= state.limiter.max {
        warn!(
            current = state.limiter.current_count(),
            max = state.limiter.max,
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    }
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let Some(_guard) = state.limiter.try_acquire() else {
        warn!("Connection limit reached during upgrade");
        return;
    };
    info!(
        connections = state.limiter.current_count(),
        "New WebSocket connection"
    );

    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    // Current status first so the client has something to render
    if let Ok(json) = serde_json::to_string(&state.dashboard.status.snapshot()) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send initial status, client disconnected");
            return;
        }
    }

    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    info!(
        connections = state.limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Drain the event queue on a fixed interval and broadcast each event.
async fn run_drainer(
    events: Arc<DashboardEventQueue>,
    tx: broadcast::Sender<String>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        for event in events.drain() {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    // Err only means no client is connected
                    if let Ok(n) = tx.send(json) {
                        trace!(receivers = n, event_type = event.event_type(), "Event broadcast");
                    }
                }
                Err(e) => debug!(error = %e, "Failed to serialize dashboard event"),
            }
        }
    }
}

/// Serve on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    dashboard: DashboardState,
    config: &DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let (broadcast_tx, _) = broadcast::channel::<String>(BROADCAST_CAPACITY);

    tokio::spawn(run_drainer(
        Arc::clone(&dashboard.events),
        broadcast_tx.clone(),
        config.update_interval(),
        shutdown.clone(),
    ));

    let app = create_router(dashboard, broadcast_tx, config.max_connections);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

/// Bind the configured address and serve.
pub async fn run_server(
    dashboard: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> DashboardResult<()> {
    let address = config.address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| DashboardError::Bind {
            address: address.clone(),
            source,
        })?;
    info!(%address, "Starting dashboard server");
    serve(listener, dashboard, &config, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DashboardEvent, DashboardEventKind};
    use crate::status::UnifiedStatus;

    #[tokio::test]
    async fn test_drainer_broadcasts_in_order() {
        let events = Arc::new(DashboardEventQueue::new(8));
        let (tx, mut rx) = broadcast::channel(8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_drainer(
            events.clone(),
            tx,
            Duration::from_millis(5),
            shutdown.clone(),
        ));

        for to in ["PERCEPTION", "REASONING"] {
            events.push(DashboardEvent::now(DashboardEventKind::StateTransition {
                from: "IDLE".to_string(),
                to: to.to_string(),
            }));
        }

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["to"], "PERCEPTION");
        assert_eq!(second["to"], "REASONING");

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_and_metrics_endpoints() {
        let dashboard = DashboardState::default();
        dashboard.status.publish(AgentStatusSnapshot {
            state: "LEARNING".to_string(),
            unified_status: UnifiedStatus::Active,
            cycle_count: 7,
            ..AgentStatusSnapshot::default()
        });
        Metrics::cycle_completed(1.0);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let config = DashboardConfig::default();
        let server = {
            let shutdown = shutdown.clone();
            let dashboard = dashboard.clone();
            tokio::spawn(async move { serve(listener, dashboard, &config, shutdown).await })
        };

        let status: AgentStatusSnapshot = reqwest::get(format!("http://{addr}/api/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status.state, "LEARNING");
        assert_eq!(status.unified_status, UnifiedStatus::Active);
        assert_eq!(status.cycle_count, 7);

        let metrics = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("ooda_cycles_total"));

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
