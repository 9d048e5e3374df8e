//! Local HTTP listener for the presentation layer
//!
//! `/health` is open; everything else sits behind the game-context gate.

mod gate;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::game::{Game, SelectedGame};
use crate::session::SessionHandle;

/// State shared by all handlers
#[derive(Clone)]
pub struct ServerState {
    pub selected: SelectedGame,
    pub session: SessionHandle,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(selected: SelectedGame, session: SessionHandle) -> Self {
        Self {
            selected,
            session,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with the gate applied to every route except `/health`
pub fn router(state: ServerState) -> Router {
    let gated = Router::new()
        .route("/game", get(handle_game))
        .route("/change-game", post(handle_change_game))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_game,
        ));

    Router::new()
        .route("/health", get(handle_health))
        .merge(gated)
        .with_state(state)
}

async fn handle_health(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "session": state.session.state().to_string(),
        "game": state.selected.get(),
    }))
}

async fn handle_game(Extension(game): Extension<Game>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "game": game }))
}

/// Make the gated game the session's active game and notify the coordinator
async fn handle_change_game(
    State(state): State<ServerState>,
    Extension(game): Extension<Game>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.session.change_game(game.clone()).await {
        (StatusCode::ACCEPTED, Json(serde_json::json!({ "game": game })))
    } else {
        warn!("Change to '{}' dropped, session is not running", game);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "message": "Session is not running." })),
        )
    }
}

/// Bind the listener up front so a taken port fails startup
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind game-context listener to {}", addr))?;

    info!("Game-context listener on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serve until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: CancellationToken,
) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;

    info!("Game-context listener stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::gate::GAME_HEADER;
    use super::*;
    use crate::config::{SessionConfig, SourcesConfig};
    use crate::provision::{AnySourcePresent, Platform, Provisioner, SourceCatalog};
    use crate::session::{create_session_channels, SessionDispatcher};
    use crate::testing::{FakeBackend, FakeNotifier, Signal};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    /// State whose session has already stopped
    fn state() -> ServerState {
        let (handle, _channels) = create_session_channels();
        ServerState::new(SelectedGame::default(), handle)
    }

    /// State backed by a live dispatcher over fakes
    fn running_session() -> (
        ServerState,
        mpsc::UnboundedReceiver<Signal>,
        CancellationToken,
    ) {
        let backend = Arc::new(FakeBackend::new());
        let provisioner = Arc::new(Provisioner::new(
            backend.clone(),
            Box::new(AnySourcePresent::new(backend)),
            SourceCatalog::new(Platform::Linux, &SourcesConfig::default()),
        ));
        let (notifier, signals) = FakeNotifier::new();
        let (_events_tx, events_rx) = mpsc::unbounded_channel();
        let (handle, channels) = create_session_channels();
        let shutdown = CancellationToken::new();
        let selected = SelectedGame::default();

        let dispatcher = SessionDispatcher::new(
            &SessionConfig::default(),
            provisioner,
            Arc::new(notifier),
            events_rx,
            channels,
            shutdown.clone(),
        )
        .with_selected_game(selected.clone());
        // Keep the event stream open until shutdown
        tokio::spawn(async move {
            let _events_tx = _events_tx;
            dispatcher.run().await
        });

        (ServerState::new(selected, handle), signals, shutdown)
    }

    async fn send(
        app: Router,
        request: axum::http::request::Builder,
        game: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = request;
        if let Some(game) = game {
            request = request.header(GAME_HEADER, game);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get_json(
        app: Router,
        uri: &str,
        game: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        send(app, Request::get(uri), game).await
    }

    #[tokio::test]
    async fn test_missing_game_header_is_rejected() {
        let state = state();
        let (status, body) = get_json(router(state.clone()), "/game", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "message": "Invalid game parameter." }));
        assert_eq!(state.selected.get(), None);
    }

    #[tokio::test]
    async fn test_blank_game_header_is_rejected() {
        let (status, _) = get_json(router(state()), "/game", Some("  ")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_game_header_reaches_handler_and_selected_game() {
        let state = state();
        let (status, body) = get_json(router(state.clone()), "/game", Some("KOF XIII")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "game": "KOF XIII" }));
        assert_eq!(state.selected.get().unwrap().name(), "KOF XIII");
    }

    #[tokio::test]
    async fn test_last_request_wins() {
        let state = state();
        get_json(router(state.clone()), "/game", Some("KOF XIII")).await;
        get_json(router(state.clone()), "/game", Some("Tekken 8")).await;

        assert_eq!(state.selected.get().unwrap().name(), "Tekken 8");
    }

    #[tokio::test]
    async fn test_health_is_not_gated() {
        let (status, body) = get_json(router(state()), "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["session"], "disconnected");
        assert!(body["game"].is_null());
    }

    #[tokio::test]
    async fn test_change_game_reaches_session_and_coordinator() {
        let (state, mut signals, shutdown) = running_session();

        let (status, body) = send(
            router(state.clone()),
            Request::post("/change-game"),
            Some("Tekken 8"),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, serde_json::json!({ "game": "Tekken 8" }));
        assert_eq!(
            signals.recv().await,
            Some(Signal::GameChanged("Tekken 8".to_string()))
        );
        assert_eq!(state.selected.get().unwrap().name(), "Tekken 8");
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_change_game_requires_game_header() {
        let (state, mut signals, shutdown) = running_session();

        let (status, _) = send(router(state), Request::post("/change-game"), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        shutdown.cancel();
        assert!(signals.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_change_game_without_session_is_unavailable() {
        let (status, body) = send(
            router(state()),
            Request::post("/change-game"),
            Some("Tekken 8"),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Session is not running.");
    }

    #[tokio::test]
    async fn test_bind_fails_when_port_is_taken() {
        let taken = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind"));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, state(), shutdown.clone()));

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }
}
