//! Game-context gate
//!
//! Every gated request must carry a `game` header. The game is threaded to the
//! handler as a request extension and also published to the shared
//! `SelectedGame`, which is last-write-wins across concurrent requests.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info};

use crate::error::MissingContextError;
use crate::game::Game;

use super::ServerState;

/// Header carrying the game name
pub const GAME_HEADER: &str = "game";

pub async fn require_game(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, MissingContextError> {
    let game = request
        .headers()
        .get(GAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Game::new)
        .ok_or_else(|| {
            debug!("Rejected {} without a game header", request.uri());
            MissingContextError
        })?;

    if state.selected.set(game.clone()) {
        info!("Selected game is now '{}'", game);
    }

    request.extensions_mut().insert(game);
    Ok(next.run(request).await)
}
