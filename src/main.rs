//! game-clipper Agent
//!
//! Keeps a per-game OBS scene with audio and video capture sources in place,
//! tells the local coordinator when OBS is ready, and relays helper process
//! output to the presentation layer.

mod config;
mod error;
mod game;
mod helper;
mod logging;
mod notify;
mod obs;
mod provision;
mod server;
mod session;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use config::Config;
use game::{Game, SelectedGame};
use helper::{HelperBridge, HelperEvent, HelperMessage};
use notify::HttpNotifier;
use obs::ObwsBackend;
use provision::{AnySourcePresent, Provisioner, SourceCatalog};
use server::ServerState;
use session::{create_session_channels, SessionDispatcher, SessionExit};

/// Provision per-game OBS scenes and relay helper output
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long, env = "GAME_CLIPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Game to provision, overriding `session.game`
    #[arg(short, long)]
    game: Option<String>,

    /// Launch the configured helper once the session starts
    #[arg(long)]
    run_helper: bool,

    /// Do not start the game-context listener
    #[arg(long)]
    no_server: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init_logging()?;

    info!("game-clipper Agent starting...");

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path());

    if let Some(game) = args.game {
        config.session.game = Some(game);
    }

    let client = match obs::connect(&config.obs).await {
        Ok(client) => client,
        Err(e) => {
            error!("{:#}", e);
            error!(
                "Is OBS running with the WebSocket server enabled on {}:{}?",
                config.obs.host, config.obs.port
            );
            return Err(e);
        }
    };
    let events = obs::subscribe_session_events(&client)?;

    let backend = Arc::new(ObwsBackend::new(client));
    let provisioner = Arc::new(Provisioner::new(
        backend.clone(),
        Box::new(AnySourcePresent::new(backend)),
        SourceCatalog::for_current_platform(&config.sources),
    ));
    let notifier = Arc::new(HttpNotifier::new(&config.coordinator));

    let (helper_tx, helper_rx) = mpsc::unbounded_channel();
    tokio::spawn(present_helper_output(helper_rx));

    let shutdown = CancellationToken::new();
    let selected = SelectedGame::new(config.session.game.clone().and_then(Game::new));
    let (handle, channels) = create_session_channels();

    let dispatcher = SessionDispatcher::new(
        &config.session,
        provisioner,
        notifier,
        events,
        channels,
        shutdown.clone(),
    )
    .with_selected_game(selected.clone())
    .with_helper(HelperBridge::new(helper_tx), config.helper.clone());

    let server = if args.no_server {
        None
    } else {
        let listener = server::bind(config.server.bind).await?;
        let state = ServerState::new(selected, handle.clone());
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            let result = server::serve(listener, state, token).await;
            if let Err(e) = &result {
                error!("Game-context listener failed: {:#}", e);
            }
            result
        }))
    };

    let ctrl_c_token = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        ctrl_c_token.cancel();
    })?;

    let session = tokio::spawn(dispatcher.run());

    if args.run_helper {
        match handle.run_helper().await {
            Ok(id) => info!("Helper session {} launched", id),
            Err(e) => warn!("Helper not started: {}", e),
        }
    }

    let exit = session.await?;
    match exit {
        SessionExit::ExitStarted => info!("OBS exited"),
        SessionExit::Disconnected => warn!("Lost connection to OBS"),
        SessionExit::Shutdown => {}
    }

    // Stop the listener whatever ended the session
    shutdown.cancel();
    if let Some(server) = server {
        if let Err(e) = server.await {
            error!("Game-context listener panicked: {}", e);
        }
    }

    info!("game-clipper Agent stopped");
    Ok(())
}

/// Stand-in presentation layer: logs every relayed helper event
async fn present_helper_output(mut rx: mpsc::UnboundedReceiver<HelperMessage>) {
    while let Some(HelperMessage { session, event }) = rx.recv().await {
        let channel = event.channel();
        match event {
            HelperEvent::Output(text) => info!("[{}] {}: {}", channel, session, text.trim_end()),
            HelperEvent::Error(text) => warn!("[{}] {}: {}", channel, session, text.trim_end()),
            HelperEvent::Close(code) => info!("[{}] {}: exit code {:?}", channel, session, code),
        }
    }
}
