pub mod api;
pub mod args;
pub mod auth;
pub mod clock;
pub mod engine;
pub mod error;
pub mod geo;
pub mod join_code;
pub mod lobby;
pub mod repository;
pub mod state;

use crate::{args::Args, auth::AuthSecret, state::ServerState};
use axum::extract::FromRef;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::prelude::*;

pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geowar_server=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_target(false),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub state: ServerState,
    pub secret: AuthSecret,
}

impl FromRef<AppState> for AuthSecret {
    fn from_ref(input: &AppState) -> Self {
        input.secret.clone()
    }
}

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let state = ServerState::new(args.game_config()?)?;
    let seeded = state.engine.bootstrap_global_objectives()?;
    if seeded > 0 {
        info!(seeded, "seeded global objectives");
    }
    if args.sweep_interval_secs > 0 {
        state.spawn_expiry_sweep(std::time::Duration::from_secs(args.sweep_interval_secs));
    }

    let app_state = AppState {
        state,
        secret: AuthSecret(args.jwt_secret.clone()),
    };
    let listener = TcpListener::bind(args.host).await?;
    info!("listening on {}", listener.local_addr()?);
    serve(listener, app_state).await?;
    Ok(())
}

pub async fn serve(listener: TcpListener, app_state: AppState) -> std::io::Result<()> {
    axum::serve(listener, api::router(app_state)).await
}
