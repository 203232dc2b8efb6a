use crate::engine::{GameConfig, GameEngine};
use crate::error::GameError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<GameEngine>,
}

impl ServerState {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        let engine = GameEngine::in_memory(config)?;
        Ok(ServerState {
            engine: Arc::new(engine),
        })
    }

    /// Periodically finishes matches whose time ran out, so clients that
    /// never poll still see them end.
    pub fn spawn_expiry_sweep(&self, period: Duration) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match engine.sweep_expired() {
                    Ok(0) => {}
                    Ok(finished) => info!(finished, "expiry sweep finished matches"),
                    Err(e) => error!("expiry sweep failed: {e}"),
                }
            }
        })
    }
}
