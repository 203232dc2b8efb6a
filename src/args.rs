use crate::engine::GameConfig;
use crate::error::GameError;
use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "geowar_server",
    rename_all = "kebab-case",
    about = "Lobby and territory control server for GeoWar matches"
)]
pub struct Args {
    #[arg(long, env = "GEOWAR_HOST", default_value = "0.0.0.0:3536")]
    pub host: SocketAddr,

    #[arg(long, env = "JWT_SECRET", default_value = "secret", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "GEOWAR_MATCH_DURATION_SECS", default_value_t = 300)]
    pub match_duration_secs: i64,

    #[arg(long, env = "GEOWAR_WIN_THRESHOLD", default_value_t = 10)]
    pub win_threshold: u32,

    #[arg(long, env = "GEOWAR_TEAM_SIZE_LIMIT", default_value_t = 10)]
    pub team_size_limit: u32,

    #[arg(long, env = "GEOWAR_MAX_PLAYERS", default_value_t = 20)]
    pub max_players: u32,

    /// Seconds a position report keeps a player on the live map
    #[arg(long, env = "GEOWAR_ACTIVE_WINDOW_SECS", default_value_t = 10)]
    pub active_window_secs: i64,

    #[arg(long, env = "GEOWAR_LOBBY_ACTIVE_WINDOW_SECS", default_value_t = 20)]
    pub lobby_active_window_secs: i64,

    #[arg(long, env = "GEOWAR_JOIN_CODE_LENGTH", default_value_t = 6)]
    pub join_code_length: usize,

    /// Period of the background expiry sweep; 0 keeps completion lazy only
    #[arg(long, env = "GEOWAR_SWEEP_INTERVAL_SECS", default_value_t = 0)]
    pub sweep_interval_secs: u64,
}

fn seconds(name: &str, value: i64) -> Result<chrono::Duration, GameError> {
    chrono::Duration::try_seconds(value)
        .ok_or_else(|| GameError::InvalidInput(format!("{name} is out of range")))
}

impl Args {
    /// Engine settings from the command line, validated.
    pub fn game_config(&self) -> Result<GameConfig, GameError> {
        let config = GameConfig {
            match_duration: seconds("match_duration_secs", self.match_duration_secs)?,
            win_threshold: self.win_threshold,
            team_size_limit: self.team_size_limit,
            max_players: self.max_players,
            active_window: seconds("active_window_secs", self.active_window_secs)?,
            lobby_active_window: seconds("lobby_active_window_secs", self.lobby_active_window_secs)?,
            join_code_length: self.join_code_length,
        };
        config.validate()?;
        Ok(config)
    }
}
