use crate::error::GameError;
use crate::lobby::Player;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

pub use geowar_auth_common::{
    decode_jwt, issue_jwt, AdminClaims, AuthError, AuthSecret, Claims,
};

/// The authenticated, non-banned caller, registered on first sight.
#[derive(Debug, Clone)]
pub struct CurrentPlayer(pub Player);

#[async_trait]
impl FromRequestParts<AppState> for CurrentPlayer {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let player = state
            .state
            .engine
            .ensure_player(&claims.sub)
            .map_err(IntoResponse::into_response)?;
        if player.banned {
            return Err(GameError::Banned(player.id).into_response());
        }
        Ok(CurrentPlayer(player))
    }
}
