use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Lifetime of tokens minted by [`issue_jwt`].
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AuthSecret(pub String);

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // opaque player id
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

/// Claims of a caller that carries the `admin` flag.
#[derive(Debug, Clone)]
pub struct AdminClaims(pub Claims);

pub fn issue_jwt(
    player_id: impl Into<String>,
    admin: bool,
    secret: &AuthSecret,
) -> Result<String, AuthError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .ok_or(AuthError::Expiration)?
        .timestamp();

    let claims = Claims {
        sub: player_id.into(),
        admin,
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.0.as_ref()),
    )
    .map_err(|_| AuthError::Encoding)
}

pub fn decode_jwt(token: &str, secret: &AuthSecret) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.0.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token_data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    AuthSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secret = AuthSecret::from_ref(state);
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let bearer_token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        decode_jwt(bearer_token, &secret)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminClaims
where
    AuthSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;
        if !claims.admin {
            return Err(AuthError::NotAdmin);
        }
        Ok(AdminClaims(claims))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Admin privileges required")]
    NotAdmin,
    #[error("Token expiration out of range")]
    Expiration,
    #[error("Failed to encode token")]
    Encoding,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::NotAdmin => StatusCode::FORBIDDEN,
            AuthError::Expiration | AuthError::Encoding => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
