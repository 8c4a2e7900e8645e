use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kilog_models::KilogError;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, warn};

use crate::handlers::{into_api_error, ApiError};
use crate::AppState;

/// Bearer token payload. `sub` is the identity-provider user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

/// The signed-in user, inserted into request extensions by [`require_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub auth_id: String,
}

/// Issue an HS256 token for `auth_id`, valid for `ttl`.
pub fn mint_token(jwt_key: &str, auth_id: &str, ttl: Duration) -> Result<String, KilogError> {
    let now = Utc::now();
    let claims = Claims {
        sub: auth_id.to_string(),
        exp: (now + ttl).timestamp().max(0) as usize,
        iat: Some(now.timestamp().max(0) as usize),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_key.as_bytes()),
    )
    .map_err(|e| KilogError::Internal {
        reason: format!("failed to sign token: {e}"),
    })
}

pub fn verify_token(jwt_key: &str, token: &str) -> Result<Claims, KilogError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_key.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error during auth middleware.");
        KilogError::Unauthorized {
            reason: "invalid or expired token".to_string(),
        }
    })
}

/// Resolve the bearer token to a stored user. Any failure is a 401.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            into_api_error(
                &state,
                KilogError::Unauthorized {
                    reason: "missing bearer token".to_string(),
                },
            )
        })?;

    let claims = verify_token(&state.config.auth.jwt_key, token)
        .map_err(|e| into_api_error(&state, e))?;

    let user = state
        .store
        .get_user_by_auth_id(&claims.sub)
        .await
        .map_err(|e| into_api_error(&state, e))?
        .ok_or_else(|| {
            into_api_error(
                &state,
                KilogError::Unauthorized {
                    reason: format!("no user registered for {}", claims.sub),
                },
            )
        })?;

    debug!("Authenticated user {} ({})", user.id, user.auth_id);
    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        auth_id: user.auth_id,
    });
    Ok(next.run(req).await)
}

/// CORS for the configured origins. Credentials are allowed, so methods and
/// headers are mirrored from the preflight rather than wildcarded.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let list: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
