//! Identity-provider webhooks, signed with the Svix scheme.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use kilog_metrics::TracingService;
use kilog_models::{
    ClerkDeletedData, ClerkSessionData, ClerkUserData, CreateUserRequest, ErrorShape, KilogError,
    UpdateUserRequest, WebhookAck, WebhookEnvelope, EVENT_SESSION_CREATED, EVENT_USER_CREATED,
    EVENT_USER_DELETED, EVENT_USER_UPDATED,
};
use kilog_store::Store;
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::handlers::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";
pub const SECRET_PREFIX: &str = "whsec_";
/// Maximum distance between the signed timestamp and now.
pub const TIMESTAMP_TOLERANCE_SECS: u64 = 5 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("timestamp outside tolerance")]
    TimestampOutOfRange,
    #[error("malformed signing secret")]
    InvalidSecret,
    #[error("no matching signature")]
    NoMatchingSignature,
}

fn signing_key(secret: &str) -> Result<Vec<u8>, SignatureError> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    STANDARD
        .decode(encoded)
        .map_err(|_| SignatureError::InvalidSecret)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

/// `v1,<base64>` signature over `"{id}.{timestamp}.{body}"`.
pub fn sign(secret: &str, msg_id: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(&signing_key(secret)?)
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(format!("{msg_id}.{timestamp}.").as_bytes());
    mac.update(body);
    Ok(format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes())))
}

/// Check the delivery headers against `body`. `now` is unix seconds.
pub fn verify(secret: &str, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), SignatureError> {
    let msg_id = header(headers, HEADER_ID)?;
    let timestamp: i64 = header(headers, HEADER_TIMESTAMP)?
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    let signatures = header(headers, HEADER_SIGNATURE)?;

    if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECS {
        return Err(SignatureError::TimestampOutOfRange);
    }

    let key = signing_key(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(format!("{msg_id}.{timestamp}.").as_bytes());
    mac.update(body);

    for candidate in signatures.split_whitespace() {
        let Some(encoded) = candidate.strip_prefix("v1,") else {
            continue;
        };
        let Ok(expected) = STANDARD.decode(encoded) else {
            continue;
        };
        // verify_slice consumes the mac, so check a clone per candidate.
        if mac.clone().verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::NoMatchingSignature)
}

fn webhook_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorShape {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.to_string(),
        }),
    )
}

#[instrument(skip_all)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(secret) = state.config.auth.clerk_webhook_secret.as_deref() else {
        error!("Clerk webhook secret is not configured");
        state.metrics.record_api_error(500);
        return Err(webhook_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook secret not configured",
        ));
    };

    if let Err(e) = verify(secret, &headers, &body, Utc::now().timestamp()) {
        TracingService::log_webhook_rejected(&e.to_string());
        state.metrics.record_api_error(400);
        return Err(webhook_error(StatusCode::BAD_REQUEST, "Invalid signature"));
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body).map_err(|e| {
        warn!("Undecodable webhook payload: {}", e);
        state.metrics.record_api_error(400);
        webhook_error(StatusCode::BAD_REQUEST, "Invalid payload")
    })?;

    info!("Received Clerk webhook: {}", envelope.event_type);
    state.metrics.record_webhook_event(&envelope.event_type);

    let event_type = envelope.event_type.clone();
    match process_event(&state, envelope).await {
        Ok(ack) => Ok(Json(ack)),
        Err(e) => {
            // Answer 200 so the provider does not keep retrying a logic error.
            error!("Error processing webhook {}: {}", event_type, e);
            Ok(Json(WebhookAck::error(e.to_string())))
        }
    }
}

/// Apply a verified event to the user table.
pub async fn process_event(state: &AppState, envelope: WebhookEnvelope) -> Result<WebhookAck, KilogError> {
    let store = &state.store;
    match envelope.event_type.as_str() {
        EVENT_USER_CREATED => {
            let data: ClerkUserData = decode_data(envelope.data)?;
            let Some(email) = data.primary_email().map(str::to_string) else {
                error!("Skipping user {}: no email found", data.id);
                return Ok(WebhookAck::error("Missing email"));
            };
            if store.get_user_by_auth_id(&data.id).await?.is_some() {
                info!("User {} already exists, skipping create", data.id);
                return Ok(WebhookAck::ok());
            }
            let user = store
                .create_user(CreateUserRequest {
                    username: data.derived_username(),
                    email,
                    auth_id: data.id,
                })
                .await?;
            state.metrics.record_user_created();
            TracingService::log_user_created(&user);
        }
        EVENT_USER_UPDATED => {
            let data: ClerkUserData = decode_data(envelope.data)?;
            match store.get_user_by_auth_id(&data.id).await? {
                Some(user) => {
                    let new_username = data.username.filter(|u| !u.is_empty());
                    if new_username.is_some() && new_username != user.username {
                        store
                            .update_user(
                                user.id,
                                UpdateUserRequest {
                                    username: new_username,
                                    last_login_at: None,
                                },
                            )
                            .await?;
                        info!("Updated username for user {}", user.id);
                    }
                }
                None => warn!("Received update for unknown user {}", data.id),
            }
        }
        EVENT_SESSION_CREATED => {
            let data: ClerkSessionData = decode_data(envelope.data)?;
            match store.get_user_by_auth_id(&data.user_id).await? {
                Some(user) => {
                    store.touch_last_login(user.id).await?;
                    info!("Updated last_login_at for user {}", user.id);
                }
                None => warn!("Session started for unknown user {}", data.user_id),
            }
        }
        EVENT_USER_DELETED => {
            let data: ClerkDeletedData = decode_data(envelope.data)?;
            if let Some(auth_id) = data.id {
                delete_by_auth_id(store, &auth_id).await?;
            }
        }
        other => info!("Ignoring webhook event {}", other),
    }
    Ok(WebhookAck::success())
}

async fn delete_by_auth_id(store: &Store, auth_id: &str) -> Result<(), KilogError> {
    if let Some(user) = store.get_user_by_auth_id(auth_id).await? {
        store.delete_user(user.id).await?;
        TracingService::log_user_deleted(auth_id);
    }
    Ok(())
}

fn decode_data<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, KilogError> {
    serde_json::from_value(data).map_err(|e| KilogError::InvalidRequest {
        reason: format!("malformed event data: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    // base64("kilog-test-signing-key")
    const SECRET: &str = "whsec_a2lsb2ctdGVzdC1zaWduaW5nLWtleQ==";

    fn headers(id: &str, ts: i64, sig: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(HEADER_ID, HeaderValue::from_str(id).unwrap());
        h.insert(HEADER_TIMESTAMP, HeaderValue::from_str(&ts.to_string()).unwrap());
        h.insert(HEADER_SIGNATURE, HeaderValue::from_str(sig).unwrap());
        h
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"type":"user.created","data":{}}"#;
        let sig = sign(SECRET, "msg_1", 1_700_000_000, body).unwrap();
        let h = headers("msg_1", 1_700_000_000, &sig);
        assert_eq!(verify(SECRET, &h, body, 1_700_000_100), Ok(()));
    }

    #[test]
    fn any_listed_signature_may_match() {
        let body = b"{}";
        let good = sign(SECRET, "msg_2", 1_700_000_000, body).unwrap();
        let list = format!("v1,AAAA v2,ignored {good}");
        let h = headers("msg_2", 1_700_000_000, &list);
        assert!(verify(SECRET, &h, body, 1_700_000_000).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign(SECRET, "msg_3", 1_700_000_000, b"original").unwrap();
        let h = headers("msg_3", 1_700_000_000, &sig);
        assert_eq!(
            verify(SECRET, &h, b"tampered", 1_700_000_000),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn stale_timestamp_fails() {
        let sig = sign(SECRET, "msg_4", 1_700_000_000, b"{}").unwrap();
        let h = headers("msg_4", 1_700_000_000, &sig);
        assert_eq!(
            verify(SECRET, &h, b"{}", 1_700_000_000 + TIMESTAMP_TOLERANCE_SECS as i64 + 1),
            Err(SignatureError::TimestampOutOfRange)
        );
    }

    #[test]
    fn extreme_timestamps_are_out_of_range() {
        let now: i64 = 1_700_000_000;
        for ts in [i64::MIN, i64::MAX, now.wrapping_add(i64::MIN)] {
            let h = headers("msg_x", ts, "v1,AAAA");
            assert_eq!(
                verify(SECRET, &h, b"{}", now),
                Err(SignatureError::TimestampOutOfRange),
                "timestamp {ts}"
            );
        }
    }

    #[test]
    fn missing_headers_fail() {
        let mut h = headers("msg_5", 1, "v1,x");
        h.remove(HEADER_SIGNATURE);
        assert_eq!(
            verify(SECRET, &h, b"{}", 1),
            Err(SignatureError::MissingHeader(HEADER_SIGNATURE))
        );
    }

    #[test]
    fn secret_must_be_base64() {
        assert_eq!(
            sign("whsec_***", "m", 1, b"").unwrap_err(),
            SignatureError::InvalidSecret
        );
    }
}
