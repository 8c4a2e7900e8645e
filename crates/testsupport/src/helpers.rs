use anyhow::Result;
use base64::Engine;
use hmac::{Hmac, Mac};
use kilog_models::Config;
use sha2::Sha256;

pub const TEST_JWT_KEY: &str = "kilog-test-jwt-key";
/// `whsec_` + base64("kilog-test-signing-key")
pub const TEST_WEBHOOK_SECRET: &str = "whsec_a2lsb2ctdGVzdC1zaWduaW5nLWtleQ==";

/// Base64 encode bytes
pub fn b64<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Default config with test credentials filled in.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_key = TEST_JWT_KEY.to_string();
    config.auth.clerk_webhook_secret = Some(TEST_WEBHOOK_SECRET.to_string());
    config
}

/// Bearer token for `auth_id`, valid for an hour.
pub fn bearer_token(config: &Config, auth_id: &str) -> Result<String> {
    Ok(kilog_api::mint_token(
        &config.auth.jwt_key,
        auth_id,
        chrono::Duration::hours(1),
    )?)
}

/// Svix-style `v1,<sig>` header value, computed the way the provider does.
pub fn sign_webhook(secret: &str, msg_id: &str, timestamp: i64, body: &str) -> Result<String> {
    let key = base64::engine::general_purpose::STANDARD
        .decode(secret.trim_start_matches("whsec_"))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| anyhow::anyhow!("invalid signing key: {e}"))?;
    mac.update(format!("{msg_id}.{timestamp}.{body}").as_bytes());
    Ok(format!("v1,{}", b64(mac.finalize().into_bytes())))
}

/// A `user.created` event body as the identity provider sends it.
pub fn user_created_event(auth_id: &str, email: &str, username: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "object": "event",
        "type": "user.created",
        "data": {
            "id": auth_id,
            "email_addresses": [{"id": "idn_test", "email_address": email}],
            "username": username,
        }
    })
}
