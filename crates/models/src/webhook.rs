use serde::{Deserialize, Serialize};

pub const EVENT_USER_CREATED: &str = "user.created";
pub const EVENT_USER_UPDATED: &str = "user.updated";
pub const EVENT_USER_DELETED: &str = "user.deleted";
pub const EVENT_SESSION_CREATED: &str = "session.created";

/// Outer shape of an identity-provider webhook delivery. `data` is decoded
/// further once the event type is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    /// Empty when the delivery carries no type; such events are ignored.
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClerkEmailAddress {
    pub email_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ClerkUserData {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.first().map(|e| e.email_address.as_str())
    }

    /// Provider username, falling back to the local part of the email.
    pub fn derived_username(&self) -> Option<String> {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => self
                .primary_email()
                .and_then(|email| email.split('@').next())
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClerkSessionData {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClerkDeletedData {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookAck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self::with_status("success")
    }

    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    pub fn error(detail: impl Into<String>) -> Self {
        WebhookAck {
            status: "error".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn with_status(status: &str) -> Self {
        WebhookAck {
            status: status.to_string(),
            detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_falls_back_to_email_prefix() {
        let data: ClerkUserData = serde_json::from_value(serde_json::json!({
            "id": "user_123",
            "email_addresses": [{"email_address": "lifter@example.com", "id": "idn_1"}],
            "username": null,
            "first_name": "Ignored"
        }))
        .unwrap();
        assert_eq!(data.primary_email(), Some("lifter@example.com"));
        assert_eq!(data.derived_username().as_deref(), Some("lifter"));
    }

    #[test]
    fn provider_username_wins() {
        let data = ClerkUserData {
            id: "user_1".into(),
            email_addresses: vec![ClerkEmailAddress {
                email_address: "a@b.c".into(),
            }],
            username: Some("squatqueen".into()),
        };
        assert_eq!(data.derived_username().as_deref(), Some("squatqueen"));
    }

    #[test]
    fn missing_email_yields_no_username() {
        let data = ClerkUserData {
            id: "user_1".into(),
            email_addresses: vec![],
            username: None,
        };
        assert!(data.primary_email().is_none());
        assert!(data.derived_username().is_none());
    }

    #[test]
    fn ack_serialization() {
        let json = serde_json::to_value(WebhookAck::success()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success"}));
        let json = serde_json::to_value(WebhookAck::error("Missing email")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "detail": "Missing email"}));
    }
}
