use anyhow::Result;
use kilog_models::{
    CreateExerciseRequest, CreateWorkoutRequest, Exercise, UserResponse, WorkoutResponse,
    WorkoutSummary,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::sign_webhook;

pub struct KilogClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl KilogClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    /// Send a request and return the status with the decoded JSON body
    /// (`Null` when empty, a JSON string when not JSON).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, value))
    }

    async fn expect<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        what: &str,
    ) -> Result<T> {
        let (status, value) = self.request(method, path, body).await?;
        if !status.is_success() {
            anyhow::bail!("{} failed with {}: {}", what, status, value);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn health(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await?;
        Ok(response.text().await?)
    }

    pub async fn metrics_text(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await?;
        Ok(response.text().await?)
    }

    pub async fn me(&self) -> Result<UserResponse> {
        self.expect(Method::GET, "/users/me", None, "Get current user").await
    }

    pub async fn list_exercises(&self, search: Option<&str>) -> Result<Vec<Exercise>> {
        let path = match search {
            Some(term) => format!("/exercises?search={term}"),
            None => "/exercises".to_string(),
        };
        self.expect(Method::GET, &path, None, "List exercises").await
    }

    pub async fn create_exercise(&self, request: &CreateExerciseRequest) -> Result<Exercise> {
        let body = serde_json::to_value(request)?;
        self.expect(Method::POST, "/exercises", Some(&body), "Create exercise")
            .await
    }

    pub async fn create_workout(&self, request: &CreateWorkoutRequest) -> Result<WorkoutResponse> {
        let body = serde_json::to_value(request)?;
        self.expect(Method::POST, "/workouts", Some(&body), "Create workout")
            .await
    }

    pub async fn get_workout(&self, id: i64) -> Result<WorkoutResponse> {
        self.expect(Method::GET, &format!("/workouts/{id}"), None, "Get workout")
            .await
    }

    pub async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>> {
        self.expect(Method::GET, "/workouts", None, "List workouts").await
    }

    /// POST a signed identity-provider event.
    pub async fn deliver_webhook(&self, secret: &str, event: &Value) -> Result<(StatusCode, Value)> {
        let body = event.to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let msg_id = format!("msg_{timestamp}");
        let signature = sign_webhook(secret, &msg_id, timestamp, &body)?;

        let response = self
            .client
            .post(format!("{}/webhooks/clerk", self.base_url))
            .header("content-type", "application/json")
            .header("svix-id", msg_id)
            .header("svix-timestamp", timestamp.to_string())
            .header("svix-signature", signature)
            .body(body)
            .send()
            .await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }
}
