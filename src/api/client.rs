//! Detection API Client
//!
//! HTTP client for the remote detection service. Every call is a single
//! attempt: no retry, no backoff. Non-2xx responses become [`ApiError::Api`]
//! carrying the body's `detail` message or a per-operation fallback.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::dto::{
    BatchRequest, DatasetInfo, DetectionResult, LoginResponse, MonitorReport, RegisterRequest,
    SampleBatch, StreamPacket, MAX_RANDOM_SAMPLES,
};
use super::error::{extract_detail, ApiError, ApiResult};
use super::forms;
use crate::config::ApiConfig;
use crate::monitor::MonitorParams;

/// Detection API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the configured base URL
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and return the response if its status is 2xx
    async fn execute(
        &self,
        request: RequestBuilder,
        path: &str,
        fallback: &str,
    ) -> ApiResult<Response> {
        tracing::debug!(path = %path, "Sending request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(path = %path, error = %e, "Request failed to send");
            ApiError::Network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_detail(&body).unwrap_or_else(|| fallback.to_string());

        tracing::warn!(
            path = %path,
            status = status.as_u16(),
            message = %message,
            "API returned an error"
        );

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `POST /auth/login` with form fields `username` and `password`
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        forms::validate_login(email, password)?;

        let path = "/auth/login";
        let request = self
            .client
            .post(self.url(path))
            .form(&[("username", email), ("password", password)]);

        let response = self.execute(request, path, "Login failed").await?;
        let body: Value = Self::decode(response).await?;

        match body.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => serde_json::from_value(body)
                .map_err(|e| ApiError::Decode(e.to_string())),
            _ => Err(ApiError::Api {
                status: 200,
                message: "Invalid response from server".to_string(),
            }),
        }
    }

    /// `POST /auth/register`; the success payload is returned untouched
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Value> {
        forms::validate_registration(request)?;

        let path = "/auth/register";
        let builder = self.client.post(self.url(path)).json(request);

        let response = self.execute(builder, path, "Registration failed").await?;
        Self::decode(response).await
    }

    /// `POST /detect/batch`
    pub async fn run_batch_detection(
        &self,
        token: Option<&str>,
        request: &BatchRequest,
    ) -> ApiResult<DetectionResult> {
        request.validate()?;

        let path = "/detect/batch";
        let builder = Self::authorize(self.client.post(self.url(path)), token).json(request);

        let response = self.execute(builder, path, "Detection failed").await?;
        let body: Value = Self::decode(response).await?;
        let result =
            DetectionResult::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;

        tracing::info!(
            samples = result.predictions.len(),
            model = %request.model_type,
            "Batch detection completed"
        );
        Ok(result)
    }

    /// `POST /monitor/start`. Requires a token; a 401 means the session expired.
    pub async fn start_monitoring(
        &self,
        token: Option<&str>,
        params: &MonitorParams,
    ) -> ApiResult<MonitorReport> {
        let token = token.ok_or(ApiError::MissingToken)?;
        params.validate()?;

        let path = "/monitor/start";
        let builder = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .query(&[
                ("duration", params.duration.to_string()),
                ("interval", params.interval.to_string()),
                ("alert_threshold", params.alert_threshold.to_string()),
            ]);

        let response = match self.execute(builder, path, "Monitoring failed").await {
            Err(ApiError::Api { status: 401, .. }) => return Err(ApiError::SessionExpired),
            other => other?,
        };
        Self::decode(response).await
    }

    /// `GET /monitor/stream`: one freshly classified packet
    pub async fn stream_packet(&self, token: Option<&str>) -> ApiResult<StreamPacket> {
        let path = "/monitor/stream";
        let builder = Self::authorize(self.client.get(self.url(path)), token);

        let response = match self.execute(builder, path, "Stream request failed").await {
            Err(ApiError::Api { status, .. }) => {
                return Err(ApiError::Api {
                    status,
                    message: "Stream request failed".to_string(),
                })
            }
            other => other?,
        };
        Self::decode(response).await
    }

    /// `GET /samples/info`
    pub async fn dataset_info(&self, token: Option<&str>) -> ApiResult<DatasetInfo> {
        let path = "/samples/info";
        let builder = Self::authorize(self.client.get(self.url(path)), token);

        let response = self
            .execute(builder, path, "Failed to fetch dataset info")
            .await?;
        Self::decode(response).await
    }

    /// `GET /samples/random?n&balanced`
    pub async fn random_samples(
        &self,
        token: Option<&str>,
        n: u32,
        balanced: bool,
    ) -> ApiResult<SampleBatch> {
        if !(1..=MAX_RANDOM_SAMPLES).contains(&n) {
            return Err(ApiError::Validation(format!(
                "Sample count must be between 1 and {}",
                MAX_RANDOM_SAMPLES
            )));
        }

        let path = "/samples/random";
        let builder = Self::authorize(self.client.get(self.url(path)), token)
            .query(&[("n", n.to_string()), ("balanced", balanced.to_string())]);

        let response = self
            .execute(builder, path, "Failed to fetch samples")
            .await?;
        Self::decode(response).await
    }
}
