use std::{fmt::Debug, path::Path};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{
    endpoint::Endpoint,
    error::WeatherKitError,
    model::{WeatherKitRequest, WeatherReport},
    token,
};

/// Anything able to answer a WeatherKit request with a raw JSON report.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, request: &WeatherKitRequest) -> Result<WeatherReport, WeatherKitError>;
}

/// Apple WeatherKit REST API over `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct AppleWeatherKit {
    http: Client,
    endpoint: Endpoint,
}

impl AppleWeatherKit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        Self { http: Client::new(), endpoint }
    }
}

#[async_trait]
impl WeatherProvider for AppleWeatherKit {
    async fn fetch(&self, request: &WeatherKitRequest) -> Result<WeatherReport, WeatherKitError> {
        let key_path = request.key_path.as_deref().ok_or(WeatherKitError::KeyPathMissing)?;
        let key = read_private_key(key_path).await?;

        let token = token::sign(request, &key, Utc::now())?;
        let url = self.endpoint.weather_url(request)?;

        debug!(%url, "requesting WeatherKit report");

        let res = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(WeatherKitError::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherKitError::Transport)?;

        if status != StatusCode::OK {
            return Err(WeatherKitError::Status { status, body: truncate_body(&body) });
        }

        match serde_json::from_str::<Value>(&body).map_err(WeatherKitError::Parse)? {
            Value::Object(report) => Ok(report),
            _ => Err(WeatherKitError::NotAnObject),
        }
    }
}

async fn read_private_key(path: &Path) -> Result<Vec<u8>, WeatherKitError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| WeatherKitError::KeyFile { path: path.to_path_buf(), source })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
