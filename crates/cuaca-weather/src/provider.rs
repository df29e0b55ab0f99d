//! Forecast providers: the trait the store depends on, and the BMKG client.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use cuaca_core::ApiConfig;

use crate::types::{ForecastResponse, WeatherError};

const USER_AGENT: &str = concat!("cuaca/", env!("CARGO_PKG_VERSION"));

/// Source of forecasts for a coordinate.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn get_forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, WeatherError>;
}

/// HTTP client for the BMKG public forecast endpoint.
#[derive(Debug, Clone)]
pub struct BmkgProvider {
    client: Arc<Client>,
    base_url: String,
}

impl BmkgProvider {
    pub fn new(api: &ApiConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: api.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ForecastProvider for BmkgProvider {
    #[instrument(skip(self), level = "info")]
    async fn get_forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!("Forecast request returned status {}", status);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let forecast: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Parse(e.to_string()))?;

        tracing::debug!("Received {} forecast entries", forecast.data.len());
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> BmkgProvider {
        BmkgProvider::new(&ApiConfig {
            base_url: format!("{}/forecast", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_sends_coordinates_as_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("lat", "-6.1754"))
            .and(query_param("lon", "106.8272"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "lokasi": {"lat": -6.1754, "lon": 106.8272},
                "data": []
            })))
            .mount(&server)
            .await;

        let response = provider_for(&server)
            .get_forecast(-6.1754, 106.8272)
            .await
            .unwrap();
        assert!(response.data.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = provider_for(&server).get_forecast(0.0, 0.0).await.unwrap_err();
        match err {
            WeatherError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_body_maps_to_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = provider_for(&server).get_forecast(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }
}
