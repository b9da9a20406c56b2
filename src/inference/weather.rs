//! Weather-observation source

use super::observation::WeatherObservation;
use crate::error::{Result, VisibilityError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Supplies current conditions for a coordinate
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(&self, lat: f64, lon: f64) -> Result<WeatherObservation>;
}

/// OpenWeather current-conditions client.
///
/// Requests the provider's standard units, so temperatures arrive in Kelvin.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("visibility_ml/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        })
    }

    /// Build a client from the `OPENWEATHER_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| VisibilityError::Config(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(VisibilityError::Validation(format!(
                "coordinates out of range: ({}, {})",
                lat, lon
            )));
        }

        debug!(lat, lon, "Requesting current weather");
        let observation = self
            .client
            .get(self.endpoint())
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<WeatherObservation>()
            .await?;
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = OpenWeatherClient::new("k")
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(client.endpoint(), "http://localhost:9999/data/2.5/weather");
    }

    #[tokio::test]
    async fn test_rejects_bad_coordinates_without_request() {
        let client = OpenWeatherClient::new("k").unwrap();
        assert!(matches!(
            client.current(95.0, 0.0).await,
            Err(VisibilityError::Validation(_))
        ));
    }
}
