//! Serving-side visibility predictor

use super::config::InferenceConfig;
use super::features::{FeatureVector, MILES_TO_METERS};
use super::observation::WeatherObservation;
use super::weather::{OpenWeatherClient, WeatherSource};
use crate::contract::{feature_names, matches_feature_order};
use crate::error::{Result, VisibilityError};
use crate::training::ModelArtifact;
use crate::transformation::StandardScaler;
use ndarray::Array2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Scaler and model loaded together; never modified after load
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub scaler: StandardScaler,
    pub model: ModelArtifact,
}

impl LoadedArtifacts {
    /// Load both artifacts and check they agree on the serving feature order
    pub fn load(config: &InferenceConfig) -> Result<Self> {
        let scaler = StandardScaler::load(&config.scaler_path)?;
        let model = ModelArtifact::load(&config.model_path)?;

        if !matches_feature_order(scaler.feature_names()) {
            return Err(VisibilityError::artifact(
                &config.scaler_path,
                format!(
                    "scaler features {:?} differ from serving order {:?}",
                    scaler.feature_names(),
                    feature_names()
                ),
            ));
        }
        if model.feature_names != scaler.feature_names() {
            return Err(VisibilityError::artifact(
                &config.model_path,
                format!(
                    "model features {:?} differ from scaler features {:?}",
                    model.feature_names,
                    scaler.feature_names()
                ),
            ));
        }
        Ok(Self { scaler, model })
    }

    /// Scale, predict (miles), convert to meters, take the magnitude, round to 0.1
    pub fn predict_meters(&self, features: &FeatureVector) -> Result<f64> {
        let scaled = self.scaler.transform_row(features.as_slice())?;
        let x = Array2::from_shape_vec((1, scaled.len()), scaled.to_vec())?;
        let miles = self.model.model.predict(&x)?;
        let miles = miles
            .first()
            .copied()
            .ok_or_else(|| VisibilityError::InferenceDegraded("model returned no output".to_string()))?;
        if !miles.is_finite() {
            return Err(VisibilityError::InferenceDegraded(format!(
                "model returned non-finite output {}",
                miles
            )));
        }
        Ok(round_one_decimal((miles * MILES_TO_METERS).abs()))
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone)]
enum PredictorState {
    Uninitialized,
    Ready(Arc<LoadedArtifacts>),
    Degraded(String),
}

/// Lifecycle state of a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictorStatus {
    Uninitialized,
    Ready,
    Degraded,
}

/// Outcome of a prediction request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredictionResult {
    /// Visibility in meters
    Visibility(f64),
    /// The configured fallback, returned when prediction could not complete
    Fallback(f64),
}

impl PredictionResult {
    pub fn value(&self) -> f64 {
        match self {
            PredictionResult::Visibility(v) | PredictionResult::Fallback(v) => *v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PredictionResult::Fallback(_))
    }
}

/// Shared predictor for concurrent serving.
///
/// Readers take a snapshot `Arc` of the loaded pair under a short read lock,
/// so a reload swaps scaler and model together and never blocks on in-flight
/// predictions. An uninitialized predictor loads lazily on first use; once
/// degraded it stays degraded until [`VisibilityPredictor::reload`] succeeds.
#[derive(Debug)]
pub struct VisibilityPredictor {
    config: InferenceConfig,
    state: RwLock<PredictorState>,
}

impl VisibilityPredictor {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            state: RwLock::new(PredictorState::Uninitialized),
        }
    }

    /// Create and load immediately; a load failure leaves the predictor degraded
    pub fn load(config: InferenceConfig) -> Self {
        let predictor = Self::new(config);
        // failure is recorded in the state
        let _ = predictor.reload();
        predictor
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn status(&self) -> PredictorStatus {
        match &*self.state.read() {
            PredictorState::Uninitialized => PredictorStatus::Uninitialized,
            PredictorState::Ready(_) => PredictorStatus::Ready,
            PredictorState::Degraded(_) => PredictorStatus::Degraded,
        }
    }

    pub fn degraded_reason(&self) -> Option<String> {
        match &*self.state.read() {
            PredictorState::Degraded(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Load a fresh artifact pair and swap it in atomically.
    ///
    /// On failure the predictor becomes degraded, even if it was ready.
    pub fn reload(&self) -> Result<()> {
        match LoadedArtifacts::load(&self.config) {
            Ok(loaded) => {
                info!(
                    model = %loaded.model.model_name,
                    created_at = %loaded.model.created_at,
                    scaler = %self.config.scaler_path.display(),
                    "Inference artifacts loaded"
                );
                *self.state.write() = PredictorState::Ready(Arc::new(loaded));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Inference artifacts unavailable, predictor degraded");
                *self.state.write() = PredictorState::Degraded(err.to_string());
                Err(err)
            }
        }
    }

    fn snapshot(&self) -> Result<Arc<LoadedArtifacts>> {
        let current = self.state.read().clone();
        match current {
            PredictorState::Ready(loaded) => Ok(loaded),
            PredictorState::Degraded(reason) => Err(VisibilityError::InferenceDegraded(reason)),
            PredictorState::Uninitialized => {
                self.reload()?;
                self.snapshot()
            }
        }
    }

    /// Prediction in meters, surfacing the failure cause
    pub fn try_predict(&self, observation: &WeatherObservation) -> Result<f64> {
        let loaded = self.snapshot()?;
        let features = FeatureVector::from_observation(observation)?;
        loaded.predict_meters(&features)
    }

    /// Prediction in meters; any failure is logged and yields the fallback
    pub fn predict(&self, observation: &WeatherObservation) -> PredictionResult {
        match self.try_predict(observation) {
            Ok(meters) => PredictionResult::Visibility(meters),
            Err(err) => self.fallback(&err),
        }
    }

    /// Predict from a raw observation document; malformed JSON yields the fallback
    pub fn predict_json(&self, json: &str) -> PredictionResult {
        match WeatherObservation::from_json(json) {
            Ok(observation) => self.predict(&observation),
            Err(err) => self.fallback(&err),
        }
    }

    fn fallback(&self, err: &VisibilityError) -> PredictionResult {
        warn!(error = %err, fallback = self.config.fallback, "Prediction fell back");
        PredictionResult::Fallback(self.config.fallback)
    }

    /// Fetch current conditions for a location and predict from them
    pub async fn predict_for_location(
        &self,
        source: &dyn WeatherSource,
        lat: f64,
        lon: f64,
    ) -> PredictionResult {
        match source.current(lat, lon).await {
            Ok(observation) => self.predict(&observation),
            Err(err) => {
                warn!(error = %err, lat, lon, fallback = self.config.fallback, "Weather fetch failed");
                PredictionResult::Fallback(self.config.fallback)
            }
        }
    }

    /// Predict for a location through OpenWeather, keyed from the environment.
    ///
    /// A missing or unusable API key yields the fallback.
    pub async fn predict_from_openweather(&self, lat: f64, lon: f64) -> PredictionResult {
        match OpenWeatherClient::from_env() {
            Ok(client) => self.predict_for_location(&client, lat, lon).await,
            Err(err) => {
                warn!(error = %err, lat, lon, fallback = self.config.fallback, "Weather client unavailable");
                PredictionResult::Fallback(self.config.fallback)
            }
        }
    }
}
