//! Live visibility inference
//!
//! - [`observation`] - current-conditions document and its validation
//! - [`features`] - unit conversion into the training feature order
//! - [`weather`] - weather source trait and the OpenWeather client
//! - [`adapter`] - shared predictor with load/reload lifecycle and fallback

mod adapter;
mod config;
pub mod features;
mod observation;
pub mod weather;

pub use adapter::{LoadedArtifacts, PredictionResult, PredictorStatus, VisibilityPredictor};
pub use config::InferenceConfig;
pub use features::FeatureVector;
pub use observation::{MainReading, ValidReading, WeatherObservation, WindReading};
pub use weather::{OpenWeatherClient, WeatherSource};
