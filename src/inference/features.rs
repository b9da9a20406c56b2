//! Observation to feature-vector derivation

use super::observation::WeatherObservation;
use crate::contract::N_FEATURES;
use crate::error::Result;

pub const KELVIN_OFFSET: f64 = 273.15;
pub const MPS_TO_MPH: f64 = 2.23694;
pub const HPA_TO_INHG: f64 = 0.02953;
pub const MILES_TO_METERS: f64 = 1609.34;

pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    (kelvin - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0
}

/// Model input in `FEATURE_ORDER`:
/// `[DRYBULBTEMPF, RelativeHumidity, WindSpeed, WindDirection, SeaLevelPressure]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    pub fn new(values: [f64; N_FEATURES]) -> Self {
        Self(values)
    }

    /// Convert provider units (K, %, m/s, deg, hPa) to the training units
    /// (°F, %, mph, deg, inHg)
    pub fn from_observation(observation: &WeatherObservation) -> Result<Self> {
        let r = observation.validated()?;
        Ok(Self([
            kelvin_to_fahrenheit(r.temp_kelvin),
            r.humidity_pct,
            r.wind_speed_mps * MPS_TO_MPH,
            r.wind_deg,
            r.sea_level_hpa * HPA_TO_INHG,
        ]))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn temperature_f(&self) -> f64 {
        self.0[0]
    }

    pub fn wind_speed_mph(&self) -> f64 {
        self.0[2]
    }

    pub fn pressure_inhg(&self) -> f64 {
        self.0[4]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_observation() {
        let obs = WeatherObservation::new(288.15, 60.0, 3.0, 120.0, Some(1013.0));
        let fv = FeatureVector::from_observation(&obs).unwrap();
        let expected = [59.0, 60.0, 6.71, 120.0, 29.92];
        for (got, want) in fv.as_slice().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 0.01, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_freezing_point() {
        assert!((kelvin_to_fahrenheit(273.15) - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_absent_pressure() {
        let obs = WeatherObservation::new(288.15, 60.0, 3.0, 120.0, None);
        assert_eq!(FeatureVector::from_observation(&obs).unwrap().pressure_inhg(), 0.0);
    }
}
