//! Live weather observation as delivered by the weather source

use crate::error::{Result, VisibilityError};
use serde::{Deserialize, Serialize};

/// `main` block of a current-conditions response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainReading {
    /// Kelvin
    pub temp: Option<f64>,
    /// Percent
    pub humidity: Option<f64>,
    /// Sea-level pressure, hPa
    pub sea_level: Option<f64>,
}

/// `wind` block of a current-conditions response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    /// m/s
    pub speed: Option<f64>,
    /// Degrees
    pub deg: Option<f64>,
}

/// Current conditions at one location.
///
/// Fields are optional on the wire; [`WeatherObservation::validated`] decides
/// whether the observation is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    #[serde(default)]
    pub main: MainReading,
    #[serde(default)]
    pub wind: WindReading,
}

/// Required fields of an observation, checked and in provider units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidReading {
    pub temp_kelvin: f64,
    pub humidity_pct: f64,
    pub wind_speed_mps: f64,
    pub wind_deg: f64,
    pub sea_level_hpa: f64,
}

fn required(value: Option<f64>, field: &str) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(VisibilityError::InferenceDegraded(format!(
            "observation field {} is not finite ({})",
            field, v
        ))),
        None => Err(VisibilityError::InferenceDegraded(format!(
            "observation field {} is missing",
            field
        ))),
    }
}

fn in_range(value: f64, field: &str, lo: f64, hi: f64) -> Result<f64> {
    if (lo..=hi).contains(&value) {
        Ok(value)
    } else {
        Err(VisibilityError::InferenceDegraded(format!(
            "observation field {} = {} outside [{}, {}]",
            field, value, lo, hi
        )))
    }
}

impl WeatherObservation {
    pub fn new(temp_kelvin: f64, humidity: f64, wind_speed: f64, wind_deg: f64, sea_level: Option<f64>) -> Self {
        Self {
            main: MainReading {
                temp: Some(temp_kelvin),
                humidity: Some(humidity),
                sea_level,
            },
            wind: WindReading {
                speed: Some(wind_speed),
                deg: Some(wind_deg),
            },
        }
    }

    /// Parse a provider JSON document; unknown fields are ignored
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            VisibilityError::InferenceDegraded(format!("malformed observation: {}", e))
        })
    }

    /// Check required fields; a missing sea-level pressure reads as 0 hPa
    pub fn validated(&self) -> Result<ValidReading> {
        let temp_kelvin = in_range(required(self.main.temp, "main.temp")?, "main.temp", 0.0, 400.0)?;
        let humidity_pct = in_range(
            required(self.main.humidity, "main.humidity")?,
            "main.humidity",
            0.0,
            100.0,
        )?;
        let wind_speed_mps = in_range(required(self.wind.speed, "wind.speed")?, "wind.speed", 0.0, 150.0)?;
        let wind_deg = in_range(required(self.wind.deg, "wind.deg")?, "wind.deg", 0.0, 360.0)?;
        let sea_level_hpa = match self.main.sea_level {
            None => 0.0,
            Some(_) => required(self.main.sea_level, "main.sea_level")?,
        };

        Ok(ValidReading {
            temp_kelvin,
            humidity_pct,
            wind_speed_mps,
            wind_deg,
            sea_level_hpa,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_document() {
        let obs = WeatherObservation::from_json(
            r#"{"coord":{"lon":-0.13,"lat":51.51},
                "main":{"temp":281.4,"pressure":1012,"humidity":81,"sea_level":1012},
                "wind":{"speed":4.1,"deg":80},"name":"London"}"#,
        )
        .unwrap();
        let reading = obs.validated().unwrap();
        assert_eq!(reading.temp_kelvin, 281.4);
        assert_eq!(reading.humidity_pct, 81.0);
        assert_eq!(reading.sea_level_hpa, 1012.0);
    }

    #[test]
    fn test_missing_sea_level_defaults_to_zero() {
        let obs = WeatherObservation::new(280.0, 50.0, 1.0, 10.0, None);
        assert_eq!(obs.validated().unwrap().sea_level_hpa, 0.0);
    }

    #[test]
    fn test_missing_required_field() {
        let obs = WeatherObservation::from_json(r#"{"main":{"temp":281.4},"wind":{"speed":1,"deg":2}}"#).unwrap();
        let err = obs.validated().unwrap_err();
        assert!(matches!(err, VisibilityError::InferenceDegraded(_)));
        assert!(err.to_string().contains("main.humidity"));
    }

    #[test]
    fn test_out_of_range_and_malformed() {
        let obs = WeatherObservation::new(280.0, 140.0, 1.0, 10.0, Some(1000.0));
        assert!(obs.validated().is_err());

        let obs = WeatherObservation::new(f64::NAN, 40.0, 1.0, 10.0, None);
        assert!(obs.validated().is_err());

        assert!(WeatherObservation::from_json("{\"main\": 3}").is_err());
    }
}
