//! Weather observations and forecasts served by the CIS backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::request::RequestOptions;

pub const MAX_FORECAST_DAYS: u8 = 16;

/// Weather condition categories as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Thunderstorm,
    #[serde(other)]
    Unknown,
}

impl WeatherCondition {
    /// Translation key for the condition label
    pub fn i18n_key(&self) -> &'static str {
        match self {
            Self::Clear => "weather.conditions.clear",
            Self::PartlyCloudy => "weather.conditions.partly_cloudy",
            Self::Cloudy => "weather.conditions.cloudy",
            Self::Fog => "weather.conditions.fog",
            Self::Drizzle => "weather.conditions.drizzle",
            Self::Rain => "weather.conditions.rain",
            Self::HeavyRain => "weather.conditions.heavy_rain",
            Self::Thunderstorm => "weather.conditions.thunderstorm",
            Self::Unknown => "weather.conditions.unknown",
        }
    }

    /// Conditions that warrant an alert to farmers
    pub fn is_severe(&self) -> bool {
        matches!(self, Self::HeavyRain | Self::Thunderstorm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location_id: i64,
    pub temperature_c: f64,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
    #[serde(default)]
    pub wind_speed_kmh: Option<f64>,
    #[serde(default)]
    pub condition: WeatherCondition,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    #[serde(default)]
    pub rainfall_mm: Option<f64>,
    /// Probability of precipitation, 0-100
    #[serde(default)]
    pub rain_probability: Option<f64>,
    #[serde(default)]
    pub condition: WeatherCondition,
}

impl ApiClient {
    pub async fn current_weather(&self, location_id: i64) -> Result<WeatherObservation, ApiError> {
        self.get_with(
            "/weather/current",
            RequestOptions::new().query("location_id", location_id),
        )
        .await
    }

    /// Daily forecast for up to `MAX_FORECAST_DAYS` days.
    pub async fn forecast(&self, location_id: i64, days: u8) -> Result<Vec<ForecastDay>, ApiError> {
        if days == 0 || days > MAX_FORECAST_DAYS {
            return Err(ApiError::InvalidRequest(format!(
                "Forecast length must be between 1 and {} days",
                MAX_FORECAST_DAYS
            )));
        }

        self.get_with(
            "/weather/forecast",
            RequestOptions::new()
                .query("location_id", location_id)
                .query("days", days),
        )
        .await
    }
}
