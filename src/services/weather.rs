use std::sync::Arc;

use chrono::NaiveDate;

use crate::{error::AppError, models::weather::WeatherReport};

/// Open-Meteo forecast client. The base URL is configurable so tests can
/// point it at a mock server.
#[derive(Clone)]
pub struct WeatherService {
    client: reqwest::Client,
    base_url: Arc<String>,
}

impl WeatherService {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: Arc::new(base_url),
        }
    }

    /// Fetches the hourly forecast and condenses the requested day into a
    /// single report: mean temperature and humidity, peak wind, worst
    /// weather code.
    pub async fn daily_report(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
    ) -> Result<WeatherReport, AppError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "hourly",
                    "temperature_2m,relativehumidity_2m,windspeed_10m,weathercode".to_string(),
                ),
                ("timezone", "UTC".to_string()),
                ("forecast_days", "16".to_string()),
                ("wind_speed_unit", "ms".to_string()),
            ])
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("weather request failed: {err}")))?;
        let response = response
            .error_for_status()
            .map_err(|err| AppError::Upstream(format!("weather provider returned {err}")))?;
        let forecast: openmeteo::ForecastResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("invalid weather response: {err}")))?;

        let hourly = forecast
            .hourly
            .ok_or_else(|| AppError::Upstream("weather response had no hourly data".into()))?;

        let day_prefix = date.format("%Y-%m-%d").to_string();
        let mut temperatures = Vec::new();
        let mut humidities = Vec::new();
        let mut wind_peak = 0.0_f64;
        let mut worst_code = None::<u8>;
        for (index, time) in hourly.time.iter().enumerate() {
            if !time.starts_with(&day_prefix) {
                continue;
            }
            if let Some(temp) = hourly.temperature.get(index) {
                temperatures.push(*temp);
            }
            if let Some(humidity) = hourly.humidity.get(index) {
                humidities.push(*humidity);
            }
            if let Some(wind) = hourly.wind_speed.get(index) {
                wind_peak = wind_peak.max(*wind);
            }
            if let Some(code) = hourly.weather_code.get(index) {
                worst_code = Some(worst_code.map_or(*code, |prev| prev.max(*code)));
            }
        }

        if temperatures.is_empty() {
            return Err(AppError::BadRequest(
                "no forecast available for the requested date".into(),
            ));
        }

        Ok(WeatherReport {
            location: format!("{latitude},{longitude}"),
            date,
            temperature: mean(&temperatures),
            condition: condition_from_code(worst_code.unwrap_or(0)).to_string(),
            humidity: mean(&humidities),
            wind_speed: wind_peak,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// WMO weather interpretation codes, collapsed to the handful of words the
/// clients display.
pub fn condition_from_code(code: u8) -> &'static str {
    match code {
        0 => "Clear",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 | 80..=82 => "Rain",
        71..=77 | 85 | 86 => "Snow",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}

/// Open-Meteo response structures.
mod openmeteo {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub hourly: Option<HourlyData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        pub time: Vec<String>,
        #[serde(rename = "temperature_2m", default)]
        pub temperature: Vec<f64>,
        #[serde(rename = "relativehumidity_2m", default)]
        pub humidity: Vec<f64>,
        #[serde(rename = "windspeed_10m", default)]
        pub wind_speed: Vec<f64>,
        #[serde(rename = "weathercode", default)]
        pub weather_code: Vec<u8>,
    }
}
