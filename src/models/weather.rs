use chrono::NaiveDate;
use serde::Serialize;

/// One-day forecast summary for a coordinate. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub date: NaiveDate,
    /// Degrees Celsius, averaged over the day's hourly samples.
    pub temperature: f64,
    pub condition: String,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// Peak wind speed in m/s.
    pub wind_speed: f64,
}
