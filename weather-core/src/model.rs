use chrono::{DateTime, Utc};

/// Current conditions for one resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResult {
    pub location: String,
    pub country: String,
    pub temp_c: f64,
    pub condition: String,
    /// Absolute icon URL, ready to be used as an image thumbnail.
    pub icon_url: String,
    pub observed_at: Option<DateTime<Utc>>,
}
