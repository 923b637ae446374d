use chrono::{DateTime, Utc};
use std::fmt;

use crate::{CommandError, WeatherResult};

/// Sky blue side bar for weather embeds.
pub const EMBED_COLOR: u32 = 0x87CEEB;

/// Platform-neutral rich reply for a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherEmbed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub thumbnail_url: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<&WeatherResult> for WeatherEmbed {
    fn from(result: &WeatherResult) -> Self {
        Self {
            title: format!("Weather in {}, {}", result.location, result.country),
            // f64 Display keeps provider precision and prints 15.0 as "15".
            description: format!("{}, {}°C", result.condition, result.temp_c),
            color: EMBED_COLOR,
            thumbnail_url: result.icon_url.clone(),
            timestamp: result.observed_at,
        }
    }
}

/// What a command sends back to the chat.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Embed(WeatherEmbed),
    Text(String),
}

impl From<Result<WeatherResult, CommandError>> for Reply {
    fn from(outcome: Result<WeatherResult, CommandError>) -> Self {
        match outcome {
            Ok(result) => Reply::Embed(WeatherEmbed::from(&result)),
            Err(err) => Reply::Text(err.to_string()),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Embed(embed) => {
                writeln!(f, "{}", embed.title)?;
                writeln!(f, "{}", embed.description)?;
                write!(f, "{}", embed.thumbnail_url)
            }
            Reply::Text(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LookupError;

    fn london(temp_c: f64) -> WeatherResult {
        WeatherResult {
            location: "London".into(),
            country: "UK".into(),
            temp_c,
            condition: "Cloudy".into(),
            icon_url: "http://x/icon.png".into(),
            observed_at: None,
        }
    }

    #[test]
    fn embed_has_title_description_and_thumbnail() {
        let embed = WeatherEmbed::from(&london(15.0));

        assert_eq!(embed.title, "Weather in London, UK");
        assert_eq!(embed.description, "Cloudy, 15°C");
        assert_eq!(embed.color, 0x87CEEB);
        assert_eq!(embed.thumbnail_url, "http://x/icon.png");
    }

    #[test]
    fn fractional_and_negative_temperatures_keep_precision() {
        assert_eq!(WeatherEmbed::from(&london(-2.5)).description, "Cloudy, -2.5°C");
        assert_eq!(WeatherEmbed::from(&london(0.0)).description, "Cloudy, 0°C");
    }

    #[test]
    fn errors_become_plain_text() {
        let reply = Reply::from(Err(CommandError::from(LookupError::HttpError(500))));
        assert_eq!(reply, Reply::Text("Request error: HTTP 500".into()));
    }

    #[test]
    fn display_renders_embed_lines() {
        let reply = Reply::from(Ok(london(15.0)));
        assert_eq!(reply.to_string(), "Weather in London, UK\nCloudy, 15°C\nhttp://x/icon.png");
    }
}
