use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::{
    Client,
    header::{AUTHORIZATION, USER_AGENT},
};
use serde::Serialize;
use tracing::debug;
use weather_core::{Reply, WeatherEmbed};

const BOT_USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/weather-task/weather-bot, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Posts replies through the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordRest {
    http: Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest").field("api_url", &self.api_url).finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    thumbnail: Thumbnail,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct Thumbnail {
    url: String,
}

impl From<&WeatherEmbed> for Embed {
    fn from(embed: &WeatherEmbed) -> Self {
        Self {
            title: embed.title.clone(),
            description: embed.description.clone(),
            color: embed.color,
            thumbnail: Thumbnail { url: embed.thumbnail_url.clone() },
            timestamp: embed.timestamp,
        }
    }
}

impl From<&Reply> for CreateMessage {
    fn from(reply: &Reply) -> Self {
        match reply {
            Reply::Embed(embed) => Self { content: None, embeds: vec![Embed::from(embed)] },
            Reply::Text(text) => Self { content: Some(text.clone()), embeds: Vec::new() },
        }
    }
}

impl DiscordRest {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub async fn send_reply(&self, channel_id: &str, reply: &Reply) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_url);
        debug!(%url, "sending reply");

        let res = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(USER_AGENT, BOT_USER_AGENT)
            .json(&CreateMessage::from(reply))
            .send()
            .await
            .with_context(|| format!("Failed to send message to Discord channel {channel_id}"))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Discord rejected message for channel {channel_id} with status {status}: {body}");
        }

        Ok(())
    }
}
