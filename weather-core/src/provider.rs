use crate::{Config, LookupError, WeatherResult, provider::weatherapi::WeatherApiClient};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod weatherapi;

/// A source of current weather conditions.
///
/// Implementations must be safe to share between concurrently running commands.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Looks up current conditions for an already normalized, non-empty location.
    async fn lookup(&self, location: &str) -> Result<WeatherResult, LookupError>;
}

/// Construct the WeatherAPI.com provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let client = WeatherApiClient::from_config(config)?;
    Ok(Arc::new(client))
}
