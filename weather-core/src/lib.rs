//! Core library for the `weather` chat bot.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Location input cleanup
//! - The WeatherAPI.com lookup client behind the `WeatherProvider` seam
//! - Command dispatch and reply rendering, independent of any chat platform
//!
//! It is used by `weather-bot`, but can also be reused by other binaries or services.

pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod render;

pub use command::{CommandHandler, Dispatcher, WeatherCommand};
pub use config::{Config, FileConfig};
pub use error::{CommandError, LookupError};
pub use model::WeatherResult;
pub use normalize::normalize;
pub use provider::{WeatherProvider, weatherapi::WeatherApiClient};
pub use render::{Reply, WeatherEmbed};
