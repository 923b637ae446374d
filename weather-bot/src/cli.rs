use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use weather_core::{
    CommandHandler, Config, Dispatcher, WeatherCommand, WeatherProvider,
    provider::provider_from_config,
};

use crate::discord::{gateway::Gateway, rest::DiscordRest};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-bot", version, about = "Discord weather bot")]
pub struct Cli {
    /// Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to Discord and answer weather commands until Ctrl-C.
    Run,

    /// Look up one location and print the reply the bot would send.
    Lookup {
        /// Location, e.g. "New York".
        #[arg(required = true, num_args = 1..)]
        location: Vec<String>,
    },

    /// Print where the config file is looked up.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Run) {
            Command::Run => run_bot().await,
            Command::Lookup { location } => {
                let config = Config::load()?;
                let provider = provider_from_config(&config)?;
                let command = WeatherCommand::new(provider, &config.prefix, &config.command);

                let reply = command.handle(&location.join(" ")).await;
                println!("{reply}");
                Ok(())
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn run_bot() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let token = config.require_discord_token()?.to_owned();
    let provider = provider_from_config(&config)?;
    info!(?config, "configuration loaded");

    let dispatcher = Arc::new(build_dispatcher(&config, provider));
    let rest = Arc::new(DiscordRest::new(&config.discord_api_url, &token));
    let gateway = Gateway::new(&config.discord_gateway_url, token, dispatcher, rest)?;

    tokio::select! {
        res = gateway.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            Ok(())
        }
    }
}

fn build_dispatcher(config: &Config, provider: Arc<dyn WeatherProvider>) -> Dispatcher {
    let weather = WeatherCommand::new(provider, &config.prefix, &config.command);
    Dispatcher::new(&config.prefix).register(Arc::new(weather))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::FileConfig;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["weather-bot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn lookup_takes_multi_word_location() {
        let cli = Cli::try_parse_from(["weather-bot", "lookup", "New", "York"]).unwrap();
        match cli.command {
            Some(Command::Lookup { location }) => assert_eq!(location, ["New", "York"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lookup_requires_location() {
        assert!(Cli::try_parse_from(["weather-bot", "lookup"]).is_err());
    }

    #[test]
    fn dispatcher_uses_configured_prefix_and_name() {
        let file = FileConfig {
            prefix: Some("?".into()),
            command: Some("wx".into()),
            weather_api_key: Some("KEY".into()),
            ..Default::default()
        };
        let config = Config::from_sources(file, |_| None);
        let provider = provider_from_config(&config).unwrap();

        let dispatcher = build_dispatcher(&config, provider);
        assert_eq!(dispatcher.prefix(), "?");
        assert!(dispatcher.help_text().contains("?wx - "));
    }
}
