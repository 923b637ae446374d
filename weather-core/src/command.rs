//! Prefix command parsing and dispatch.
//!
//! Nothing here knows about a particular chat platform: an adapter feeds raw
//! message text into [`Dispatcher::dispatch`] and sends back whatever [`Reply`]
//! comes out.

use async_trait::async_trait;
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};
use tracing::{debug, info};

use crate::{CommandError, Reply, WeatherProvider, WeatherResult, normalize};

/// Name of the built-in command listing every registered command.
pub const HELP_COMMAND: &str = "help";

/// A command name and its free-text argument, split out of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Splits `<prefix><name> <args>` into its parts.
///
/// Returns `None` when the message does not start with `prefix` or there is no
/// name right after it (`"! weather"` is not a command).
pub fn parse_invocation<'a>(content: &'a str, prefix: &str) -> Option<Invocation<'a>> {
    let rest = content.strip_prefix(prefix)?;
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (name, args) = rest.split_at(name_end);

    if name.is_empty() {
        return None;
    }

    Some(Invocation { name, args: args.trim() })
}

#[async_trait]
pub trait CommandHandler: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// One line shown by `help`.
    fn description(&self) -> &str;

    async fn handle(&self, args: &str) -> Reply;
}

/// Routes prefixed messages to registered handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    prefix: String,
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), handlers: BTreeMap::new() }
    }

    /// Registers a handler under its own name, replacing any previous one.
    pub fn register(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `content` looks like a command for this dispatcher at all.
    pub fn is_command(&self, content: &str) -> bool {
        parse_invocation(content, &self.prefix).is_some()
    }

    /// Runs the command in `content`, if any. `None` means "stay silent".
    pub async fn dispatch(&self, content: &str) -> Option<Reply> {
        let invocation = parse_invocation(content, &self.prefix)?;

        match self.handlers.get(invocation.name) {
            Some(handler) => {
                debug!(command = invocation.name, "dispatching command");
                Some(handler.handle(invocation.args).await)
            }
            None if invocation.name == HELP_COMMAND => Some(Reply::Text(self.help_text())),
            None => {
                debug!(command = invocation.name, "ignoring unknown command");
                None
            }
        }
    }

    pub fn help_text(&self) -> String {
        let mut out = String::from("Commands:");
        for handler in self.handlers.values() {
            let line = format!("\n{}{} - {}", self.prefix, handler.name(), handler.description());
            out.push_str(&line);
        }
        out.push_str(&format!("\n{}{HELP_COMMAND} - Show this message", self.prefix));
        out
    }
}

/// `<prefix>weather <location>`: clean the location, look it up, render the outcome.
#[derive(Debug, Clone)]
pub struct WeatherCommand {
    provider: Arc<dyn WeatherProvider>,
    prefix: String,
    name: String,
}

impl WeatherCommand {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        prefix: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { provider, prefix: prefix.into(), name: name.into() }
    }

    /// Empty input after cleanup is rejected here, before any network call.
    pub async fn run(&self, raw: &str) -> Result<WeatherResult, CommandError> {
        let location = normalize(raw);
        if location.is_empty() {
            return Err(CommandError::EmptyInput {
                prefix: self.prefix.clone(),
                command: self.name.clone(),
            });
        }

        info!(%location, "looking up weather");
        Ok(self.provider.lookup(&location).await?)
    }
}

#[async_trait]
impl CommandHandler for WeatherCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Show current weather for a city"
    }

    async fn handle(&self, args: &str) -> Reply {
        Reply::from(self.run(args).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LookupError;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct FakeProvider {
        outcome: Result<WeatherResult, LookupError>,
        calls: AtomicUsize,
        last_location: Mutex<Option<String>>,
    }

    impl FakeProvider {
        fn returning(outcome: Result<WeatherResult, LookupError>) -> Arc<Self> {
            Arc::new(Self { outcome, calls: AtomicUsize::new(0), last_location: Mutex::new(None) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn lookup(&self, location: &str) -> Result<WeatherResult, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_location.lock().unwrap() = Some(location.to_string());
            self.outcome.clone()
        }
    }

    fn london() -> WeatherResult {
        WeatherResult {
            location: "London".into(),
            country: "UK".into(),
            temp_c: 15.0,
            condition: "Cloudy".into(),
            icon_url: "http://x/icon.png".into(),
            observed_at: None,
        }
    }

    fn dispatcher(provider: Arc<FakeProvider>) -> Dispatcher {
        Dispatcher::new("!").register(Arc::new(WeatherCommand::new(provider, "!", "weather")))
    }

    #[test]
    fn parses_name_and_trimmed_args() {
        let inv = parse_invocation("!weather   New York  ", "!").unwrap();
        assert_eq!(inv, Invocation { name: "weather", args: "New York" });

        let inv = parse_invocation("!weather", "!").unwrap();
        assert_eq!(inv, Invocation { name: "weather", args: "" });
    }

    #[test]
    fn rejects_messages_without_prefix_or_name() {
        assert_eq!(parse_invocation("weather London", "!"), None);
        assert_eq!(parse_invocation("! weather London", "!"), None);
        assert_eq!(parse_invocation("!", "!"), None);
    }

    #[test]
    fn supports_multi_char_prefix() {
        let inv = parse_invocation("wx!weather Oslo", "wx!").unwrap();
        assert_eq!(inv, Invocation { name: "weather", args: "Oslo" });
    }

    #[tokio::test]
    async fn successful_lookup_renders_embed() {
        let provider = FakeProvider::returning(Ok(london()));
        let reply = dispatcher(provider.clone()).dispatch("!weather London!!").await;

        match reply {
            Some(Reply::Embed(embed)) => assert_eq!(embed.title, "Weather in London, UK"),
            other => panic!("expected embed, got {other:?}"),
        }
        assert_eq!(provider.last_location.lock().unwrap().as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn empty_location_is_rejected_without_lookup() {
        let provider = FakeProvider::returning(Ok(london()));
        let d = dispatcher(provider.clone());

        for msg in ["!weather", "!weather   ", "!weather 12345 !!"] {
            let reply = d.dispatch(msg).await;
            assert_eq!(
                reply,
                Some(Reply::Text("❌ Please enter a city name, e.g., !weather London".into()))
            );
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn lookup_errors_are_shown_as_text() {
        let provider = FakeProvider::returning(Err(LookupError::NotFound));
        let reply = dispatcher(provider.clone()).dispatch("!weather Atlantis").await;

        assert_eq!(reply, Some(Reply::Text("City not found. Please check the spelling.".into())));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_commands_and_plain_chat_stay_silent() {
        let provider = FakeProvider::returning(Ok(london()));
        let d = dispatcher(provider.clone());

        assert_eq!(d.dispatch("!forecast London").await, None);
        assert_eq!(d.dispatch("what's the weather?").await, None);
        assert_eq!(d.dispatch("!Weather London").await, None);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn help_lists_registered_commands() {
        let d = dispatcher(FakeProvider::returning(Ok(london())));

        let Some(Reply::Text(text)) = d.dispatch("!help").await else {
            panic!("help should reply with text");
        };
        assert!(text.contains("!weather - Show current weather for a city"));
        assert!(text.contains("!help"));
    }

    #[test]
    fn is_command_checks_prefix_and_name() {
        let d = Dispatcher::new("!");
        assert!(d.is_command("!anything"));
        assert!(!d.is_command("hello"));
    }
}
