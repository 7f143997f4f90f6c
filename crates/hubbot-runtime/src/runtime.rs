//! The runtime: builds the bot from configuration and runs it until told to
//! stop.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hubbot_runtime::HubbotRuntime;
//!
//! let runtime = HubbotRuntime::builder()
//!     .config_file("config/hubbot.toml")
//!     .profile("production")
//!     .build()?;
//!
//! runtime.add_handler(MyHandler);
//! runtime.run_ws().await?;
//! ```

use std::future::Future;
use std::path::Path;

use parking_lot::Mutex;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use hubbot_core::{Bot, BoxedHandler, BoxedTransport, Handler};

use crate::config::{ConfigLoader, ConfigResult, HubbotConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the configuration and the handler list, and runs one bot.
///
/// Handlers added before [`run`](Self::run) are installed on the bot in the
/// order they were added. The host constructs its handlers itself; the
/// runtime never discovers them.
pub struct HubbotRuntime {
    config: HubbotConfig,
    handlers: Mutex<Vec<BoxedHandler>>,
    bot: Mutex<Option<Bot>>,
    shutdown: CancellationToken,
}

impl HubbotRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration and initializes
    /// logging from it.
    pub fn from_config(config: &HubbotConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            hub = %config.hub.url,
            bot = %config.bot.name,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            handlers: Mutex::new(Vec::new()),
            bot: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &HubbotConfig {
        &self.config
    }

    /// Queues a handler for the bot and returns the shared instance.
    ///
    /// Once the bot is running, handlers go straight onto its chain.
    pub fn add_handler<H: Handler>(&self, handler: H) -> BoxedHandler {
        let handler: BoxedHandler = std::sync::Arc::new(handler);
        self.add_boxed_handler(handler.clone());
        handler
    }

    /// Queues an already shared handler.
    pub fn add_boxed_handler(&self, handler: BoxedHandler) {
        if let Some(bot) = self.bot.lock().as_ref() {
            bot.add_boxed_handler(handler.clone());
        }
        self.handlers.lock().push(handler);
    }

    /// Number of handlers added so far.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// The bot, once [`run`](Self::run) has built it.
    pub fn bot(&self) -> Option<Bot> {
        self.bot.lock().clone()
    }

    /// A token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Asks a running runtime to shut the bot down.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Runs the bot over `transport` until Ctrl+C, SIGTERM, a lost
    /// connection, or [`stop`](Self::stop).
    pub async fn run(&self, transport: BoxedTransport) -> RuntimeResult<()> {
        info!("Hubbot is now running. Press Ctrl+C to stop.");
        self.run_until(transport, wait_for_signal()).await
    }

    /// Runs the bot over a WebSocket transport configured from `hub`.
    #[cfg(feature = "ws-client")]
    pub async fn run_ws(&self) -> RuntimeResult<()> {
        use hubbot_transport::{WsTransport, WsTransportConfig};

        let config =
            WsTransportConfig::default().with_invoke_timeout(self.config.hub.invoke_timeout());
        self.run(std::sync::Arc::new(WsTransport::new(config))).await
    }

    /// Runs the bot until `shutdown` resolves, the connection is lost, or
    /// [`stop`](Self::stop) is called.
    pub async fn run_until<F>(&self, transport: BoxedTransport, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let bot = self.build_bot(transport);
        let mut disconnects = bot.on_disconnected();

        bot.power_up().await?;
        self.join_configured_rooms(&bot).await;

        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = self.shutdown.cancelled() => info!("Runtime stopped"),
            notice = disconnects.recv() => match notice {
                Ok(notice) => warn!(reason = ?notice.reason, "Hub connection lost"),
                Err(e) => warn!(error = %e, "Disconnect notifications ended"),
            },
        }

        bot.shut_down().await;
        Ok(())
    }

    fn build_bot(&self, transport: BoxedTransport) -> Bot {
        let mut slot = self.bot.lock();
        if let Some(bot) = slot.as_ref() {
            return bot.clone();
        }

        let bot = Bot::new(
            self.config.hub.url.clone(),
            self.config.bot.identity(),
            transport,
        );
        for handler in self.handlers.lock().iter() {
            bot.add_boxed_handler(handler.clone());
        }
        *slot = Some(bot.clone());
        bot
    }

    async fn join_configured_rooms(&self, bot: &Bot) {
        let rooms = &self.config.bot.rooms;
        async {
            for room in rooms {
                match bot.join(room).await {
                    Ok(()) => info!(room = %room, "Joined room"),
                    Err(e) => error!(room = %room, error = %e, "Failed to join room"),
                }
            }
        }
        .instrument(info_span!("auto_join", rooms = rooms.len()))
        .await;
    }
}

/// Waits for Ctrl+C, or SIGTERM on Unix.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c.await;
                info!("Received Ctrl+C, shutting down");
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`HubbotRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder that searches the current directory and the user
    /// config directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new()
                .with_current_dir()
                .with_user_config_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically.
    pub fn merge(mut self, config: HubbotConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides a single key, e.g. `("hub.url", "ws://localhost:8080")`.
    pub fn set<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<HubbotRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(HubbotRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::RuntimeError;
    use hubbot_core::testing::{MockTransport, eventually};
    use hubbot_core::{BotError, ConnectionState, Transport, handler_fn};
    use std::sync::Arc;

    fn config() -> HubbotConfig {
        let mut config = HubbotConfig::default();
        config.hub.url = "ws://hub.test/chat".into();
        config.bot.name = "hubbot".into();
        config.bot.secret = "s3cret".into();
        config.bot.rooms = vec!["dev".into(), "ops".into()];
        config
    }

    #[tokio::test]
    async fn run_joins_rooms_then_shuts_down() {
        let runtime = HubbotRuntime::from_config(&config());
        let transport = MockTransport::new();
        let probe = transport.clone();

        let result = runtime
            .run_until(transport.clone(), async move {
                eventually(move || probe.sent_texts().len() == 2).await;
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(
            transport.sent_texts(),
            vec!["/join dev", "/join ops", "/leave dev", "/leave ops"]
        );
        assert_eq!(transport.close_count(), 1);
        let bot = runtime.bot().unwrap();
        assert_eq!(bot.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn lost_connection_ends_run() {
        let runtime = HubbotRuntime::from_config(&config());
        let transport = MockTransport::new();
        let dropper = transport.clone();
        tokio::spawn(async move {
            let probe = dropper.clone();
            eventually(move || probe.sent_texts().len() == 2).await;
            dropper.drop_connection("hub restart");
        });

        let result = runtime
            .run_until(transport.clone(), std::future::pending())
            .await;
        assert!(result.is_ok());
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn stop_ends_run() {
        let runtime = Arc::new(HubbotRuntime::from_config(&config()));
        let transport = MockTransport::new();

        let stopper = Arc::clone(&runtime);
        let probe = transport.clone();
        tokio::spawn(async move {
            eventually(move || probe.sent_texts().len() == 2).await;
            stopper.stop();
        });

        assert!(runtime.run(transport.clone()).await.is_ok());
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn handlers_are_installed_in_order() {
        let runtime = HubbotRuntime::from_config(&config());
        runtime.add_handler(handler_fn(|_, _| async { Ok(false) }).named("first"));
        runtime.add_handler(handler_fn(|_, _| async { Ok(true) }).named("second"));
        assert_eq!(runtime.handler_count(), 2);

        let transport = MockTransport::new();
        runtime
            .run_until(transport.clone(), async {})
            .await
            .unwrap();
        assert_eq!(runtime.bot().unwrap().handler_count(), 2);
    }

    #[tokio::test]
    async fn power_up_failure_is_reported() {
        let runtime = HubbotRuntime::from_config(&config());
        let transport = MockTransport::new();
        transport.fail_connect(true);

        let err = runtime
            .run_until(transport.clone(), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Bot(BotError::Transport(_))));
        assert!(transport.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn failed_join_leaves_no_open_connection() {
        let runtime = HubbotRuntime::from_config(&config());
        let transport = MockTransport::new();
        transport.fail_join(true);

        let err = runtime
            .run_until(transport.clone(), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Bot(BotError::Transport(_))));
        assert_eq!(transport.close_count(), 1);
        assert!(!transport.is_active());
        assert!(transport.sent_texts().is_empty());
        assert_eq!(runtime.bot().unwrap().state(), ConnectionState::Faulted);
    }

    #[test]
    fn builder_validates_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let result = HubbotRuntime::builder()
            .without_env()
            .search_path(dir.path())
            .set("hub.url", "http://wrong.example")
            .set("bot.name", "hubbot")
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn builder_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hubbot.toml");
        std::fs::write(
            &path,
            r#"
                [hub]
                url = "wss://hub.example/chat"
                [bot]
                name = "filebot"
                rooms = ["lobby"]
            "#,
        )
        .unwrap();

        let runtime = HubbotRuntime::builder()
            .without_env()
            .config_file(&path)
            .build()
            .unwrap();
        assert_eq!(runtime.config().bot.name, "filebot");
        assert_eq!(runtime.config().bot.rooms, vec!["lobby"]);
        assert!(runtime.bot().is_none());
    }
}
