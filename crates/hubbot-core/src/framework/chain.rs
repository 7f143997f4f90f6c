//! Handler trait and the ordered handler chain.
//!
//! Registration order is priority order: the chain offers each message to
//! its handlers one at a time and stops at the first one that consumes it.
//!
//! ```rust,ignore
//! use hubbot_core::{Bot, ChatMessage, Handler, handler_fn};
//!
//! struct Ping;
//!
//! #[async_trait::async_trait]
//! impl Handler for Ping {
//!     async fn handle(&self, message: &ChatMessage, bot: &Bot) -> anyhow::Result<bool> {
//!         if message.content() != "!ping" {
//!             return Ok(false);
//!         }
//!         bot.reply(message.sender(), "pong", message.room()).await?;
//!         Ok(true)
//!     }
//! }
//!
//! bot.add_handler(Ping);
//! bot.add_handler(handler_fn(|message, _bot| async move {
//!     tracing::info!(%message, "unhandled");
//!     Ok(true)
//! }));
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

use crate::foundation::message::ChatMessage;
use crate::framework::engine::Bot;

/// A pluggable message handler.
///
/// Return `Ok(true)` to consume the message and stop the chain, `Ok(false)`
/// to pass it on. An `Err` is logged and counts as `Ok(false)`.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Attempts to handle `message`.
    async fn handle(&self, message: &ChatMessage, bot: &Bot) -> anyhow::Result<bool>;
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn Handler>;

// =============================================================================
// Closure handlers
// =============================================================================

/// A [`Handler`] backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    name: &'static str,
    f: F,
}

impl<F> FnHandler<F> {
    /// Overrides the log name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

/// Wraps an async closure as a [`Handler`].
///
/// The closure receives owned copies of the message and bot handle so the
/// returned future can be `'static`.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ChatMessage, Bot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    FnHandler {
        name: "handler_fn",
        f,
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(ChatMessage, Bot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, message: &ChatMessage, bot: &Bot) -> anyhow::Result<bool> {
        (self.f)(message.clone(), bot.clone()).await
    }
}

// =============================================================================
// Handler Chain
// =============================================================================

/// An ordered list of handlers with first-match-wins dispatch.
#[derive(Default)]
pub struct HandlerChain {
    handlers: RwLock<Vec<BoxedHandler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    pub fn add(&self, handler: BoxedHandler) {
        debug!(handler = handler.name(), "Handler added");
        self.handlers.write().push(handler);
    }

    /// Removes the first entry that is the same instance as `handler`.
    ///
    /// Returns `true` if one was removed.
    pub fn remove(&self, handler: &BoxedHandler) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Offers `message` to each handler in order.
    ///
    /// Returns the index of the handler that consumed it, or `None`. A handler
    /// that errors or panics is logged and skipped. The list is copied before
    /// iterating, so handlers may add or remove handlers while running.
    pub async fn dispatch(&self, message: &ChatMessage, bot: &Bot) -> Option<usize> {
        let handlers = self.handlers.read().clone();

        for (index, handler) in handlers.iter().enumerate() {
            let outcome = AssertUnwindSafe(handler.handle(message, bot))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(true)) => {
                    debug!(handler = handler.name(), index, "Message consumed");
                    return Some(index);
                }
                Ok(Ok(false)) => {
                    trace!(handler = handler.name(), index, "Handler passed");
                }
                Ok(Err(e)) => {
                    warn!(handler = handler.name(), index, error = %e, "Handler failed");
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(handler = handler.name(), index, panic = %reason, "Handler panicked");
                }
            }
        }

        None
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("HandlerChain")
            .field(
                "handlers",
                &handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
