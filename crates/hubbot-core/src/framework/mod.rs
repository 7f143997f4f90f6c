//! Framework layer - rooms, handlers, commands and the dispatch engine.
//!
//! - [`RoomRegistry`]: case-insensitive set of joined rooms
//! - [`HandlerChain`]: ordered, first-match-wins handler list
//! - [`Command`]: outbound slash-command encoding and the [`Bot`] send API
//! - [`Bot`]: connection lifecycle state machine and event routing

pub mod chain;
pub mod command;
pub mod engine;
pub mod rooms;

pub use chain::{BoxedHandler, FnHandler, Handler, HandlerChain, handler_fn};
pub use command::{COMMAND_PREFIX, Command};
pub use engine::{Bot, ConnectionState, Disconnected, Presence};
pub use rooms::RoomRegistry;
