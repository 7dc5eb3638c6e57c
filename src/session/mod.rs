//! Connection lifecycle
//!
//! This module provides the pieces that keep one long-lived messaging
//! connection consistent under concurrent access:
//! - `StatusStore` - guarded connection status, pairing payload and start time
//! - `ConnectionCoordinator` - single-flight connect / pairing / disconnect
//! - `EventDispatcher` - per-message handling tasks with a deadline
//! - `format_uptime` - uptime rendering for the status view

mod coordinator;
mod dispatcher;
mod status;
mod uptime;

pub use coordinator::ConnectionCoordinator;
pub use dispatcher::{compose_reply, EventDispatcher, DEFAULT_MESSAGE_DEADLINE};
pub use status::{ConnectionStatus, ManagerState, StatusStore};
pub use uptime::format_uptime;
