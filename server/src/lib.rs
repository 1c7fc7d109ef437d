//! WebSocket relay for the collaborative sketch board.
//!
//! The relay accepts client sockets and rebroadcasts every message a client
//! sends to all other connected clients. It interprets nothing beyond the
//! event type name, which it reads for logging only.
//!
//! | Module | Role |
//! |--------|------|
//! | [`hub`] | Session registry and fan-out |
//! | [`routes`] | Axum router: `/ws` and `/healthz` |
//! | [`config`] | Environment configuration |
//! | [`state`] | Shared handler state |

pub mod config;
pub mod hub;
pub mod routes;
pub mod state;

pub use config::{ConfigError, RelayConfig};
pub use hub::{FanOut, Hub, Relayed, SessionId};
pub use state::AppState;
