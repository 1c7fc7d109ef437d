//! Networked drawing client for the collaborative sketch board.
//!
//! Wraps the [`canvas`] engine in a websocket connection to the relay.
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | [`session::Session`]: local edits out, peer events in |
//! | [`connection`] | One relay websocket, binary protobuf events |
//! | [`config`] | Environment configuration |
//! | [`error`] | [`ClientError`] |

pub mod config;
pub mod connection;
pub mod error;
pub mod session;

pub use config::ClientConfig;
pub use connection::Connection;
pub use error::ClientError;
pub use session::{Session, SessionCommand};
