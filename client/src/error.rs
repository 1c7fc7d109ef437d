//! Client error type.

use canvas::engine::CaptureError;
use frames::CodecError;
use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid {key}={value:?}: {reason}")]
    Config { key: &'static str, value: String, reason: String },
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tungstenite::Error>),
    #[error("websocket error: {0}")]
    Ws(Box<tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("event encode failed: {0}")]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
