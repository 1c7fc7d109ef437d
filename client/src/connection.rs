//! One websocket connection to the relay.
//!
//! Outbound events always travel as binary protobuf frames. Inbound, binary
//! frames are decoded with [`frames::decode_event`] and text frames with
//! [`frames::decode_json_event`]. Anything else a peer sends is skipped with a
//! warning, since the relay forwards payloads without validating them.

use frames::{Event, decode_event, decode_json_event, encode_event};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::ClientError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Connection {
    socket: Socket,
}

impl Connection {
    /// Open a connection to the relay at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::WsConnect`] if the handshake fails.
    pub async fn open(url: &str) -> Result<Self, ClientError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| ClientError::WsConnect(Box::new(e)))?;
        debug!(%url, "relay connection open");
        Ok(Self { socket })
    }

    /// Send one event as a binary frame.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Codec`] if the event cannot be encoded and
    /// [`ClientError::Ws`] if the socket write fails.
    pub async fn send(&mut self, event: &Event) -> Result<(), ClientError> {
        let bytes = encode_event(event)?;
        self.socket
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| ClientError::Ws(Box::new(e)))
    }

    /// Wait for the next decodable event. `None` once the relay closes the
    /// connection.
    ///
    /// Cancel safe: a frame is fully handled before the next await point.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Ws`] on a transport failure.
    pub async fn recv(&mut self) -> Result<Option<Event>, ClientError> {
        while let Some(message) = self.socket.next().await {
            let message = message.map_err(|e| ClientError::Ws(Box::new(e)))?;
            let decoded = match message {
                Message::Binary(bytes) => decode_event(&bytes).map_err(|e| e.to_string()),
                Message::Text(text) => decode_json_event(text.as_str()).map_err(|e| e.to_string()),
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            match decoded {
                Ok(event) => return Ok(Some(event)),
                Err(error) => warn!(%error, "skipping undecodable event"),
            }
        }
        Ok(None)
    }

    /// Close the connection politely.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Ws`] if the close handshake cannot be sent.
    pub async fn close(mut self) -> Result<(), ClientError> {
        match self.socket.close(None).await {
            Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(ClientError::Ws(Box::new(e))),
        }
    }
}
