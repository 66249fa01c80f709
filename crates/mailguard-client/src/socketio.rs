//! Socket.IO v4 framing over the Engine.IO v4 WebSocket transport.
//!
//! Each WebSocket text frame carries one Engine.IO packet: a type digit
//! followed by its payload. Engine.IO `message` packets (`4`) wrap a
//! Socket.IO packet, again a type digit, optionally a namespace and an ack
//! id, then JSON.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

/// Socket.IO connect request for the default namespace (`4` + `0`).
pub const CONNECT: &str = "40";

/// Engine.IO pong reply.
pub const PONG: &str = "3";

/// Parameters announced by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    /// Session id.
    pub sid: String,
    /// Milliseconds between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

const fn default_ping_interval() -> u64 {
    25_000
}

const fn default_ping_timeout() -> u64 {
    20_000
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// `0`: session open.
    Open(OpenInfo),
    /// `1`: transport close.
    Close,
    /// `2`: heartbeat from the server.
    Ping,
    /// `3`: heartbeat reply.
    Pong,
    /// `4`: Socket.IO payload.
    Message(String),
    /// `5`/`6`: upgrade handshake, unused on a direct WebSocket.
    Upgrade,
}

/// Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connected.
    Connect(Option<Value>),
    /// `1`: namespace disconnected by the server.
    Disconnect,
    /// `2`: named event.
    Event {
        /// Event name.
        name: String,
        /// First argument, `Null` when absent.
        payload: Value,
    },
    /// `3`: acknowledgement; not requested by this client.
    Ack,
    /// `4`: namespace connection refused.
    ConnectError(Value),
}

/// Decodes one Engine.IO text frame.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for an unknown packet type and
/// [`Error::Decode`] for a malformed open payload.
pub fn decode_engine(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Engine.IO frame".to_string()))?;
    let body = chars.as_str();
    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => Ok(EnginePacket::Message(body.to_string())),
        '5' | '6' => Ok(EnginePacket::Upgrade),
        other => Err(Error::Protocol(format!(
            "unknown Engine.IO packet type {other:?}"
        ))),
    }
}

/// Decodes the Socket.IO packet inside an Engine.IO message.
///
/// # Errors
///
/// Returns [`Error::Protocol`] for unknown types or event packets without
/// a name, and [`Error::Decode`] for malformed JSON.
pub fn decode_socket(packet: &str) -> Result<SocketPacket> {
    let mut chars = packet.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty Socket.IO packet".to_string()))?;
    let mut rest = chars.as_str();

    // Namespace: "/name," before the payload.
    if rest.starts_with('/') {
        rest = rest.split_once(',').map_or("", |(_, tail)| tail);
    }
    // Ack id: leading digits.
    rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    let json = || -> Result<Option<Value>> {
        if rest.is_empty() {
            Ok(None)
        } else {
            Ok(Some(serde_json::from_str(rest)?))
        }
    };

    match kind {
        '0' => Ok(SocketPacket::Connect(json()?)),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let Some(Value::Array(mut args)) = json()? else {
                return Err(Error::Protocol("event packet without arguments".to_string()));
            };
            if args.is_empty() {
                return Err(Error::Protocol("event packet without a name".to_string()));
            }
            let Value::String(name) = args.remove(0) else {
                return Err(Error::Protocol("event name is not a string".to_string()));
            };
            let payload = if args.is_empty() {
                Value::Null
            } else {
                args.remove(0)
            };
            Ok(SocketPacket::Event { name, payload })
        }
        '3' => Ok(SocketPacket::Ack),
        '4' => Ok(SocketPacket::ConnectError(json()?.unwrap_or(Value::Null))),
        other => Err(Error::Protocol(format!(
            "unknown Socket.IO packet type {other:?}"
        ))),
    }
}

/// WebSocket handshake URL for `base`: `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
///
/// # Errors
///
/// Returns an error when `base` is not http(s) or the path cannot be joined.
pub fn handshake_url(base: &Url) -> Result<Url> {
    let mut url = base.join("socket.io/")?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::InvalidConfig(format!(
                "cannot derive WebSocket URL from {other} scheme"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::InvalidConfig(format!("cannot use {scheme} for {base}")))?;
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open() {
        let packet =
            decode_engine(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":5000,"maxPayload":1000000}"#)
                .unwrap();
        assert_eq!(
            packet,
            EnginePacket::Open(OpenInfo {
                sid: "abc".into(),
                ping_interval: 25_000,
                ping_timeout: 5_000,
            })
        );
    }

    #[test]
    fn test_decode_engine_control() {
        assert_eq!(decode_engine("2").unwrap(), EnginePacket::Ping);
        assert_eq!(decode_engine("1").unwrap(), EnginePacket::Close);
        assert_eq!(
            decode_engine("40").unwrap(),
            EnginePacket::Message("0".into())
        );
        assert!(decode_engine("").is_err());
        assert!(decode_engine("9").is_err());
    }

    #[test]
    fn test_decode_event() {
        let packet =
            decode_socket(r#"2["new_email",{"id":3,"sender":"b@y.com"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "new_email".into(),
                payload: json!({"id": 3, "sender": "b@y.com"}),
            }
        );
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack() {
        let packet = decode_socket(r#"2/admin,12["connected"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                name: "connected".into(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn test_decode_connect_and_errors() {
        assert_eq!(
            decode_socket(r#"0{"sid":"x"}"#).unwrap(),
            SocketPacket::Connect(Some(json!({"sid": "x"})))
        );
        assert_eq!(decode_socket("0").unwrap(), SocketPacket::Connect(None));
        assert_eq!(decode_socket("1").unwrap(), SocketPacket::Disconnect);
        assert_eq!(
            decode_socket(r#"4{"message":"Not authorized"}"#).unwrap(),
            SocketPacket::ConnectError(json!({"message": "Not authorized"}))
        );
        assert!(decode_socket("2[]").is_err());
        assert!(decode_socket("2[1]").is_err());
        assert!(decode_socket("2").is_err());
    }

    #[test]
    fn test_handshake_url() {
        let base = Url::parse("http://localhost:5001/").unwrap();
        assert_eq!(
            handshake_url(&base).unwrap().as_str(),
            "ws://localhost:5001/socket.io/?EIO=4&transport=websocket"
        );
        let base = Url::parse("https://dlp.example.com/app/").unwrap();
        assert_eq!(
            handshake_url(&base).unwrap().as_str(),
            "wss://dlp.example.com/app/socket.io/?EIO=4&transport=websocket"
        );
    }
}
