//! Message envelope
//!
//! Every frame carries a JSON array `[header, body]`. Bootstrap replies may
//! drop the body, in which case it is treated as `{}`.

use std::fmt;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};
use serde_json::{Map, Value};

use crate::error::{FrameError, ProtocolResult};
use crate::frame::TOKEN_LEN;

/// Header object of a message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    /// Protocol namespace (`system`, `ha`, `device_control`, ...)
    pub namespace: String,

    /// Verb on requests sent to the hub
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Echoed verb on replies from the hub
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Message type on unsolicited pushes (e.g. `device_property`)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Result flag on replies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const HEADER_FIELDS: [&str; 5] = ["namespace", "command", "response", "type", "success"];

impl Header {
    /// Read a header object
    ///
    /// Known fields holding a value of the wrong type are dropped with a
    /// warning; unknown fields are kept in `extra`.
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut header = Header::default();
        for (key, value) in object {
            let leftover = match (key.as_str(), value) {
                ("namespace", Value::String(s)) => {
                    header.namespace = s;
                    None
                }
                ("command", Value::String(s)) => {
                    header.command = Some(s);
                    None
                }
                ("response", Value::String(s)) => {
                    header.response = Some(s);
                    None
                }
                ("type", Value::String(s)) => {
                    header.kind = Some(s);
                    None
                }
                ("success", Value::Bool(b)) => {
                    header.success = Some(b);
                    None
                }
                (_, value) => Some(value),
            };
            match leftover {
                Some(value) if HEADER_FIELDS.contains(&key.as_str()) => {
                    warn!(field = %key, %value, "ignoring header field of unexpected type");
                }
                Some(value) => {
                    header.extra.insert(key, value);
                }
                None => {}
            }
        }
        header
    }

    /// Create a request header
    pub fn command(namespace: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            command: Some(command.into()),
            ..Default::default()
        }
    }

    /// Create a reply header
    pub fn response(namespace: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            response: Some(response.into()),
            ..Default::default()
        }
    }
}

/// A decoded `[header, body]` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    pub body: Value,
}

impl Message {
    /// Create a message from a header and body
    pub fn new(header: Header, body: Value) -> Self {
        Self { header, body }
    }

    /// Create a request message
    pub fn command(namespace: &str, command: &str, body: Value) -> Self {
        Self::new(Header::command(namespace, command), body)
    }

    /// Build a message from decoded JSON
    ///
    /// Accepts `[header, body, ...]`, `[header]` and a bare `header` object.
    /// Elements past the body are ignored. Content of any other shape still
    /// yields a message, with an empty header, so it is classified as
    /// unhandled instead of failing the stream.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                if items.len() > 2 {
                    debug!(elements = items.len(), "ignoring trailing envelope elements");
                }
                let mut items = items.into_iter();
                let header = match items.next() {
                    Some(Value::Object(object)) => Header::from_object(object),
                    Some(other) => {
                        warn!(header = %other, "message header is not an object");
                        Header::default()
                    }
                    None => {
                        warn!("empty message envelope");
                        Header::default()
                    }
                };
                let body = items.next().unwrap_or_else(empty_body);
                Self { header, body }
            }
            Value::Object(object) => Self {
                header: Header::from_object(object),
                body: empty_body(),
            },
            other => {
                warn!(content = %other, "message is neither an array nor an object");
                Self {
                    header: Header::default(),
                    body: other,
                }
            }
        }
    }

    /// Parse a message from JSON bytes
    ///
    /// Only invalid JSON is an error; see [`Message::from_value`].
    pub fn from_slice(content: &[u8]) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_slice(content)?;
        Ok(Self::from_value(value))
    }

    /// Serialize to compact JSON
    pub fn to_vec(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize the body into a typed payload
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.header, &self.body).serialize(serializer)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

/// The 12-character identifier carried in every outbound frame
///
/// The hub associates a client with this value once the user approves the
/// integration in the vendor app.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Validate and wrap a token
    pub fn new(token: impl Into<String>) -> ProtocolResult<Self> {
        let token = token.into();
        if !token.is_ascii() {
            return Err(FrameError::InvalidToken {
                token,
                reason: "must be ASCII",
            });
        }
        if token.len() != TOKEN_LEN {
            return Err(FrameError::InvalidToken {
                token,
                reason: "must be exactly 12 characters",
            });
        }
        Ok(Self(token))
    }

    /// Generate a random token of 12 lower-case hex digits
    pub fn generate() -> Self {
        const DIGITS: &[u8] = b"0123456789abcdef";
        let mut rng = rand::thread_rng();
        let token = (0..TOKEN_LEN)
            .map(|_| DIGITS[rng.gen_range(0..DIGITS.len())] as char)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

impl std::str::FromStr for Token {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
